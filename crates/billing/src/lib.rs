//! Billing module: client payments against matters and the LawPay
//! integration (OAuth connection + card/eCheck charges).

pub mod lawpay;
pub mod payment;

pub use lawpay::{
    Charge, ChargeRequest, LawPayClient, LawPayConfig, LawPayConnection, LawPayError, LawPayToken,
    OAUTH_STATE_TTL, check_endpoint,
};
pub use payment::{NewPayment, Payment, PaymentStatus};
