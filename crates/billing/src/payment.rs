use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casebridge_core::{
    DomainError, DomainResult, Entity, MatterId, Money, PaymentId, UserId, optional_text,
    required_text, status_enum,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentStatus {
    Pending,
    /// Claimed by an in-flight LawPay charge.
    Processing,
    Paid,
    Failed,
    Refunded,
}

status_enum!(PaymentStatus, "status", {
    Pending => "PENDING",
    Processing => "PROCESSING",
    Paid => "PAID",
    Failed => "FAILED",
    Refunded => "REFUNDED",
});

impl PaymentStatus {
    /// Manual moves made by staff: PENDING settles to PAID or FAILED, a
    /// FAILED payment can be retried, only PAID can be refunded. PROCESSING
    /// is entered and left only by the charge flow.
    pub fn can_transition_to(self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        if self == Processing || next == Processing {
            return false;
        }
        self == next
            || matches!(
                (self, next),
                (Pending, Paid) | (Pending, Failed) | (Failed, Pending) | (Paid, Refunded)
            )
    }

    pub fn transition(self, next: PaymentStatus) -> DomainResult<PaymentStatus> {
        if self == PaymentStatus::Processing {
            return Err(DomainError::invariant(
                "payment is being charged; try again once the charge settles",
            ));
        }
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(DomainError::invariant(format!(
                "payment cannot move from {self} to {next}"
            )))
        }
    }

    /// Final status for a charge LawPay answered.
    pub fn from_charge(approved: bool) -> Self {
        if approved {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Failed
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Payment {
    pub id: PaymentId,
    pub matter_id: MatterId,
    /// Joined from `matters`.
    pub matter_title: Option<String>,
    /// Client of the matter (joined), used for ownership checks.
    pub client_id: UserId,
    pub amount_cents: i64,
    pub currency: String,
    pub description: Option<String>,
    pub status: PaymentStatus,
    pub lawpay_charge_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Payment {
    type Id = PaymentId;
    const NAME: &'static str = "payment";

    fn id(&self) -> &PaymentId {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub matter_id: MatterId,
    pub amount: Money,
    pub description: Option<String>,
}

impl NewPayment {
    pub fn new(
        matter_id: Option<&str>,
        amount_cents: Option<i64>,
        currency: Option<&str>,
        description: Option<&str>,
    ) -> DomainResult<Self> {
        let matter_id = required_text(matter_id, "matter_id")?.parse::<MatterId>()?;
        let amount_cents =
            amount_cents.ok_or_else(|| DomainError::validation("amount_cents is required"))?;

        Ok(Self {
            matter_id,
            amount: Money::new(amount_cents, currency)?,
            description: optional_text(description),
        })
    }
}
