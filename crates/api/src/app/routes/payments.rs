use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use casebridge_auth::STAFF;
use casebridge_billing::{ChargeRequest, LawPayConnection, NewPayment, Payment, PaymentStatus};
use casebridge_core::{MatterId, PaymentId, required_text};

use crate::app::dto::{
    self, ChargePaymentRequest, CreatePaymentRequest, MatterFilter, UpdatePaymentRequest,
};
use crate::app::errors::{ApiError, ApiResult};
use crate::app::AppState;
use crate::authz;
use crate::context::CurrentUser;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_payments).post(create_payment))
        .route("/:id", get(get_payment).put(update_payment))
        .route("/:id/charge", post(charge_payment))
}

pub async fn list_payments(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    query: Result<Query<MatterFilter>, QueryRejection>,
) -> ApiResult {
    let Query(query) = query?;
    let matter = query
        .matter_id
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(dto::parse_id::<MatterId>)
        .transpose()?;

    let payments = state
        .db
        .payments()
        .list(matter, authz::client_scope(&current))
        .await?;
    dto::envelope("payments", &payments)
}

pub async fn create_payment(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<CreatePaymentRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let Json(body) = body?;

    let new = NewPayment::new(
        body.matter_id.as_deref(),
        body.amount_cents,
        body.currency.as_deref(),
        body.description.as_deref(),
    )?;
    let payment = state.db.payments().create(&new).await?;

    tracing::info!(
        payment_id = %payment.id,
        matter_id = %payment.matter_id,
        amount_cents = payment.amount_cents,
        by = %current.id(),
        "payment created"
    );
    dto::mutated(StatusCode::CREATED, "payment", &payment)
}

pub async fn get_payment(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> ApiResult {
    let id: PaymentId = dto::parse_id(&id)?;
    let payment = state.db.payments().get(id).await?;
    authz::require_owner(&current, payment.client_id)?;
    dto::envelope("payment", &payment)
}

pub async fn update_payment(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdatePaymentRequest>, JsonRejection>,
) -> ApiResult {
    authz::require(&current, STAFF)?;
    let id: PaymentId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let status = required_text(body.status.as_deref(), "status")?.parse::<PaymentStatus>()?;
    let payment = state.db.payments().set_status(id, status).await?;

    tracing::info!(payment_id = %payment.id, status = %payment.status, by = %current.id(), "payment status changed");
    dto::mutated(StatusCode::OK, "payment", &payment)
}

/// Charge a pending payment through LawPay using a hosted-fields token.
///
/// The payment is claimed (PENDING → PROCESSING) before LawPay is called, so
/// concurrent attempts get 409 instead of a second charge. A declined charge
/// marks the payment FAILED and answers 200 with `success: false`; transport
/// and upstream errors hand it back to PENDING.
pub async fn charge_payment(
    Extension(state): Extension<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<ChargePaymentRequest>, JsonRejection>,
) -> ApiResult {
    let id: PaymentId = dto::parse_id(&id)?;
    let Json(body) = body?;

    let payment = state.db.payments().get(id).await?;
    authz::require_owner(&current, payment.client_id)?;
    if payment.status != PaymentStatus::Pending {
        return Err(ApiError::conflict(format!(
            "payment is {}; only PENDING payments can be charged",
            payment.status
        )));
    }
    let method = required_text(body.token.as_deref(), "token")?;

    let connection = state
        .db
        .lawpay()
        .get()
        .await?
        .ok_or_else(|| ApiError::conflict("LawPay is not connected"))?;

    // Runs detached so a dropped request cannot strand the claim.
    let (payment, charge_status) = tokio::spawn(run_charge(state, connection, id, method))
        .await
        .map_err(|e| ApiError::Internal(format!("charge task failed: {e}")))??;

    tracing::info!(
        payment_id = %payment.id,
        charge_id = payment.lawpay_charge_id.as_deref().unwrap_or_default(),
        status = %payment.status,
        by = %current.id(),
        "payment charged"
    );
    Ok((
        StatusCode::OK,
        Json(json!({
            "success": payment.status == PaymentStatus::Paid,
            "payment": payment,
            "charge_status": charge_status,
        })),
    )
        .into_response())
}

async fn run_charge(
    state: AppState,
    connection: LawPayConnection,
    id: PaymentId,
    method: String,
) -> Result<(Payment, String), ApiError> {
    let payments = state.db.payments();
    let payment = payments.claim_for_charge(id).await?;

    let request = ChargeRequest {
        amount: payment.amount_cents,
        currency: payment.currency.clone(),
        method,
        reference: payment.id.to_string(),
        account_id: state.lawpay.config().account_id.clone(),
    };
    let charge = match state.lawpay.create_charge(&connection, &request).await {
        Ok(charge) => charge,
        Err(err) => {
            if let Err(release) = payments.release_charge(id).await {
                tracing::error!(payment_id = %id, error = %release, "could not release charge claim");
            }
            return Err(err.into());
        }
    };

    let outcome = PaymentStatus::from_charge(charge.succeeded());
    let payment = payments.settle_charge(id, outcome, &charge.id).await?;
    Ok((payment, charge.status))
}
