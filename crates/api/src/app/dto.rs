use axum::{Json, http::StatusCode, response::{IntoResponse, Response}};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::app::errors::{ApiError, ApiResult};

// -------------------------
// Request DTOs
// -------------------------
//
// Every field is optional at the JSON layer; required-ness is enforced by the
// domain constructors so missing fields produce a field-specific 400.

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMatterRequest {
    pub client_id: Option<String>,
    pub title: Option<String>,
    pub lead_lawyer_id: Option<String>,
    pub matter_number: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMatterRequest {
    pub title: Option<String>,
    pub lead_lawyer_id: Option<String>,
    pub matter_number: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// `?matter_id=` filter shared by documents and payments.
#[derive(Debug, Deserialize)]
pub struct MatterFilter {
    pub matter_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDocumentRequest {
    pub matter_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDocumentRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub content: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSnapshotRequest {
    pub content: Option<String>,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IncludeInactive {
    pub include_inactive: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryPosition {
    pub id: String,
    pub display_order: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReorderCategoriesRequest {
    pub categories: Option<Vec<CategoryPosition>>,
}

#[derive(Debug, Deserialize)]
pub struct JourneyRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub service_category_id: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct StepRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StepPosition {
    pub id: String,
    pub step_order: i64,
}

#[derive(Debug, Deserialize)]
pub struct ReorderStepsRequest {
    pub steps: Option<Vec<StepPosition>>,
}

#[derive(Debug, Deserialize)]
pub struct OAuthProviderRequest {
    pub provider_id: Option<String>,
    pub name: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub scopes: Option<Vec<String>>,
    pub is_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CreatePaymentRequest {
    pub matter_id: Option<String>,
    pub amount_cents: Option<i64>,
    pub currency: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePaymentRequest {
    pub status: Option<String>,
}

/// One-time payment method token produced by LawPay hosted fields.
#[derive(Debug, Deserialize)]
pub struct ChargePaymentRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LawPayCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleDriveRequest {
    pub is_enabled: Option<bool>,
    pub service_account_email: Option<String>,
    pub service_account_key: Option<String>,
    pub root_folder_id: Option<String>,
    pub shared_drive_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateConversationRequest {
    pub client_id: Option<String>,
    pub lawyer_id: Option<String>,
    pub matter_id: Option<String>,
    pub subject: Option<String>,
}

// -------------------------
// Response envelopes
// -------------------------

/// `{ "<key>": value }` with 200.
pub fn envelope<T: Serialize>(key: &str, value: &T) -> ApiResult {
    Ok((StatusCode::OK, Json(wrap(key, value, false)?)).into_response())
}

/// `{ "success": true, "<key>": value }` for a mutation.
pub fn mutated<T: Serialize>(status: StatusCode, key: &str, value: &T) -> ApiResult {
    Ok((status, Json(wrap(key, value, true)?)).into_response())
}

/// `{ "success": true }`.
pub fn success() -> ApiResult {
    Ok((StatusCode::OK, Json(json!({ "success": true }))).into_response())
}

fn wrap<T: Serialize>(key: &str, value: &T, success: bool) -> Result<Value, ApiError> {
    let value = serde_json::to_value(value)
        .map_err(|e| ApiError::Internal(format!("serialize {key}: {e}")))?;
    let mut body = Map::new();
    if success {
        body.insert("success".to_string(), Value::Bool(true));
    }
    body.insert(key.to_string(), value);
    Ok(Value::Object(body))
}

/// Parse a path or body identifier, answering 400 on garbage.
pub fn parse_id<T>(raw: &str) -> Result<T, ApiError>
where
    T: core::str::FromStr<Err = casebridge_core::DomainError>,
{
    raw.parse::<T>().map_err(ApiError::from)
}
