//! LawPay client: OAuth2 authorization-code connection and charges.
//!
//! The firm connects its LawPay merchant account once (admin-only redirect
//! flow); the stored access token is then used for every charge.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use casebridge_core::UserId;

/// How long an issued OAuth `state` stays redeemable.
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);

const HTTP_TIMEOUT: Duration = Duration::from_secs(15);
const MAX_ERROR_BODY: usize = 512;

#[derive(Debug, thiserror::Error)]
pub enum LawPayError {
    #[error("LawPay is not configured (missing client id/secret)")]
    NotConfigured,

    /// Local settings LawPay cannot be reached with, such as a malformed URL.
    #[error("LawPay is misconfigured: {0}")]
    Misconfigured(String),

    #[error("LawPay request failed: {0}")]
    Transport(String),

    #[error("LawPay returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("unexpected LawPay response: {0}")]
    Decode(String),
}

#[derive(Debug, Clone)]
pub struct LawPayConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub authorize_url: String,
    pub token_url: String,
    pub api_url: String,
    pub redirect_uri: String,
    pub scope: String,
    /// Operating account charges are deposited into, when the merchant has several.
    pub account_id: Option<String>,
}

impl LawPayConfig {
    pub fn is_configured(&self) -> bool {
        self.client_id.as_deref().is_some_and(|s| !s.is_empty())
            && self.client_secret.as_deref().is_some_and(|s| !s.is_empty())
    }

    fn credentials(&self) -> Result<(&str, &str), LawPayError> {
        match (self.client_id.as_deref(), self.client_secret.as_deref()) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => Ok((id, secret)),
            _ => Err(LawPayError::NotConfigured),
        }
    }
}

/// Check that `raw` is an absolute http(s) URL usable as a LawPay endpoint.
pub fn check_endpoint(raw: &str) -> Result<(), String> {
    let url = reqwest::Url::parse(raw).map_err(|e| e.to_string())?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err("missing host".to_string()),
        other => Err(format!("unsupported scheme '{other}'")),
    }
}

impl Default for LawPayConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            authorize_url: "https://secure.lawpay.com/oauth/authorize".to_string(),
            token_url: "https://secure.lawpay.com/oauth/token".to_string(),
            api_url: "https://api.affinipay.com".to_string(),
            redirect_uri: "http://localhost:8080/lawpay/callback".to_string(),
            scope: "chargeio".to_string(),
            account_id: None,
        }
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LawPayToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub merchant_id: Option<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// The firm's stored LawPay connection (singleton row).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LawPayConnection {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub token_type: String,
    pub scope: Option<String>,
    pub merchant_id: Option<String>,
    pub connected_by: UserId,
    pub connected_at: DateTime<Utc>,
}

impl LawPayConnection {
    pub fn from_token(token: LawPayToken, connected_by: UserId, connected_at: DateTime<Utc>) -> Self {
        Self {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            token_type: token.token_type,
            scope: token.scope,
            merchant_id: token.merchant_id,
            connected_by,
            connected_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeRequest {
    /// Amount in cents.
    pub amount: i64,
    pub currency: String,
    /// One-time payment method token from LawPay hosted fields.
    pub method: String,
    pub reference: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Charge {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub amount: Option<i64>,
}

impl Charge {
    pub fn succeeded(&self) -> bool {
        !matches!(
            self.status.to_uppercase().as_str(),
            "FAILED" | "DECLINED" | "VOIDED"
        )
    }
}

#[derive(Debug, Clone)]
pub struct LawPayClient {
    http: reqwest::Client,
    config: LawPayConfig,
}

impl LawPayClient {
    pub fn new(config: LawPayConfig) -> Result<Self, LawPayError> {
        let http = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| LawPayError::Transport(e.to_string()))?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &LawPayConfig {
        &self.config
    }

    /// URL the admin's browser is redirected to in order to grant access.
    pub fn authorization_url(&self, state: &str) -> Result<String, LawPayError> {
        let (client_id, _) = self.config.credentials()?;
        let url = reqwest::Url::parse_with_params(
            &self.config.authorize_url,
            &[
                ("response_type", "code"),
                ("client_id", client_id),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("scope", self.config.scope.as_str()),
                ("state", state),
            ],
        )
        .map_err(|e| LawPayError::Misconfigured(format!("invalid authorize url: {e}")))?;
        Ok(url.into())
    }

    pub async fn exchange_code(&self, code: &str) -> Result<LawPayToken, LawPayError> {
        let (client_id, client_secret) = self.config.credentials()?;

        let res = self
            .http
            .post(&self.config.token_url)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| LawPayError::Transport(e.to_string()))?;

        let token: LawPayToken = decode(res).await?;
        tracing::info!(merchant_id = ?token.merchant_id, "exchanged LawPay authorization code");
        Ok(token)
    }

    pub async fn create_charge(
        &self,
        connection: &LawPayConnection,
        request: &ChargeRequest,
    ) -> Result<Charge, LawPayError> {
        let url = format!("{}/v1/charges", self.config.api_url.trim_end_matches('/'));

        let res = self
            .http
            .post(url)
            .bearer_auth(&connection.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| LawPayError::Transport(e.to_string()))?;

        let charge: Charge = decode(res).await?;
        tracing::info!(
            charge_id = %charge.id,
            status = %charge.status,
            reference = %request.reference,
            "LawPay charge processed"
        );
        Ok(charge)
    }
}

async fn decode<T: serde::de::DeserializeOwned>(res: reqwest::Response) -> Result<T, LawPayError> {
    let status = res.status();
    if !status.is_success() {
        let mut body = res.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        return Err(LawPayError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    res.json::<T>()
        .await
        .map_err(|e| LawPayError::Decode(e.to_string()))
}
