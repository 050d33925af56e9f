//! Runtime configuration, read from the environment.
//!
//! Every value has a development default; the ones that matter in production
//! log a warning when they fall back.

use std::net::SocketAddr;
use std::time::Duration;

use casebridge_billing::{LawPayConfig, check_endpoint};
use casebridge_core::EmailAddress;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: EmailAddress,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub session_ttl: Duration,
    /// Adds `Secure` to the session cookie.
    pub cookie_secure: bool,
    /// Front-end origin the LawPay callback redirects back to.
    pub app_url: String,
    pub bootstrap_admin: Option<BootstrapAdmin>,
    pub lawpay: LawPayConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://casebridge.db".to_string(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            session_ttl: Duration::from_secs(60 * 60 * 24 * 7),
            cookie_secure: false,
            app_url: "http://localhost:3000".to_string(),
            bootstrap_admin: None,
            lawpay: LawPayConfig::default(),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source (the process env in `main`).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| get(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let database_url = var("DATABASE_URL").unwrap_or_else(|| {
            tracing::warn!(default = %defaults.database_url, "DATABASE_URL not set; using dev default");
            defaults.database_url.clone()
        });

        let bind_addr = match var("BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?,
            None => defaults.bind_addr,
        };

        let session_ttl = match var("SESSION_TTL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.parse().map_err(|_| ConfigError::Invalid {
                    var: "SESSION_TTL_SECS",
                    reason: format!("expected a positive number of seconds, got '{raw}'"),
                })?;
                if secs == 0 {
                    return Err(ConfigError::Invalid {
                        var: "SESSION_TTL_SECS",
                        reason: "must be greater than zero".to_string(),
                    });
                }
                Duration::from_secs(secs)
            }
            None => defaults.session_ttl,
        };

        let cookie_secure = match var("COOKIE_SECURE") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| ConfigError::Invalid {
                var: "COOKIE_SECURE",
                reason: format!("expected true/false, got '{raw}'"),
            })?,
            None => {
                tracing::warn!("COOKIE_SECURE not set; session cookie will not be marked Secure");
                false
            }
        };

        let app_url = var("APP_URL")
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or(defaults.app_url);

        let bootstrap_admin = match (var("BOOTSTRAP_ADMIN_EMAIL"), var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                email: EmailAddress::parse(&email).map_err(|e| ConfigError::Invalid {
                    var: "BOOTSTRAP_ADMIN_EMAIL",
                    reason: e.to_string(),
                })?,
                password,
            }),
            (None, None) => None,
            _ => {
                tracing::warn!(
                    "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must both be set; skipping bootstrap"
                );
                None
            }
        };

        let lawpay_defaults = LawPayConfig::default();
        let endpoint = |key: &'static str, default: String| -> Result<String, ConfigError> {
            let url = var(key).unwrap_or(default);
            check_endpoint(&url).map_err(|reason| ConfigError::Invalid { var: key, reason })?;
            Ok(url)
        };
        let lawpay = LawPayConfig {
            client_id: var("LAWPAY_CLIENT_ID"),
            client_secret: var("LAWPAY_CLIENT_SECRET"),
            authorize_url: endpoint("LAWPAY_AUTHORIZE_URL", lawpay_defaults.authorize_url)?,
            token_url: endpoint("LAWPAY_TOKEN_URL", lawpay_defaults.token_url)?,
            api_url: endpoint("LAWPAY_API_URL", lawpay_defaults.api_url)?,
            redirect_uri: endpoint("LAWPAY_REDIRECT_URI", lawpay_defaults.redirect_uri)?,
            scope: var("LAWPAY_SCOPE").unwrap_or(lawpay_defaults.scope),
            account_id: var("LAWPAY_ACCOUNT_ID"),
        };
        if !lawpay.is_configured() {
            tracing::warn!("LAWPAY_CLIENT_ID/LAWPAY_CLIENT_SECRET not set; LawPay routes are disabled");
        }

        Ok(Self {
            database_url,
            bind_addr,
            session_ttl,
            cookie_secure,
            app_url,
            bootstrap_admin,
            lawpay,
        })
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from(vars: &[(&str, &str)]) -> Result<ApiConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ApiConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = from(&[]).unwrap();
        assert_eq!(cfg.bind_addr.port(), 8080);
        assert_eq!(cfg.session_ttl, Duration::from_secs(604_800));
        assert!(!cfg.cookie_secure);
        assert!(cfg.bootstrap_admin.is_none());
        assert!(!cfg.lawpay.is_configured());
    }

    #[test]
    fn values_are_read_and_normalized() {
        let cfg = from(&[
            ("BIND_ADDR", "127.0.0.1:9000"),
            ("SESSION_TTL_SECS", "3600"),
            ("COOKIE_SECURE", "TRUE"),
            ("APP_URL", "https://app.example.com/"),
            ("BOOTSTRAP_ADMIN_EMAIL", "Admin@Example.com"),
            ("BOOTSTRAP_ADMIN_PASSWORD", "change-me-now"),
            ("LAWPAY_CLIENT_ID", "id"),
            ("LAWPAY_CLIENT_SECRET", "secret"),
        ])
        .unwrap();
        assert_eq!(cfg.bind_addr.port(), 9000);
        assert_eq!(cfg.session_ttl, Duration::from_secs(3600));
        assert!(cfg.cookie_secure);
        assert_eq!(cfg.app_url, "https://app.example.com");
        assert_eq!(
            cfg.bootstrap_admin.map(|a| a.email.into_inner()).as_deref(),
            Some("admin@example.com")
        );
        assert!(cfg.lawpay.is_configured());
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(from(&[("BIND_ADDR", "nowhere")]).is_err());
        assert!(from(&[("SESSION_TTL_SECS", "0")]).is_err());
        assert!(from(&[("SESSION_TTL_SECS", "soon")]).is_err());
        assert!(from(&[("COOKIE_SECURE", "maybe")]).is_err());
    }

    #[test]
    fn malformed_lawpay_urls_fail_startup() {
        match from(&[("LAWPAY_AUTHORIZE_URL", "secure.lawpay.com/authorize")]) {
            Err(ConfigError::Invalid { var, .. }) => assert_eq!(var, "LAWPAY_AUTHORIZE_URL"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(from(&[("LAWPAY_API_URL", "ftp://api.lawpay.test")]).is_err());
        let cfg = from(&[("LAWPAY_TOKEN_URL", "http://127.0.0.1:9999/oauth/token")]).unwrap();
        assert_eq!(cfg.lawpay.token_url, "http://127.0.0.1:9999/oauth/token");
    }

    #[test]
    fn half_configured_bootstrap_is_skipped() {
        let cfg = from(&[("BOOTSTRAP_ADMIN_EMAIL", "a@example.com")]).unwrap();
        assert!(cfg.bootstrap_admin.is_none());
    }
}
