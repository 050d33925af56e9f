use std::sync::Arc;

use casebridge_billing::{LawPayClient, LawPayError, OAUTH_STATE_TTL};
use casebridge_infra::{Database, KvStore, OAuthStates, SessionManager};

use crate::config::ApiConfig;

/// Shared handles every handler can reach (cheap to clone).
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionManager,
    pub lawpay_states: OAuthStates,
    pub lawpay: Arc<LawPayClient>,
    pub config: Arc<ApiConfig>,
}

impl AppState {
    pub fn new(db: Database, kv: Arc<dyn KvStore>, config: ApiConfig) -> Result<Self, LawPayError> {
        let lawpay = LawPayClient::new(config.lawpay.clone())?;

        Ok(Self {
            sessions: SessionManager::new(kv.clone(), config.session_ttl),
            lawpay_states: OAuthStates::new(kv, "lawpay", OAUTH_STATE_TTL),
            lawpay: Arc::new(lawpay),
            config: Arc::new(config),
            db,
        })
    }
}
