//! Login sessions and one-time OAuth `state` values on top of [`KvStore`].

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use casebridge_auth::{SessionRecord, SessionToken, User};
use casebridge_core::UserId;

use crate::error::{StoreError, StoreResult};
use crate::kv::KvStore;

#[derive(Clone)]
pub struct SessionManager {
    kv: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(kv: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Open a session for `user` and return its token.
    pub async fn create(&self, user: &User) -> StoreResult<SessionToken> {
        let token = SessionToken::generate();
        let record = SessionRecord::new(user.id, user.role, Utc::now());
        let value = serde_json::to_string(&record)
            .map_err(|e| StoreError::corrupt(format!("session record: {e}")))?;

        self.kv.put(&token.storage_key(), &value, Some(self.ttl)).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "session opened");
        Ok(token)
    }

    /// The live session behind `token`, if any.
    pub async fn resolve(&self, token: &SessionToken) -> StoreResult<Option<SessionRecord>> {
        let Some(raw) = self.kv.get(&token.storage_key()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StoreError::corrupt(format!("session record: {e}")))
    }

    pub async fn revoke(&self, token: &SessionToken) -> StoreResult<()> {
        self.kv.delete(&token.storage_key()).await
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager").field("ttl", &self.ttl).finish()
    }
}

/// One-time OAuth `state` values bound to the user who started the flow.
#[derive(Clone)]
pub struct OAuthStates {
    kv: Arc<dyn KvStore>,
    purpose: &'static str,
    ttl: Duration,
}

impl OAuthStates {
    pub fn new(kv: Arc<dyn KvStore>, purpose: &'static str, ttl: Duration) -> Self {
        Self { kv, purpose, ttl }
    }

    fn key(&self, state: &str) -> String {
        format!("{}_state:{}", self.purpose, state)
    }

    /// Mint a fresh state value for `user`.
    pub async fn issue(&self, user: UserId) -> StoreResult<String> {
        let state = Uuid::new_v4().to_string();
        self.kv
            .put(&self.key(&state), &user.to_string(), Some(self.ttl))
            .await?;
        Ok(state)
    }

    /// Consume a state value. Unknown, expired and already-used states all
    /// yield `None`.
    pub async fn consume(&self, state: &str) -> StoreResult<Option<UserId>> {
        let state = state.trim();
        if Uuid::parse_str(state).is_err() {
            return Ok(None);
        }
        let Some(owner) = self.kv.take(&self.key(state)).await? else {
            return Ok(None);
        };
        owner
            .parse::<UserId>()
            .map(Some)
            .map_err(|e| StoreError::corrupt(format!("oauth state owner: {e}")))
    }
}

impl std::fmt::Debug for OAuthStates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthStates")
            .field("purpose", &self.purpose)
            .field("ttl", &self.ttl)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKvStore;
    use casebridge_auth::Role;

    fn user(role: Role) -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            email: "someone@example.com".into(),
            first_name: None,
            last_name: None,
            phone: None,
            role,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn session_round_trip_and_revoke() {
        let kv = InMemoryKvStore::arc();
        let sessions = SessionManager::new(kv.clone(), Duration::from_secs(60));
        let user = user(Role::Lawyer);

        let token = sessions.create(&user).await.unwrap();
        let record = sessions.resolve(&token).await.unwrap().unwrap();
        assert_eq!(record.user_id, user.id);
        assert_eq!(record.role, Role::Lawyer);
        assert!(kv.get(&token.storage_key()).await.unwrap().is_some());

        sessions.revoke(&token).await.unwrap();
        assert!(sessions.resolve(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_token_resolves_to_none() {
        let sessions = SessionManager::new(InMemoryKvStore::arc(), Duration::from_secs(60));
        assert!(sessions.resolve(&SessionToken::generate()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oauth_state_is_single_use() {
        let kv = InMemoryKvStore::arc();
        let states = OAuthStates::new(kv.clone(), "lawpay", Duration::from_secs(600));
        let owner = UserId::new();

        let state = states.issue(owner).await.unwrap();
        assert!(kv.get(&format!("lawpay_state:{state}")).await.unwrap().is_some());

        assert_eq!(states.consume(&state).await.unwrap(), Some(owner));
        assert_eq!(states.consume(&state).await.unwrap(), None);
        assert_eq!(states.consume("not-a-uuid").await.unwrap(), None);
    }
}
