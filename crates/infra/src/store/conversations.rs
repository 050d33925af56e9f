use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_auth::Role;
use casebridge_core::{ConversationId, DomainError, UserId};
use casebridge_matters::{Conversation, NewConversation};

use super::{joined_name, parse_column, parse_optional_column};
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const CONVERSATION_SELECT: &str = "SELECT b.id, b.client_id, b.lawyer_id, b.matter_id, b.subject,
        b.status, b.created_at, b.updated_at,
        u.first_name AS client_first_name, u.last_name AS client_last_name,
        u.email AS client_email
    FROM bridge_conversations b
    LEFT JOIN users u ON u.id = b.client_id";

/// Which open conversations a listing covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationScope {
    /// Threads where the user is the client.
    Client(UserId),
    /// Threads assigned to the lawyer plus the unassigned queue.
    Lawyer(UserId),
    All,
}

#[derive(Debug, Clone)]
pub struct ConversationStore {
    pool: SqlitePool,
}

impl ConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open conversations in `scope`, most recently updated first.
    pub async fn list(&self, scope: ConversationScope) -> StoreResult<Vec<Conversation>> {
        let mut qb = QueryBuilder::<Sqlite>::new(CONVERSATION_SELECT);
        qb.push(" WHERE b.status = 'OPEN'");
        match scope {
            ConversationScope::Client(client) => {
                qb.push(" AND b.client_id = ").push_bind(client.to_string());
            }
            ConversationScope::Lawyer(lawyer) => {
                qb.push(" AND (b.lawyer_id IS NULL OR b.lawyer_id = ")
                    .push_bind(lawyer.to_string())
                    .push(")");
            }
            ConversationScope::All => {}
        }
        qb.push(" ORDER BY b.updated_at DESC, b.id DESC");

        let rows: Vec<ConversationRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_conversations", e))?;

        rows.into_iter().map(ConversationRow::into_conversation).collect()
    }

    /// Open conversation by id; archived ones read as missing.
    pub async fn get(&self, id: ConversationId) -> StoreResult<Conversation> {
        let row: Option<ConversationRow> = sqlx::query_as(&format!(
            "{CONVERSATION_SELECT} WHERE b.id = ? AND b.status = 'OPEN'"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_conversation", e))?;

        row.ok_or(StoreError::not_found::<Conversation>())?
            .into_conversation()
    }

    #[instrument(skip(self, new), fields(client_id = %new.client_id), err)]
    pub async fn create(&self, new: &NewConversation) -> StoreResult<Conversation> {
        let users = super::UserStore::new(self.pool.clone());
        if users.role_of(new.client_id).await? != Some(Role::Client) {
            return Err(DomainError::validation("client_id must reference a CLIENT user").into());
        }

        let id = ConversationId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO bridge_conversations (id, client_id, lawyer_id, matter_id, subject, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 'OPEN', ?, ?)",
        )
        .bind(id.to_string())
        .bind(new.client_id.to_string())
        .bind(new.lawyer_id.map(|l| l.to_string()))
        .bind(new.matter_id.map(|m| m.to_string()))
        .bind(&new.subject)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_conversation", e))?;

        self.get(id).await
    }

    /// Soft delete.
    #[instrument(skip(self), err)]
    pub async fn archive(&self, id: ConversationId) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE bridge_conversations SET status = 'ARCHIVED', updated_at = ?
             WHERE id = ? AND status = 'OPEN'",
        )
        .bind(Utc::now())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("archive_conversation", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Conversation>());
        }
        Ok(())
    }
}

struct ConversationRow {
    id: String,
    client_id: String,
    lawyer_id: Option<String>,
    matter_id: Option<String>,
    subject: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    client_first_name: Option<String>,
    client_last_name: Option<String>,
    client_email: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for ConversationRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            lawyer_id: row.try_get("lawyer_id")?,
            matter_id: row.try_get("matter_id")?,
            subject: row.try_get("subject")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            client_first_name: row.try_get("client_first_name")?,
            client_last_name: row.try_get("client_last_name")?,
            client_email: row.try_get("client_email")?,
        })
    }
}

impl ConversationRow {
    fn into_conversation(self) -> StoreResult<Conversation> {
        Ok(Conversation {
            id: parse_column(&self.id, "bridge_conversations.id")?,
            client_id: parse_column(&self.client_id, "bridge_conversations.client_id")?,
            client_name: joined_name(
                self.client_first_name,
                self.client_last_name,
                self.client_email,
            ),
            lawyer_id: parse_optional_column(self.lawyer_id, "bridge_conversations.lawyer_id")?,
            matter_id: parse_optional_column(self.matter_id, "bridge_conversations.matter_id")?,
            subject: self.subject,
            status: parse_column(&self.status, "bridge_conversations.status")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;

    #[tokio::test]
    async fn scopes_filter_open_threads() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let other = fixtures::user(&db, "o@example.com", "CLIENT").await;
        let lawyer = fixtures::user(&db, "l@example.com", "LAWYER").await;
        let colleague = fixtures::user(&db, "k@example.com", "LAWYER").await;
        let store = db.conversations();

        let lawyer_id = lawyer.id.to_string();
        let colleague_id = colleague.id.to_string();
        store
            .create(&NewConversation::new(client.id, Some("Mine"), Some(&lawyer_id), None).unwrap())
            .await
            .unwrap();
        store
            .create(&NewConversation::new(client.id, Some("Unassigned"), None, None).unwrap())
            .await
            .unwrap();
        store
            .create(&NewConversation::new(other.id, Some("Theirs"), Some(&colleague_id), None).unwrap())
            .await
            .unwrap();

        assert_eq!(store.list(ConversationScope::All).await.unwrap().len(), 3);
        assert_eq!(store.list(ConversationScope::Client(client.id)).await.unwrap().len(), 2);
        let for_lawyer = store.list(ConversationScope::Lawyer(lawyer.id)).await.unwrap();
        assert_eq!(for_lawyer.len(), 2);
        assert!(for_lawyer.iter().all(|c| c.visible_to_lawyer(lawyer.id)));
    }

    #[tokio::test]
    async fn archive_is_soft_and_hides_thread() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let store = db.conversations();
        let convo = store
            .create(&NewConversation::new(client.id, Some("Question"), None, None).unwrap())
            .await
            .unwrap();
        assert_eq!(convo.client_name.as_deref(), Some("c@example.com"));

        store.archive(convo.id).await.unwrap();
        assert!(matches!(
            store.get(convo.id).await,
            Err(StoreError::NotFound("conversation"))
        ));
        assert!(matches!(
            store.archive(convo.id).await,
            Err(StoreError::NotFound("conversation"))
        ));

        let archived: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bridge_conversations WHERE status = 'ARCHIVED'",
        )
        .fetch_one(db.pool())
        .await
        .unwrap();
        assert_eq!(archived, 1);
    }

    #[tokio::test]
    async fn conversation_client_must_be_a_client() {
        let db = fixtures::db().await;
        let lawyer = fixtures::user(&db, "l@example.com", "LAWYER").await;
        let err = db
            .conversations()
            .create(&NewConversation::new(lawyer.id, Some("x"), None, None).unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))));
    }
}
