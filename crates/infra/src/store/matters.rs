use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_auth::Role;
use casebridge_core::{DomainError, MatterId, UserId};
use casebridge_matters::{Matter, MatterPatch, NewMatter};

use super::{joined_name, parse_column, parse_optional_column};
use crate::error::{StoreError, StoreResult, map_sqlx_error};

/// Matter columns plus the client's name parts from `users`.
const MATTER_SELECT: &str = "SELECT m.id, m.client_id, m.lead_lawyer_id, m.title, m.matter_number,
        m.description, m.status, m.created_at, m.updated_at,
        u.first_name AS client_first_name, u.last_name AS client_last_name,
        u.email AS client_email
    FROM matters m
    LEFT JOIN users u ON u.id = m.client_id";

#[derive(Debug, Clone)]
pub struct MatterStore {
    pool: SqlitePool,
}

impl MatterStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Matters newest first, optionally restricted to one client.
    pub async fn list(&self, client: Option<UserId>) -> StoreResult<Vec<Matter>> {
        let mut qb = QueryBuilder::<Sqlite>::new(MATTER_SELECT);
        if let Some(client) = client {
            qb.push(" WHERE m.client_id = ").push_bind(client.to_string());
        }
        qb.push(" ORDER BY m.created_at DESC, m.id DESC");

        let rows: Vec<MatterRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_matters", e))?;

        rows.into_iter().map(MatterRow::into_matter).collect()
    }

    pub async fn get(&self, id: MatterId) -> StoreResult<Matter> {
        let row: Option<MatterRow> = sqlx::query_as(&format!("{MATTER_SELECT} WHERE m.id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_matter", e))?;

        row.ok_or(StoreError::not_found::<Matter>())?.into_matter()
    }

    pub async fn exists(&self, id: MatterId) -> StoreResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT 1 FROM matters WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("matter_exists", e))?;
        Ok(found.is_some())
    }

    /// Insert a matter. The referenced client must be a CLIENT account and the
    /// lead lawyer (when given) a staff account.
    #[instrument(skip(self, new), fields(client_id = %new.client_id), err)]
    pub async fn create(&self, new: &NewMatter) -> StoreResult<Matter> {
        self.check_people(Some(new.client_id), new.lead_lawyer_id).await?;

        let id = MatterId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO matters (id, client_id, lead_lawyer_id, title, matter_number, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id.to_string())
        .bind(new.client_id.to_string())
        .bind(new.lead_lawyer_id.map(|l| l.to_string()))
        .bind(&new.title)
        .bind(&new.matter_number)
        .bind(&new.description)
        .bind(new.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_matter", e))?;

        self.get(id).await
    }

    #[instrument(skip(self, patch), fields(matter_id = %id), err)]
    pub async fn update(&self, id: MatterId, patch: &MatterPatch) -> StoreResult<Matter> {
        if patch.is_empty() {
            return self.get(id).await;
        }
        if let Some(Some(lawyer)) = patch.lead_lawyer_id {
            self.check_people(None, Some(lawyer)).await?;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE matters SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(title) = &patch.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(lawyer) = patch.lead_lawyer_id {
            qb.push(", lead_lawyer_id = ")
                .push_bind(lawyer.map(|l| l.to_string()));
        }
        if let Some(number) = &patch.matter_number {
            qb.push(", matter_number = ").push_bind(number.clone());
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_matter", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Matter>());
        }

        self.get(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: MatterId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM matters WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_matter", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Matter>());
        }
        Ok(())
    }

    async fn check_people(&self, client: Option<UserId>, lawyer: Option<UserId>) -> StoreResult<()> {
        let users = super::UserStore::new(self.pool.clone());

        if let Some(client) = client {
            match users.role_of(client).await? {
                Some(Role::Client) => {}
                Some(_) => return Err(invalid_reference("client_id must reference a CLIENT user")),
                None => return Err(invalid_reference("client_id does not reference an existing user")),
            }
        }
        if let Some(lawyer) = lawyer {
            match users.role_of(lawyer).await? {
                Some(role) if role.is_staff() => {}
                Some(_) => return Err(invalid_reference("lead_lawyer_id must reference a staff user")),
                None => {
                    return Err(invalid_reference("lead_lawyer_id does not reference an existing user"));
                }
            }
        }
        Ok(())
    }
}

fn invalid_reference(msg: &str) -> StoreError {
    DomainError::validation(msg).into()
}

struct MatterRow {
    id: String,
    client_id: String,
    lead_lawyer_id: Option<String>,
    title: String,
    matter_number: Option<String>,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    client_first_name: Option<String>,
    client_last_name: Option<String>,
    client_email: Option<String>,
}

impl<'r> FromRow<'r, SqliteRow> for MatterRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            client_id: row.try_get("client_id")?,
            lead_lawyer_id: row.try_get("lead_lawyer_id")?,
            title: row.try_get("title")?,
            matter_number: row.try_get("matter_number")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            client_first_name: row.try_get("client_first_name")?,
            client_last_name: row.try_get("client_last_name")?,
            client_email: row.try_get("client_email")?,
        })
    }
}

impl MatterRow {
    fn into_matter(self) -> StoreResult<Matter> {
        Ok(Matter {
            id: parse_column(&self.id, "matters.id")?,
            client_id: parse_column(&self.client_id, "matters.client_id")?,
            client_name: joined_name(
                self.client_first_name,
                self.client_last_name,
                self.client_email,
            ),
            lead_lawyer_id: parse_optional_column(self.lead_lawyer_id, "matters.lead_lawyer_id")?,
            title: self.title,
            matter_number: self.matter_number,
            description: self.description,
            status: parse_column(&self.status, "matters.status")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;
    use casebridge_matters::MatterStatus;

    #[tokio::test]
    async fn create_joins_client_name() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "jane@example.com", "CLIENT").await;

        let matter = fixtures::matter(&db, &client, "Doe Revocable Trust").await;
        assert_eq!(matter.client_id, client.id);
        assert_eq!(matter.client_name.as_deref(), Some("jane@example.com"));
        assert_eq!(matter.status, MatterStatus::Open);
    }

    #[tokio::test]
    async fn client_must_be_a_client_account() {
        let db = fixtures::db().await;
        let lawyer = fixtures::user(&db, "lawyer@example.com", "LAWYER").await;

        let new = NewMatter::new(Some(&lawyer.id.to_string()), Some("t"), None, None, None, None)
            .unwrap();
        let err = db.matters().create(&new).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Validation(_))), "{err:?}");

        let ghost = NewMatter::new(Some(&UserId::new().to_string()), Some("t"), None, None, None, None)
            .unwrap();
        assert!(db.matters().create(&ghost).await.is_err());
    }

    #[tokio::test]
    async fn list_is_scoped_to_client() {
        let db = fixtures::db().await;
        let a = fixtures::user(&db, "a@example.com", "CLIENT").await;
        let b = fixtures::user(&db, "b@example.com", "CLIENT").await;
        fixtures::matter(&db, &a, "A1").await;
        fixtures::matter(&db, &a, "A2").await;
        fixtures::matter(&db, &b, "B1").await;

        assert_eq!(db.matters().list(None).await.unwrap().len(), 3);
        let mine = db.matters().list(Some(a.id)).await.unwrap();
        assert_eq!(mine.len(), 2);
        assert!(mine.iter().all(|m| m.client_id == a.id));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Original").await;

        let patch = MatterPatch::new(Some("Renamed"), None, None, Some("notes"), Some("PENDING"))
            .unwrap();
        let updated = db.matters().update(matter.id, &patch).await.unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.description.as_deref(), Some("notes"));
        assert_eq!(updated.status, MatterStatus::Pending);

        db.matters().delete(matter.id).await.unwrap();
        assert!(matches!(
            db.matters().get(matter.id).await,
            Err(StoreError::NotFound("matter"))
        ));
        assert!(matches!(
            db.matters().delete(matter.id).await,
            Err(StoreError::NotFound("matter"))
        ));
    }

    #[tokio::test]
    async fn duplicate_matter_number_conflicts() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "n@example.com", "CLIENT").await;
        let id = client.id.to_string();
        let first = NewMatter::new(Some(&id), Some("One"), None, Some("2024-7"), None, None).unwrap();
        let second = NewMatter::new(Some(&id), Some("Two"), None, Some("2024-7"), None, None).unwrap();

        db.matters().create(&first).await.unwrap();
        assert!(matches!(
            db.matters().create(&second).await,
            Err(StoreError::Conflict(_))
        ));
    }
}
