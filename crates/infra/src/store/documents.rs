use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_core::{DocumentId, MatterId, UserId};
use casebridge_matters::{Document, DocumentPatch, Matter, NewDocument};

use super::parse_column;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const DOCUMENT_SELECT: &str = "SELECT d.id, d.matter_id, d.title, d.description, d.content,
        d.status, d.created_at, d.updated_at,
        m.title AS matter_title, m.client_id AS client_id
    FROM documents d
    JOIN matters m ON m.id = d.matter_id";

#[derive(Debug, Clone)]
pub struct DocumentStore {
    pool: SqlitePool,
}

impl DocumentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Documents newest first, filtered by matter and/or owning client.
    pub async fn list(
        &self,
        matter: Option<MatterId>,
        client: Option<UserId>,
    ) -> StoreResult<Vec<Document>> {
        let mut qb = QueryBuilder::<Sqlite>::new(DOCUMENT_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(matter) = matter {
            qb.push(" AND d.matter_id = ").push_bind(matter.to_string());
        }
        if let Some(client) = client {
            qb.push(" AND m.client_id = ").push_bind(client.to_string());
        }
        qb.push(" ORDER BY d.created_at DESC, d.id DESC");

        let rows: Vec<DocumentRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_documents", e))?;

        rows.into_iter().map(DocumentRow::into_document).collect()
    }

    pub async fn get(&self, id: DocumentId) -> StoreResult<Document> {
        let row: Option<DocumentRow> =
            sqlx::query_as(&format!("{DOCUMENT_SELECT} WHERE d.id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_document", e))?;

        row.ok_or(StoreError::not_found::<Document>())?.into_document()
    }

    #[instrument(skip(self, new), fields(matter_id = %new.matter_id), err)]
    pub async fn create(&self, new: &NewDocument) -> StoreResult<Document> {
        let matters = super::MatterStore::new(self.pool.clone());
        if !matters.exists(new.matter_id).await? {
            return Err(StoreError::not_found::<Matter>());
        }

        let id = DocumentId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO documents (id, matter_id, title, description, content, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 'DRAFT', ?, ?)",
        )
        .bind(id.to_string())
        .bind(new.matter_id.to_string())
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.content)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_document", e))?;

        self.get(id).await
    }

    /// Apply a patch after checking it against the stored workflow status.
    #[instrument(skip(self, patch), fields(document_id = %id), err)]
    pub async fn update(&self, id: DocumentId, patch: &DocumentPatch) -> StoreResult<Document> {
        let current = self.get(id).await?;
        if patch.is_empty() {
            return Ok(current);
        }
        patch.check_against(&current)?;

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE documents SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(title) = &patch.title {
            qb.push(", title = ").push_bind(title.clone());
        }
        if let Some(description) = &patch.description {
            qb.push(", description = ").push_bind(description.clone());
        }
        if let Some(content) = &patch.content {
            qb.push(", content = ").push_bind(content.clone());
        }
        if let Some(status) = patch.status {
            qb.push(", status = ").push_bind(status.as_str());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        qb.build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_document", e))?;

        self.get(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: DocumentId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_document", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<Document>());
        }
        Ok(())
    }
}

struct DocumentRow {
    id: String,
    matter_id: String,
    matter_title: Option<String>,
    client_id: String,
    title: String,
    description: Option<String>,
    content: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for DocumentRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            matter_id: row.try_get("matter_id")?,
            matter_title: row.try_get("matter_title")?,
            client_id: row.try_get("client_id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            content: row.try_get("content")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl DocumentRow {
    fn into_document(self) -> StoreResult<Document> {
        Ok(Document {
            id: parse_column(&self.id, "documents.id")?,
            matter_id: parse_column(&self.matter_id, "documents.matter_id")?,
            matter_title: self.matter_title,
            client_id: parse_column(&self.client_id, "matters.client_id")?,
            title: self.title,
            description: self.description,
            content: self.content,
            status: parse_column(&self.status, "documents.status")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::fixtures;
    use casebridge_core::DomainError;
    use casebridge_matters::DocumentStatus;

    #[tokio::test]
    async fn create_joins_matter_title_and_client() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Estate Plan").await;

        let new = NewDocument::new(Some(&matter.id.to_string()), Some("Will"), None, Some("<p>x</p>"))
            .unwrap();
        let doc = db.documents().create(&new).await.unwrap();
        assert_eq!(doc.matter_title.as_deref(), Some("Estate Plan"));
        assert_eq!(doc.client_id, client.id);
        assert_eq!(doc.status, DocumentStatus::Draft);
    }

    #[tokio::test]
    async fn create_on_missing_matter_is_not_found() {
        let db = fixtures::db().await;
        let new = NewDocument::new(Some(&MatterId::new().to_string()), Some("Will"), None, None)
            .unwrap();
        assert!(matches!(
            db.documents().create(&new).await,
            Err(StoreError::NotFound("matter"))
        ));
    }

    #[tokio::test]
    async fn workflow_is_enforced_on_update() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Trust").await;
        let doc = db
            .documents()
            .create(&NewDocument::new(Some(&matter.id.to_string()), Some("Trust"), None, None).unwrap())
            .await
            .unwrap();

        let skip = DocumentPatch::new(None, None, None, Some("SIGNED")).unwrap();
        let err = db.documents().update(doc.id, &skip).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));

        let review = DocumentPatch::new(Some("Trust v2"), None, None, Some("IN_REVIEW")).unwrap();
        let updated = db.documents().update(doc.id, &review).await.unwrap();
        assert_eq!(updated.status, DocumentStatus::InReview);
        assert_eq!(updated.title, "Trust v2");
    }

    #[tokio::test]
    async fn list_filters_by_client() {
        let db = fixtures::db().await;
        let a = fixtures::user(&db, "a@example.com", "CLIENT").await;
        let b = fixtures::user(&db, "b@example.com", "CLIENT").await;
        let ma = fixtures::matter(&db, &a, "A").await;
        let mb = fixtures::matter(&db, &b, "B").await;
        for m in [&ma, &mb] {
            db.documents()
                .create(&NewDocument::new(Some(&m.id.to_string()), Some("Doc"), None, None).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(db.documents().list(None, None).await.unwrap().len(), 2);
        assert_eq!(db.documents().list(None, Some(a.id)).await.unwrap().len(), 1);
        assert_eq!(db.documents().list(Some(mb.id), Some(a.id)).await.unwrap().len(), 0);
    }
}
