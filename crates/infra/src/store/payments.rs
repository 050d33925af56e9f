use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_billing::{NewPayment, Payment, PaymentStatus};
use casebridge_matters::Matter;
use casebridge_core::{DomainError, MatterId, PaymentId, UserId};

use super::parse_column;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const PAYMENT_SELECT: &str = "SELECT p.id, p.matter_id, p.amount_cents, p.currency,
        p.description, p.status, p.lawpay_charge_id, p.created_at, p.updated_at,
        m.title AS matter_title, m.client_id AS client_id
    FROM payments p
    JOIN matters m ON m.id = p.matter_id";

#[derive(Debug, Clone)]
pub struct PaymentStore {
    pool: SqlitePool,
}

impl PaymentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        matter: Option<MatterId>,
        client: Option<UserId>,
    ) -> StoreResult<Vec<Payment>> {
        let mut qb = QueryBuilder::<Sqlite>::new(PAYMENT_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(matter) = matter {
            qb.push(" AND p.matter_id = ").push_bind(matter.to_string());
        }
        if let Some(client) = client {
            qb.push(" AND m.client_id = ").push_bind(client.to_string());
        }
        qb.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows: Vec<PaymentRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_payments", e))?;

        rows.into_iter().map(PaymentRow::into_payment).collect()
    }

    pub async fn get(&self, id: PaymentId) -> StoreResult<Payment> {
        let row: Option<PaymentRow> = sqlx::query_as(&format!("{PAYMENT_SELECT} WHERE p.id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_payment", e))?;

        row.ok_or(StoreError::not_found::<Payment>())?.into_payment()
    }

    #[instrument(skip(self, new), fields(matter_id = %new.matter_id, amount_cents = new.amount.amount_cents), err)]
    pub async fn create(&self, new: &NewPayment) -> StoreResult<Payment> {
        let matters = super::MatterStore::new(self.pool.clone());
        if !matters.exists(new.matter_id).await? {
            return Err(StoreError::not_found::<Matter>());
        }

        let id = PaymentId::new();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO payments (id, matter_id, amount_cents, currency, description, status, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 'PENDING', ?, ?)",
        )
        .bind(id.to_string())
        .bind(new.matter_id.to_string())
        .bind(new.amount.amount_cents)
        .bind(&new.amount.currency)
        .bind(&new.description)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_payment", e))?;

        self.get(id).await
    }

    /// Move a payment to `next`, enforcing the status lifecycle.
    ///
    /// The write only lands if the status is still the one that was checked,
    /// so a concurrent charge or update surfaces as a conflict.
    #[instrument(skip(self), err)]
    pub async fn set_status(&self, id: PaymentId, next: PaymentStatus) -> StoreResult<Payment> {
        let current = self.get(id).await?;
        current.status.transition(next)?;
        if self.swap_status(id, current.status, next, None).await? {
            return self.get(id).await;
        }
        Err(DomainError::conflict("payment status changed concurrently; reload and retry").into())
    }

    /// Atomically move a PENDING payment to PROCESSING before calling LawPay.
    ///
    /// Exactly one caller wins the claim; everyone else gets a conflict
    /// naming the status they lost to.
    #[instrument(skip(self), err)]
    pub async fn claim_for_charge(&self, id: PaymentId) -> StoreResult<Payment> {
        if self
            .swap_status(id, PaymentStatus::Pending, PaymentStatus::Processing, None)
            .await?
        {
            return self.get(id).await;
        }
        let current = self.get(id).await?;
        Err(DomainError::conflict(format!(
            "payment is {}; only PENDING payments can be charged",
            current.status
        ))
        .into())
    }

    /// Record the outcome of a claimed LawPay charge.
    #[instrument(skip(self), err)]
    pub async fn settle_charge(
        &self,
        id: PaymentId,
        outcome: PaymentStatus,
        charge_id: &str,
    ) -> StoreResult<Payment> {
        if self
            .swap_status(id, PaymentStatus::Processing, outcome, Some(charge_id))
            .await?
        {
            return self.get(id).await;
        }
        Err(StoreError::not_found::<Payment>())
    }

    /// Hand a claimed payment back to PENDING after a failed charge attempt.
    #[instrument(skip(self), err)]
    pub async fn release_charge(&self, id: PaymentId) -> StoreResult<()> {
        self.swap_status(id, PaymentStatus::Processing, PaymentStatus::Pending, None)
            .await?;
        Ok(())
    }

    /// Compare-and-set on `status`; `false` when the row is gone or no
    /// longer in `from`.
    async fn swap_status(
        &self,
        id: PaymentId,
        from: PaymentStatus,
        to: PaymentStatus,
        charge_id: Option<&str>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE payments
             SET status = ?, lawpay_charge_id = COALESCE(?, lawpay_charge_id), updated_at = ?
             WHERE id = ? AND status = ?",
        )
        .bind(to.as_str())
        .bind(charge_id)
        .bind(Utc::now())
        .bind(id.to_string())
        .bind(from.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_payment_status", e))?;

        Ok(result.rows_affected() == 1)
    }
}

struct PaymentRow {
    id: String,
    matter_id: String,
    matter_title: Option<String>,
    client_id: String,
    amount_cents: i64,
    currency: String,
    description: Option<String>,
    status: String,
    lawpay_charge_id: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for PaymentRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            matter_id: row.try_get("matter_id")?,
            matter_title: row.try_get("matter_title")?,
            client_id: row.try_get("client_id")?,
            amount_cents: row.try_get("amount_cents")?,
            currency: row.try_get("currency")?,
            description: row.try_get("description")?,
            status: row.try_get("status")?,
            lawpay_charge_id: row.try_get("lawpay_charge_id")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl PaymentRow {
    fn into_payment(self) -> StoreResult<Payment> {
        Ok(Payment {
            id: parse_column(&self.id, "payments.id")?,
            matter_id: parse_column(&self.matter_id, "payments.matter_id")?,
            matter_title: self.matter_title,
            client_id: parse_column(&self.client_id, "matters.client_id")?,
            amount_cents: self.amount_cents,
            currency: self.currency,
            description: self.description,
            status: parse_column(&self.status, "payments.status")?,
            lawpay_charge_id: self.lawpay_charge_id,
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
    async fn create_defaults_to_pending_usd() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Trust").await;

        let new = NewPayment::new(Some(&matter.id.to_string()), Some(250_000), None, Some("Retainer"))
            .unwrap();
        let payment = db.payments().create(&new).await.unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.currency, "USD");
        assert_eq!(payment.client_id, client.id);
        assert_eq!(payment.matter_title.as_deref(), Some("Trust"));
    }

    #[tokio::test]
    async fn status_lifecycle_is_enforced() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Trust").await;
        let payment = db
            .payments()
            .create(&NewPayment::new(Some(&matter.id.to_string()), Some(100), None, None).unwrap())
            .await
            .unwrap();

        let err = db
            .payments()
            .set_status(payment.id, PaymentStatus::Refunded)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));

        db.payments().claim_for_charge(payment.id).await.unwrap();
        let paid = db
            .payments()
            .settle_charge(payment.id, PaymentStatus::Paid, "ch_123")
            .await
            .unwrap();
        assert_eq!(paid.status, PaymentStatus::Paid);
        assert_eq!(paid.lawpay_charge_id.as_deref(), Some("ch_123"));

        let refunded = db
            .payments()
            .set_status(payment.id, PaymentStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(refunded.lawpay_charge_id.as_deref(), Some("ch_123"));
    }

    #[tokio::test]
    async fn list_is_scoped_to_client() {
        let db = fixtures::db().await;
        let a = fixtures::user(&db, "a@example.com", "CLIENT").await;
        let b = fixtures::user(&db, "b@example.com", "CLIENT").await;
        for (client, title) in [(&a, "A"), (&b, "B")] {
            let matter = fixtures::matter(&db, client, title).await;
            db.payments()
                .create(&NewPayment::new(Some(&matter.id.to_string()), Some(500), None, None).unwrap())
                .await
                .unwrap();
        }

        assert_eq!(db.payments().list(None, None).await.unwrap().len(), 2);
        let mine = db.payments().list(None, Some(b.id)).await.unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].client_id, b.id);
    }

    #[tokio::test]
    async fn only_one_charge_can_claim_a_payment() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Trust").await;
        let payment = db
            .payments()
            .create(&NewPayment::new(Some(&matter.id.to_string()), Some(100), None, None).unwrap())
            .await
            .unwrap();

        let claimed = db.payments().claim_for_charge(payment.id).await.unwrap();
        assert_eq!(claimed.status, PaymentStatus::Processing);

        let err = db.payments().claim_for_charge(payment.id).await.unwrap_err();
        match err {
            StoreError::Domain(DomainError::Conflict(msg)) => assert!(msg.contains("PROCESSING")),
            other => panic!("unexpected error: {other:?}"),
        }

        // Staff cannot move a payment while the charge is in flight.
        let err = db
            .payments()
            .set_status(payment.id, PaymentStatus::Failed)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::InvariantViolation(_))));

        db.payments().release_charge(payment.id).await.unwrap();
        let again = db.payments().get(payment.id).await.unwrap();
        assert_eq!(again.status, PaymentStatus::Pending);
        assert!(again.lawpay_charge_id.is_none());
    }

    #[tokio::test]
    async fn settling_requires_a_claim() {
        let db = fixtures::db().await;
        let client = fixtures::user(&db, "c@example.com", "CLIENT").await;
        let matter = fixtures::matter(&db, &client, "Trust").await;
        let payment = db
            .payments()
            .create(&NewPayment::new(Some(&matter.id.to_string()), Some(100), None, None).unwrap())
            .await
            .unwrap();

        let err = db
            .payments()
            .settle_charge(payment.id, PaymentStatus::Paid, "ch_1")
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound("payment")));
        assert_eq!(
            db.payments().get(payment.id).await.unwrap().status,
            PaymentStatus::Pending
        );
    }
}
