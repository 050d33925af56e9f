use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqliteRow};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite};
use tracing::instrument;

use casebridge_auth::{NewUser, Role, User, UserPatch, hash_password, verify_password};
use casebridge_core::{EmailAddress, UserId};

use super::parse_column;
use crate::error::{StoreError, StoreResult, map_sqlx_error};

const USER_COLUMNS: &str =
    "id, email, first_name, last_name, phone, role, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a user, hashing the plaintext password. A taken email surfaces as
    /// [`StoreError::Conflict`].
    #[instrument(skip(self, new), fields(email = %new.email, role = %new.role), err)]
    pub async fn create(&self, new: &NewUser) -> StoreResult<User> {
        let password_hash = hash_password(&new.password)?;
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: new.email.as_str().to_string(),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            phone: new.phone.clone(),
            role: new.role,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO users (id, email, password_hash, first_name, last_name, phone, role, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.id.to_string())
        .bind(&user.email)
        .bind(password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match map_sqlx_error("create_user", e) {
            StoreError::Conflict(_) => {
                StoreError::Conflict(format!("a user with email {} already exists", user.email))
            }
            other => other,
        })?;

        Ok(user)
    }

    pub async fn find(&self, id: UserId) -> StoreResult<Option<User>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| map_sqlx_error("find_user", e))?;

        row.map(UserRow::into_user).transpose()
    }

    pub async fn get(&self, id: UserId) -> StoreResult<User> {
        self.find(id).await?.ok_or(StoreError::not_found::<User>())
    }

    /// All users, optionally restricted to one role, ordered by name.
    pub async fn list(&self, role: Option<Role>) -> StoreResult<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        if let Some(role) = role {
            qb.push(" WHERE role = ").push_bind(role.as_str());
        }
        qb.push(" ORDER BY last_name, first_name, email");

        let rows: Vec<UserRow> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        rows.into_iter().map(UserRow::into_user).collect()
    }

    #[instrument(skip(self, patch), fields(user_id = %id), err)]
    pub async fn update(&self, id: UserId, patch: &UserPatch) -> StoreResult<User> {
        if patch.is_empty() {
            return self.get(id).await;
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET updated_at = ");
        qb.push_bind(Utc::now());
        if let Some(email) = &patch.email {
            qb.push(", email = ").push_bind(email.as_str().to_string());
        }
        if let Some(password) = &patch.password {
            qb.push(", password_hash = ").push_bind(hash_password(password)?);
        }
        if let Some(first_name) = &patch.first_name {
            qb.push(", first_name = ").push_bind(first_name.clone());
        }
        if let Some(last_name) = &patch.last_name {
            qb.push(", last_name = ").push_bind(last_name.clone());
        }
        if let Some(phone) = &patch.phone {
            qb.push(", phone = ").push_bind(phone.clone());
        }
        if let Some(role) = patch.role {
            qb.push(", role = ").push_bind(role.as_str());
        }
        qb.push(" WHERE id = ").push_bind(id.to_string());

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<User>());
        }

        self.get(id).await
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: UserId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found::<User>());
        }
        Ok(())
    }

    /// Look the user up by email and check the password. Unknown email and wrong
    /// password are indistinguishable to the caller.
    #[instrument(skip(self, password), err)]
    pub async fn verify_credentials(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = ?"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("verify_credentials", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let hash: String = row
            .try_get("password_hash")
            .map_err(|e| map_sqlx_error("verify_credentials", e))?;
        if !verify_password(password, &hash)? {
            return Ok(None);
        }

        let user = UserRow::from_row(&row).map_err(|e| map_sqlx_error("verify_credentials", e))?;
        user.into_user().map(Some)
    }

    pub async fn count(&self) -> StoreResult<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))
    }

    /// Role of a user, if the user exists. Used to validate foreign references
    /// that must point at a particular kind of account.
    pub async fn role_of(&self, id: UserId) -> StoreResult<Option<Role>> {
        let role: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("role_of", e))?;

        role.as_deref().map(|r| parse_column(r, "users.role")).transpose()
    }

    /// Create the first administrator when the table is empty. Returns the new
    /// account, or `None` when users already exist.
    #[instrument(skip(self, password), fields(email = %email), err)]
    pub async fn ensure_bootstrap_admin(
        &self,
        email: &EmailAddress,
        password: &str,
    ) -> StoreResult<Option<User>> {
        if self.count().await? > 0 {
            return Ok(None);
        }

        let new = NewUser::new(
            Some(email.as_str()),
            Some(password),
            Some(Role::Admin.as_str()),
            None,
            None,
            None,
        )?;
        self.create(&new).await.map(Some)
    }
}

struct UserRow {
    id: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    phone: Option<String>,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, SqliteRow> for UserRow {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            email: row.try_get("email")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone: row.try_get("phone")?,
            role: row.try_get("role")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl UserRow {
    fn into_user(self) -> StoreResult<User> {
        Ok(User {
            id: parse_column(&self.id, "users.id")?,
            email: self.email,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            role: parse_column(&self.role, "users.role")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
