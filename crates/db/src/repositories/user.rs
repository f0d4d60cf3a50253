use chrono::{DateTime, Utc};
use sqlx::Row;

use procure_core::domain::user::{EmailAddress, User, UserId};

use super::{RepositoryError, UserRepository};
use crate::DbPool;

pub struct SqlUserRepository {
    pool: DbPool,
}

impl SqlUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp `{raw}`: {e}")))
}

pub(crate) fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let email: String =
        row.try_get("email_address").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let first_name: Option<String> =
        row.try_get("first_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let last_name: Option<String> =
        row.try_get("last_name").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let client_slug: Option<String> =
        row.try_get("client_slug").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let active: bool =
        row.try_get("active").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let created_at_str: String =
        row.try_get("created_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let email_address =
        EmailAddress::parse(&email).map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(User {
        id: UserId(id),
        email_address,
        first_name,
        last_name,
        client_slug,
        active,
        created_at: parse_timestamp(&created_at_str)?,
    })
}

#[async_trait::async_trait]
impl UserRepository for SqlUserRepository {
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, email_address, first_name, last_name, client_slug, active, created_at
             FROM users WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => Ok(Some(row_to_user(r)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users (id, email_address, first_name, last_name, client_slug, active, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 email_address = excluded.email_address,
                 first_name = excluded.first_name,
                 last_name = excluded.last_name,
                 client_slug = excluded.client_slug,
                 active = excluded.active",
        )
        .bind(&user.id.0)
        .bind(user.email_address.as_str())
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.client_slug)
        .bind(user.active)
        .bind(user.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn add_role(&self, user_id: &UserId, role: &str) -> Result<(), RepositoryError> {
        let exists: i64 = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1)")
            .bind(&user_id.0)
            .fetch_one(&self.pool)
            .await?;
        if exists == 0 {
            return Err(RepositoryError::UnknownUser(user_id.0.clone()));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO user_roles (user_id, role_name, created_at) VALUES (?, ?, ?)",
        )
        .bind(&user_id.0)
        .bind(role)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_active_by_role_and_tenant(
        &self,
        role: &str,
        tenant: &str,
    ) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT u.id, u.email_address, u.first_name, u.last_name, u.client_slug, u.active,
                    u.created_at
             FROM users u
             JOIN user_roles r ON r.user_id = u.id
             WHERE r.role_name = ?1 AND u.client_slug = ?2 AND u.active = 1
             ORDER BY u.created_at ASC, u.rowid ASC",
        )
        .bind(role)
        .bind(tenant)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_user).collect()
    }
}
