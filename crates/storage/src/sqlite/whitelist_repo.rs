use sqlx::Row;

use super::SqliteRepository;
use super::mapping::{conn, ser};
use crate::repository::{StorageError, WhitelistRepository};

#[async_trait::async_trait]
impl WhitelistRepository for SqliteRepository {
    async fn add_email(&self, email: &str) -> Result<bool, StorageError> {
        let res = sqlx::query("INSERT OR IGNORE INTO whitelist (email) VALUES (?1)")
            .bind(email)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected() > 0)
    }

    async fn contains_email(&self, email: &str) -> Result<bool, StorageError> {
        let row = sqlx::query("SELECT 1 FROM whitelist WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;
        Ok(row.is_some())
    }

    async fn list_emails(&self) -> Result<Vec<String>, StorageError> {
        let rows = sqlx::query("SELECT email FROM whitelist ORDER BY email ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter()
            .map(|row| row.try_get("email").map_err(ser))
            .collect()
    }
}
