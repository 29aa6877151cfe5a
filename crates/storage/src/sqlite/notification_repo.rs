use exam_core::model::{Notification, NotificationId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u64, ser, u64_to_i64};
use crate::repository::{NotificationRepository, StorageError};

fn map_notification_row(row: &SqliteRow) -> Result<Notification, StorageError> {
    let id = NotificationId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let message: String = row.try_get("message").map_err(ser)?;
    let read: i64 = row.try_get("read").map_err(ser)?;
    let created_at = row.try_get("created_at").map_err(ser)?;
    Notification::new(id, message, read != 0, created_at).map_err(ser)
}

#[async_trait::async_trait]
impl NotificationRepository for SqliteRepository {
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationId, StorageError> {
        let res = sqlx::query(
            "INSERT INTO notifications (message, read, created_at) VALUES (?1, ?2, ?3)",
        )
        .bind(notification.message())
        .bind(i64::from(notification.is_read()))
        .bind(notification.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(NotificationId::new(i64_to_u64("id", res.last_insert_rowid())?))
    }

    async fn delete_read(&self) -> Result<u64, StorageError> {
        let res = sqlx::query("DELETE FROM notifications WHERE read = 1")
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(res.rows_affected())
    }

    async fn list_unread(&self) -> Result<Vec<Notification>, StorageError> {
        let rows = sqlx::query("SELECT * FROM notifications WHERE read = 0 ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_notification_row).collect()
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), StorageError> {
        let res = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ?1")
            .bind(u64_to_i64("id", id.value())?)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }
}
