use exam_core::model::{MotivationalText, MotivationalTextId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u64, placeholders, ser, u64_to_i64};
use crate::repository::{MotivationalTextRepository, StorageError};

fn map_text_row(row: &SqliteRow) -> Result<MotivationalText, StorageError> {
    let id = MotivationalTextId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let title: String = row.try_get("title").map_err(ser)?;
    let content: String = row.try_get("content").map_err(ser)?;
    let source: String = row.try_get("source").map_err(ser)?;
    MotivationalText::new(id, title, content, source).map_err(ser)
}

#[async_trait::async_trait]
impl MotivationalTextRepository for SqliteRepository {
    async fn insert_text(
        &self,
        text: &MotivationalText,
    ) -> Result<MotivationalTextId, StorageError> {
        let res = sqlx::query(
            "INSERT INTO motivational_texts (title, content, source) VALUES (?1, ?2, ?3)",
        )
        .bind(text.title())
        .bind(text.content())
        .bind(text.source())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(MotivationalTextId::new(i64_to_u64("id", res.last_insert_rowid())?))
    }

    async fn get_texts(
        &self,
        ids: &[MotivationalTextId],
    ) -> Result<Vec<MotivationalText>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT * FROM motivational_texts WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(u64_to_i64("id", id.value())?);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;
        let found = rows
            .iter()
            .map(map_text_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|t| t.id() == *id).cloned())
            .collect())
    }
}
