use exam_core::model::{Question, QuestionDraft, QuestionId, ValidatedQuestion};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, from_json, i64_to_u32, i64_to_u64, placeholders, ser, to_json, u64_to_i64};
use crate::repository::{QuestionRepository, StorageError};

const COLUMNS: &str = r"
    id, prompt, options, correct_index, difficulty, subject, tags, year, source,
    image_base64, context_text, uses_motivational_text, times_used, created_at
";

fn map_question_row(row: &SqliteRow) -> Result<Question, StorageError> {
    let id = QuestionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let options: String = row.try_get("options").map_err(ser)?;
    let tags: String = row.try_get("tags").map_err(ser)?;
    let correct_index: i64 = row.try_get("correct_index").map_err(ser)?;
    let difficulty: String = row.try_get("difficulty").map_err(ser)?;
    let subject: String = row.try_get("subject").map_err(ser)?;
    let uses_motivational_text: i64 = row.try_get("uses_motivational_text").map_err(ser)?;

    let draft = QuestionDraft {
        prompt: row.try_get("prompt").map_err(ser)?,
        options: from_json("options", &options)?,
        correct_index: usize::try_from(correct_index)
            .map_err(|_| StorageError::Serialization(format!("invalid correct_index: {correct_index}")))?,
        difficulty: difficulty.parse().map_err(ser)?,
        subject: subject.parse().map_err(ser)?,
        tags: from_json("tags", &tags)?,
        year: row.try_get("year").map_err(ser)?,
        source: row.try_get("source").map_err(ser)?,
        image_base64: row.try_get("image_base64").map_err(ser)?,
        context_text: row.try_get("context_text").map_err(ser)?,
        uses_motivational_text: uses_motivational_text != 0,
    };
    let times_used = i64_to_u32("times_used", row.try_get("times_used").map_err(ser)?)?;
    let created_at = row.try_get("created_at").map_err(ser)?;

    Question::from_persisted(id, draft, created_at, times_used).map_err(ser)
}

#[async_trait::async_trait]
impl QuestionRepository for SqliteRepository {
    async fn insert_new_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<Question, StorageError> {
        let draft = question.draft();
        let correct_index = i64::try_from(draft.correct_index)
            .map_err(|_| StorageError::Serialization("correct_index overflow".into()))?;

        let res = sqlx::query(
            r"
            INSERT INTO questions (
                prompt, options, correct_index, difficulty, subject, tags, year, source,
                image_base64, context_text, uses_motivational_text, times_used, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, 0, ?12)
            ",
        )
        .bind(&draft.prompt)
        .bind(to_json(&draft.options)?)
        .bind(correct_index)
        .bind(draft.difficulty.as_str())
        .bind(draft.subject.as_str())
        .bind(to_json(&draft.tags)?)
        .bind(&draft.year)
        .bind(&draft.source)
        .bind(&draft.image_base64)
        .bind(&draft.context_text)
        .bind(i64::from(draft.uses_motivational_text))
        .bind(question.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        let id = QuestionId::new(i64_to_u64("id", res.last_insert_rowid())?);
        Ok(question.clone().assign_id(id))
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let sql = format!("SELECT {COLUMNS} FROM questions WHERE id = ?1");
        let row = sqlx::query(&sql)
            .bind(u64_to_i64("id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_question_row(&row)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {COLUMNS} FROM questions WHERE id IN ({})",
            placeholders(ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(u64_to_i64("id", id.value())?);
        }
        let rows = query.fetch_all(&self.pool).await.map_err(conn)?;

        let mut found = Vec::with_capacity(rows.len());
        for row in &rows {
            found.push(map_question_row(row)?);
        }

        // SQL gives no ordering guarantee for IN; restore the caller's order.
        Ok(ids
            .iter()
            .filter_map(|id| found.iter().find(|q| q.id() == *id).cloned())
            .collect())
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let sql =
            format!("SELECT {COLUMNS} FROM questions ORDER BY created_at DESC, id DESC LIMIT ?1");
        let rows = sqlx::query(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_question_row).collect()
    }

    async fn record_usage(&self, ids: &[QuestionId]) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;
        for id in ids {
            sqlx::query("UPDATE questions SET times_used = times_used + 1 WHERE id = ?1")
                .bind(u64_to_i64("id", id.value())?)
                .execute(&mut *tx)
                .await
                .map_err(conn)?;
        }
        tx.commit().await.map_err(conn)?;
        Ok(())
    }
}
