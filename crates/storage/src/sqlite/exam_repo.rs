use exam_core::model::{Exam, ExamDraft, ExamId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, from_json, i64_to_u32, i64_to_u64, ser, to_json, u64_to_i64};
use crate::repository::{ExamRepository, StorageError};

fn map_exam_row(row: &SqliteRow) -> Result<Exam, StorageError> {
    let id = ExamId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let question_ids: String = row.try_get("question_ids").map_err(ser)?;
    let text_ids: String = row.try_get("motivational_text_ids").map_err(ser)?;

    let draft = ExamDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        question_ids: from_json("question_ids", &question_ids)?,
        duration_minutes: i64_to_u32(
            "duration_minutes",
            row.try_get("duration_minutes").map_err(ser)?,
        )?,
        reward_points: i64_to_u32("reward_points", row.try_get("reward_points").map_err(ser)?)?,
        motivational_text: row.try_get("motivational_text").map_err(ser)?,
        motivational_text_ids: from_json("motivational_text_ids", &text_ids)?,
    };
    let created_at = row.try_get("created_at").map_err(ser)?;

    Exam::new(id, draft, created_at).map_err(ser)
}

#[async_trait::async_trait]
impl ExamRepository for SqliteRepository {
    async fn insert_new_exam(&self, exam: &Exam) -> Result<ExamId, StorageError> {
        let res = sqlx::query(
            r"
            INSERT INTO exams (
                title, description, question_ids, duration_minutes, reward_points,
                motivational_text, motivational_text_ids, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(exam.title())
        .bind(exam.description())
        .bind(to_json(exam.question_ids())?)
        .bind(i64::from(exam.duration_minutes()))
        .bind(i64::from(exam.reward_points()))
        .bind(exam.motivational_text())
        .bind(to_json(exam.motivational_text_ids())?)
        .bind(exam.created_at())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(ExamId::new(i64_to_u64("id", res.last_insert_rowid())?))
    }

    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError> {
        let row = sqlx::query("SELECT * FROM exams WHERE id = ?1")
            .bind(u64_to_i64("id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_exam_row(&row)
    }

    async fn list_exams(&self, limit: u32) -> Result<Vec<Exam>, StorageError> {
        let rows = sqlx::query("SELECT * FROM exams ORDER BY created_at DESC, id DESC LIMIT ?1")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_exam_row).collect()
    }
}
