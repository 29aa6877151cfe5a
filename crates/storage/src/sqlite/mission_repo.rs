use exam_core::model::{Mission, MissionDraft, MissionId, MissionSummary};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, from_json, i64_to_u32, i64_to_u64, ser, to_json, u64_to_i64};
use crate::repository::{MissionRepository, StorageError};

fn map_mission_row(row: &SqliteRow) -> Result<Mission, StorageError> {
    let id = MissionId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let status: String = row.try_get("status").map_err(ser)?;
    let kind: String = row.try_get("kind").map_err(ser)?;
    let subject: String = row.try_get("subject").map_err(ser)?;
    let question_ids: String = row.try_get("question_ids").map_err(ser)?;
    let summary_text: Option<String> = row.try_get("summary_text").map_err(ser)?;
    let summary_audio: Option<String> = row.try_get("summary_audio").map_err(ser)?;

    let draft = MissionDraft {
        title: row.try_get("title").map_err(ser)?,
        description: row.try_get("description").map_err(ser)?,
        points: i64_to_u32("points", row.try_get("points").map_err(ser)?)?,
        kind: kind.parse().map_err(ser)?,
        subject: subject.parse().map_err(ser)?,
        icon: row.try_get("icon").map_err(ser)?,
        question_ids: from_json("question_ids", &question_ids)?,
        summary: summary_text.map(|text| MissionSummary {
            text,
            audio_base64: summary_audio,
        }),
    };

    Mission::from_persisted(id, draft, status.parse().map_err(ser)?).map_err(ser)
}

#[async_trait::async_trait]
impl MissionRepository for SqliteRepository {
    async fn insert_new_mission(&self, mission: &Mission) -> Result<MissionId, StorageError> {
        let summary = mission.summary();
        let res = sqlx::query(
            r"
            INSERT INTO missions (
                title, description, points, status, kind, subject, icon,
                question_ids, summary_text, summary_audio
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(mission.title())
        .bind(mission.description())
        .bind(i64::from(mission.points()))
        .bind(mission.status().as_str())
        .bind(mission.kind().as_str())
        .bind(mission.subject().as_str())
        .bind(mission.icon())
        .bind(to_json(mission.question_ids())?)
        .bind(summary.map(|s| s.text.clone()))
        .bind(summary.and_then(|s| s.audio_base64.clone()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(MissionId::new(i64_to_u64("id", res.last_insert_rowid())?))
    }

    async fn upsert_mission(&self, mission: &Mission) -> Result<(), StorageError> {
        let summary = mission.summary();
        sqlx::query(
            r"
            INSERT INTO missions (
                id, title, description, points, status, kind, subject, icon,
                question_ids, summary_text, summary_audio
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                points = excluded.points,
                status = excluded.status,
                kind = excluded.kind,
                subject = excluded.subject,
                icon = excluded.icon,
                question_ids = excluded.question_ids,
                summary_text = excluded.summary_text,
                summary_audio = excluded.summary_audio
            ",
        )
        .bind(u64_to_i64("id", mission.id().value())?)
        .bind(mission.title())
        .bind(mission.description())
        .bind(i64::from(mission.points()))
        .bind(mission.status().as_str())
        .bind(mission.kind().as_str())
        .bind(mission.subject().as_str())
        .bind(mission.icon())
        .bind(to_json(mission.question_ids())?)
        .bind(summary.map(|s| s.text.clone()))
        .bind(summary.and_then(|s| s.audio_base64.clone()))
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn get_mission(&self, id: MissionId) -> Result<Mission, StorageError> {
        let row = sqlx::query("SELECT * FROM missions WHERE id = ?1")
            .bind(u64_to_i64("id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_mission_row(&row)
    }

    async fn list_missions(&self, limit: u32) -> Result<Vec<Mission>, StorageError> {
        let rows = sqlx::query("SELECT * FROM missions ORDER BY id DESC LIMIT ?1")
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_mission_row).collect()
    }

    async fn set_global_mission(&self, id: Option<MissionId>) -> Result<(), StorageError> {
        let mission_id = id.map(|m| u64_to_i64("mission_id", m.value())).transpose()?;
        if let Some(mission_id) = mission_id {
            let exists = sqlx::query("SELECT 1 FROM missions WHERE id = ?1")
                .bind(mission_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(conn)?;
            if exists.is_none() {
                return Err(StorageError::NotFound);
            }
        }

        sqlx::query(
            r"
            INSERT INTO global_mission (id, mission_id)
            VALUES (1, ?1)
            ON CONFLICT(id) DO UPDATE SET mission_id = excluded.mission_id
            ",
        )
        .bind(mission_id)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn global_mission(&self) -> Result<Option<Mission>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT m.*
            FROM global_mission g
            JOIN missions m ON m.id = g.mission_id
            WHERE g.id = 1
            ",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        row.as_ref().map(map_mission_row).transpose()
    }
}
