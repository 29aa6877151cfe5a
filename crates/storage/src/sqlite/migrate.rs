use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS questions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            prompt TEXT NOT NULL,
            options TEXT NOT NULL,
            correct_index INTEGER NOT NULL CHECK (correct_index >= 0),
            difficulty TEXT NOT NULL,
            subject TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            year TEXT,
            source TEXT,
            image_base64 TEXT,
            context_text TEXT,
            uses_motivational_text INTEGER NOT NULL DEFAULT 0,
            times_used INTEGER NOT NULL DEFAULT 0 CHECK (times_used >= 0),
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS exams (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            question_ids TEXT NOT NULL,
            duration_minutes INTEGER NOT NULL CHECK (duration_minutes > 0),
            reward_points INTEGER NOT NULL CHECK (reward_points >= 0),
            motivational_text TEXT,
            motivational_text_ids TEXT NOT NULL DEFAULT '[]',
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS missions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT NOT NULL,
            points INTEGER NOT NULL CHECK (points >= 0),
            status TEXT NOT NULL,
            kind TEXT NOT NULL,
            subject TEXT NOT NULL,
            icon TEXT NOT NULL,
            question_ids TEXT NOT NULL DEFAULT '[]',
            summary_text TEXT,
            summary_audio TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS global_mission (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            mission_id INTEGER REFERENCES missions(id) ON DELETE SET NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS students (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            role TEXT NOT NULL,
            points INTEGER NOT NULL DEFAULT 0 CHECK (points >= 0),
            streak INTEGER NOT NULL DEFAULT 0 CHECK (streak >= 0),
            level INTEGER NOT NULL DEFAULT 1 CHECK (level >= 0),
            total_answered INTEGER NOT NULL DEFAULT 0 CHECK (total_answered >= 0),
            total_correct INTEGER NOT NULL DEFAULT 0 CHECK (total_correct >= 0)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS whitelist (
            email TEXT PRIMARY KEY
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            message TEXT NOT NULL,
            read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS motivational_texts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            source TEXT NOT NULL
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_questions_created
            ON questions (created_at, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_notifications_read
            ON notifications (read, id);
    ",
];

/// Applies the versioned schema. Each version runs once, inside a transaction.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::debug!(version = 1, "schema migration applied");
    }

    Ok(())
}
