use exam_core::model::{Student, StudentId, StudentStats};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use super::SqliteRepository;
use super::mapping::{conn, i64_to_u32, i64_to_u64, ser, u64_to_i64};
use crate::repository::{StorageError, StudentRepository};

fn map_student_row(row: &SqliteRow) -> Result<Student, StorageError> {
    let id = StudentId::new(i64_to_u64("id", row.try_get("id").map_err(ser)?)?);
    let name: String = row.try_get("name").map_err(ser)?;
    let email: String = row.try_get("email").map_err(ser)?;
    let role: String = row.try_get("role").map_err(ser)?;

    let stats = StudentStats {
        points: i64_to_u64("points", row.try_get("points").map_err(ser)?)?,
        streak: i64_to_u32("streak", row.try_get("streak").map_err(ser)?)?,
        level: i64_to_u32("level", row.try_get("level").map_err(ser)?)?,
        total_answered: i64_to_u64("total_answered", row.try_get("total_answered").map_err(ser)?)?,
        total_correct: i64_to_u64("total_correct", row.try_get("total_correct").map_err(ser)?)?,
    };

    Student::from_persisted(id, name, &email, role.parse().map_err(ser)?, stats).map_err(ser)
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn insert_new_student(&self, student: &Student) -> Result<StudentId, StorageError> {
        let stats = student.stats();
        let res = sqlx::query(
            r"
            INSERT INTO students (
                name, email, role, points, streak, level, total_answered, total_correct
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(student.name())
        .bind(student.email())
        .bind(student.role().as_str())
        .bind(u64_to_i64("points", stats.points)?)
        .bind(i64::from(stats.streak))
        .bind(i64::from(stats.level))
        .bind(u64_to_i64("total_answered", stats.total_answered)?)
        .bind(u64_to_i64("total_correct", stats.total_correct)?)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                conn(e)
            }
        })?;

        Ok(StudentId::new(i64_to_u64("id", res.last_insert_rowid())?))
    }

    async fn update_student(&self, student: &Student) -> Result<(), StorageError> {
        let stats = student.stats();
        let res = sqlx::query(
            r"
            UPDATE students SET
                name = ?2,
                email = ?3,
                role = ?4,
                points = ?5,
                streak = ?6,
                level = ?7,
                total_answered = ?8,
                total_correct = ?9
            WHERE id = ?1
            ",
        )
        .bind(u64_to_i64("id", student.id().value())?)
        .bind(student.name())
        .bind(student.email())
        .bind(student.role().as_str())
        .bind(u64_to_i64("points", stats.points)?)
        .bind(i64::from(stats.streak))
        .bind(i64::from(stats.level))
        .bind(u64_to_i64("total_answered", stats.total_answered)?)
        .bind(u64_to_i64("total_correct", stats.total_correct)?)
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError> {
        let row = sqlx::query("SELECT * FROM students WHERE id = ?1")
            .bind(u64_to_i64("id", id.value())?)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;

        map_student_row(&row)
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StorageError> {
        let row = sqlx::query("SELECT * FROM students WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(conn)?;

        row.as_ref().map(map_student_row).transpose()
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        let rows = sqlx::query("SELECT * FROM students ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;

        rows.iter().map(map_student_row).collect()
    }
}
