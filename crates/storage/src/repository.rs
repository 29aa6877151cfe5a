use std::sync::Arc;

use async_trait::async_trait;
use exam_core::model::{
    Exam, ExamId, Mission, MissionId, MotivationalText, MotivationalTextId, Notification,
    NotificationId, Question, QuestionId, Student, StudentId, ValidatedQuestion,
};
use thiserror::Error;

use crate::memory::InMemoryRepository;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Question bank.
#[async_trait]
pub trait QuestionRepository: Send + Sync {
    /// Store a freshly validated question and return it with its assigned id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the question cannot be stored.
    async fn insert_new_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<Question, StorageError>;

    /// Fetch a question by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError>;

    /// Fetch the questions that exist among `ids`, in the order of `ids`.
    ///
    /// Missing ids are skipped; callers that need the full set compare lengths.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError>;

    /// List questions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError>;

    /// Bump the usage counter of every listed question by one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn record_usage(&self, ids: &[QuestionId]) -> Result<(), StorageError>;
}

/// Simulated exams.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Persist a new exam. The id carried by `exam` is ignored; storage assigns one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn insert_new_exam(&self, exam: &Exam) -> Result<ExamId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError>;

    /// List exams, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_exams(&self, limit: u32) -> Result<Vec<Exam>, StorageError>;
}

/// Missions plus the single "global" mission pushed to every student.
#[async_trait]
pub trait MissionRepository: Send + Sync {
    /// Persist a new mission. The id carried by `mission` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the mission cannot be stored.
    async fn insert_new_mission(&self, mission: &Mission) -> Result<MissionId, StorageError>;

    /// Persist or update a mission under its own id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the mission cannot be stored.
    async fn upsert_mission(&self, mission: &Mission) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_mission(&self, id: MissionId) -> Result<Mission, StorageError>;

    /// List missions, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_missions(&self, limit: u32) -> Result<Vec<Mission>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the mission does not exist.
    async fn set_global_mission(&self, id: Option<MissionId>) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn global_mission(&self) -> Result<Option<Mission>, StorageError>;
}

/// Student and teacher accounts with their running stats.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Register a new account. The id carried by `student` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the e-mail is already registered.
    async fn insert_new_student(&self, student: &Student) -> Result<StudentId, StorageError>;

    /// Overwrite an existing account (stats included).
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the account does not exist.
    async fn update_student(&self, student: &Student) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError>;

    /// Look up by normalised e-mail.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_students(&self) -> Result<Vec<Student>, StorageError>;
}

/// E-mails allowed to register as students.
#[async_trait]
pub trait WhitelistRepository: Send + Sync {
    /// Returns `true` if the e-mail was newly added.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn add_email(&self, email: &str) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn contains_email(&self, email: &str) -> Result<bool, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_emails(&self) -> Result<Vec<String>, StorageError>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Persist a notification. The id carried by `notification` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationId, StorageError>;

    /// Remove every notification already marked read; returns how many went.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn delete_read(&self) -> Result<u64, StorageError>;

    /// Unread notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn list_unread(&self) -> Result<Vec<Notification>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the notification does not exist.
    async fn mark_read(&self, id: NotificationId) -> Result<(), StorageError>;
}

#[async_trait]
pub trait MotivationalTextRepository: Send + Sync {
    /// Persist a text. The id carried by `text` is ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn insert_text(&self, text: &MotivationalText)
    -> Result<MotivationalTextId, StorageError>;

    /// Fetch the texts that exist among `ids`, in the order of `ids`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` for backend failures.
    async fn get_texts(
        &self,
        ids: &[MotivationalTextId],
    ) -> Result<Vec<MotivationalText>, StorageError>;
}

/// Aggregates every repository behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub questions: Arc<dyn QuestionRepository>,
    pub exams: Arc<dyn ExamRepository>,
    pub missions: Arc<dyn MissionRepository>,
    pub students: Arc<dyn StudentRepository>,
    pub whitelist: Arc<dyn WhitelistRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub motivational_texts: Arc<dyn MotivationalTextRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_backend(InMemoryRepository::new())
    }

    /// Share one backend value across every repository slot.
    pub fn from_backend<R>(repo: R) -> Self
    where
        R: QuestionRepository
            + ExamRepository
            + MissionRepository
            + StudentRepository
            + WhitelistRepository
            + NotificationRepository
            + MotivationalTextRepository
            + Clone
            + 'static,
    {
        Self {
            questions: Arc::new(repo.clone()),
            exams: Arc::new(repo.clone()),
            missions: Arc::new(repo.clone()),
            students: Arc::new(repo.clone()),
            whitelist: Arc::new(repo.clone()),
            notifications: Arc::new(repo.clone()),
            motivational_texts: Arc::new(repo),
        }
    }
}
