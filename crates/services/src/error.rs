//! Shared error types for the services crate.

use thiserror::Error;

use exam_core::model::{
    ExamError, MaterialError, MissionError, QuestionError, QuestionId, StudentError,
};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the AI gateway.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AiError {
    #[error("AI gateway is not configured")]
    Disabled,
    #[error("AI gateway returned an empty response")]
    EmptyResponse,
    #[error("AI gateway request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error("AI gateway returned an invalid payload: {0}")]
    InvalidPayload(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// Errors emitted by session services.
///
/// Every state-machine precondition has its own variant so callers can assert
/// on the exact violation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session already finished")]
    Finished,
    #[error("session is still in progress")]
    NotFinished,
    #[error("feedback already revealed for the current question")]
    AlreadyRevealed,
    #[error("feedback not revealed for the current question")]
    NotRevealed,
    #[error("no option selected for the current question")]
    NoSelection,
    #[error("option {index} out of range for {len} options")]
    OptionOutOfRange { index: usize, len: usize },
    #[error("questions missing from the bank: {missing:?}")]
    MissingQuestions { missing: Vec<QuestionId> },
    #[error("question bank holds more than {limit} questions")]
    BankTooLarge { limit: u32 },
    #[error("session outcome already recorded")]
    AlreadyRecorded,
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ContentService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContentError {
    #[error("questions missing from the bank: {missing:?}")]
    MissingQuestions { missing: Vec<QuestionId> },
    #[error("mission has no summary to narrate")]
    NoSummary,
    #[error(transparent)]
    Question(#[from] QuestionError),
    #[error(transparent)]
    Exam(#[from] ExamError),
    #[error(transparent)]
    Mission(#[from] MissionError),
    #[error(transparent)]
    Material(#[from] MaterialError),
    #[error(transparent)]
    Ai(#[from] AiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `AccessService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AccessError {
    #[error("e-mail is already whitelisted")]
    AlreadyWhitelisted,
    #[error("access denied for {0}")]
    AccessDenied(String),
    #[error(transparent)]
    Student(#[from] StudentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
