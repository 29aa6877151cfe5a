use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::model::ids::{ExamId, MotivationalTextId, QuestionId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ExamError {
    #[error("exam title cannot be empty")]
    EmptyTitle,

    #[error("exam must reference at least one question")]
    NoQuestions,

    #[error("question {0} is listed more than once")]
    DuplicateQuestion(QuestionId),

    #[error("exam duration must be > 0 minutes")]
    InvalidDuration,
}

/// Authoring input for a simulated exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamDraft {
    pub title: String,
    pub description: String,
    pub question_ids: Vec<QuestionId>,
    pub duration_minutes: u32,
    pub reward_points: u32,
    pub motivational_text: Option<String>,
    pub motivational_text_ids: Vec<MotivationalTextId>,
}

/// A simulated exam: an official, ordered question set with a completion bonus.
///
/// The time budget is descriptive only; sessions never enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exam {
    id: ExamId,
    title: String,
    description: String,
    question_ids: Vec<QuestionId>,
    duration_minutes: u32,
    reward_points: u32,
    motivational_text: Option<String>,
    motivational_text_ids: Vec<MotivationalTextId>,
    created_at: DateTime<Utc>,
}

impl Exam {
    /// Build an exam from a draft.
    ///
    /// # Errors
    ///
    /// Returns `ExamError` for a blank title, an empty or repeated question list,
    /// or a zero duration.
    pub fn new(id: ExamId, draft: ExamDraft, created_at: DateTime<Utc>) -> Result<Self, ExamError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(ExamError::EmptyTitle);
        }
        if draft.question_ids.is_empty() {
            return Err(ExamError::NoQuestions);
        }
        for (i, id) in draft.question_ids.iter().enumerate() {
            if draft.question_ids[..i].contains(id) {
                return Err(ExamError::DuplicateQuestion(*id));
            }
        }
        if draft.duration_minutes == 0 {
            return Err(ExamError::InvalidDuration);
        }

        Ok(Self {
            id,
            title,
            description: draft.description,
            question_ids: draft.question_ids,
            duration_minutes: draft.duration_minutes,
            reward_points: draft.reward_points,
            motivational_text: draft.motivational_text.filter(|t| !t.trim().is_empty()),
            motivational_text_ids: draft.motivational_text_ids,
            created_at,
        })
    }

    #[must_use]
    pub fn id(&self) -> ExamId {
        self.id
    }

    /// Re-key the exam, e.g. once storage has assigned an id.
    #[must_use]
    pub fn with_id(mut self, id: ExamId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    #[must_use]
    pub fn reward_points(&self) -> u32 {
        self.reward_points
    }

    #[must_use]
    pub fn motivational_text(&self) -> Option<&str> {
        self.motivational_text.as_deref()
    }

    #[must_use]
    pub fn motivational_text_ids(&self) -> &[MotivationalTextId] {
        &self.motivational_text_ids
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}
