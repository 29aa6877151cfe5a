use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::QuestionId;

/// Every objective question carries this many answer options.
pub const OPTION_COUNT: usize = 4;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum QuestionError {
    #[error("question prompt cannot be empty")]
    EmptyPrompt,

    #[error("expected {expected} options, got {got}")]
    OptionCount { expected: usize, got: usize },

    #[error("option {index} cannot be empty")]
    EmptyOption { index: usize },

    #[error("correct index {index} is outside the {len} options")]
    CorrectIndexOutOfRange { index: usize, len: usize },

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("unknown subject: {0}")]
    UnknownSubject(String),
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

/// Difficulty tier of a question. The tier alone decides the reward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Points awarded for a correct answer at this tier.
    #[must_use]
    pub const fn points(self) -> u32 {
        match self {
            Self::Easy => 100,
            Self::Medium => 250,
            Self::Hard => 500,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Easy => "easy",
            Self::Medium => "medium",
            Self::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = QuestionError;

    /// Accepts the canonical names plus the exam board's own labels.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" | "fácil" | "facil" => Ok(Self::Easy),
            "medium" | "médio" | "medio" => Ok(Self::Medium),
            "hard" | "difícil" | "dificil" => Ok(Self::Hard),
            other => Err(QuestionError::UnknownDifficulty(other.to_string())),
        }
    }
}

//
// ─── SUBJECT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Mathematics,
    Portuguese,
    Science,
    General,
}

impl Subject {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mathematics => "mathematics",
            Self::Portuguese => "portuguese",
            Self::Science => "science",
            Self::General => "general",
        }
    }

    /// Lenient mapping used for AI output; anything unrecognised is `General`.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Self::General)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = QuestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mathematics" | "math" | "matemática" | "matematica" => Ok(Self::Mathematics),
            "portuguese" | "português" | "portugues" => Ok(Self::Portuguese),
            "science" | "ciências" | "ciencias" => Ok(Self::Science),
            "general" | "geral" => Ok(Self::General),
            other => Err(QuestionError::UnknownSubject(other.to_string())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Unvalidated question as authored by a teacher or produced by extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_index: usize,
    pub difficulty: Difficulty,
    pub subject: Subject,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub image_base64: Option<String>,
    #[serde(default)]
    pub context_text: Option<String>,
    #[serde(default)]
    pub uses_motivational_text: bool,
}

impl QuestionDraft {
    #[must_use]
    pub fn new(
        prompt: impl Into<String>,
        options: Vec<String>,
        correct_index: usize,
        difficulty: Difficulty,
        subject: Subject,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            options,
            correct_index,
            difficulty,
            subject,
            tags: Vec::new(),
            year: None,
            source: None,
            image_base64: None,
            context_text: None,
            uses_motivational_text: false,
        }
    }

    /// Check the draft and stamp its creation time.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` when the prompt or any option is blank, the option
    /// count is not [`OPTION_COUNT`], or the correct index is out of range.
    pub fn validate(self, now: DateTime<Utc>) -> Result<ValidatedQuestion, QuestionError> {
        if self.prompt.trim().is_empty() {
            return Err(QuestionError::EmptyPrompt);
        }
        if self.options.len() != OPTION_COUNT {
            return Err(QuestionError::OptionCount {
                expected: OPTION_COUNT,
                got: self.options.len(),
            });
        }
        if let Some(index) = self.options.iter().position(|o| o.trim().is_empty()) {
            return Err(QuestionError::EmptyOption { index });
        }
        if self.correct_index >= self.options.len() {
            return Err(QuestionError::CorrectIndexOutOfRange {
                index: self.correct_index,
                len: self.options.len(),
            });
        }

        Ok(ValidatedQuestion {
            draft: QuestionDraft {
                tags: normalize_tags(self.tags),
                context_text: self.context_text.filter(|t| !t.trim().is_empty()),
                image_base64: self.image_base64.filter(|t| !t.trim().is_empty()),
                ..self
            },
            created_at: now,
        })
    }
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if !tag.is_empty() && !out.contains(&tag) {
            out.push(tag);
        }
    }
    out
}

/// A draft that passed validation but has no identity yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedQuestion {
    draft: QuestionDraft,
    created_at: DateTime<Utc>,
}

impl ValidatedQuestion {
    #[must_use]
    pub fn draft(&self) -> &QuestionDraft {
        &self.draft
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn assign_id(self, id: QuestionId) -> Question {
        Question {
            id,
            body: self.draft,
            times_used: 0,
            created_at: self.created_at,
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// An objective question from the bank.
///
/// Content is frozen once created; only `times_used` moves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Question {
    id: QuestionId,
    #[serde(flatten)]
    body: QuestionDraft,
    times_used: u32,
    created_at: DateTime<Utc>,
}

impl Question {
    /// Rehydrate a question from storage, re-running draft validation.
    ///
    /// # Errors
    ///
    /// Returns `QuestionError` if the persisted fields are no longer valid.
    pub fn from_persisted(
        id: QuestionId,
        draft: QuestionDraft,
        created_at: DateTime<Utc>,
        times_used: u32,
    ) -> Result<Self, QuestionError> {
        let mut question = draft.validate(created_at)?.assign_id(id);
        question.times_used = times_used;
        Ok(question)
    }

    #[must_use]
    pub fn id(&self) -> QuestionId {
        self.id
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.body.prompt
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.body.options
    }

    #[must_use]
    pub fn option(&self, index: usize) -> Option<&str> {
        self.body.options.get(index).map(String::as_str)
    }

    #[must_use]
    pub fn correct_index(&self) -> usize {
        self.body.correct_index
    }

    /// Text of the correct option. Validation guarantees it exists.
    #[must_use]
    pub fn correct_option(&self) -> &str {
        self.option(self.body.correct_index).unwrap_or_default()
    }

    #[must_use]
    pub fn is_correct(&self, index: usize) -> bool {
        index == self.body.correct_index
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.body.difficulty
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.body.difficulty.points()
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.body.subject
    }

    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.body.tags
    }

    #[must_use]
    pub fn year(&self) -> Option<&str> {
        self.body.year.as_deref()
    }

    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.body.source.as_deref()
    }

    #[must_use]
    pub fn image_base64(&self) -> Option<&str> {
        self.body.image_base64.as_deref()
    }

    #[must_use]
    pub fn context_text(&self) -> Option<&str> {
        self.body.context_text.as_deref()
    }

    #[must_use]
    pub fn uses_motivational_text(&self) -> bool {
        self.body.uses_motivational_text
    }

    #[must_use]
    pub fn times_used(&self) -> u32 {
        self.times_used
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Borrow the authored content, e.g. for persistence.
    #[must_use]
    pub fn draft(&self) -> &QuestionDraft {
        &self.body
    }

    pub fn record_use(&mut self) {
        self.times_used = self.times_used.saturating_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    fn options() -> Vec<String> {
        ["a", "b", "c", "d"].iter().map(ToString::to_string).collect()
    }

    #[test]
    fn tier_points_are_fixed() {
        assert_eq!(Difficulty::Easy.points(), 100);
        assert_eq!(Difficulty::Medium.points(), 250);
        assert_eq!(Difficulty::Hard.points(), 500);
    }

    #[test]
    fn difficulty_parses_board_labels() {
        assert_eq!("Fácil".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!("médio".parse::<Difficulty>().unwrap(), Difficulty::Medium);
        assert_eq!("HARD".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn unknown_subject_label_maps_to_general() {
        assert_eq!(Subject::from_label("Matemática"), Subject::Mathematics);
        assert_eq!(Subject::from_label("History"), Subject::General);
    }

    #[test]
    fn validate_rejects_wrong_option_count() {
        let draft = QuestionDraft::new(
            "Q",
            vec!["a".into(), "b".into()],
            0,
            Difficulty::Easy,
            Subject::General,
        );
        let err = draft.validate(fixed_now()).unwrap_err();
        assert_eq!(
            err,
            QuestionError::OptionCount {
                expected: 4,
                got: 2
            }
        );
    }

    #[test]
    fn validate_rejects_out_of_range_correct_index() {
        let draft = QuestionDraft::new("Q", options(), 4, Difficulty::Easy, Subject::General);
        assert!(matches!(
            draft.validate(fixed_now()),
            Err(QuestionError::CorrectIndexOutOfRange { index: 4, len: 4 })
        ));
    }

    #[test]
    fn validate_rejects_blank_prompt_and_option() {
        let blank = QuestionDraft::new("  ", options(), 0, Difficulty::Easy, Subject::General);
        assert_eq!(
            blank.validate(fixed_now()).unwrap_err(),
            QuestionError::EmptyPrompt
        );

        let mut opts = options();
        opts[2] = " ".into();
        let draft = QuestionDraft::new("Q", opts, 0, Difficulty::Easy, Subject::General);
        assert_eq!(
            draft.validate(fixed_now()).unwrap_err(),
            QuestionError::EmptyOption { index: 2 }
        );
    }

    #[test]
    fn validate_normalizes_tags() {
        let mut draft = QuestionDraft::new("Q", options(), 1, Difficulty::Hard, Subject::Science);
        draft.tags = vec!["Algebra".into(), " algebra ".into(), String::new(), "geo".into()];
        let question = draft.validate(fixed_now()).unwrap().assign_id(QuestionId::new(1));
        assert_eq!(question.tags(), ["algebra", "geo"]);
        assert_eq!(question.correct_option(), "b");
        assert_eq!(question.points(), 500);
    }

    #[test]
    fn record_use_only_moves_counter() {
        let mut question = QuestionDraft::new("Q", options(), 0, Difficulty::Easy, Subject::General)
            .validate(fixed_now())
            .unwrap()
            .assign_id(QuestionId::new(5));
        let before = question.clone();
        question.record_use();
        assert_eq!(question.times_used(), 1);
        assert_eq!(question.draft(), before.draft());
    }
}
