use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::StudentId;
use crate::model::outcome::SessionOutcome;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum StudentError {
    #[error("name cannot be empty")]
    EmptyName,

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("unknown role: {0}")]
    UnknownRole(String),
}

/// Normalise an e-mail address for comparisons and storage.
///
/// # Errors
///
/// Returns `StudentError::InvalidEmail` when the address is blank or has no
/// `local@domain` shape.
pub fn normalize_email(raw: &str) -> Result<String, StudentError> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(StudentError::InvalidEmail(raw.to_string())),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Teacher,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
        }
    }
}

impl FromStr for Role {
    type Err = StudentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            other => Err(StudentError::UnknownRole(other.to_string())),
        }
    }
}

/// Running totals across every finished session of a student.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StudentStats {
    pub points: u64,
    pub streak: u32,
    pub level: u32,
    pub total_answered: u64,
    pub total_correct: u64,
}

impl Default for StudentStats {
    fn default() -> Self {
        Self {
            points: 0,
            streak: 0,
            level: 1,
            total_answered: 0,
            total_correct: 0,
        }
    }
}

impl StudentStats {
    /// Fold one session outcome into the running totals.
    pub fn apply_outcome(&mut self, outcome: &SessionOutcome) {
        self.points = self.points.saturating_add(outcome.total_points());
        self.streak = self.streak.saturating_add(1);
        self.total_answered = self
            .total_answered
            .saturating_add(u64::from(outcome.answered_count));
        self.total_correct = self
            .total_correct
            .saturating_add(u64::from(outcome.correct_count));
    }

    /// Share of correct answers, rounded to a whole percent.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    pub fn accuracy_percent(&self) -> u8 {
        if self.total_answered == 0 {
            return 0;
        }
        let ratio = self.total_correct as f64 / self.total_answered as f64;
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    id: StudentId,
    name: String,
    email: String,
    role: Role,
    stats: StudentStats,
}

impl Student {
    /// # Errors
    ///
    /// Returns `StudentError` for a blank name or malformed e-mail.
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        email: &str,
        role: Role,
    ) -> Result<Self, StudentError> {
        Self::from_persisted(id, name, email, role, StudentStats::default())
    }

    /// # Errors
    ///
    /// Returns `StudentError` for a blank name or malformed e-mail.
    pub fn from_persisted(
        id: StudentId,
        name: impl Into<String>,
        email: &str,
        role: Role,
        stats: StudentStats,
    ) -> Result<Self, StudentError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(StudentError::EmptyName);
        }
        Ok(Self {
            id,
            name,
            email: normalize_email(email)?,
            role,
            stats,
        })
    }

    #[must_use]
    pub fn id(&self) -> StudentId {
        self.id
    }

    #[must_use]
    pub fn with_id(mut self, id: StudentId) -> Self {
        self.id = id;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn stats(&self) -> &StudentStats {
        &self.stats
    }

    pub fn apply_outcome(&mut self, outcome: &SessionOutcome) {
        self.stats.apply_outcome(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_outcome_folds_points_streak_and_totals() {
        let mut stats = StudentStats::default();
        stats.apply_outcome(&SessionOutcome::new(1, 2, 100, 500));
        stats.apply_outcome(&SessionOutcome::new(3, 3, 300, 0));

        assert_eq!(stats.points, 900);
        assert_eq!(stats.streak, 2);
        assert_eq!(stats.total_answered, 5);
        assert_eq!(stats.total_correct, 4);
        assert_eq!(stats.accuracy_percent(), 80);
    }

    #[test]
    fn accuracy_is_zero_without_answers() {
        assert_eq!(StudentStats::default().accuracy_percent(), 0);
    }

    #[test]
    fn email_is_normalized() {
        let student =
            Student::new(StudentId::new(1), "Ana", "  Ana@School.EDU ", Role::Student).unwrap();
        assert_eq!(student.email(), "ana@school.edu");
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@domain").is_err());
    }
}
