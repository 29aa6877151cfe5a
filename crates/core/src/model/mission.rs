use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::{MissionId, QuestionId};
use crate::model::question::Subject;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MissionError {
    #[error("mission title cannot be empty")]
    EmptyTitle,

    #[error("unknown mission status: {0}")]
    UnknownStatus(String),

    #[error("unknown mission kind: {0}")]
    UnknownKind(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionStatus {
    Pending,
    Completed,
    Locked,
}

impl MissionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Locked => "locked",
        }
    }
}

impl FromStr for MissionStatus {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "locked" => Ok(Self::Locked),
            other => Err(MissionError::UnknownStatus(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MissionKind {
    Daily,
    Mastery,
    Audio,
    AiCreative,
    Custom,
}

impl MissionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Mastery => "mastery",
            Self::Audio => "audio",
            Self::AiCreative => "ai_creative",
            Self::Custom => "custom",
        }
    }
}

impl fmt::Display for MissionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MissionKind {
    type Err = MissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(Self::Daily),
            "mastery" => Ok(Self::Mastery),
            "audio" => Ok(Self::Audio),
            "ai_creative" => Ok(Self::AiCreative),
            "custom" => Ok(Self::Custom),
            other => Err(MissionError::UnknownKind(other.to_string())),
        }
    }
}

/// Study summary attached to a mission, optionally narrated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissionSummary {
    pub text: String,
    pub audio_base64: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissionDraft {
    pub title: String,
    pub description: String,
    pub points: u32,
    pub kind: MissionKind,
    pub subject: Subject,
    pub icon: String,
    pub question_ids: Vec<QuestionId>,
    pub summary: Option<MissionSummary>,
}

/// A themed challenge with a flat completion bonus.
///
/// An empty `question_ids` list means the mission runs over the whole bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mission {
    id: MissionId,
    title: String,
    description: String,
    points: u32,
    status: MissionStatus,
    kind: MissionKind,
    subject: Subject,
    icon: String,
    question_ids: Vec<QuestionId>,
    summary: Option<MissionSummary>,
}

impl Mission {
    /// # Errors
    ///
    /// Returns `MissionError::EmptyTitle` for a blank title.
    pub fn new(id: MissionId, draft: MissionDraft) -> Result<Self, MissionError> {
        Self::from_persisted(id, draft, MissionStatus::Pending)
    }

    /// # Errors
    ///
    /// Returns `MissionError::EmptyTitle` for a blank title.
    pub fn from_persisted(
        id: MissionId,
        draft: MissionDraft,
        status: MissionStatus,
    ) -> Result<Self, MissionError> {
        let title = draft.title.trim().to_string();
        if title.is_empty() {
            return Err(MissionError::EmptyTitle);
        }
        Ok(Self {
            id,
            title,
            description: draft.description,
            points: draft.points,
            status,
            kind: draft.kind,
            subject: draft.subject,
            icon: draft.icon,
            question_ids: draft.question_ids,
            summary: draft.summary,
        })
    }

    #[must_use]
    pub fn id(&self) -> MissionId {
        self.id
    }

    #[must_use]
    pub fn with_id(mut self, id: MissionId) -> Self {
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
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn status(&self) -> MissionStatus {
        self.status
    }

    #[must_use]
    pub fn kind(&self) -> MissionKind {
        self.kind
    }

    #[must_use]
    pub fn subject(&self) -> Subject {
        self.subject
    }

    #[must_use]
    pub fn icon(&self) -> &str {
        &self.icon
    }

    #[must_use]
    pub fn question_ids(&self) -> &[QuestionId] {
        &self.question_ids
    }

    #[must_use]
    pub fn summary(&self) -> Option<&MissionSummary> {
        self.summary.as_ref()
    }

    /// Attach narration to the summary. Returns false when there is no summary to narrate.
    pub fn set_summary_audio(&mut self, audio_base64: String) -> bool {
        match self.summary.as_mut() {
            Some(summary) => {
                summary.audio_base64 = Some(audio_base64);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> MissionDraft {
        MissionDraft {
            title: "Fractions sprint".into(),
            description: "Ten minutes of fractions".into(),
            points: 500,
            kind: MissionKind::Mastery,
            subject: Subject::Mathematics,
            icon: "🎯".into(),
            question_ids: vec![QuestionId::new(1)],
            summary: None,
        }
    }

    #[test]
    fn new_mission_starts_pending() {
        let mission = Mission::new(MissionId::new(1), draft()).unwrap();
        assert_eq!(mission.status(), MissionStatus::Pending);
        assert_eq!(mission.points(), 500);
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut d = draft();
        d.title = " ".into();
        assert_eq!(
            Mission::new(MissionId::new(1), d).unwrap_err(),
            MissionError::EmptyTitle
        );
    }

    #[test]
    fn summary_audio_requires_summary() {
        let mut mission = Mission::new(MissionId::new(1), draft()).unwrap();
        assert!(!mission.set_summary_audio("AAAA".into()));

        let mut d = draft();
        d.summary = Some(MissionSummary {
            text: "Recap".into(),
            audio_base64: None,
        });
        let mut mission = Mission::new(MissionId::new(2), d).unwrap();
        assert!(mission.set_summary_audio("AAAA".into()));
        assert_eq!(
            mission.summary().and_then(|s| s.audio_base64.as_deref()),
            Some("AAAA")
        );
    }

    #[test]
    fn kind_round_trips_through_str() {
        for kind in [
            MissionKind::Daily,
            MissionKind::Mastery,
            MissionKind::Audio,
            MissionKind::AiCreative,
            MissionKind::Custom,
        ] {
            assert_eq!(kind.as_str().parse::<MissionKind>().unwrap(), kind);
        }
    }
}
