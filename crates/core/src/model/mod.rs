mod exam;
mod ids;
mod material;
mod mission;
mod outcome;
mod question;
mod student;

pub use ids::{
    ExamId, MissionId, MotivationalTextId, NotificationId, ParseIdError, QuestionId, StudentId,
};

pub use exam::{Exam, ExamDraft, ExamError};
pub use material::{MaterialError, MotivationalText, Notification};
pub use mission::{Mission, MissionDraft, MissionError, MissionKind, MissionStatus, MissionSummary};
pub use outcome::SessionOutcome;
pub use question::{
    Difficulty, OPTION_COUNT, Question, QuestionDraft, QuestionError, Subject, ValidatedQuestion,
};
pub use student::{Role, Student, StudentError, StudentStats, normalize_email};
