mod feedback;
mod plan;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use feedback::{Explanation, ExplanationSlot};
pub use plan::{PRACTICE_SIZE, SessionBuilder, SessionMode, SessionOptions, SessionPlan, sample};
pub use progress::SessionProgress;
pub use service::{AnsweredQuestion, RevealedFeedback, SessionService, SessionState};
pub use workflow::{BANK_LIMIT, CompletedSession, SessionLoopService};
