use std::sync::Arc;

use exam_core::model::{
    ExamId, MissionId, Question, QuestionId, SessionOutcome, Student, StudentId, Subject,
};
use storage::repository::{
    ExamRepository, MissionRepository, MotivationalTextRepository, QuestionRepository, Storage,
    StudentRepository,
};

use super::plan::SessionOptions;
use super::service::SessionService;
use crate::Clock;
use crate::ai::ErrorExplainer;
use crate::error::SessionError;

/// Default upper bound on questions read from the bank for practice or
/// bank-wide missions.
pub const BANK_LIMIT: u32 = 10_000;

/// Result of recording a finished session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub outcome: SessionOutcome,
    pub student: Student,
}

/// Orchestrates session start from storage and outcome persistence.
#[derive(Clone)]
pub struct SessionLoopService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    exams: Arc<dyn ExamRepository>,
    missions: Arc<dyn MissionRepository>,
    students: Arc<dyn StudentRepository>,
    texts: Arc<dyn MotivationalTextRepository>,
    explainer: Option<Arc<dyn ErrorExplainer>>,
    bank_limit: u32,
}

impl SessionLoopService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        Self {
            clock,
            questions: Arc::clone(&storage.questions),
            exams: Arc::clone(&storage.exams),
            missions: Arc::clone(&storage.missions),
            students: Arc::clone(&storage.students),
            texts: Arc::clone(&storage.motivational_texts),
            explainer: None,
            bank_limit: BANK_LIMIT,
        }
    }

    /// Explain wrong answers in every session started from here.
    #[must_use]
    pub fn with_explainer(mut self, explainer: Arc<dyn ErrorExplainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    /// Override [`BANK_LIMIT`].
    #[must_use]
    pub fn with_bank_limit(mut self, limit: u32) -> Self {
        self.bank_limit = limit;
        self
    }

    /// Practice over a random sample of the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` for an empty bank, or storage errors.
    pub async fn start_daily_practice(&self) -> Result<SessionService, SessionError> {
        let (bank, _) = self.load_bank().await?;
        self.start(bank, SessionOptions::practice())
    }

    /// Practice restricted to one subject.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` when the subject has no questions.
    pub async fn start_subject_practice(
        &self,
        subject: Subject,
    ) -> Result<SessionService, SessionError> {
        let (bank, _) = self.load_bank().await?;
        let pool = bank.into_iter().filter(|q| q.subject() == subject).collect();
        self.start(pool, SessionOptions::practice())
    }

    /// Run every question of an exam, in order, with its supporting texts.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage(NotFound)` for an unknown exam and
    /// `SessionError::MissingQuestions` when the bank lacks any referenced question.
    pub async fn start_exam(&self, exam_id: ExamId) -> Result<SessionService, SessionError> {
        let exam = self.exams.get_exam(exam_id).await?;
        let questions = self.load_exact(exam.question_ids()).await?;
        let texts = self.texts.get_texts(exam.motivational_text_ids()).await?;
        self.start(
            questions,
            SessionOptions::for_exam(exam).with_motivational_texts(texts),
        )
    }

    /// Run a mission's questions in order; a mission without questions covers
    /// the whole bank.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Storage(NotFound)` for an unknown mission,
    /// `SessionError::MissingQuestions`, `SessionError::Empty`, or
    /// `SessionError::BankTooLarge` when a bank-wide mission would be cut short.
    pub async fn start_mission(&self, mission_id: MissionId) -> Result<SessionService, SessionError> {
        let mission = self.missions.get_mission(mission_id).await?;
        let questions = if mission.question_ids().is_empty() {
            match self.load_bank().await? {
                (_, true) => {
                    return Err(SessionError::BankTooLarge {
                        limit: self.bank_limit,
                    });
                }
                (bank, false) => bank,
            }
        } else {
            self.load_exact(mission.question_ids()).await?
        };
        self.start(questions, SessionOptions::for_mission(mission))
    }

    /// Finalize a session, fold it into the student's stats and bump usage
    /// counters of every asked question.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` for a running session,
    /// `SessionError::AlreadyRecorded` on a second call, or storage errors.
    pub async fn complete(
        &self,
        session: &mut SessionService,
        student_id: StudentId,
    ) -> Result<CompletedSession, SessionError> {
        let outcome = session.finalize()?;
        if session.is_recorded() {
            return Err(SessionError::AlreadyRecorded);
        }

        let mut student = self.students.get_student(student_id).await?;
        student.apply_outcome(&outcome);
        self.students.update_student(&student).await?;
        self.questions.record_usage(&session.question_ids()).await?;
        session.mark_recorded();

        tracing::info!(
            student = %student_id,
            total_points = outcome.total_points(),
            streak = student.stats().streak,
            "session outcome recorded"
        );
        Ok(CompletedSession { outcome, student })
    }

    fn start(
        &self,
        questions: Vec<Question>,
        options: SessionOptions,
    ) -> Result<SessionService, SessionError> {
        let session = SessionService::start(questions, options, self.clock.now())?;
        Ok(match &self.explainer {
            Some(explainer) => session.with_explainer(Arc::clone(explainer)),
            None => session,
        })
    }

    /// Up to `bank_limit` questions, plus whether the bank held more.
    async fn load_bank(&self) -> Result<(Vec<Question>, bool), SessionError> {
        let mut bank = self
            .questions
            .list_questions(self.bank_limit.saturating_add(1))
            .await?;
        let limit = usize::try_from(self.bank_limit).unwrap_or(usize::MAX);
        let truncated = bank.len() > limit;
        if truncated {
            bank.truncate(limit);
            tracing::warn!(limit = self.bank_limit, "question bank exceeds the read limit");
        }
        Ok((bank, truncated))
    }

    async fn load_exact(&self, ids: &[QuestionId]) -> Result<Vec<Question>, SessionError> {
        let found = self.questions.get_questions(ids).await?;
        if found.len() != ids.len() {
            let missing: Vec<_> = ids
                .iter()
                .filter(|id| !found.iter().any(|q| q.id() == **id))
                .copied()
                .collect();
            tracing::warn!(?missing, "structured session references missing questions");
            return Err(SessionError::MissingQuestions { missing });
        }
        Ok(found)
    }
}
