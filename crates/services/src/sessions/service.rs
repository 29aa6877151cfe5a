use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use exam_core::model::{
    Exam, Mission, MotivationalText, MotivationalTextId, Question, QuestionId, SessionOutcome,
};

use super::feedback::{Explanation, ExplanationSlot};
use super::plan::{SessionBuilder, SessionMode, SessionOptions, SessionPlan};
use super::progress::SessionProgress;
use crate::ai::{ErrorExplainer, FALLBACK_EXPLANATION};
use crate::error::SessionError;

//
// ─── STATE ─────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    InProgress,
    Finished,
}

/// Locked-in result of one revealed question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnsweredQuestion {
    pub position: usize,
    pub question_id: QuestionId,
    pub selected: usize,
    pub is_correct: bool,
    pub points: u32,
}

/// What the presentation layer shows after a reveal.
#[derive(Debug, Clone)]
pub struct RevealedFeedback {
    pub answer: AnsweredQuestion,
    pub correct_index: usize,
    /// Present for wrong answers only.
    pub explanation: Option<ExplanationSlot>,
}

struct ExplanationRequest {
    question: String,
    chosen: String,
    correct: String,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Quiz run-loop for one play-through.
///
/// The question sequence is fixed at start. Each question goes through
/// select, reveal and advance; correctness and points are locked in at reveal.
/// The session never touches storage: folding the outcome into a student's
/// stats is done by `SessionLoopService::complete`.
///
/// Wrong answers spawn an explanation request onto the current Tokio runtime.
/// Its result lands in that question's [`ExplanationSlot`] only, and pending
/// requests are aborted when the session is dropped.
pub struct SessionService {
    questions: Vec<Question>,
    options: SessionOptions,
    mode: SessionMode,
    state: SessionState,
    position: usize,
    selected: Option<usize>,
    revealed: bool,
    correct_count: u32,
    earned_points: u32,
    answers: Vec<AnsweredQuestion>,
    explanations: BTreeMap<usize, ExplanationSlot>,
    explainer: Option<Arc<dyn ErrorExplainer>>,
    tasks: Vec<JoinHandle<()>>,
    started_at: DateTime<Utc>,
    recorded: bool,
}

impl SessionService {
    /// Start a session using the thread-local RNG for practice sampling.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn start(
        questions: Vec<Question>,
        options: SessionOptions,
        started_at: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        Self::start_with_rng(questions, options, started_at, &mut rand::rng())
    }

    /// Start a session with an explicit RNG.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Empty` if no questions are provided.
    pub fn start_with_rng<R: Rng + ?Sized>(
        questions: Vec<Question>,
        options: SessionOptions,
        started_at: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::Empty);
        }
        let plan = SessionBuilder::new(options).build(questions, rng);
        Self::from_plan(plan, started_at)
    }

    /// # Errors
    ///
    /// Returns `SessionError::Empty` if the plan selected no questions.
    pub fn from_plan(plan: SessionPlan, started_at: DateTime<Utc>) -> Result<Self, SessionError> {
        if plan.is_empty() {
            return Err(SessionError::Empty);
        }

        tracing::info!(
            questions = plan.total(),
            mode = ?plan.mode,
            bonus = plan.options.bonus_points(),
            "session started"
        );

        Ok(Self {
            questions: plan.questions,
            options: plan.options,
            mode: plan.mode,
            state: SessionState::InProgress,
            position: 0,
            selected: None,
            revealed: false,
            correct_count: 0,
            earned_points: 0,
            answers: Vec::new(),
            explanations: BTreeMap::new(),
            explainer: None,
            tasks: Vec::new(),
            started_at,
            recorded: false,
        })
    }

    /// Attach the gateway used to explain wrong answers.
    #[must_use]
    pub fn with_explainer(mut self, explainer: Arc<dyn ErrorExplainer>) -> Self {
        self.explainer = Some(explainer);
        self
    }

    // ─── accessors ───

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.state == SessionState::Finished
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    #[must_use]
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    #[must_use]
    pub fn question_ids(&self) -> Vec<QuestionId> {
        self.questions.iter().map(Question::id).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always `false`: sessions are never started without questions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    /// The question awaiting an answer, or `None` once finished.
    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        match self.state {
            SessionState::InProgress => self.questions.get(self.position),
            SessionState::Finished => None,
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed
    }

    #[must_use]
    pub fn correct_count(&self) -> u32 {
        self.correct_count
    }

    #[must_use]
    pub fn earned_points(&self) -> u32 {
        self.earned_points
    }

    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    #[must_use]
    pub fn answers(&self) -> &[AnsweredQuestion] {
        &self.answers
    }

    #[must_use]
    pub fn exam(&self) -> Option<&Exam> {
        self.options.exam.as_ref()
    }

    #[must_use]
    pub fn mission(&self) -> Option<&Mission> {
        self.options.mission.as_ref()
    }

    #[must_use]
    pub fn bonus_points(&self) -> u32 {
        self.options.bonus_points()
    }

    /// Linked motivational texts, or the exam's inline text when none are linked.
    #[must_use]
    pub fn supporting_texts(&self) -> Vec<MotivationalText> {
        if !self.options.motivational_texts.is_empty() {
            return self.options.motivational_texts.clone();
        }
        self.exam()
            .and_then(Exam::motivational_text)
            .and_then(|content| {
                MotivationalText::new(MotivationalTextId::new(0), "Supporting text", content, "")
                    .ok()
            })
            .into_iter()
            .collect()
    }

    /// Explanation slot for the question at `position`, if one was requested.
    #[must_use]
    pub fn explanation(&self, position: usize) -> Option<ExplanationSlot> {
        self.explanations.get(&position).cloned()
    }

    #[must_use]
    pub fn progress(&self) -> SessionProgress {
        SessionProgress {
            total: self.len(),
            position: self.position,
            answered: self.answered_count(),
            correct: self.correct_count,
            earned_points: self.earned_points,
            is_complete: self.is_complete(),
        }
    }

    // ─── transitions ───

    /// Choose an option for the current question, replacing any earlier choice.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished`, `SessionError::AlreadyRevealed`, or
    /// `SessionError::OptionOutOfRange`; the session is left unchanged.
    pub fn select_option(&mut self, index: usize) -> Result<(), SessionError> {
        let question = self.in_progress_question()?;
        if self.revealed {
            return Err(SessionError::AlreadyRevealed);
        }
        let len = question.options().len();
        if index >= len {
            return Err(SessionError::OptionOutOfRange { index, len });
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Lock in the current selection and score it.
    ///
    /// A wrong answer triggers an explanation request that resolves later
    /// into the returned slot.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished`, `SessionError::AlreadyRevealed`, or
    /// `SessionError::NoSelection`.
    pub fn reveal_feedback(&mut self) -> Result<RevealedFeedback, SessionError> {
        let question = self.in_progress_question()?;
        if self.revealed {
            return Err(SessionError::AlreadyRevealed);
        }
        let selected = self.selected.ok_or(SessionError::NoSelection)?;

        let is_correct = question.is_correct(selected);
        let points = if is_correct { question.points() } else { 0 };
        let correct_index = question.correct_index();
        let answer = AnsweredQuestion {
            position: self.position,
            question_id: question.id(),
            selected,
            is_correct,
            points,
        };
        let request = (!is_correct).then(|| ExplanationRequest {
            question: question.prompt().to_string(),
            chosen: question.option(selected).unwrap_or_default().to_string(),
            correct: question.correct_option().to_string(),
        });

        self.revealed = true;
        if is_correct {
            self.correct_count = self.correct_count.saturating_add(1);
            self.earned_points = self.earned_points.saturating_add(points);
        }
        self.answers.push(answer.clone());

        let explanation = request.map(|request| self.request_explanation(request));

        Ok(RevealedFeedback {
            answer,
            correct_index,
            explanation,
        })
    }

    /// Move to the next question, or finish after the last one.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Finished` or `SessionError::NotRevealed`.
    pub fn advance(&mut self) -> Result<SessionState, SessionError> {
        self.in_progress_question()?;
        if !self.revealed {
            return Err(SessionError::NotRevealed);
        }

        if self.position + 1 >= self.questions.len() {
            self.state = SessionState::Finished;
            tracing::info!(
                correct = self.correct_count,
                answered = self.answers.len(),
                earned = self.earned_points,
                "session finished"
            );
        } else {
            self.position += 1;
            self.selected = None;
            self.revealed = false;
        }
        Ok(self.state)
    }

    /// Final tally: `(correct, answered, earned, bonus)`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::NotFinished` while questions remain.
    pub fn finalize(&self) -> Result<SessionOutcome, SessionError> {
        if !self.is_complete() {
            return Err(SessionError::NotFinished);
        }
        Ok(SessionOutcome::new(
            self.correct_count,
            u32::try_from(self.answers.len()).unwrap_or(u32::MAX),
            self.earned_points,
            self.bonus_points(),
        ))
    }

    pub(crate) fn is_recorded(&self) -> bool {
        self.recorded
    }

    pub(crate) fn mark_recorded(&mut self) {
        self.recorded = true;
    }

    fn in_progress_question(&self) -> Result<&Question, SessionError> {
        match self.state {
            SessionState::InProgress => self
                .questions
                .get(self.position)
                .ok_or(SessionError::Finished),
            SessionState::Finished => Err(SessionError::Finished),
        }
    }

    fn request_explanation(&mut self, request: ExplanationRequest) -> ExplanationSlot {
        let slot = ExplanationSlot::pending();
        self.explanations.insert(self.position, slot.clone());

        let fallback = || Explanation::Fallback(FALLBACK_EXPLANATION.to_string());
        let Some(explainer) = self.explainer.clone() else {
            slot.resolve(fallback());
            return slot;
        };
        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("no async runtime available; using fallback explanation");
            slot.resolve(fallback());
            return slot;
        };

        let writer = slot.clone();
        let task = runtime.spawn(async move {
            let resolved = match explainer
                .explain_error(&request.question, &request.chosen, &request.correct)
                .await
            {
                Ok(text) => Explanation::Ready(text),
                Err(err) => {
                    tracing::warn!(error = %err, "explanation request failed; using fallback");
                    fallback()
                }
            };
            writer.resolve(resolved);
        });

        self.tasks.retain(|task| !task.is_finished());
        self.tasks.push(task);
        slot
    }
}

impl Drop for SessionService {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl fmt::Debug for SessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionService")
            .field("questions_len", &self.questions.len())
            .field("mode", &self.mode)
            .field("state", &self.state)
            .field("position", &self.position)
            .field("selected", &self.selected)
            .field("revealed", &self.revealed)
            .field("correct_count", &self.correct_count)
            .field("earned_points", &self.earned_points)
            .field("started_at", &self.started_at)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
