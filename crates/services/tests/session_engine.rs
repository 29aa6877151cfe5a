use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use exam_core::model::{
    Difficulty, Mission, MissionDraft, MissionId, MissionKind, Question, QuestionDraft,
    QuestionId, Subject,
};
use exam_core::time::fixed_now;
use rand::SeedableRng;
use rand::rngs::StdRng;
use services::ai::ErrorExplainer;
use services::{
    AiError, Explanation, FALLBACK_EXPLANATION, SessionError, SessionOptions, SessionService,
    SessionState,
};
use tokio::sync::Notify;

fn question(id: u64, difficulty: Difficulty) -> Question {
    QuestionDraft::new(
        format!("Question {id}"),
        vec![
            format!("{id}-a"),
            format!("{id}-b"),
            format!("{id}-c"),
            format!("{id}-d"),
        ],
        2,
        difficulty,
        Subject::General,
    )
    .validate(fixed_now())
    .unwrap()
    .assign_id(QuestionId::new(id))
}

fn mission(points: u32) -> Mission {
    Mission::new(
        MissionId::new(9),
        MissionDraft {
            title: "Mission".into(),
            description: String::new(),
            points,
            kind: MissionKind::Daily,
            subject: Subject::General,
            icon: "⭐".into(),
            question_ids: Vec::new(),
            summary: None,
        },
    )
    .unwrap()
}

fn answer(session: &mut SessionService, option: usize) -> SessionState {
    session.select_option(option).unwrap();
    session.reveal_feedback().unwrap();
    session.advance().unwrap()
}

struct FailingExplainer;

#[async_trait]
impl ErrorExplainer for FailingExplainer {
    async fn explain_error(&self, _: &str, _: &str, _: &str) -> Result<String, AiError> {
        Err(AiError::EmptyResponse)
    }
}

/// Holds every answer until released, recording what it was asked.
#[derive(Default)]
struct GatedExplainer {
    release: Notify,
    calls: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl ErrorExplainer for GatedExplainer {
    async fn explain_error(
        &self,
        question: &str,
        chosen: &str,
        correct: &str,
    ) -> Result<String, AiError> {
        self.calls
            .lock()
            .unwrap()
            .push((question.into(), chosen.into(), correct.into()));
        self.release.notified().await;
        Ok(format!("{correct} is right"))
    }
}

#[tokio::test]
async fn three_easy_correct_answers_tally_to_300() {
    let questions = vec![
        question(1, Difficulty::Easy),
        question(2, Difficulty::Easy),
        question(3, Difficulty::Easy),
    ];
    let mut session = SessionService::start_with_rng(
        questions,
        SessionOptions::practice(),
        fixed_now(),
        &mut StdRng::seed_from_u64(11),
    )
    .unwrap();

    assert_eq!(session.len(), 3);
    assert_eq!(answer(&mut session, 2), SessionState::InProgress);
    assert_eq!(answer(&mut session, 2), SessionState::InProgress);
    assert_eq!(answer(&mut session, 2), SessionState::Finished);

    assert_eq!(session.finalize().unwrap().as_tuple(), (3, 3, 300, 0));
}

#[tokio::test]
async fn mission_bonus_is_added_to_tally() {
    let questions = vec![question(1, Difficulty::Easy), question(2, Difficulty::Hard)];
    let mut session =
        SessionService::start(questions, SessionOptions::for_mission(mission(500)), fixed_now())
            .unwrap();

    answer(&mut session, 2);
    session.select_option(0).unwrap();
    let feedback = session.reveal_feedback().unwrap();
    assert!(!feedback.answer.is_correct);
    assert_eq!(feedback.answer.points, 0);
    assert_eq!(session.earned_points(), 100);
    session.advance().unwrap();

    let outcome = session.finalize().unwrap();
    assert_eq!(outcome.as_tuple(), (1, 2, 100, 500));
    assert_eq!(outcome.total_points(), 600);
}

#[tokio::test]
async fn length_advances_reach_finished_with_every_question_answered() {
    let questions: Vec<_> = (1..=7).map(|id| question(id, Difficulty::Medium)).collect();
    let ids: Vec<_> = questions.iter().map(Question::id).collect();
    let mut session =
        SessionService::start(questions, SessionOptions::for_mission(mission(0)), fixed_now())
            .unwrap();

    assert_eq!(session.question_ids(), ids);
    for step in 0..ids.len() {
        assert_eq!(session.position(), step);
        answer(&mut session, 1);
    }
    assert_eq!(session.state(), SessionState::Finished);
    assert_eq!(session.answered_count(), ids.len());
    assert_eq!(session.finalize().unwrap().answered_count, 7);
}

#[tokio::test]
async fn failing_explainer_resolves_to_fallback_without_blocking() {
    let mut session = SessionService::start(
        vec![question(1, Difficulty::Hard)],
        SessionOptions::for_mission(mission(0)),
        fixed_now(),
    )
    .unwrap()
    .with_explainer(Arc::new(FailingExplainer));

    session.select_option(0).unwrap();
    let feedback = session.reveal_feedback().unwrap();
    let slot = feedback.explanation.expect("wrong answers get a slot");

    assert_eq!(session.advance().unwrap(), SessionState::Finished);
    assert_eq!(session.finalize().unwrap().as_tuple(), (0, 1, 0, 0));

    let resolved = tokio::time::timeout(Duration::from_secs(5), slot.wait())
        .await
        .expect("explanation resolves");
    assert_eq!(resolved, Explanation::Fallback(FALLBACK_EXPLANATION.to_string()));
    assert_eq!(session.finalize().unwrap().as_tuple(), (0, 1, 0, 0));
}

#[tokio::test]
async fn late_explanation_lands_in_its_own_slot() {
    let explainer = Arc::new(GatedExplainer::default());
    let mut session = SessionService::start(
        vec![question(1, Difficulty::Easy), question(2, Difficulty::Easy)],
        SessionOptions::for_mission(mission(0)),
        fixed_now(),
    )
    .unwrap()
    .with_explainer(Arc::clone(&explainer) as Arc<dyn ErrorExplainer>);

    session.select_option(3).unwrap();
    let slot = session.reveal_feedback().unwrap().explanation.unwrap();

    // The request is still in flight; progress continues regardless.
    assert_eq!(session.advance().unwrap(), SessionState::InProgress);
    assert!(slot.get().is_pending());
    answer(&mut session, 2);
    assert_eq!(session.finalize().unwrap().as_tuple(), (1, 2, 100, 0));

    tokio::time::timeout(Duration::from_secs(5), async {
        while explainer.calls.lock().unwrap().is_empty() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("request was spawned");
    explainer.release.notify_one();

    let resolved = tokio::time::timeout(Duration::from_secs(5), slot.wait())
        .await
        .expect("explanation resolves");
    assert_eq!(resolved, Explanation::Ready("1-c is right".into()));
    assert_eq!(
        explainer.calls.lock().unwrap().as_slice(),
        [("Question 1".to_string(), "1-d".to_string(), "1-c".to_string())]
    );
    assert!(session.explanation(1).is_none());
    assert_eq!(session.correct_count(), 1);
    assert_eq!(session.earned_points(), 100);
}

#[tokio::test]
async fn dropping_a_session_cancels_pending_explanations() {
    let explainer = Arc::new(GatedExplainer::default());
    let mut session = SessionService::start(
        vec![question(1, Difficulty::Easy)],
        SessionOptions::for_mission(mission(0)),
        fixed_now(),
    )
    .unwrap()
    .with_explainer(Arc::clone(&explainer) as Arc<dyn ErrorExplainer>);

    session.select_option(0).unwrap();
    let slot = session.reveal_feedback().unwrap().explanation.unwrap();
    drop(session);

    tokio::time::timeout(Duration::from_secs(5), async {
        while Arc::strong_count(&explainer) > 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("aborted task releases the explainer");
    assert!(slot.get().is_pending());
}

#[tokio::test]
async fn precondition_errors_are_distinct() {
    let mut session = SessionService::start(
        vec![question(1, Difficulty::Easy)],
        SessionOptions::for_mission(mission(0)),
        fixed_now(),
    )
    .unwrap();

    assert!(matches!(session.reveal_feedback(), Err(SessionError::NoSelection)));
    assert!(matches!(session.advance(), Err(SessionError::NotRevealed)));
    assert!(matches!(session.finalize(), Err(SessionError::NotFinished)));
    assert!(matches!(
        session.select_option(9),
        Err(SessionError::OptionOutOfRange { index: 9, len: 4 })
    ));
    session.select_option(2).unwrap();
    session.reveal_feedback().unwrap();
    assert!(matches!(session.select_option(1), Err(SessionError::AlreadyRevealed)));
    assert!(matches!(session.reveal_feedback(), Err(SessionError::AlreadyRevealed)));
}
