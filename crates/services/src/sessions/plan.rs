use rand::Rng;
use rand::seq::SliceRandom;

use exam_core::model::{Exam, Mission, MotivationalText, Question};

/// Number of questions drawn for an unstructured practice session.
pub const PRACTICE_SIZE: usize = 5;

/// Optional challenge context attached to a session.
///
/// Attaching an exam or a mission makes the session structured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionOptions {
    pub exam: Option<Exam>,
    pub mission: Option<Mission>,
    /// Supporting texts shown alongside an exam.
    pub motivational_texts: Vec<MotivationalText>,
}

impl SessionOptions {
    #[must_use]
    pub fn practice() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn for_exam(exam: Exam) -> Self {
        Self {
            exam: Some(exam),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn for_mission(mission: Mission) -> Self {
        Self {
            mission: Some(mission),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_motivational_texts(mut self, texts: Vec<MotivationalText>) -> Self {
        self.motivational_texts = texts;
        self
    }

    #[must_use]
    pub fn is_structured(&self) -> bool {
        self.exam.is_some() || self.mission.is_some()
    }

    /// Exam reward plus mission reward.
    #[must_use]
    pub fn bonus_points(&self) -> u32 {
        let exam = self.exam.as_ref().map_or(0, Exam::reward_points);
        let mission = self.mission.as_ref().map_or(0, Mission::points);
        exam.saturating_add(mission)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Full sequence, caller's order.
    Structured,
    /// Uniform random sample.
    Unstructured,
}

/// Selection result for a session build.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionPlan {
    pub questions: Vec<Question>,
    pub mode: SessionMode,
    pub options: SessionOptions,
}

impl SessionPlan {
    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }
}

/// Draw `amount` distinct items uniformly without replacement, in random order.
///
/// Returns every item (shuffled) when the pool is smaller than `amount`.
pub fn sample<T: Clone, R: Rng + ?Sized>(pool: &[T], amount: usize, rng: &mut R) -> Vec<T> {
    let mut drawn = pool.to_vec();
    drawn.shuffle(rng);
    drawn.truncate(amount);
    drawn
}

/// Chooses the question sequence for a session.
pub struct SessionBuilder {
    options: SessionOptions,
    practice_size: usize,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(options: SessionOptions) -> Self {
        Self {
            options,
            practice_size: PRACTICE_SIZE,
        }
    }

    /// Override the unstructured sample size.
    #[must_use]
    pub fn with_practice_size(mut self, size: usize) -> Self {
        self.practice_size = size;
        self
    }

    /// Structured sessions keep `questions` verbatim; unstructured ones draw
    /// `min(practice_size, available)` of them.
    pub fn build<R: Rng + ?Sized>(self, questions: Vec<Question>, rng: &mut R) -> SessionPlan {
        if self.options.is_structured() {
            return SessionPlan {
                questions,
                mode: SessionMode::Structured,
                options: self.options,
            };
        }

        SessionPlan {
            questions: sample(&questions, self.practice_size, rng),
            mode: SessionMode::Unstructured,
            options: self.options,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use exam_core::model::{
        Difficulty, ExamDraft, ExamId, MissionDraft, MissionId, MissionKind, QuestionDraft,
        QuestionId, Subject,
    };
    use exam_core::time::fixed_now;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn question(id: u64) -> Question {
        QuestionDraft::new(
            format!("Q{id}"),
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
            Difficulty::Easy,
            Subject::General,
        )
        .validate(fixed_now())
        .unwrap()
        .assign_id(QuestionId::new(id))
    }

    fn pool(n: u64) -> Vec<Question> {
        (1..=n).map(question).collect()
    }

    fn exam(reward: u32, ids: Vec<QuestionId>) -> Exam {
        Exam::new(
            ExamId::new(1),
            ExamDraft {
                title: "Simulado".into(),
                description: String::new(),
                question_ids: ids,
                duration_minutes: 60,
                reward_points: reward,
                motivational_text: None,
                motivational_text_ids: Vec::new(),
            },
            fixed_now(),
        )
        .unwrap()
    }

    fn mission(points: u32) -> Mission {
        Mission::new(
            MissionId::new(1),
            MissionDraft {
                title: "Missão".into(),
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

    #[test]
    fn structured_plan_keeps_order_and_membership() {
        let questions = vec![question(3), question(1), question(2)];
        let expected: Vec<_> = questions.iter().map(Question::id).collect();
        let options = SessionOptions::for_exam(exam(0, expected.clone()));

        let plan = SessionBuilder::new(options).build(questions, &mut StdRng::seed_from_u64(7));

        assert_eq!(plan.mode, SessionMode::Structured);
        let ids: Vec<_> = plan.questions.iter().map(Question::id).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn unstructured_plan_draws_five_distinct_members() {
        let bank = pool(12);
        let members: HashSet<_> = bank.iter().map(Question::id).collect();

        for seed in 0..20 {
            let plan = SessionBuilder::new(SessionOptions::practice())
                .build(bank.clone(), &mut StdRng::seed_from_u64(seed));
            let ids: HashSet<_> = plan.questions.iter().map(Question::id).collect();
            assert_eq!(plan.mode, SessionMode::Unstructured);
            assert_eq!(plan.total(), PRACTICE_SIZE);
            assert_eq!(ids.len(), PRACTICE_SIZE);
            assert!(ids.is_subset(&members));
        }
    }

    #[test]
    fn small_pool_yields_every_member() {
        let bank = pool(3);
        let plan = SessionBuilder::new(SessionOptions::practice())
            .build(bank.clone(), &mut StdRng::seed_from_u64(1));
        let got: HashSet<_> = plan.questions.iter().map(Question::id).collect();
        let want: HashSet<_> = bank.iter().map(Question::id).collect();
        assert_eq!(got, want);
    }

    #[test]
    fn sampling_varies_order_across_seeds() {
        let bank = pool(10);
        let orders: HashSet<Vec<QuestionId>> = (0..10)
            .map(|seed| {
                sample(&bank, PRACTICE_SIZE, &mut StdRng::seed_from_u64(seed))
                    .iter()
                    .map(Question::id)
                    .collect()
            })
            .collect();
        assert!(orders.len() > 1);
    }

    #[test]
    fn bonus_sums_exam_and_mission_rewards() {
        let mut options = SessionOptions::for_mission(mission(500));
        assert_eq!(options.bonus_points(), 500);
        options.exam = Some(exam(1_000, vec![QuestionId::new(1)]));
        assert_eq!(options.bonus_points(), 1_500);
        assert_eq!(SessionOptions::practice().bonus_points(), 0);
        assert!(!SessionOptions::practice().is_structured());
    }
}
