use std::sync::Arc;

use chrono::Datelike;

use exam_core::model::{
    Exam, ExamDraft, ExamId, Mission, MissionDraft, MissionId, MotivationalText,
    MotivationalTextId, Notification, NotificationId, Question, QuestionDraft, QuestionError,
    QuestionId,
};
use storage::repository::{
    ExamRepository, MissionRepository, MotivationalTextRepository, NotificationRepository,
    QuestionRepository, Storage,
};

use crate::Clock;
use crate::ai::{AiClient, ExtractedExam};
use crate::error::ContentError;

/// Reward granted by exams created straight from imported material.
pub const DEFAULT_IMPORT_REWARD: u32 = 1_000;
/// Minutes budgeted per question for imported exams.
pub const MINUTES_PER_IMPORTED_QUESTION: u32 = 2;

/// Turn an import into a ready-to-run exam.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedExamSpec {
    pub title: String,
    pub reward_points: u32,
}

/// What an import stored, plus the extracted questions that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub text_ids: Vec<MotivationalTextId>,
    pub questions: Vec<Question>,
    pub rejected: Vec<(usize, QuestionError)>,
    pub exam: Option<Exam>,
}

/// Teacher-side authoring of the question bank, exams, missions and notices.
#[derive(Clone)]
pub struct ContentService {
    clock: Clock,
    questions: Arc<dyn QuestionRepository>,
    exams: Arc<dyn ExamRepository>,
    missions: Arc<dyn MissionRepository>,
    notifications: Arc<dyn NotificationRepository>,
    texts: Arc<dyn MotivationalTextRepository>,
}

impl ContentService {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        Self {
            clock,
            questions: Arc::clone(&storage.questions),
            exams: Arc::clone(&storage.exams),
            missions: Arc::clone(&storage.missions),
            notifications: Arc::clone(&storage.notifications),
            texts: Arc::clone(&storage.motivational_texts),
        }
    }

    // ─── questions ───

    /// Validate and store a question.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Question` for invalid drafts, or storage errors.
    pub async fn add_question(&self, draft: QuestionDraft) -> Result<Question, ContentError> {
        let validated = draft.validate(self.clock.now())?;
        let question = self.questions.insert_new_question(&validated).await?;
        tracing::info!(id = %question.id(), difficulty = %question.difficulty(), "question added");
        Ok(question)
    }

    /// Newest questions first.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, ContentError> {
        Ok(self.questions.list_questions(limit).await?)
    }

    // ─── exams ───

    /// Store an exam and announce it to students.
    ///
    /// Already-read notifications are dropped before the announcement is added.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Exam` for invalid drafts,
    /// `ContentError::MissingQuestions` for unknown question ids, or storage errors.
    pub async fn add_exam(&self, draft: ExamDraft) -> Result<Exam, ContentError> {
        let now = self.clock.now();
        let exam = Exam::new(ExamId::new(0), draft, now)?;
        self.ensure_questions_exist(exam.question_ids()).await?;

        let id = self.exams.insert_new_exam(&exam).await?;
        let exam = exam.with_id(id);

        let dropped = self.notifications.delete_read().await?;
        let notice = Notification::new(
            NotificationId::new(0),
            format!("New exam published: {}", exam.title()),
            false,
            now,
        )?;
        self.notifications.insert_notification(&notice).await?;

        tracing::info!(id = %id, questions = exam.question_ids().len(), dropped, "exam published");
        Ok(exam)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_exams(&self, limit: u32) -> Result<Vec<Exam>, ContentError> {
        Ok(self.exams.list_exams(limit).await?)
    }

    // ─── missions ───

    /// # Errors
    ///
    /// Returns `ContentError::Mission` for invalid drafts,
    /// `ContentError::MissingQuestions` for unknown question ids, or storage errors.
    pub async fn add_mission(&self, draft: MissionDraft) -> Result<Mission, ContentError> {
        let mission = Mission::new(MissionId::new(0), draft)?;
        self.ensure_questions_exist(mission.question_ids()).await?;
        let id = self.missions.insert_new_mission(&mission).await?;
        tracing::info!(id = %id, kind = %mission.kind(), "mission added");
        Ok(mission.with_id(id))
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn list_missions(&self, limit: u32) -> Result<Vec<Mission>, ContentError> {
        Ok(self.missions.list_missions(limit).await?)
    }

    /// Feature one mission for every student, or clear it with `None`.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::Storage(NotFound)` for an unknown mission.
    pub async fn set_global_mission(&self, id: Option<MissionId>) -> Result<(), ContentError> {
        self.missions.set_global_mission(id).await?;
        tracing::info!(mission = ?id, "global mission updated");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn global_mission(&self) -> Result<Option<Mission>, ContentError> {
        Ok(self.missions.global_mission().await?)
    }

    /// Store narration audio on a mission summary.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NoSummary` when the mission has nothing to narrate.
    pub async fn attach_mission_audio(
        &self,
        mission_id: MissionId,
        audio_base64: String,
    ) -> Result<Mission, ContentError> {
        let mut mission = self.missions.get_mission(mission_id).await?;
        if !mission.set_summary_audio(audio_base64) {
            return Err(ContentError::NoSummary);
        }
        self.missions.upsert_mission(&mission).await?;
        Ok(mission)
    }

    /// Synthesize narration for a mission summary and store it.
    ///
    /// # Errors
    ///
    /// Returns `ContentError::NoSummary`, `ContentError::Ai`, or storage errors.
    pub async fn narrate_mission(
        &self,
        mission_id: MissionId,
        ai: &AiClient,
    ) -> Result<Mission, ContentError> {
        let mission = self.missions.get_mission(mission_id).await?;
        let text = mission
            .summary()
            .map(|summary| summary.text.clone())
            .ok_or(ContentError::NoSummary)?;
        let audio = ai.narrate(&text).await?;
        self.attach_mission_audio(mission_id, audio).await
    }

    // ─── supporting material ───

    /// # Errors
    ///
    /// Returns `ContentError::Material` for blank input, or storage errors.
    pub async fn add_motivational_text(
        &self,
        title: &str,
        content: &str,
        source: &str,
    ) -> Result<MotivationalText, ContentError> {
        let text = MotivationalText::new(MotivationalTextId::new(0), title, content, source)?;
        let id = self.texts.insert_text(&text).await?;
        Ok(text.with_id(id))
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage` if repository access fails.
    pub async fn unread_notifications(&self) -> Result<Vec<Notification>, ContentError> {
        Ok(self.notifications.list_unread().await?)
    }

    /// # Errors
    ///
    /// Returns `ContentError::Storage(NotFound)` for an unknown notification.
    pub async fn mark_notification_read(&self, id: NotificationId) -> Result<(), ContentError> {
        Ok(self.notifications.mark_read(id).await?)
    }

    // ─── import ───

    /// Store extracted material: supporting texts first, then every valid
    /// question. With `exam`, also publish an exam over the imported
    /// questions linked to the imported texts.
    ///
    /// # Errors
    ///
    /// Returns storage errors, or exam errors when nothing valid was imported
    /// but an exam was requested.
    pub async fn import_extracted(
        &self,
        extracted: ExtractedExam,
        source: &str,
        exam: Option<ImportedExamSpec>,
    ) -> Result<ImportReport, ContentError> {
        let year = self.clock.now().year().to_string();
        let source = source.trim();
        let source = (!source.is_empty()).then_some(source);

        let mut text_ids = Vec::with_capacity(extracted.motivational_texts.len());
        for text in extracted.motivational_texts {
            match self
                .add_motivational_text(&text.title, &text.content, source.unwrap_or_default())
                .await
            {
                Ok(stored) => text_ids.push(stored.id()),
                Err(ContentError::Material(err)) => {
                    tracing::warn!(error = %err, "skipping blank motivational text");
                }
                Err(err) => return Err(err),
            }
        }

        let mut questions = Vec::new();
        let mut rejected = Vec::new();
        for (index, extracted_question) in extracted.questions.into_iter().enumerate() {
            let draft = extracted_question.into_draft(source, Some(&year));
            match self.add_question(draft).await {
                Ok(question) => questions.push(question),
                Err(ContentError::Question(err)) => {
                    tracing::warn!(index, error = %err, "rejecting extracted question");
                    rejected.push((index, err));
                }
                Err(err) => return Err(err),
            }
        }

        let exam = match exam {
            Some(spec) => {
                let count = u32::try_from(questions.len()).unwrap_or(u32::MAX);
                let draft = ExamDraft {
                    title: spec.title,
                    description: format!(
                        "Exam with {} questions imported from {}.",
                        questions.len(),
                        source.unwrap_or("extracted material")
                    ),
                    question_ids: questions.iter().map(Question::id).collect(),
                    duration_minutes: count
                        .saturating_mul(MINUTES_PER_IMPORTED_QUESTION)
                        .max(1),
                    reward_points: spec.reward_points,
                    motivational_text: None,
                    motivational_text_ids: text_ids.clone(),
                };
                Some(self.add_exam(draft).await?)
            }
            None => None,
        };

        tracing::info!(
            questions = questions.len(),
            rejected = rejected.len(),
            texts = text_ids.len(),
            "extracted material imported"
        );
        Ok(ImportReport {
            text_ids,
            questions,
            rejected,
            exam,
        })
    }

    async fn ensure_questions_exist(&self, ids: &[QuestionId]) -> Result<(), ContentError> {
        if ids.is_empty() {
            return Ok(());
        }
        let found = self.questions.get_questions(ids).await?;
        let missing: Vec<_> = ids
            .iter()
            .filter(|id| !found.iter().any(|q| q.id() == **id))
            .copied()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ContentError::MissingQuestions { missing })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Difficulty, MissionKind, MissionSummary, Subject};
    use exam_core::time::fixed_clock;
    use storage::repository::StorageError;

    use crate::ai::parse_extracted_exam;
    use crate::error::AiError;

    fn service() -> ContentService {
        ContentService::new(fixed_clock(), &Storage::in_memory())
    }

    fn draft(prompt: &str) -> QuestionDraft {
        QuestionDraft::new(
            prompt,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
            Difficulty::Medium,
            Subject::Portuguese,
        )
    }

    fn exam_draft(title: &str, question_ids: Vec<QuestionId>) -> ExamDraft {
        ExamDraft {
            title: title.into(),
            description: String::new(),
            question_ids,
            duration_minutes: 60,
            reward_points: 500,
            motivational_text: None,
            motivational_text_ids: Vec::new(),
        }
    }

    #[tokio::test]
    async fn invalid_question_is_rejected() {
        let svc = service();
        let mut bad = draft("Q");
        bad.options.pop();
        let err = svc.add_question(bad).await.unwrap_err();
        assert!(matches!(err, ContentError::Question(_)));
    }

    #[tokio::test]
    async fn publishing_exam_notifies_and_drops_read_notices() {
        let svc = service();
        let q = svc.add_question(draft("Q1")).await.unwrap();

        let first = svc.add_exam(exam_draft("Simulado 1", vec![q.id()])).await.unwrap();
        let unread = svc.unread_notifications().await.unwrap();
        assert_eq!(unread.len(), 1);
        assert!(unread[0].message().contains(first.title()));

        svc.mark_notification_read(unread[0].id()).await.unwrap();
        svc.add_exam(exam_draft("Simulado 2", vec![q.id()])).await.unwrap();
        let unread = svc.unread_notifications().await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].message(), "New exam published: Simulado 2");
    }

    #[tokio::test]
    async fn exam_with_unknown_question_is_rejected() {
        let svc = service();
        let err = svc
            .add_exam(exam_draft("Simulado", vec![QuestionId::new(77)]))
            .await
            .unwrap_err();
        match err {
            ContentError::MissingQuestions { missing } => {
                assert_eq!(missing, vec![QuestionId::new(77)]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn audio_needs_a_summary() {
        let svc = service();
        let mut mission_draft = MissionDraft {
            title: "Ouvir".into(),
            description: String::new(),
            points: 100,
            kind: MissionKind::Audio,
            subject: Subject::Science,
            icon: "🎧".into(),
            question_ids: Vec::new(),
            summary: None,
        };
        let bare = svc.add_mission(mission_draft.clone()).await.unwrap();
        let err = svc
            .attach_mission_audio(bare.id(), "AAAA".into())
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::NoSummary));

        mission_draft.summary = Some(MissionSummary {
            text: "Fotossíntese".into(),
            audio_base64: None,
        });
        let narrated = svc.add_mission(mission_draft).await.unwrap();
        let updated = svc
            .attach_mission_audio(narrated.id(), "AAAA".into())
            .await
            .unwrap();
        assert_eq!(
            updated.summary().and_then(|s| s.audio_base64.as_deref()),
            Some("AAAA")
        );
    }

    #[tokio::test]
    async fn narration_checks_summary_before_calling_the_gateway() {
        let svc = service();
        let ai = AiClient::new(None);
        let mut mission_draft = MissionDraft {
            title: "Narrar".into(),
            description: String::new(),
            points: 0,
            kind: MissionKind::Audio,
            subject: Subject::General,
            icon: "🔊".into(),
            question_ids: Vec::new(),
            summary: None,
        };
        let bare = svc.add_mission(mission_draft.clone()).await.unwrap();
        let err = svc.narrate_mission(bare.id(), &ai).await.unwrap_err();
        assert!(matches!(err, ContentError::NoSummary));

        mission_draft.summary = Some(MissionSummary {
            text: "Resumo".into(),
            audio_base64: None,
        });
        let with_summary = svc.add_mission(mission_draft).await.unwrap();
        let err = svc.narrate_mission(with_summary.id(), &ai).await.unwrap_err();
        assert!(matches!(err, ContentError::Ai(AiError::Disabled)));
        let stored = svc.list_missions(10).await.unwrap();
        assert!(stored.iter().all(|m| m.summary().is_none_or(|s| s.audio_base64.is_none())));
    }

    #[tokio::test]
    async fn global_mission_round_trip() {
        let svc = service();
        let err = svc
            .set_global_mission(Some(MissionId::new(5)))
            .await
            .unwrap_err();
        assert!(matches!(err, ContentError::Storage(StorageError::NotFound)));
        assert!(svc.global_mission().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn import_stores_texts_questions_and_exam() {
        let svc = service();
        let extracted = parse_extracted_exam(
            r#"{
                "motivational_texts": [{"title": "Texto I", "content": "Conteúdo"}],
                "questions": [
                    {"text": "Q1", "options": ["a","b","c","d"], "correct_index": 0,
                     "subject": "Português", "difficulty": "Fácil", "uses_motivational_text": true},
                    {"text": "Q2", "options": ["a","b"], "correct_index": 0, "subject": "Matemática"}
                ]
            }"#,
        )
        .unwrap();

        let report = svc
            .import_extracted(
                extracted,
                "prova-2024.pdf",
                Some(ImportedExamSpec {
                    title: "Prova 2024".into(),
                    reward_points: DEFAULT_IMPORT_REWARD,
                }),
            )
            .await
            .unwrap();

        assert_eq!(report.text_ids.len(), 1);
        assert_eq!(report.questions.len(), 1);
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].0, 1);
        assert_eq!(report.questions[0].source(), Some("prova-2024.pdf"));
        assert!(report.questions[0].uses_motivational_text());

        let exam = report.exam.unwrap();
        assert_eq!(exam.question_ids(), [report.questions[0].id()]);
        assert_eq!(exam.motivational_text_ids(), report.text_ids.as_slice());
        assert_eq!(exam.duration_minutes(), 2);
        assert_eq!(exam.reward_points(), DEFAULT_IMPORT_REWARD);
    }
}
