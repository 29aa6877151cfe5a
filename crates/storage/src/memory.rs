use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use exam_core::model::{
    Exam, ExamId, Mission, MissionId, MotivationalText, MotivationalTextId, Notification,
    NotificationId, Question, QuestionId, Student, StudentId, ValidatedQuestion,
};

use crate::repository::{
    ExamRepository, MissionRepository, MotivationalTextRepository, NotificationRepository,
    QuestionRepository, StorageError, StudentRepository, WhitelistRepository,
};

#[derive(Default)]
struct State {
    questions: BTreeMap<QuestionId, Question>,
    exams: BTreeMap<ExamId, Exam>,
    missions: BTreeMap<MissionId, Mission>,
    global_mission: Option<MissionId>,
    students: BTreeMap<StudentId, Student>,
    whitelist: BTreeSet<String>,
    notifications: BTreeMap<NotificationId, Notification>,
    texts: BTreeMap<MotivationalTextId, MotivationalText>,
    last_id: u64,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// All entity kinds share one id sequence.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<State>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn limit_usize(limit: u32) -> usize {
    usize::try_from(limit).unwrap_or(usize::MAX)
}

#[async_trait]
impl QuestionRepository for InMemoryRepository {
    async fn insert_new_question(
        &self,
        question: &ValidatedQuestion,
    ) -> Result<Question, StorageError> {
        let mut guard = self.lock()?;
        let id = QuestionId::new(guard.next_id());
        let stored = question.clone().assign_id(id);
        guard.questions.insert(id, stored.clone());
        Ok(stored)
    }

    async fn get_question(&self, id: QuestionId) -> Result<Question, StorageError> {
        let guard = self.lock()?;
        guard.questions.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn get_questions(&self, ids: &[QuestionId]) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.questions.get(id).cloned())
            .collect())
    }

    async fn list_questions(&self, limit: u32) -> Result<Vec<Question>, StorageError> {
        let guard = self.lock()?;
        let mut all: Vec<Question> = guard.questions.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        all.truncate(limit_usize(limit));
        Ok(all)
    }

    async fn record_usage(&self, ids: &[QuestionId]) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        for id in ids {
            if let Some(question) = guard.questions.get_mut(id) {
                question.record_use();
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn insert_new_exam(&self, exam: &Exam) -> Result<ExamId, StorageError> {
        let mut guard = self.lock()?;
        let id = ExamId::new(guard.next_id());
        guard.exams.insert(id, exam.clone().with_id(id));
        Ok(id)
    }

    async fn get_exam(&self, id: ExamId) -> Result<Exam, StorageError> {
        let guard = self.lock()?;
        guard.exams.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_exams(&self, limit: u32) -> Result<Vec<Exam>, StorageError> {
        let guard = self.lock()?;
        let mut all: Vec<Exam> = guard.exams.values().cloned().collect();
        all.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        all.truncate(limit_usize(limit));
        Ok(all)
    }
}

#[async_trait]
impl MissionRepository for InMemoryRepository {
    async fn insert_new_mission(&self, mission: &Mission) -> Result<MissionId, StorageError> {
        let mut guard = self.lock()?;
        let id = MissionId::new(guard.next_id());
        guard.missions.insert(id, mission.clone().with_id(id));
        Ok(id)
    }

    async fn upsert_mission(&self, mission: &Mission) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard.missions.insert(mission.id(), mission.clone());
        Ok(())
    }

    async fn get_mission(&self, id: MissionId) -> Result<Mission, StorageError> {
        let guard = self.lock()?;
        guard.missions.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_missions(&self, limit: u32) -> Result<Vec<Mission>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .missions
            .values()
            .rev()
            .take(limit_usize(limit))
            .cloned()
            .collect())
    }

    async fn set_global_mission(&self, id: Option<MissionId>) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if let Some(id) = id {
            if !guard.missions.contains_key(&id) {
                return Err(StorageError::NotFound);
            }
        }
        guard.global_mission = id;
        Ok(())
    }

    async fn global_mission(&self) -> Result<Option<Mission>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .global_mission
            .and_then(|id| guard.missions.get(&id).cloned()))
    }
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn insert_new_student(&self, student: &Student) -> Result<StudentId, StorageError> {
        let mut guard = self.lock()?;
        if guard.students.values().any(|s| s.email() == student.email()) {
            return Err(StorageError::Conflict);
        }
        let id = StudentId::new(guard.next_id());
        guard.students.insert(id, student.clone().with_id(id));
        Ok(id)
    }

    async fn update_student(&self, student: &Student) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        let slot = guard
            .students
            .get_mut(&student.id())
            .ok_or(StorageError::NotFound)?;
        *slot = student.clone();
        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError> {
        let guard = self.lock()?;
        guard.students.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn find_student_by_email(&self, email: &str) -> Result<Option<Student>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .students
            .values()
            .find(|s| s.email() == email)
            .cloned())
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.students.values().cloned().collect())
    }
}

#[async_trait]
impl WhitelistRepository for InMemoryRepository {
    async fn add_email(&self, email: &str) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        Ok(guard.whitelist.insert(email.to_string()))
    }

    async fn contains_email(&self, email: &str) -> Result<bool, StorageError> {
        let guard = self.lock()?;
        Ok(guard.whitelist.contains(email))
    }

    async fn list_emails(&self) -> Result<Vec<String>, StorageError> {
        let guard = self.lock()?;
        Ok(guard.whitelist.iter().cloned().collect())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryRepository {
    async fn insert_notification(
        &self,
        notification: &Notification,
    ) -> Result<NotificationId, StorageError> {
        let mut guard = self.lock()?;
        let id = NotificationId::new(guard.next_id());
        guard
            .notifications
            .insert(id, notification.clone().with_id(id));
        Ok(id)
    }

    async fn delete_read(&self) -> Result<u64, StorageError> {
        let mut guard = self.lock()?;
        let before = guard.notifications.len();
        guard.notifications.retain(|_, n| !n.is_read());
        Ok((before - guard.notifications.len()) as u64)
    }

    async fn list_unread(&self) -> Result<Vec<Notification>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .notifications
            .values()
            .rev()
            .filter(|n| !n.is_read())
            .cloned()
            .collect())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        guard
            .notifications
            .get_mut(&id)
            .ok_or(StorageError::NotFound)?
            .mark_read();
        Ok(())
    }
}

#[async_trait]
impl MotivationalTextRepository for InMemoryRepository {
    async fn insert_text(
        &self,
        text: &MotivationalText,
    ) -> Result<MotivationalTextId, StorageError> {
        let mut guard = self.lock()?;
        let id = MotivationalTextId::new(guard.next_id());
        guard.texts.insert(id, text.clone().with_id(id));
        Ok(id)
    }

    async fn get_texts(
        &self,
        ids: &[MotivationalTextId],
    ) -> Result<Vec<MotivationalText>, StorageError> {
        let guard = self.lock()?;
        Ok(ids
            .iter()
            .filter_map(|id| guard.texts.get(id).cloned())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::model::{Difficulty, QuestionDraft, Role, Subject};
    use exam_core::time::fixed_now;

    fn draft(prompt: &str) -> ValidatedQuestion {
        QuestionDraft::new(
            prompt,
            vec!["a".into(), "b".into(), "c".into(), "d".into()],
            0,
            Difficulty::Easy,
            Subject::General,
        )
        .validate(fixed_now())
        .unwrap()
    }

    #[tokio::test]
    async fn get_questions_keeps_requested_order_and_skips_missing() {
        let repo = InMemoryRepository::new();
        let first = repo.insert_new_question(&draft("one")).await.unwrap();
        let second = repo.insert_new_question(&draft("two")).await.unwrap();

        let fetched = repo
            .get_questions(&[second.id(), QuestionId::new(999), first.id()])
            .await
            .unwrap();
        let ids: Vec<_> = fetched.iter().map(Question::id).collect();
        assert_eq!(ids, vec![second.id(), first.id()]);
    }

    #[tokio::test]
    async fn record_usage_increments_counters() {
        let repo = InMemoryRepository::new();
        let q = repo.insert_new_question(&draft("one")).await.unwrap();
        repo.record_usage(&[q.id(), q.id()]).await.unwrap();
        assert_eq!(repo.get_question(q.id()).await.unwrap().times_used(), 2);
    }

    #[tokio::test]
    async fn duplicate_student_email_conflicts() {
        let repo = InMemoryRepository::new();
        let student = Student::new(StudentId::new(0), "Ana", "ana@x.io", Role::Student).unwrap();
        repo.insert_new_student(&student).await.unwrap();
        let err = repo.insert_new_student(&student).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict));
    }

    #[tokio::test]
    async fn global_mission_must_exist() {
        let repo = InMemoryRepository::new();
        let err = repo
            .set_global_mission(Some(MissionId::new(42)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
        assert!(repo.global_mission().await.unwrap().is_none());
    }
}
