use exam_core::model::{
    Difficulty, Exam, ExamDraft, ExamId, Mission, MissionDraft, MissionId, MissionKind,
    MissionSummary, Notification, NotificationId, QuestionDraft, QuestionId, Role, Student,
    StudentId, Subject, ValidatedQuestion,
};
use exam_core::time::fixed_now;
use storage::repository::{
    ExamRepository, MissionRepository, NotificationRepository, QuestionRepository, StorageError,
    StudentRepository, WhitelistRepository,
};
use storage::sqlite::SqliteRepository;

async fn connect(name: &str) -> SqliteRepository {
    let url = format!("sqlite:file:{name}?mode=memory&cache=shared");
    let repo = SqliteRepository::connect(&url).await.expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

fn question(prompt: &str, difficulty: Difficulty) -> ValidatedQuestion {
    let mut draft = QuestionDraft::new(
        prompt,
        vec!["1".into(), "2".into(), "3".into(), "4".into()],
        2,
        difficulty,
        Subject::Mathematics,
    );
    draft.tags = vec!["frações".into()];
    draft.context_text = Some("Leia o texto.".into());
    draft.validate(fixed_now()).unwrap()
}

#[tokio::test]
async fn questions_round_trip_with_json_columns() {
    let repo = connect("memdb_questions").await;

    let first = repo
        .insert_new_question(&question("Quanto é 1 + 2?", Difficulty::Easy))
        .await
        .unwrap();
    let second = repo
        .insert_new_question(&question("Quanto é 2 + 1?", Difficulty::Hard))
        .await
        .unwrap();

    let fetched = repo.get_question(first.id()).await.unwrap();
    assert_eq!(fetched, first);
    assert_eq!(fetched.tags(), ["frações"]);
    assert_eq!(fetched.correct_option(), "3");

    let batch = repo
        .get_questions(&[second.id(), QuestionId::new(9_999), first.id()])
        .await
        .unwrap();
    let ids: Vec<_> = batch.iter().map(|q| q.id()).collect();
    assert_eq!(ids, vec![second.id(), first.id()]);

    repo.record_usage(&[first.id()]).await.unwrap();
    assert_eq!(repo.get_question(first.id()).await.unwrap().times_used(), 1);

    let err = repo.get_question(QuestionId::new(9_999)).await.unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn exams_and_missions_persist() {
    let repo = connect("memdb_exams_missions").await;
    let q = repo
        .insert_new_question(&question("Quanto é 1 + 2?", Difficulty::Medium))
        .await
        .unwrap();

    let exam = Exam::new(
        ExamId::new(0),
        ExamDraft {
            title: "Simulado 1".into(),
            description: "Treino".into(),
            question_ids: vec![q.id()],
            duration_minutes: 90,
            reward_points: 500,
            motivational_text: None,
            motivational_text_ids: Vec::new(),
        },
        fixed_now(),
    )
    .unwrap();
    let exam_id = repo.insert_new_exam(&exam).await.unwrap();
    let stored = repo.get_exam(exam_id).await.unwrap();
    assert_eq!(stored.question_ids(), [q.id()]);
    assert_eq!(stored.reward_points(), 500);

    let mission = Mission::new(
        MissionId::new(0),
        MissionDraft {
            title: "Missão de frações".into(),
            description: String::new(),
            points: 200,
            kind: MissionKind::Audio,
            subject: Subject::Mathematics,
            icon: "🎧".into(),
            question_ids: Vec::new(),
            summary: Some(MissionSummary {
                text: "Frações são partes de um todo.".into(),
                audio_base64: None,
            }),
        },
    )
    .unwrap();
    let mission_id = repo.insert_new_mission(&mission).await.unwrap();

    let mut stored = repo.get_mission(mission_id).await.unwrap();
    assert!(stored.set_summary_audio("AAAA".into()));
    repo.upsert_mission(&stored).await.unwrap();
    let reloaded = repo.get_mission(mission_id).await.unwrap();
    assert_eq!(
        reloaded.summary().and_then(|s| s.audio_base64.as_deref()),
        Some("AAAA")
    );

    assert!(repo.global_mission().await.unwrap().is_none());
    repo.set_global_mission(Some(mission_id)).await.unwrap();
    assert_eq!(
        repo.global_mission().await.unwrap().map(|m| m.id()),
        Some(mission_id)
    );
    let err = repo
        .set_global_mission(Some(MissionId::new(4_242)))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn students_whitelist_and_notifications() {
    let repo = connect("memdb_people").await;

    let student = Student::new(StudentId::new(0), "Ana", "ana@escola.br", Role::Student).unwrap();
    let id = repo.insert_new_student(&student).await.unwrap();
    let err = repo.insert_new_student(&student).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict));

    let found = repo
        .find_student_by_email("ana@escola.br")
        .await
        .unwrap()
        .expect("student exists");
    assert_eq!(found.id(), id);

    assert!(repo.add_email("bia@escola.br").await.unwrap());
    assert!(!repo.add_email("bia@escola.br").await.unwrap());
    assert!(repo.contains_email("bia@escola.br").await.unwrap());

    let old = Notification::new(NotificationId::new(0), "Antigo", false, fixed_now()).unwrap();
    let old_id = repo.insert_notification(&old).await.unwrap();
    repo.mark_read(old_id).await.unwrap();
    let fresh = Notification::new(NotificationId::new(0), "Novo", false, fixed_now()).unwrap();
    repo.insert_notification(&fresh).await.unwrap();

    assert_eq!(repo.delete_read().await.unwrap(), 1);
    let unread = repo.list_unread().await.unwrap();
    assert_eq!(unread.len(), 1);
    assert_eq!(unread[0].message(), "Novo");
}
