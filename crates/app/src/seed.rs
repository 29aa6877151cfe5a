use anyhow::Context;
use exam_core::model::{
    Difficulty, ExamDraft, MissionDraft, MissionKind, MissionSummary, QuestionDraft, Subject,
};
use services::AppServices;

pub const DEMO_STUDENT: &str = "aluno@escola.br";

const DEMO_QUESTIONS: [(&str, [&str; 4], usize, Difficulty, Subject); 6] = [
    (
        "Quanto é 7 × 8?",
        ["54", "56", "58", "64"],
        1,
        Difficulty::Easy,
        Subject::Mathematics,
    ),
    (
        "Qual fração é equivalente a 0,75?",
        ["1/4", "2/3", "3/4", "7/5"],
        2,
        Difficulty::Medium,
        Subject::Mathematics,
    ),
    (
        "Qual palavra é um substantivo?",
        ["correr", "bonito", "casa", "rapidamente"],
        2,
        Difficulty::Easy,
        Subject::Portuguese,
    ),
    (
        "Em \"Os alunos estudaram muito\", qual é o sujeito?",
        ["Os alunos", "estudaram", "muito", "sujeito oculto"],
        0,
        Difficulty::Medium,
        Subject::Portuguese,
    ),
    (
        "Qual órgão bombeia o sangue pelo corpo?",
        ["Pulmão", "Fígado", "Rim", "Coração"],
        3,
        Difficulty::Easy,
        Subject::Science,
    ),
    (
        "A fotossíntese transforma luz em energia armazenada como:",
        ["glicose", "oxigênio", "água", "gás carbônico"],
        0,
        Difficulty::Hard,
        Subject::Science,
    ),
];

/// What a seeding run created.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub questions: usize,
    pub exam_title: Option<String>,
    pub mission_title: Option<String>,
}

/// Load a small demo bank with one exam and a global mission.
///
/// Skips everything when the bank already has questions.
pub async fn demo(services: &AppServices) -> anyhow::Result<SeedReport> {
    let content = services.content();
    if !content.list_questions(1).await?.is_empty() {
        tracing::info!("question bank already populated; skipping seed");
        return Ok(SeedReport::default());
    }

    let mut ids = Vec::with_capacity(DEMO_QUESTIONS.len());
    for (prompt, options, correct, difficulty, subject) in DEMO_QUESTIONS {
        let mut draft = QuestionDraft::new(
            prompt,
            options.iter().map(|o| (*o).to_string()).collect(),
            correct,
            difficulty,
            subject,
        );
        draft.tags = vec![subject.to_string(), difficulty.to_string()];
        draft.source = Some("demo".into());
        let question = content
            .add_question(draft)
            .await
            .with_context(|| format!("seeding question {prompt:?}"))?;
        ids.push(question.id());
    }

    let text = content
        .add_motivational_text(
            "Estudar todo dia",
            "Pequenos passos diários constroem grandes conquistas.",
            "demo",
        )
        .await?;
    let exam = content
        .add_exam(ExamDraft {
            title: "Simulado de demonstração".into(),
            description: "Uma questão de cada matéria e dificuldade.".into(),
            question_ids: ids.clone(),
            duration_minutes: 20,
            reward_points: 1000,
            motivational_text: None,
            motivational_text_ids: vec![text.id()],
        })
        .await?;

    let mission = content
        .add_mission(MissionDraft {
            title: "Missão da semana".into(),
            description: "Revise matemática básica.".into(),
            points: 500,
            kind: MissionKind::Daily,
            subject: Subject::Mathematics,
            icon: "🧮".into(),
            question_ids: ids.iter().take(2).copied().collect(),
            summary: Some(MissionSummary {
                text: "Multiplicação e frações equivalentes.".into(),
                audio_base64: None,
            }),
        })
        .await?;
    content.set_global_mission(Some(mission.id())).await?;

    match services.access().whitelist(DEMO_STUDENT).await {
        Ok(_) | Err(services::AccessError::AlreadyWhitelisted) => {}
        Err(err) => return Err(err.into()),
    }

    Ok(SeedReport {
        questions: ids.len(),
        exam_title: Some(exam.title().to_string()),
        mission_title: Some(mission.title().to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use exam_core::time::fixed_clock;
    use services::AppConfig;
    use storage::repository::Storage;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let storage = Storage::in_memory();
        let services = AppServices::from_storage(&storage, fixed_clock(), AppConfig::default());

        let first = demo(&services).await.unwrap();
        assert_eq!(first.questions, DEMO_QUESTIONS.len());
        assert!(services.content().global_mission().await.unwrap().is_some());
        assert!(storage.whitelist.contains_email(DEMO_STUDENT).await.unwrap());

        let second = demo(&services).await.unwrap();
        assert_eq!(second.questions, 0);
        assert_eq!(services.content().list_exams(10).await.unwrap().len(), 1);
    }
}
