use serde::Deserialize;

use exam_core::model::{Difficulty, QuestionDraft, Subject};

use super::client::AiClient;
use crate::error::AiError;

/// Material beyond this many characters is cut before prompting.
pub const MAX_MATERIAL_CHARS: usize = 30_000;

/// Questions requested per generation call.
pub const GENERATED_QUESTION_COUNT: usize = 5;

/// Supporting text shared by several questions of an exam.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedText {
    #[serde(alias = "titulo")]
    pub title: String,
    #[serde(alias = "conteudo")]
    pub content: String,
}

/// A question as returned by the model, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ExtractedQuestion {
    #[serde(alias = "enunciado")]
    pub text: String,
    pub options: Vec<String>,
    #[serde(alias = "correctAnswerIndex")]
    pub correct_index: usize,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default, alias = "usesMotivationalText")]
    pub uses_motivational_text: bool,
    #[serde(default, alias = "imageBase64")]
    pub image_base64: Option<String>,
    #[serde(default, alias = "contextText")]
    pub context_text: Option<String>,
}

impl ExtractedQuestion {
    /// Map model output onto a draft. Unknown subjects become `General` and
    /// unknown difficulties `Medium`.
    #[must_use]
    pub fn into_draft(self, source: Option<&str>, year: Option<&str>) -> QuestionDraft {
        let subject = Subject::from_label(&self.subject);
        let difficulty = self
            .difficulty
            .as_deref()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(Difficulty::Medium);

        let mut draft = QuestionDraft::new(
            self.text,
            self.options,
            self.correct_index,
            difficulty,
            subject,
        );
        draft.tags = vec![subject.as_str().to_string(), difficulty.as_str().to_string()];
        draft.year = year.map(str::to_string);
        draft.source = source.map(str::to_string);
        draft.image_base64 = self.image_base64;
        draft.context_text = self.context_text;
        draft.uses_motivational_text = self.uses_motivational_text;
        draft
    }
}

/// Holistic extraction result for one exam document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ExtractedExam {
    #[serde(default, alias = "textos_motivadores")]
    pub motivational_texts: Vec<ExtractedText>,
    #[serde(default, alias = "questoes")]
    pub questions: Vec<ExtractedQuestion>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QuestionList {
    Wrapped { questions: Vec<ExtractedQuestion> },
    Bare(Vec<ExtractedQuestion>),
}

pub(crate) fn truncate_material(text: &str) -> &str {
    match text.char_indices().nth(MAX_MATERIAL_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = body.strip_prefix("json").unwrap_or(body);
    body.strip_suffix("```").unwrap_or(body).trim()
}

/// Parse the JSON document produced by an extraction request.
///
/// # Errors
///
/// Returns `AiError::InvalidPayload` when the document does not match the
/// expected shape.
pub fn parse_extracted_exam(raw: &str) -> Result<ExtractedExam, AiError> {
    serde_json::from_str(strip_code_fence(raw)).map_err(|e| AiError::InvalidPayload(e.to_string()))
}

/// Parse generated questions, accepting a bare array or `{"questions": [...]}`.
///
/// # Errors
///
/// Returns `AiError::InvalidPayload` for malformed JSON.
pub fn parse_generated_questions(raw: &str) -> Result<Vec<ExtractedQuestion>, AiError> {
    let list: QuestionList = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| AiError::InvalidPayload(e.to_string()))?;
    Ok(match list {
        QuestionList::Wrapped { questions } | QuestionList::Bare(questions) => questions,
    })
}

fn extraction_prompt(full_text: &str) -> String {
    format!(
        r#"You are an expert on admission exams. Extract EVERY question of the exam below with full fidelity.
Use the text as the primary source of truth. Do not omit, summarise or alter any question or option.

FULL TEXT:
---
{full_text}
---

Return ONLY valid JSON with this shape:
{{
  "motivational_texts": [{{"title": "...", "content": "..."}}],
  "questions": [{{
    "text": "...",
    "options": ["...", "...", "...", "..."],
    "correct_index": 0,
    "subject": "Portuguese" or "Mathematics",
    "difficulty": "easy" or "medium" or "hard",
    "uses_motivational_text": true or false,
    "context_text": "..."
  }}]
}}
Rules:
- Every question has exactly 4 options and a 0-based correct_index.
- Detect supporting texts at the start; when a question depends on one, set "uses_motivational_text": true.
- Preserve the original wording of statements and options."#
    )
}

fn generation_prompt(material: &str) -> String {
    format!(
        r#"You are a teaching assistant for an exam preparation course.
Read the study material below and write {GENERATED_QUESTION_COUNT} high-quality multiple-choice questions in the style and difficulty of the admission exam.

MATERIAL:
---
{material}
---

Return ONLY valid JSON of the form
{{"questions": [{{"text": "...", "options": ["...", "...", "...", "..."], "correct_index": 0, "subject": "..."}}]}}
Each question has exactly 4 options and a 0-based correct_index."#
    )
}

impl AiClient {
    /// Extract motivational texts and questions from an exam's full text.
    ///
    /// # Errors
    ///
    /// Returns `AiError` when the gateway fails or returns malformed JSON.
    pub async fn extract_exam(&self, full_text: &str) -> Result<ExtractedExam, AiError> {
        let raw = self
            .generate_json(&extraction_prompt(truncate_material(full_text)))
            .await?;
        let exam = parse_extracted_exam(&raw)?;
        tracing::info!(
            questions = exam.questions.len(),
            texts = exam.motivational_texts.len(),
            "exam material extracted"
        );
        Ok(exam)
    }

    /// Write new questions from study material. Difficulty defaults to medium.
    ///
    /// # Errors
    ///
    /// Returns `AiError` when the gateway fails or returns malformed JSON.
    pub async fn generate_questions(&self, text: &str) -> Result<Vec<ExtractedQuestion>, AiError> {
        let raw = self
            .generate_json(&generation_prompt(truncate_material(text)))
            .await?;
        parse_generated_questions(&raw)
    }
}
