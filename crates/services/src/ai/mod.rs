//! Gateway to the generative AI service.
//!
//! Covers wrong-answer explanations, exam material extraction, question
//! generation, narration and the free-form exam assistant.

mod assistant;
mod client;
mod explain;
mod extract;
mod speech;

pub use assistant::ASSISTANT_FALLBACK;
pub use client::{AiClient, AiConfig, DEFAULT_TIMEOUT_SECS};
pub use explain::{ErrorExplainer, FALLBACK_EXPLANATION};
pub use extract::{
    ExtractedExam, ExtractedQuestion, ExtractedText, GENERATED_QUESTION_COUNT, MAX_MATERIAL_CHARS,
    parse_extracted_exam, parse_generated_questions,
};
