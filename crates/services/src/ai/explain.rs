use async_trait::async_trait;

use super::client::AiClient;
use crate::error::AiError;

/// Shown in place of an explanation whenever the gateway cannot provide one.
pub const FALLBACK_EXPLANATION: &str =
    "Explanation unavailable right now. Compare your answer with the correct option and try again.";

/// Produces a pedagogical explanation for a wrong answer.
#[async_trait]
pub trait ErrorExplainer: Send + Sync {
    /// # Errors
    ///
    /// Returns `AiError` when no explanation could be produced.
    async fn explain_error(
        &self,
        question: &str,
        chosen: &str,
        correct: &str,
    ) -> Result<String, AiError>;
}

pub(crate) fn explanation_prompt(question: &str, chosen: &str, correct: &str) -> String {
    format!(
        "A student preparing for an admission exam answered a question incorrectly.\n\
         Question: {question}\n\
         Student's answer: {chosen}\n\
         Correct answer: {correct}\n\n\
         Give a clear, encouraging explanation that breaks down the reasoning \
         leading to the correct answer and points out the mistake in the student's choice."
    )
}

#[async_trait]
impl ErrorExplainer for AiClient {
    async fn explain_error(
        &self,
        question: &str,
        chosen: &str,
        correct: &str,
    ) -> Result<String, AiError> {
        self.generate(&explanation_prompt(question, chosen, correct))
            .await
    }
}
