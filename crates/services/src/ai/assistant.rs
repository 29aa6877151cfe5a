use super::AiClient;
use crate::error::AiError;

/// Shown when the assistant cannot be reached.
pub const ASSISTANT_FALLBACK: &str =
    "Could not reach the assistant right now. Try again later.";

pub(crate) fn assistant_prompt(query: &str) -> String {
    format!(
        "You are a helpful assistant for students preparing for a technical \
         school admission exam. Answer the question below about exam dates, \
         official notices, enrollment steps or campuses. Be short and \
         objective, mention where the official notice is published and say \
         so plainly when you are not sure.\n\n\
         Question: {query}"
    )
}

impl AiClient {
    /// Free-form question about the admission exam.
    pub async fn ask(&self, query: &str) -> Result<String, AiError> {
        self.generate(&assistant_prompt(query)).await
    }

    /// Like [`AiClient::ask`], but any failure becomes [`ASSISTANT_FALLBACK`].
    pub async fn ask_or_fallback(&self, query: &str) -> String {
        match self.ask(query).await {
            Ok(answer) => answer,
            Err(err) => {
                tracing::warn!(error = %err, "assistant unavailable");
                ASSISTANT_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_the_query() {
        let prompt = assistant_prompt("When is the enrollment deadline?");
        assert!(prompt.contains("Question: When is the enrollment deadline?"));
        assert!(prompt.contains("admission exam"));
    }

    #[tokio::test]
    async fn disabled_client_falls_back() {
        let client = AiClient::new(None);
        assert!(matches!(
            client.ask("next exam date").await,
            Err(AiError::Disabled)
        ));
        assert_eq!(client.ask_or_fallback("next exam date").await, ASSISTANT_FALLBACK);
    }
}
