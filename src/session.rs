// ============================================================================
// File: src/session.rs
// Multi-turn medical Q&A session holding the conversation history
// ============================================================================

use crate::error::LlmError;
use crate::llm_client::LlmClient;
use crate::models::Message;

/// Caller-side state for a chat with the medical assistant.
///
/// History only grows when a turn succeeds, so a failed call can be retried
/// without duplicating the question.
pub struct ChatSession {
    llm_client: LlmClient,
    patient_context: Option<String>,
    history: Vec<Message>,
}

impl ChatSession {
    pub fn new(llm_client: LlmClient, patient_context: Option<String>) -> Self {
        Self {
            llm_client,
            patient_context: patient_context.filter(|context| !context.trim().is_empty()),
            history: Vec::new(),
        }
    }

    pub async fn ask(&mut self, query: &str) -> Result<String, LlmError> {
        let answer = self
            .llm_client
            .get_medical_assistant_response(query, self.patient_context.as_deref(), &self.history)
            .await?;

        self.history.push(Message::user(query));
        self.history.push(Message::assistant(answer.clone()));
        tracing::debug!(turns = self.history.len() / 2, "chat turn recorded");

        Ok(answer)
    }

    /// Forget all prior turns; patient context is kept
    pub fn reset(&mut self) {
        self.history.clear();
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn patient_context(&self) -> Option<&str> {
        self.patient_context.as_deref()
    }

    pub fn model(&self) -> &str {
        self.llm_client.default_model()
    }
}
