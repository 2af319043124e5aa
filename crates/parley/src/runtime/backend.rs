//! Built-in model backend used when no real model is wired in.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::{
    BackendError, ChatRequest, ChatResponse, Message, ModelBackend, Role, Usage,
};
use uuid::Uuid;

/// Replies with `Echo: <last user message>`.
///
/// Useful for wiring checks and local runs: it never fails and reports one
/// prompt token per input message.
#[derive(Debug, Clone)]
pub struct EchoBackend {
    model: String,
}

impl Default for EchoBackend {
    fn default() -> Self {
        Self {
            model: "echo-stub".to_string(),
        }
    }
}

impl EchoBackend {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl ModelBackend for EchoBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let last_user = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map_or("(no user message)", |m| m.content.as_str());
        let prompt_tokens = u32::try_from(request.messages.len()).unwrap_or(u32::MAX);

        Ok(ChatResponse {
            id: format!("echo-{}", Uuid::new_v4()),
            model: self.model.clone(),
            created: Utc::now(),
            message: Message::assistant(format!("Echo: {last_user}")),
            finish_reason: "stop".to_string(),
            usage: Some(Usage::new(prompt_tokens, 1)),
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}
