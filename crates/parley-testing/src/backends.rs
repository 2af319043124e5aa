//! Model backends with predictable behavior.

use async_trait::async_trait;
use chrono::Utc;
use parley_core::{BackendError, ChatRequest, ChatResponse, Message, ModelBackend, Usage};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Answers with a fixed list of replies, one per call, and records every
/// request it receives.
///
/// Once the script runs out, calls fail with
/// [`BackendError::InvalidResponse`].
#[derive(Debug, Default)]
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        lock(&self.requests).clone()
    }

    pub fn remaining(&self) -> usize {
        lock(&self.replies).len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, BackendError> {
        let prompt_tokens = u32::try_from(request.messages.len()).unwrap_or(u32::MAX);
        lock(&self.requests).push(request);

        let reply = lock(&self.replies)
            .pop_front()
            .ok_or_else(|| BackendError::InvalidResponse("script exhausted".to_string()))?;

        Ok(ChatResponse {
            id: format!("scripted-{}", lock(&self.requests).len()),
            model: self.model().to_string(),
            created: Utc::now(),
            message: Message::assistant(reply),
            finish_reason: "stop".to_string(),
            usage: Some(Usage::new(prompt_tokens, 1)),
        })
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Fails every call with the same error.
#[derive(Debug)]
pub struct FailingBackend {
    error: BackendError,
    calls: Mutex<usize>,
}

impl FailingBackend {
    pub fn new(error: BackendError) -> Self {
        Self {
            error,
            calls: Mutex::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        *lock(&self.calls)
    }
}

#[async_trait]
impl ModelBackend for FailingBackend {
    async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, BackendError> {
        *lock(&self.calls) += 1;
        Err(self.error.clone())
    }
}
