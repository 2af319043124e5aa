//! # Mock Tools for Testing
//!
//! Tool handlers with canned responses and call tracking, so dispatcher and
//! runtime behavior can be asserted without real tool side effects.

use async_trait::async_trait;
use parley_core::{Metadata, ToolFailure, ToolHandler};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Debug, Clone)]
enum Behavior {
    Respond(Value),
    Fail(ToolFailure),
    Panic(String),
}

#[derive(Debug, Default)]
struct CallLog {
    calls: Vec<Vec<String>>,
    metadata: Vec<Metadata>,
}

/// A mock tool that returns predefined responses keyed by its arguments.
///
/// Arguments are matched by joining them with `,`. Clones share call
/// tracking, so a clone can be registered while the original is inspected.
#[derive(Debug, Clone, Default)]
pub struct MockTool {
    responses: HashMap<String, Behavior>,
    default_behavior: Option<Behavior>,
    delay: Option<Duration>,
    log: Arc<Mutex<CallLog>>,
}

impl MockTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `output` when called with exactly `args`.
    #[must_use]
    pub fn with_response(mut self, args: &[&str], output: Value) -> Self {
        self.responses.insert(args.join(","), Behavior::Respond(output));
        self
    }

    /// Fail with an execution failure when called with exactly `args`.
    #[must_use]
    pub fn with_failure(mut self, args: &[&str], message: impl Into<String>) -> Self {
        self.responses.insert(
            args.join(","),
            Behavior::Fail(ToolFailure::execution(message)),
        );
        self
    }

    /// Set a default response for any unmatched input
    #[must_use]
    pub fn with_default_response(mut self, output: Value) -> Self {
        self.default_behavior = Some(Behavior::Respond(output));
        self
    }

    /// Set a default failure for any unmatched input
    #[must_use]
    pub fn with_default_failure(mut self, failure: ToolFailure) -> Self {
        self.default_behavior = Some(Behavior::Fail(failure));
        self
    }

    /// Panic on every unmatched call.
    #[must_use]
    pub fn panicking(mut self, message: impl Into<String>) -> Self {
        self.default_behavior = Some(Behavior::Panic(message.into()));
        self
    }

    /// Sleep before answering.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get the number of times this tool has been called
    pub fn call_count(&self) -> usize {
        self.log().calls.len()
    }

    /// Arguments of every call, oldest first.
    pub fn call_history(&self) -> Vec<Vec<String>> {
        self.log().calls.clone()
    }

    /// Metadata passed to the most recent call.
    pub fn last_metadata(&self) -> Option<Metadata> {
        self.log().metadata.last().cloned()
    }

    /// Reset call tracking
    pub fn reset(&self) {
        let mut log = self.log();
        log.calls.clear();
        log.metadata.clear();
    }

    /// Check if the tool was called with exactly these arguments
    pub fn was_called_with(&self, args: &[&str]) -> bool {
        self.log()
            .calls
            .iter()
            .any(|call| call.iter().map(String::as_str).eq(args.iter().copied()))
    }

    fn log(&self) -> MutexGuard<'_, CallLog> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ToolHandler for MockTool {
    async fn execute(&self, args: &[String], metadata: &Metadata) -> Result<Value, ToolFailure> {
        {
            let mut log = self.log();
            log.calls.push(args.to_vec());
            log.metadata.push(metadata.clone());
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let behavior = self
            .responses
            .get(&args.join(","))
            .or(self.default_behavior.as_ref());

        match behavior {
            Some(Behavior::Respond(output)) => Ok(output.clone()),
            Some(Behavior::Fail(failure)) => Err(failure.clone()),
            Some(Behavior::Panic(message)) => panic!("{message}"),
            None => Ok(Value::String(format!(
                "Mock response for: {}",
                args.join(",")
            ))),
        }
    }

    fn description(&self) -> &str {
        "Mock tool"
    }
}
