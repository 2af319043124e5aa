//! Tool invocation types and the handler contract.
//!
//! A [`ToolCall`] is produced by the call extractor, handed to a dispatcher,
//! and answered by exactly one [`ToolResult`]. Failures are carried as data in
//! [`ToolFailure`] so one broken handler can never abort its siblings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Free-form request metadata passed through to every handler.
pub type Metadata = serde_json::Map<String, Value>;

/// Check that `name` matches the tool identifier grammar: ASCII letters,
/// digits and underscores, not starting with a digit.
pub fn is_valid_tool_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// A parsed request to invoke a named tool with flat string arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Vec<String>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

/// Category of a tool failure.
///
/// Mirrors the failure taxonomy hosts care about when deciding whether to
/// retry, surface, or ignore a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No handler is registered under the requested name.
    NotFound,
    /// Arguments were missing or malformed.
    InvalidInput,
    /// The handler ran and reported an error.
    ExecutionFailed,
    /// The handler exceeded the host-imposed time limit.
    Timeout,
    /// The handler panicked; the panic was contained.
    Panicked,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::NotFound => "not_found",
            FailureKind::InvalidInput => "invalid_input",
            FailureKind::ExecutionFailed => "execution_failed",
            FailureKind::Timeout => "timeout",
            FailureKind::Panicked => "panicked",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured description of why a tool call did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct ToolFailure {
    /// Human-readable description.
    pub message: String,
    /// Failure category.
    pub kind: FailureKind,
    /// Underlying cause, when the handler supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<String>,
}

impl ToolFailure {
    /// Create a failure of the given kind.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind,
            cause: None,
        }
    }

    /// Failure reported when no handler is registered for `name`.
    pub fn not_found(name: &str) -> Self {
        Self::new(FailureKind::NotFound, format!("Tool \"{name}\" not found"))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidInput, message)
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::new(FailureKind::ExecutionFailed, message)
    }

    /// Failure reported when a handler exceeds its time limit.
    pub fn timeout(name: &str, limit: Duration) -> Self {
        Self::new(
            FailureKind::Timeout,
            format!("Tool \"{name}\" timed out after {}ms", limit.as_millis()),
        )
    }

    pub fn panicked(name: &str, detail: impl Into<String>) -> Self {
        Self::new(FailureKind::Panicked, format!("Tool \"{name}\" panicked"))
            .with_cause(detail)
    }

    /// Attach an underlying cause.
    #[must_use]
    pub fn with_cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }
}

/// Outcome of one attempted tool call.
///
/// `output` is `Value::Null` whenever `success` is false, and `error` is
/// only present on failures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    pub name: String,
    pub success: bool,
    pub output: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolFailure>,
}

impl ToolResult {
    /// Successful completion with the handler's return value.
    pub fn success(name: impl Into<String>, output: Value) -> Self {
        Self {
            name: name.into(),
            success: true,
            output,
            error: None,
        }
    }

    /// Failed call; output is always null.
    pub fn failure(name: impl Into<String>, error: ToolFailure) -> Self {
        Self {
            name: name.into(),
            success: false,
            output: Value::Null,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        self.error.as_ref().map(|e| e.kind)
    }
}

/// A named capability the dispatcher can invoke.
///
/// Handlers receive the extracted argument list and the request metadata.
/// Returning `Err` is the normal way to report a failure; it is captured as
/// data in the corresponding [`ToolResult`].
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use parley_core::tool::{Metadata, ToolFailure, ToolHandler};
/// use serde_json::Value;
///
/// struct JoinTool;
///
/// #[async_trait]
/// impl ToolHandler for JoinTool {
///     async fn execute(&self, args: &[String], _metadata: &Metadata) -> Result<Value, ToolFailure> {
///         Ok(Value::String(args.join("-")))
///     }
/// }
/// ```
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Run the tool.
    async fn execute(&self, args: &[String], metadata: &Metadata) -> Result<Value, ToolFailure>;

    /// Short human-readable description used for listings.
    fn description(&self) -> &str {
        "No description available"
    }
}
