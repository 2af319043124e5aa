//! Outbound prompt assembly.
//!
//! The assembler is a pure function of the request's history, tool results
//! and user input. It never reads the session store or calls the dispatcher;
//! both are resolved by the caller beforehand.

use crate::message::Message;
use crate::tool::{Metadata, ToolResult};

/// Transient aggregate used to build one outbound message sequence.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    pub user_input: String,
    /// Prior messages, oldest first.
    pub history: Vec<Message>,
    /// Tool results in original call order.
    pub tool_results: Vec<ToolResult>,
    pub metadata: Metadata,
}

impl PromptContext {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn with_tool_results(mut self, tool_results: Vec<ToolResult>) -> Self {
        self.tool_results = tool_results;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Replaceable prompt building strategy.
pub trait PromptAssembler: Send + Sync {
    fn assemble(&self, context: &PromptContext) -> Vec<Message>;
}

/// History, then one tool message per result, then the user input.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultPromptAssembler;

impl PromptAssembler for DefaultPromptAssembler {
    fn assemble(&self, context: &PromptContext) -> Vec<Message> {
        assemble_prompt(context)
    }
}

/// Build the outbound message sequence.
///
/// Order is fixed: the supplied history as-is, then each tool result rendered
/// with [`tool_message`], then the user input as the final `user` message.
/// Nothing is reordered, filtered or deduplicated.
///
/// ```rust
/// use parley_core::prompt::{PromptContext, assemble_prompt};
/// use parley_core::{Message, ToolResult};
///
/// let context = PromptContext::new("hi")
///     .with_history(vec![Message::user("h1"), Message::assistant("h2")])
///     .with_tool_results(vec![ToolResult::success("t", "x".into())]);
///
/// let messages = assemble_prompt(&context);
/// assert_eq!(messages.len(), 4);
/// assert_eq!(messages[2].content, "[t]\n\"x\"");
/// assert_eq!(messages[3], Message::user("hi"));
/// ```
pub fn assemble_prompt(context: &PromptContext) -> Vec<Message> {
    let mut messages =
        Vec::with_capacity(context.history.len() + context.tool_results.len() + 1);
    messages.extend(context.history.iter().cloned());
    messages.extend(context.tool_results.iter().map(tool_message));
    messages.push(Message::user(context.user_input.clone()));
    messages
}

/// Render one tool result as a `tool` message: `[<name>]\n<serialized output>`.
///
/// Failed results carry their serialized error payload in place of the
/// (null) output.
pub fn tool_message(result: &ToolResult) -> Message {
    let body = match (&result.error, result.success) {
        (Some(error), false) => {
            serde_json::to_string(error).unwrap_or_else(|_| error.message.clone())
        }
        _ => result.output.to_string(),
    };
    Message::tool(format!("[{}]\n{}", result.name, body))
}
