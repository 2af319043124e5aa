//! # Parley Core
//!
//! Core types and traits for the Parley conversational agent runtime:
//! messages, tool calls and results, the session store and model backend
//! contracts, and the prompt assembler.

pub mod backend;
pub mod error;
pub mod memory;
pub mod message;
pub mod prompt;
pub mod tool;
pub mod transport;

pub use backend::{ChatRequest, ChatResponse, GenerationParams, ModelBackend, Usage};
pub use error::{BackendError, BackendResult, MemoryError, MemoryResult};
pub use memory::{InvalidSessionId, LoadOptions, SessionId, SessionStore};
pub use message::{Message, Role};
pub use prompt::{DefaultPromptAssembler, PromptAssembler, PromptContext, assemble_prompt};
pub use tool::{
    FailureKind, Metadata, ToolCall, ToolFailure, ToolHandler, ToolResult, is_valid_tool_name,
};
pub use transport::{TransportError, TransportRequest, TransportResponse};
