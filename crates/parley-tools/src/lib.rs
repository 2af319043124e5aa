//! # Parley Tools
//!
//! Turns raw input text into tool invocations and runs them.
//!
//! - [`extract_tool_calls`]: flat `name(arg, ...)` call extraction
//! - [`ToolRegistry`]: fixed name → handler table built at startup
//! - [`ToolDispatcher`]: concurrent execution with per-call failure isolation
//!   and results returned in call order
//! - [`standard`]: a few ready-made handlers (feature `standard`)

/// Tool call extraction from raw text.
pub mod extract;
/// Closure-backed handlers.
pub mod function;
/// Concurrent dispatcher.
pub mod dispatcher;
/// Name → handler lookup table.
pub mod registry;
/// Standard tool library.
#[cfg(feature = "standard")]
pub mod standard;

pub use dispatcher::{DispatcherConfig, ToolDispatcher};
pub use extract::{PatternParser, ToolCallParser, extract_tool_calls};
pub use function::{FnTool, tool_fn};
pub use parley_core::{FailureKind, Metadata, ToolCall, ToolFailure, ToolHandler, ToolResult};
pub use registry::{RegistryError, ToolRegistry};
#[cfg(feature = "standard")]
pub use standard::standard_registry;
