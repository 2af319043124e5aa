//! # Parley
//!
//! Parley is the orchestration core of a conversational agent runtime. It
//! turns raw input text into tool invocations, runs them concurrently,
//! merges their results with bounded session history and hands a
//! deterministic message sequence to a model backend.
//!
//! ## Core Components
//!
//! - **[extract_tool_calls]**: finds flat `name(arg, ...)` calls in text
//! - **[ToolDispatcher]**: runs calls concurrently, isolates failures and
//!   keeps results in call order
//! - **[SlidingWindowMemory]**: per-session history with oldest-first eviction
//! - **[assemble_prompt]**: history, then tool output, then the user input
//! - **[runtime::Coordinator]**: the whole pipeline for one request
//!
//! ## Quick Start
//!
//! ```rust
//! use parley::runtime::{EchoBackend, RuntimeConfig, build_runtime};
//! use parley::{TransportRequest, standard_registry};
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let runtime = build_runtime(
//!     RuntimeConfig::default(),
//!     standard_registry(),
//!     Arc::new(EchoBackend::new()),
//! );
//!
//! let exchange = runtime
//!     .process(TransportRequest::new("req-1", "text_uppercase(hello)"))
//!     .await
//!     .unwrap();
//!
//! assert_eq!(exchange.tool_results[0].output["result"], "HELLO");
//! assert_eq!(exchange.reply(), "Echo: text_uppercase(hello)");
//! # });
//! ```

// ============================================================================
// Module aliases for namespaced access
// ============================================================================

pub use parley_core as core;
pub use parley_memory as memory;
pub use parley_tools as tools;

#[cfg(feature = "testing")]
pub use parley_testing as testing;

/// Configuration, composition and request coordination.
pub mod runtime;

// ============================================================================
// Core types
// ============================================================================

pub use parley_core::{
    BackendError, ChatRequest, ChatResponse, GenerationParams, InvalidSessionId, LoadOptions,
    MemoryError, Message, Metadata, ModelBackend, Role, SessionId, SessionStore, Usage,
};

// Transport contract
pub use parley_core::{TransportError, TransportRequest, TransportResponse};

// Prompt assembly
pub use parley_core::{DefaultPromptAssembler, PromptAssembler, PromptContext, assemble_prompt};

// ============================================================================
// Tools - Extraction and dispatch
// ============================================================================

pub use parley_tools::{
    DispatcherConfig, FailureKind, FnTool, PatternParser, RegistryError, ToolCall,
    ToolCallParser, ToolDispatcher, ToolFailure, ToolHandler, ToolRegistry, ToolResult,
    extract_tool_calls, standard_registry, tool_fn,
};

// ============================================================================
// Memory backends
// ============================================================================

pub use parley_memory::SlidingWindowMemory;

// ============================================================================
// Runtime
// ============================================================================

pub use runtime::{
    ConfigError, Coordinator, EchoBackend, Exchange, RuntimeConfig, RuntimeConfigBuilder,
    RuntimeError, build_runtime,
};
