//! # Parley Testing
//!
//! Test doubles for the Parley runtime.
//!
//! - **Mock Tools**: handlers with canned answers, delays, failures, panics
//!   and call tracking
//! - **Backends**: a scripted backend that records requests and a backend
//!   that always fails
//!
//! ## Usage
//!
//! ```rust
//! use parley_core::Metadata;
//! use parley_testing::MockTool;
//! use parley_tools::{ToolDispatcher, ToolRegistry};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let tool = MockTool::new().with_response(&["x"], json!("hit"));
//! let dispatcher =
//!     ToolDispatcher::new(ToolRegistry::new().with_tool("probe", Arc::new(tool.clone())));
//!
//! let results = dispatcher.run_tools("probe(x)", &Metadata::new()).await;
//! assert_eq!(results[0].output, json!("hit"));
//! assert_eq!(tool.call_count(), 1);
//! # });
//! ```

/// Scripted and failing model backends
pub mod backends;
/// Mock tools for predictable testing
pub mod mock_tools;

pub use backends::{FailingBackend, ScriptedBackend};
pub use mock_tools::MockTool;
