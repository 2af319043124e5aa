//! # Parley Runtime
//!
//! Composition and request handling for the Parley agent runtime.
//!
//! - **[RuntimeConfig]**: environment-driven settings
//! - **[build_runtime]**: wires store, dispatcher, assembler and backend
//! - **[Coordinator]**: runs one request through the pipeline
//! - **[EchoBackend]**: stub model backend for local runs
//!
//! ## Example
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
//! let response = runtime.handle(TransportRequest::new("1", "text_reverse(abc)")).await;
//! assert!(response.success);
//! assert_eq!(response.output, "Echo: text_reverse(abc)");
//! # });
//! ```

/// Built-in model backends.
pub mod backend;
/// Environment-based configuration.
pub mod config;
/// Request coordinator and composition function.
pub mod coordinator;

pub use backend::EchoBackend;
pub use config::{ConfigError, RuntimeConfig, RuntimeConfigBuilder};
pub use coordinator::{
    Coordinator, Exchange, RuntimeError, RuntimeResult, SESSION_ID_KEY, build_runtime,
};
