//! Workspace facade for Parley.
//!
//! Re-exports the [`parley`] meta crate; cross-crate integration and
//! property tests for the workspace live in `tests/`.

pub use parley::*;
