//! # Parley Memory
//!
//! Session store implementations for the Parley runtime.
//!
//! - **[SlidingWindowMemory]**: process-lifetime storage with a fixed-size,
//!   oldest-first eviction window per session
//!
//! Durable backends are an extension point: implement
//! [`parley_core::SessionStore`] and hand the store to the runtime.

pub use parley_core::memory::*;

mod sliding;
pub use sliding::{DEFAULT_CAPACITY, SlidingWindowMemory};
