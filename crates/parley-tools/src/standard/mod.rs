//! Standard tool library.

pub mod data;
pub mod text;

pub use data::JsonParseTool;
pub use text::{EchoTool, TextLengthTool, TextReverseTool, TextUppercaseTool};

use crate::registry::ToolRegistry;
use std::sync::Arc;

/// Registry pre-populated with every standard tool.
pub fn standard_registry() -> ToolRegistry {
    ToolRegistry::new()
        .with_tool("echo", Arc::new(EchoTool))
        .with_tool("text_uppercase", Arc::new(TextUppercaseTool))
        .with_tool("text_reverse", Arc::new(TextReverseTool))
        .with_tool("text_length", Arc::new(TextLengthTool))
        .with_tool("json_parse", Arc::new(JsonParseTool))
}
