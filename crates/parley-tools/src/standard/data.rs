//! # Data Processing Tools

use async_trait::async_trait;
use parley_core::{Metadata, ToolFailure, ToolHandler};
use serde_json::Value;

/// Parses its input as JSON.
///
/// The extractor splits on commas, so the arguments are re-joined with `,`
/// before parsing. Whitespace around commas is lost, which never changes the
/// meaning of a JSON document outside of string literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonParseTool;

#[async_trait]
impl ToolHandler for JsonParseTool {
    async fn execute(&self, args: &[String], _metadata: &Metadata) -> Result<Value, ToolFailure> {
        if args.is_empty() {
            return Err(ToolFailure::invalid_input("expected a JSON document"));
        }
        let document = args.join(",");
        serde_json::from_str(&document).map_err(|e| {
            ToolFailure::invalid_input(format!("Invalid JSON: {}", document))
                .with_cause(e.to_string())
        })
    }

    fn description(&self) -> &str {
        "Parse a JSON document"
    }
}
