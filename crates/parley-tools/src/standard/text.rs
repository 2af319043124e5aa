//! # Text Processing Tools
//!
//! Small handlers over the flat argument list. Multiple arguments are joined
//! with a single space before processing, except for [`EchoTool`] which
//! joins with `-`.

use async_trait::async_trait;
use parley_core::{Metadata, ToolFailure, ToolHandler};
use serde_json::{Value, json};

/// Joins its arguments with `-`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn execute(&self, args: &[String], _metadata: &Metadata) -> Result<Value, ToolFailure> {
        Ok(Value::String(args.join("-")))
    }

    fn description(&self) -> &str {
        "Echo the arguments joined with '-'"
    }
}

/// Uppercases the input text.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextUppercaseTool;

#[async_trait]
impl ToolHandler for TextUppercaseTool {
    async fn execute(&self, args: &[String], _metadata: &Metadata) -> Result<Value, ToolFailure> {
        let text = required_text(args)?;
        Ok(json!({
            "original": text,
            "result": text.to_uppercase(),
        }))
    }

    fn description(&self) -> &str {
        "Convert text to uppercase"
    }
}

/// Reverses the input text by character.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextReverseTool;

#[async_trait]
impl ToolHandler for TextReverseTool {
    async fn execute(&self, args: &[String], _metadata: &Metadata) -> Result<Value, ToolFailure> {
        let text = required_text(args)?;
        Ok(json!({
            "original": text,
            "result": text.chars().rev().collect::<String>(),
        }))
    }

    fn description(&self) -> &str {
        "Reverse text"
    }
}

/// Counts characters and words.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextLengthTool;

#[async_trait]
impl ToolHandler for TextLengthTool {
    async fn execute(&self, args: &[String], _metadata: &Metadata) -> Result<Value, ToolFailure> {
        let text = args.join(" ");
        Ok(json!({
            "characters": text.chars().count(),
            "words": text.split_whitespace().count(),
        }))
    }

    fn description(&self) -> &str {
        "Count characters and words"
    }
}

fn required_text(args: &[String]) -> Result<String, ToolFailure> {
    if args.is_empty() {
        return Err(ToolFailure::invalid_input("expected at least one argument"));
    }
    Ok(args.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[tokio::test]
    async fn echo_joins_with_dash() {
        let out = EchoTool.execute(&args(&["foo", "bar"]), &Metadata::new()).await;
        assert_eq!(out, Ok(json!("foo-bar")));
        let empty = EchoTool.execute(&[], &Metadata::new()).await;
        assert_eq!(empty, Ok(json!("")));
    }

    #[tokio::test]
    async fn uppercase_and_reverse() {
        let upper = TextUppercaseTool
            .execute(&args(&["hello", "world"]), &Metadata::new())
            .await
            .unwrap();
        assert_eq!(upper["result"], "HELLO WORLD");

        let reversed = TextReverseTool
            .execute(&args(&["abc"]), &Metadata::new())
            .await
            .unwrap();
        assert_eq!(reversed["result"], "cba");
    }

    #[tokio::test]
    async fn missing_text_is_invalid_input() {
        let err = TextUppercaseTool.execute(&[], &Metadata::new()).await.unwrap_err();
        assert_eq!(err.kind, parley_core::FailureKind::InvalidInput);
    }

    #[tokio::test]
    async fn length_counts_characters_and_words() {
        let out = TextLengthTool
            .execute(&args(&["héllo there", "friend"]), &Metadata::new())
            .await
            .unwrap();
        assert_eq!(out["characters"], 18);
        assert_eq!(out["words"], 3);
    }
}
