//! Name to handler lookup used by the dispatcher.
//!
//! Names are checked against the call grammar at registration time, so every
//! registered tool can actually be reached from input text.

use parley_core::{ToolHandler, is_valid_tool_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Errors raised while building a [`ToolRegistry`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The name can never be produced by the call extractor.
    #[error("Invalid tool name '{0}': expected letters, digits or '_', not starting with a digit")]
    InvalidName(String),
}

/// Fixed lookup table from tool name to handler.
///
/// The registry is assembled once at startup and then handed to a
/// [`crate::ToolDispatcher`], which only ever reads it. Registering the same
/// name twice keeps the later handler.
///
/// # Example
///
/// ```rust
/// use parley_core::ToolFailure;
/// use parley_tools::{ToolRegistry, tool_fn};
/// use serde_json::Value;
///
/// let registry = ToolRegistry::new()
///     .with_tool("echo", tool_fn(|args, _meta| async move {
///         Ok::<_, ToolFailure>(Value::String(args.join("-")))
///     }));
///
/// assert!(registry.contains("echo"));
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler using the builder pattern.
    ///
    /// # Panics
    ///
    /// Panics if `name` does not match the tool identifier grammar. Use
    /// [`ToolRegistry::try_with_tool`] for names that come from configuration.
    pub fn with_tool(self, name: &str, handler: Arc<dyn ToolHandler>) -> Self {
        match self.try_with_tool(name, handler) {
            Ok(registry) => registry,
            Err(err) => panic!("{err}"),
        }
    }

    /// Register a handler, rejecting names the extractor could never match.
    pub fn try_with_tool(
        mut self,
        name: &str,
        handler: Arc<dyn ToolHandler>,
    ) -> Result<Self, RegistryError> {
        if !is_valid_tool_name(name) {
            return Err(RegistryError::InvalidName(name.to_string()));
        }
        if self.tools.insert(name.to_string(), handler).is_some() {
            tracing::debug!(tool = name, "Replacing previously registered tool");
        }
        Ok(self)
    }

    /// Look up a handler by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Registered names in alphabetical order.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, description)` pairs in alphabetical order.
    pub fn descriptions(&self) -> Vec<(String, String)> {
        self.tool_names()
            .into_iter()
            .filter_map(|name| {
                let description = self.tools.get(&name)?.description().to_string();
                Some((name, description))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parley_core::{Metadata, ToolFailure};
    use serde_json::Value;

    struct UppercaseTool;

    #[async_trait]
    impl ToolHandler for UppercaseTool {
        async fn execute(&self, args: &[String], _: &Metadata) -> Result<Value, ToolFailure> {
            Ok(Value::String(args.join(" ").to_uppercase()))
        }

        fn description(&self) -> &str {
            "Uppercase the arguments"
        }
    }

    struct ReverseTool;

    #[async_trait]
    impl ToolHandler for ReverseTool {
        async fn execute(&self, args: &[String], _: &Metadata) -> Result<Value, ToolFailure> {
            Ok(Value::String(args.join(" ").chars().rev().collect()))
        }
    }

    #[test]
    fn registry_finds_registered_tools() {
        let registry = ToolRegistry::new()
            .with_tool("uppercase", Arc::new(UppercaseTool))
            .with_tool("reverse", Arc::new(ReverseTool));

        assert!(registry.get("uppercase").is_some());
        assert!(registry.get("reverse").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.tool_names(), vec!["reverse", "uppercase"]);
    }

    #[test]
    fn registry_rejects_unextractable_names() {
        let result = ToolRegistry::new().try_with_tool("bad-name", Arc::new(ReverseTool));
        assert_eq!(
            result.err(),
            Some(RegistryError::InvalidName("bad-name".to_string()))
        );
    }

    #[test]
    #[should_panic(expected = "Invalid tool name")]
    fn with_tool_panics_on_invalid_name() {
        let _ = ToolRegistry::new().with_tool("1st", Arc::new(ReverseTool));
    }

    #[test]
    fn later_registration_wins() {
        let registry = ToolRegistry::new()
            .with_tool("t", Arc::new(ReverseTool))
            .with_tool("t", Arc::new(UppercaseTool));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.descriptions(),
            vec![("t".to_string(), "Uppercase the arguments".to_string())]
        );
    }

    #[test]
    fn registry_len_and_is_empty() {
        assert!(ToolRegistry::new().is_empty());
        let registry = ToolRegistry::new().with_tool("reverse", Arc::new(ReverseTool));
        assert!(!registry.is_empty());
        assert_eq!(registry.len(), 1);
    }
}
