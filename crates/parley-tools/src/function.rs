//! Closure-backed tool handlers.

use async_trait::async_trait;
use parley_core::{Metadata, ToolFailure, ToolHandler};
use serde_json::Value;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// Adapter turning an async closure into a [`ToolHandler`].
///
/// The closure receives owned copies of the arguments and metadata so the
/// returned future can be `'static`.
pub struct FnTool<F, Fut> {
    func: F,
    description: String,
    _future: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnTool<F, Fut>
where
    F: Fn(Vec<String>, Metadata) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send + 'static,
{
    pub fn new(func: F) -> Self {
        Self {
            func,
            description: String::from("No description available"),
            _future: PhantomData,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnTool<F, Fut>
where
    F: Fn(Vec<String>, Metadata) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send + 'static,
{
    async fn execute(&self, args: &[String], metadata: &Metadata) -> Result<Value, ToolFailure> {
        (self.func)(args.to_vec(), metadata.clone()).await
    }

    fn description(&self) -> &str {
        &self.description
    }
}

/// Wrap an async closure as a shareable handler.
///
/// ```rust
/// use parley_core::{ToolFailure, ToolHandler};
/// use parley_tools::tool_fn;
/// use serde_json::Value;
///
/// let handler = tool_fn(|args, _meta| async move {
///     Ok::<_, ToolFailure>(Value::from(args.len()))
/// });
/// assert_eq!(handler.description(), "No description available");
/// ```
pub fn tool_fn<F, Fut>(func: F) -> Arc<dyn ToolHandler>
where
    F: Fn(Vec<String>, Metadata) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ToolFailure>> + Send + 'static,
{
    Arc::new(FnTool::new(func))
}
