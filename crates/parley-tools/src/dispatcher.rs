//! Concurrent tool dispatch with order-preserving reassembly.
//!
//! Every registered call runs in its own tokio task, so a handler that
//! errors, times out or panics only affects its own [`ToolResult`]. Results
//! are written back into a slot per original call index, which makes the
//! returned order independent of completion order.
//!
//! Tasks belong to a [`JoinSet`] owned by the dispatch future. Dropping that
//! future aborts every handler still running.

use crate::extract::{PatternParser, ToolCallParser};
use crate::registry::ToolRegistry;
use parley_core::{Metadata, ToolCall, ToolFailure, ToolHandler, ToolResult};
use std::any::Any;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Host-imposed limits on handler execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatcherConfig {
    /// Per-handler time limit. Exceeding it yields a `timeout` failure.
    pub handler_timeout: Option<Duration>,
    /// Upper bound on handlers running at the same time.
    pub max_concurrency: Option<NonZeroUsize>,
}

impl DispatcherConfig {
    #[must_use]
    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.handler_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }
}

/// Maps tool calls to results without ever failing itself.
///
/// The registry is fixed at construction; the dispatcher holds no other
/// mutable state and can be shared freely behind an `Arc`.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    parser: Arc<dyn ToolCallParser>,
    config: DispatcherConfig,
}

impl ToolDispatcher {
    /// Dispatcher with no time or concurrency limits.
    pub fn new(registry: ToolRegistry) -> Self {
        Self::with_config(registry, DispatcherConfig::default())
    }

    pub fn with_config(registry: ToolRegistry, config: DispatcherConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            parser: Arc::new(PatternParser),
            config,
        }
    }

    /// Replace the call extraction strategy.
    #[must_use]
    pub fn with_parser(mut self, parser: Arc<dyn ToolCallParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Extract calls from raw input with the configured parser.
    pub fn extract(&self, input: &str) -> Vec<ToolCall> {
        self.parser.parse(input)
    }

    /// Extract and dispatch every call found in `input`.
    pub async fn run_tools(&self, input: &str, metadata: &Metadata) -> Vec<ToolResult> {
        let calls = self.extract(input);
        self.dispatch(&calls, metadata).await
    }

    /// Execute `calls` concurrently and return one result per call, in call
    /// order.
    ///
    /// Unknown names produce a `not_found` failure without spawning anything.
    /// An empty call list returns immediately. The concurrency limit applies
    /// to this dispatch only.
    pub async fn dispatch(&self, calls: &[ToolCall], metadata: &Metadata) -> Vec<ToolResult> {
        if calls.is_empty() {
            return Vec::new();
        }

        let metadata = Arc::new(metadata.clone());
        let limiter = self
            .config
            .max_concurrency
            .map(|limit| Arc::new(Semaphore::new(limit.get())));
        let mut slots: Vec<Option<ToolResult>> = vec![None; calls.len()];
        let mut tasks = JoinSet::new();
        let mut indices = HashMap::with_capacity(calls.len());

        for (index, call) in calls.iter().enumerate() {
            let Some(handler) = self.registry.get(&call.name) else {
                debug!(tool = %call.name, call_index = index, "Tool not registered");
                slots[index] = Some(ToolResult::failure(
                    call.name.clone(),
                    ToolFailure::not_found(&call.name),
                ));
                continue;
            };

            let handle = tasks.spawn(invoke(
                handler,
                call.clone(),
                Arc::clone(&metadata),
                self.config.handler_timeout,
                limiter.clone(),
            ));
            indices.insert(handle.id(), index);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let id = match &joined {
                Ok((id, _)) => *id,
                Err(err) => err.id(),
            };
            let Some(&index) = indices.get(&id) else {
                continue;
            };
            let name = &calls[index].name;
            let result = match joined {
                Ok((_, result)) => result,
                Err(err) if err.is_panic() => {
                    let detail = panic_detail(err.into_panic());
                    warn!(tool = %name, call_index = index, panic = %detail, "Tool handler panicked");
                    ToolResult::failure(name.clone(), ToolFailure::panicked(name, detail))
                }
                Err(err) => ToolResult::failure(
                    name.clone(),
                    ToolFailure::execution(format!("Tool \"{name}\" was cancelled"))
                        .with_cause(err.to_string()),
                ),
            };
            slots[index] = Some(result);
        }

        let results: Vec<ToolResult> = slots.into_iter().flatten().collect();
        let failed = results.iter().filter(|r| !r.success).count();
        info!(calls = calls.len(), failed, "Tool dispatch completed");
        results
    }
}

async fn invoke(
    handler: Arc<dyn ToolHandler>,
    call: ToolCall,
    metadata: Arc<Metadata>,
    timeout: Option<Duration>,
    limiter: Option<Arc<Semaphore>>,
) -> ToolResult {
    // Held until the handler finishes.
    let _permit = match limiter {
        Some(semaphore) => semaphore.acquire_owned().await.ok(),
        None => None,
    };

    let started = Instant::now();
    let execution = handler.execute(&call.args, metadata.as_ref());
    let outcome = match timeout {
        Some(limit) => match tokio::time::timeout(limit, execution).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ToolFailure::timeout(&call.name, limit)),
        },
        None => execution.await,
    };
    let duration_ms = started.elapsed().as_millis() as u64;

    match outcome {
        Ok(output) => {
            debug!(tool = %call.name, duration_ms, "Tool succeeded");
            ToolResult::success(call.name, output)
        }
        Err(failure) => {
            warn!(
                tool = %call.name,
                duration_ms,
                kind = %failure.kind,
                error = %failure.message,
                "Tool failed"
            );
            ToolResult::failure(call.name, failure)
        }
    }
}

fn panic_detail(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::function::tool_fn;
    use parley_core::FailureKind;
    use serde_json::{Value, json};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn join_registry() -> ToolRegistry {
        ToolRegistry::new().with_tool(
            "echo",
            tool_fn(|args, _| async move { Ok::<_, ToolFailure>(Value::String(args.join("-"))) }),
        )
    }

    fn sleepy(ms: u64, label: &'static str) -> Arc<dyn ToolHandler> {
        tool_fn(move |_, _| async move {
            tokio::time::sleep(Duration::from_millis(ms)).await;
            Ok::<_, ToolFailure>(Value::from(label))
        })
    }

    #[tokio::test]
    async fn echo_joins_arguments() {
        let dispatcher = ToolDispatcher::new(join_registry());
        let results = dispatcher.run_tools("echo(foo,bar)", &Metadata::new()).await;

        assert_eq!(results, vec![ToolResult::success("echo", json!("foo-bar"))]);
    }

    #[tokio::test]
    async fn missing_tool_is_reported_not_raised() {
        let dispatcher = ToolDispatcher::new(join_registry());
        let results = dispatcher.run_tools("missing()", &Metadata::new()).await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "missing");
        assert!(!results[0].success);
        assert_eq!(results[0].output, Value::Null);
        assert!(results[0].error.as_ref().unwrap().message.contains("not found"));
    }

    #[tokio::test]
    async fn empty_input_never_touches_handlers() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let registry = ToolRegistry::new().with_tool(
            "count",
            tool_fn(move |_, _| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ToolFailure>(Value::Null)
                }
            }),
        );
        let dispatcher = ToolDispatcher::new(registry);

        assert!(dispatcher.run_tools("plain text", &Metadata::new()).await.is_empty());
        assert!(dispatcher.dispatch(&[], &Metadata::new()).await.is_empty());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn results_follow_call_order_not_completion_order() {
        let registry = ToolRegistry::new()
            .with_tool("a", sleepy(60, "a"))
            .with_tool("b", sleepy(5, "b"));
        let dispatcher = ToolDispatcher::new(registry);

        let results = dispatcher.run_tools("a(1) b(2) a(3)", &Metadata::new()).await;
        let names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "a"]);
        assert!(results.iter().all(|r| r.success));
    }

    #[tokio::test]
    async fn failing_handler_does_not_affect_siblings() {
        let registry = join_registry()
            .with_tool(
                "boom",
                tool_fn(|_, _| async {
                    Err::<Value, _>(ToolFailure::execution("exploded").with_cause("disk full"))
                }),
            )
            .with_tool(
                "panics",
                tool_fn(|_, _| async {
                    if true {
                        panic!("handler bug");
                    }
                    Ok::<_, ToolFailure>(Value::Null)
                }),
            );
        let dispatcher = ToolDispatcher::new(registry);

        let results = dispatcher
            .run_tools("echo(x) boom() panics() echo(y)", &Metadata::new())
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].output, json!("x"));
        assert_eq!(results[1].failure_kind(), Some(FailureKind::ExecutionFailed));
        assert_eq!(
            results[1].error.as_ref().unwrap().cause.as_deref(),
            Some("disk full")
        );
        assert_eq!(results[2].failure_kind(), Some(FailureKind::Panicked));
        assert_eq!(
            results[2].error.as_ref().unwrap().cause.as_deref(),
            Some("handler bug")
        );
        assert_eq!(results[3].output, json!("y"));
    }

    #[tokio::test]
    async fn slow_handler_times_out_as_ordinary_failure() {
        let registry = ToolRegistry::new()
            .with_tool("slow", sleepy(500, "late"))
            .with_tool("fast", sleepy(0, "quick"));
        let config = DispatcherConfig::default().with_handler_timeout(Duration::from_millis(20));
        let dispatcher = ToolDispatcher::with_config(registry, config);

        let results = dispatcher.run_tools("slow() fast()", &Metadata::new()).await;

        assert_eq!(results[0].failure_kind(), Some(FailureKind::Timeout));
        assert!(results[1].success);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrency_limit_caps_running_handlers() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (running_c, peak_c) = (Arc::clone(&running), Arc::clone(&peak));
        let registry = ToolRegistry::new().with_tool(
            "work",
            tool_fn(move |_, _| {
                let running = Arc::clone(&running_c);
                let peak = Arc::clone(&peak_c);
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok::<_, ToolFailure>(Value::Null)
                }
            }),
        );
        let config = DispatcherConfig::default()
            .with_max_concurrency(NonZeroUsize::new(2).unwrap());
        let dispatcher = ToolDispatcher::with_config(registry, config);

        let results = dispatcher
            .run_tools("work() work() work() work() work()", &Metadata::new())
            .await;

        assert_eq!(results.len(), 5);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn cancelled_dispatch_aborts_its_handlers() {
        let finished = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&finished);
        let registry = ToolRegistry::new().with_tool(
            "slow",
            tool_fn(move |_, _| {
                let counter = Arc::clone(&counter);
                async move {
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, ToolFailure>(Value::Null)
                }
            }),
        );
        let config = DispatcherConfig::default().with_max_concurrency(NonZeroUsize::MIN);
        let dispatcher = ToolDispatcher::with_config(registry, config);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            dispatcher.run_tools("slow() slow()", &Metadata::new()),
        )
        .await;
        assert!(cancelled.is_err());

        let started = Instant::now();
        let results = dispatcher.run_tools("slow()", &Metadata::new()).await;
        assert!(results[0].success);
        // Orphaned handlers would hold the only permit for another 400ms.
        assert!(started.elapsed() < Duration::from_millis(350));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn metadata_reaches_handlers() {
        let registry = ToolRegistry::new().with_tool(
            "whoami",
            tool_fn(|_, meta| async move {
                Ok::<_, ToolFailure>(meta.get("user").cloned().unwrap_or(Value::Null))
            }),
        );
        let dispatcher = ToolDispatcher::new(registry);
        let mut meta = Metadata::new();
        meta.insert("user".to_string(), json!("ada"));

        let results = dispatcher.run_tools("whoami()", &meta).await;
        assert_eq!(results[0].output, json!("ada"));
    }
}
