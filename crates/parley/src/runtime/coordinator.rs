//! Request coordinator: one inbound request through the whole pipeline.
//!
//! ```text
//! input ─► extract ─► dispatch ─► assemble(history + results + input) ─► backend
//!                                                                          │
//!                  session store ◄── user, tool messages, reply ◄──────────┘
//! ```

use super::config::RuntimeConfig;
use parley_core::prompt::tool_message;
use parley_core::{
    BackendError, ChatRequest, ChatResponse, DefaultPromptAssembler, InvalidSessionId,
    MemoryError, Message, ModelBackend, PromptAssembler, PromptContext, SessionId, SessionStore,
    ToolCall, ToolResult, TransportError, TransportRequest, TransportResponse,
};
use parley_memory::SlidingWindowMemory;
use parley_tools::{ToolDispatcher, ToolRegistry};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Metadata key a transport uses to route a request to a session.
pub const SESSION_ID_KEY: &str = "session_id";

/// Failures that abort a whole request.
///
/// Tool failures never appear here; they are carried inside each
/// [`ToolResult`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Backend failure: {0}")]
    Backend(#[from] BackendError),

    #[error("Session store failure: {0}")]
    Memory(#[from] MemoryError),

    #[error("Invalid session id: {0}")]
    InvalidSession(#[from] InvalidSessionId),

    /// The dispatcher answered with a different number of results than
    /// there were calls. `ToolDispatcher::dispatch` fills one slot per call,
    /// so this only fires if a dispatch loses a task.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl RuntimeError {
    /// Stable machine-readable code reported to transports.
    pub fn code(&self) -> &'static str {
        match self {
            RuntimeError::Backend(_) => "backend_failure",
            RuntimeError::Memory(_) => "memory_failure",
            RuntimeError::InvalidSession(_) => "invalid_session",
            RuntimeError::InvariantViolation(_) => "invariant_violation",
        }
    }
}

impl From<&RuntimeError> for TransportError {
    fn from(err: &RuntimeError) -> Self {
        TransportError::new(err.to_string(), err.code())
    }
}

/// `{"tool_failures": [...]}` for the failed results of a request, if any.
fn tool_failure_details(results: &[ToolResult]) -> Option<Value> {
    let failed: Vec<&ToolResult> = results.iter().filter(|r| !r.is_success()).collect();
    if failed.is_empty() {
        return None;
    }
    Some(json!({ "tool_failures": failed }))
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Everything one processed request produced.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub request_id: String,
    pub session: SessionId,
    pub calls: Vec<ToolCall>,
    pub tool_results: Vec<ToolResult>,
    /// The exact sequence handed to the backend.
    pub prompt: Vec<Message>,
    pub response: ChatResponse,
}

impl Exchange {
    /// Content of the generated reply.
    pub fn reply(&self) -> &str {
        &self.response.message.content
    }
}

/// Wire the default runtime: sliding-window memory sized from `config`,
/// a dispatcher over `registry`, the default prompt assembler and `backend`.
///
/// This is the single place the runtime is composed; nothing is looked up
/// from a global registry.
pub fn build_runtime(
    config: RuntimeConfig,
    registry: ToolRegistry,
    backend: Arc<dyn ModelBackend>,
) -> Coordinator {
    let store = Arc::new(SlidingWindowMemory::new(config.memory_capacity));
    let dispatcher = ToolDispatcher::with_config(registry, config.dispatcher_config());
    Coordinator::new(config, dispatcher, store, backend)
}

/// Drives requests through extraction, dispatch, assembly, the backend and
/// session persistence.
///
/// A coordinator is immutable after construction and can be shared across
/// tasks behind an `Arc`; concurrent requests for different sessions never
/// contend on anything but the session map itself.
pub struct Coordinator {
    config: RuntimeConfig,
    dispatcher: ToolDispatcher,
    store: Arc<dyn SessionStore>,
    assembler: Arc<dyn PromptAssembler>,
    backend: Arc<dyn ModelBackend>,
}

impl Coordinator {
    pub fn new(
        config: RuntimeConfig,
        dispatcher: ToolDispatcher,
        store: Arc<dyn SessionStore>,
        backend: Arc<dyn ModelBackend>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            store,
            assembler: Arc::new(DefaultPromptAssembler),
            backend,
        }
    }

    /// Replace the prompt assembler.
    #[must_use]
    pub fn with_assembler(mut self, assembler: Arc<dyn PromptAssembler>) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &ToolDispatcher {
        &self.dispatcher
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Session a request belongs to: the `session_id` metadata string when
    /// present, the configured default otherwise.
    pub fn session_for(&self, request: &TransportRequest) -> RuntimeResult<SessionId> {
        match request.metadata.get(SESSION_ID_KEY) {
            Some(Value::String(id)) => Ok(SessionId::new(id)?),
            Some(other) => {
                debug!(
                    request_id = %request.id,
                    value = %other,
                    "Ignoring non-string session id"
                );
                Ok(self.config.default_session.clone())
            }
            None => Ok(self.config.default_session.clone()),
        }
    }

    /// Process one request end to end.
    ///
    /// Tool failures are reported inside the exchange. A backend failure
    /// aborts the request before anything is persisted.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError` for backend failures, session store failures,
    /// malformed session ids, or a result/call count mismatch.
    pub async fn process(&self, request: TransportRequest) -> RuntimeResult<Exchange> {
        let mut dispatched = Vec::new();
        self.run(request, &mut dispatched).await
    }

    /// Pipeline body. Tool results are copied into `dispatched` as soon as
    /// dispatch finishes so a later failure can still report them.
    async fn run(
        &self,
        request: TransportRequest,
        dispatched: &mut Vec<ToolResult>,
    ) -> RuntimeResult<Exchange> {
        let started = Instant::now();
        let session = self.session_for(&request)?;

        self.store.open(&session)?;
        let history = self
            .store
            .load_session(&session, self.config.history_window())?;

        let calls = self.dispatcher.extract(&request.input);
        let tool_results = self.dispatcher.dispatch(&calls, &request.metadata).await;
        dispatched.clone_from(&tool_results);
        if tool_results.len() != calls.len() {
            return Err(RuntimeError::InvariantViolation(format!(
                "dispatcher returned {} results for {} calls",
                tool_results.len(),
                calls.len()
            )));
        }

        let context = PromptContext::new(request.input.clone())
            .with_history(history)
            .with_tool_results(tool_results.clone())
            .with_metadata(request.metadata.clone());
        let prompt = self.assembler.assemble(&context);

        let chat = ChatRequest::new(prompt.clone()).with_params(self.config.generation.clone());
        let response = match self.backend.chat(chat).await {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    request_id = %request.id,
                    session = %session,
                    model = self.backend.model(),
                    error = %err,
                    "Backend call failed"
                );
                return Err(err.into());
            }
        };

        let mut turn = Vec::with_capacity(tool_results.len() + 2);
        turn.push(Message::user(request.input.clone()));
        turn.extend(tool_results.iter().map(tool_message));
        turn.push(response.message.clone());
        self.store.append_session(&session, turn)?;

        info!(
            request_id = %request.id,
            session = %session,
            tool_calls = calls.len(),
            tool_failures = tool_results.iter().filter(|r| !r.is_success()).count(),
            prompt_messages = prompt.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Request processed"
        );

        Ok(Exchange {
            request_id: request.id,
            session,
            calls,
            tool_results,
            prompt,
            response,
        })
    }

    /// Transport-facing wrapper around [`Coordinator::process`].
    ///
    /// Always answers with the request id; failures become
    /// `success: false` with a coded error. When tools already ran, their
    /// failures travel in the error's `details`.
    pub async fn handle(&self, request: TransportRequest) -> TransportResponse {
        let id = request.id.clone();
        let mut dispatched = Vec::new();
        match self.run(request, &mut dispatched).await {
            Ok(exchange) => TransportResponse::ok(id, exchange.response.message.content),
            Err(err) => {
                warn!(request_id = %id, code = err.code(), error = %err, "Request failed");
                let mut error = TransportError::from(&err);
                if let Some(details) = tool_failure_details(&dispatched) {
                    error = error.with_details(details);
                }
                TransportResponse::failed(id, error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::EchoBackend;
    use parley_core::{FailureKind, LoadOptions, Role};
    use parley_testing::{FailingBackend, MockTool, ScriptedBackend};
    use parley_tools::standard_registry;

    fn echo_runtime(config: RuntimeConfig) -> Coordinator {
        build_runtime(config, standard_registry(), Arc::new(EchoBackend::new()))
    }

    fn request(input: &str) -> TransportRequest {
        TransportRequest::new("req-1", input)
    }

    #[tokio::test]
    async fn plain_input_reaches_the_backend_unchanged() {
        let runtime = echo_runtime(RuntimeConfig::default());
        let exchange = runtime.process(request("hello there")).await.unwrap();

        assert!(exchange.calls.is_empty());
        assert_eq!(exchange.prompt, vec![Message::user("hello there")]);
        assert_eq!(exchange.reply(), "Echo: hello there");
        assert_eq!(exchange.session.as_str(), "default");
    }

    #[tokio::test]
    async fn tool_output_lands_between_history_and_input() {
        let runtime = echo_runtime(RuntimeConfig::default());
        let exchange = runtime.process(request("echo(foo, bar)")).await.unwrap();

        assert_eq!(exchange.tool_results.len(), 1);
        assert_eq!(exchange.tool_results[0].output, json!("foo-bar"));
        assert_eq!(
            exchange.prompt,
            vec![
                Message::tool("[echo]\n\"foo-bar\""),
                Message::user("echo(foo, bar)"),
            ]
        );
    }

    #[tokio::test]
    async fn turns_are_persisted_in_order() {
        let runtime = echo_runtime(RuntimeConfig::default());
        runtime.process(request("echo(a)")).await.unwrap();

        let stored = runtime
            .store()
            .load_session(&SessionId::default(), LoadOptions::all())
            .unwrap();
        let roles: Vec<Role> = stored.iter().map(|m| m.role.clone()).collect();
        assert_eq!(roles, vec![Role::User, Role::Tool, Role::Assistant]);
        assert_eq!(stored[2].content, "Echo: echo(a)");

        // The next request sees the previous turn as history.
        let second = runtime.process(request("again")).await.unwrap();
        assert_eq!(&second.prompt[..3], &stored[..]);
    }

    #[tokio::test]
    async fn session_is_taken_from_metadata() {
        let runtime = echo_runtime(RuntimeConfig::default());
        let routed = request("hi").with_metadata(SESSION_ID_KEY, json!("alice"));
        let exchange = runtime.process(routed).await.unwrap();

        assert_eq!(exchange.session.as_str(), "alice");
        let alice = SessionId::new("alice").unwrap();
        assert_eq!(
            runtime
                .store()
                .load_session(&alice, LoadOptions::all())
                .unwrap()
                .len(),
            2
        );
        assert!(
            runtime
                .store()
                .load_session(&SessionId::default(), LoadOptions::all())
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn invalid_session_id_is_rejected() {
        let runtime = echo_runtime(RuntimeConfig::default());
        let response = runtime
            .handle(request("hi").with_metadata(SESSION_ID_KEY, json!("   ")))
            .await;

        assert!(!response.success);
        assert_eq!(response.error.unwrap().code.as_deref(), Some("invalid_session"));
    }

    #[tokio::test]
    async fn tool_failure_does_not_fail_the_request() {
        let runtime = echo_runtime(RuntimeConfig::default());
        let exchange = runtime
            .process(request("missing(x) echo(ok)"))
            .await
            .unwrap();

        assert_eq!(
            exchange.tool_results[0].failure_kind(),
            Some(FailureKind::NotFound)
        );
        assert!(exchange.tool_results[1].is_success());
        assert!(exchange.prompt[0].content.contains("Tool \\\"missing\\\" not found"));
        assert_eq!(exchange.prompt.last(), Some(&Message::user("missing(x) echo(ok)")));
    }

    #[tokio::test]
    async fn backend_failure_propagates_and_persists_nothing() {
        let runtime = build_runtime(
            RuntimeConfig::default(),
            standard_registry(),
            Arc::new(FailingBackend::new(BackendError::Unavailable("down".into()))),
        );

        let err = runtime.process(request("echo(x)")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Backend(BackendError::Unavailable(_))));
        assert!(
            runtime
                .store()
                .load_session(&SessionId::default(), LoadOptions::all())
                .unwrap()
                .is_empty()
        );

        let response = runtime.handle(request("echo(x)")).await;
        assert_eq!(response.id, "req-1");
        assert!(!response.success);
        assert!(response.output.is_empty());
        assert_eq!(response.error.unwrap().code.as_deref(), Some("backend_failure"));
    }

    #[tokio::test]
    async fn backend_failure_reports_tool_failures_in_details() {
        let runtime = build_runtime(
            RuntimeConfig::default(),
            standard_registry(),
            Arc::new(FailingBackend::new(BackendError::Timeout(30))),
        );

        let response = runtime.handle(request("echo(x) missing(y)")).await;
        let error = response.error.unwrap();
        assert_eq!(error.code.as_deref(), Some("backend_failure"));

        let details = error.details.unwrap();
        let failures = details["tool_failures"].as_array().unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0]["name"], json!("missing"));
        assert_eq!(failures[0]["error"]["kind"], json!("not_found"));
    }

    #[tokio::test]
    async fn errors_before_dispatch_carry_no_details() {
        let runtime = build_runtime(
            RuntimeConfig::default(),
            standard_registry(),
            Arc::new(FailingBackend::new(BackendError::Unavailable("down".into()))),
        );

        let clean = runtime.handle(request("echo(x)")).await;
        assert!(clean.error.unwrap().details.is_none());

        let rejected = runtime
            .handle(request("missing()").with_metadata(SESSION_ID_KEY, json!("")))
            .await;
        assert!(rejected.error.unwrap().details.is_none());
    }

    #[test]
    fn invariant_violation_maps_to_its_code() {
        let err = RuntimeError::InvariantViolation("2 results for 3 calls".to_string());
        let wire = TransportError::from(&err);

        assert_eq!(err.code(), "invariant_violation");
        assert_eq!(wire.code.as_deref(), Some("invariant_violation"));
        assert_eq!(wire.message, "Invariant violated: 2 results for 3 calls");
        assert!(wire.details.is_none());
    }

    #[tokio::test]
    async fn generation_params_and_history_window_are_applied() {
        let backend = Arc::new(ScriptedBackend::new(["one", "two", "three"]));
        let config = crate::runtime::RuntimeConfigBuilder::new()
            .history_limit(2)
            .temperature(0.2)
            .build()
            .unwrap();
        let runtime = build_runtime(config, ToolRegistry::new(), backend.clone());

        runtime.process(request("first")).await.unwrap();
        let exchange = runtime.process(request("second")).await.unwrap();

        // History window of 2: the previous user message and reply.
        assert_eq!(
            exchange.prompt,
            vec![
                Message::user("first"),
                Message::assistant("one"),
                Message::user("second"),
            ]
        );
        assert_eq!(exchange.reply(), "two");

        let seen = backend.requests();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[1].params.temperature, Some(0.2));
    }

    #[tokio::test]
    async fn handle_reports_the_reply() {
        let runtime = echo_runtime(RuntimeConfig::default());
        let response = runtime.handle(request("hi")).await;
        assert_eq!(response, TransportResponse::ok("req-1", "Echo: hi"));
    }

    #[tokio::test]
    async fn mock_tools_receive_request_metadata() {
        let tool = MockTool::new().with_default_response(json!("done"));
        let registry = ToolRegistry::new().with_tool("probe", Arc::new(tool.clone()));
        let runtime = build_runtime(
            RuntimeConfig::default(),
            registry,
            Arc::new(EchoBackend::new()),
        );

        runtime
            .process(request("probe(1, 2)").with_metadata("trace", json!("t-9")))
            .await
            .unwrap();

        assert_eq!(tool.call_count(), 1);
        assert!(tool.was_called_with(&["1", "2"]));
        assert_eq!(tool.last_metadata().unwrap()["trace"], json!("t-9"));
    }
}
