use crate::RuntimeArgs;
use parley::runtime::SESSION_ID_KEY;
use parley::{
    ConfigError, Coordinator, EchoBackend, RuntimeConfigBuilder, RuntimeError, TransportRequest,
    build_runtime, standard_registry,
};
use serde_json::json;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn build(args: &RuntimeArgs) -> Result<Coordinator, CliError> {
    let mut builder = RuntimeConfigBuilder::from_env()?;
    if let Some(capacity) = args.capacity {
        builder = builder.memory_capacity(capacity);
    }
    if let Some(timeout) = args.tool_timeout {
        builder = builder.tool_timeout(timeout);
    }
    let config = builder.build()?;

    Ok(build_runtime(
        config,
        standard_registry(),
        Arc::new(EchoBackend::new()),
    ))
}

fn request(args: &RuntimeArgs, id: String, input: String) -> TransportRequest {
    let request = TransportRequest::new(id, input);
    match &args.session {
        Some(session) => request.with_metadata(SESSION_ID_KEY, json!(session)),
        None => request,
    }
}

pub async fn run_once(args: &RuntimeArgs, input: String) -> Result<(), CliError> {
    let runtime = build(args)?;
    let exchange = runtime
        .process(request(args, "cli-1".to_string(), input))
        .await?;

    let report = json!({
        "id": exchange.request_id,
        "session": exchange.session.as_str(),
        "reply": exchange.reply(),
        "calls": exchange.calls,
        "tool_results": exchange.tool_results,
        "usage": exchange.response.usage,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

pub async fn run_chat(args: &RuntimeArgs) -> Result<(), CliError> {
    let runtime = build(args)?;
    let stdin = BufReader::new(tokio::io::stdin());
    chat_loop(&runtime, args, stdin, tokio::io::stdout()).await
}

/// Answer one line at a time until `/quit` or end of input.
async fn chat_loop<R, W>(
    runtime: &Coordinator,
    args: &RuntimeArgs,
    reader: R,
    mut writer: W,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = reader.lines();
    let mut turn = 0usize;

    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "/quit" {
            break;
        }

        turn += 1;
        let response = runtime
            .handle(request(args, format!("chat-{turn}"), input.to_string()))
            .await;
        let text = if response.success {
            response.output
        } else {
            let message = response.error.map(|e| e.message).unwrap_or_default();
            format!("error: {message}")
        };
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }
    Ok(())
}

pub fn list_tools() {
    let registry = standard_registry();
    for (name, description) in registry.descriptions() {
        println!("{name:<16} {description}");
    }
}
