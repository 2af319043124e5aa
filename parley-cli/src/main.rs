use clap::{Args, Parser, Subcommand};
use std::time::Duration;

mod commands;

use commands::{CliError, list_tools, run_chat, run_once};

#[derive(Parser, Debug)]
#[command(name = "parley", version)]
#[command(about = "Parley CLI - run requests through the agent orchestration pipeline")]
struct Cli {
    /// Emit logs as JSON instead of human-readable text
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Process one input and print the exchange as JSON
    Run {
        #[command(flatten)]
        runtime: RuntimeArgs,
        /// Raw input text, e.g. "echo(a, b) what now?"
        input: String,
    },
    /// Read inputs line by line from stdin and print each reply
    Chat {
        #[command(flatten)]
        runtime: RuntimeArgs,
    },
    /// List the registered tools
    Tools,
}

/// Overrides applied on top of the `PARLEY_*` environment.
#[derive(Args, Debug, Clone, Default)]
pub struct RuntimeArgs {
    /// Session to read and extend
    #[arg(long)]
    pub session: Option<String>,
    /// Messages kept per session
    #[arg(long)]
    pub capacity: Option<usize>,
    /// Per-tool time limit, e.g. "2s" or "500ms"
    #[arg(long, value_parser = humantime::parse_duration)]
    pub tool_timeout: Option<Duration>,
}

fn init_logging(json: bool) {
    let env_filter = tracing_subscriber::EnvFilter::from_default_env();
    let env_filter = match "info".parse() {
        Ok(directive) => env_filter.add_directive(directive),
        Err(_) => env_filter,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    let outcome: Result<(), CliError> = match cli.command {
        Commands::Run { runtime, input } => run_once(&runtime, input).await,
        Commands::Chat { runtime } => run_chat(&runtime).await,
        Commands::Tools => {
            list_tools();
            Ok(())
        }
    };

    if let Err(e) = outcome {
        tracing::error!(error = %e, "Command failed");
        std::process::exit(1);
    }
}
