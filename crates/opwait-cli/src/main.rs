// Opwait CLI
//
// Design Decision: Use clap derive for ergonomic argument parsing.
// Design Decision: Support text/json/yaml output formats for scripting.
// Design Decision: Logs go to stderr so command output stays on stdout.
// Design Decision: A wait that does not complete exits non-zero.

mod client;
mod commands;
mod output;

use clap::{Parser, Subcommand};
use opwait_core::WaiterConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "opwait")]
#[command(about = "Wait for long-running asynchronous operations to finish")]
#[command(version)]
pub struct Cli {
    /// Output format
    #[arg(long, short, default_value = "text", value_parser = ["text", "json", "yaml"])]
    pub output: String,

    /// Suppress non-essential output
    #[arg(long, short)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Poll one status endpoint until it reaches a terminal state
    Poll {
        /// Status endpoint returning JSON
        #[arg(long, short)]
        url: String,

        #[command(flatten)]
        wait: commands::WaitArgs,
    },

    /// Poll many status endpoints concurrently
    Batch {
        /// Status endpoints returning JSON (repeatable)
        #[arg(long = "url", short, required = true)]
        urls: Vec<String>,

        /// Maximum endpoints polled at once
        #[arg(long, env = "OPWAIT_MAX_CONCURRENCY", default_value = "8")]
        concurrency: usize,

        /// Wait for every endpoint instead of stopping at the first failure
        #[arg(long)]
        collect: bool,

        #[command(flatten)]
        wait: commands::WaitArgs,
    },

    /// List built-in operation presets
    Presets,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let default_filter = if cli.quiet { "opwait=warn" } else { "opwait=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = WaiterConfig::from_env();
    let output_format = output::OutputFormat::parse(&cli.output);

    match cli.command {
        Commands::Poll { url, wait } => {
            commands::poll::run(wait, url, &config, output_format, cli.quiet).await
        }
        Commands::Batch {
            urls,
            concurrency,
            collect,
            wait,
        } => {
            commands::batch::run(
                wait,
                urls,
                concurrency,
                collect,
                &config,
                output_format,
                cli.quiet,
            )
            .await
        }
        Commands::Presets => commands::presets::run(output_format),
    }
}
