use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "corex")]
#[command(about = "Run and observe agent tasks against the corex runtime core", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Workspace directory holding config, checkpoints and working memory.
    /// Defaults to `$COREX_PATH` or the platform data directory.
    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    /// Output rendering for the event stream.
    #[arg(long, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable, colored when stdout is a terminal.
    Text,
    /// One JSON event per line (the wire protocol's data line, §6.1).
    Ndjson,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a goal to completion, streaming events as they're emitted.
    Run {
        /// The natural-language goal to plan and execute.
        goal: String,

        /// Use a scripted mock model instead of a configured provider.
        #[arg(long)]
        mock: bool,

        /// Automatically approve every confirmation request instead of
        /// prompting on stdin.
        #[arg(long)]
        auto_approve: bool,
    },
    /// Inspect or initialize the orchestrator configuration.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration (defaults merged with the saved file).
    Show,
    /// Write the documented defaults to the workspace config file.
    Init,
}
