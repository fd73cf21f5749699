use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "kvapi",
    about = "Replay object-store operations against an in-memory store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a JSON operation script and report results and watch events
    Run(RunArgs),
    /// Print the effective store configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to a JSON array of operations
    pub script: PathBuf,
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

#[derive(Args, Clone, Debug)]
pub struct StoreArgs {
    /// TOML file with store settings
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Resource kind served by the store
    #[arg(long, default_value = "objects")]
    pub kind: String,
    /// Serve a cluster-scoped kind (namespaces are ignored)
    #[arg(long)]
    pub cluster_scoped: bool,
    /// Let updates of missing objects create them
    #[arg(long)]
    pub allow_create_on_update: bool,
    /// Per-watcher event buffer size
    #[arg(long)]
    pub watch_capacity: Option<usize>,
}
