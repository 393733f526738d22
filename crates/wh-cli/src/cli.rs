use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use wh_core::GraphStyle;

#[derive(Parser)]
#[command(
    name = "warehouse",
    about = "Multi-tenant branch warehouse with per-feed ownership and cascading GC",
    version
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
    /// Start the warehouse server
    Serve(ServeArgs),
    /// Print the effective server configuration
    Config(ConfigArgs),
    /// Run the diagnostics over a saved state file
    Check(StateArgs),
    /// List the feeds of a saved state file
    Feeds(StateArgs),
    /// Show counters for a saved state file
    Stats(StateArgs),
    /// Render the ownership graph of a saved state file as DOT
    Graph(GraphArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// JSON state file, loaded at start and written on shutdown
    #[arg(long)]
    pub state: Option<PathBuf>,
}

#[derive(Args)]
pub struct ConfigArgs {
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[derive(Args)]
pub struct StateArgs {
    pub state: PathBuf,
}

#[derive(Args)]
pub struct GraphArgs {
    pub state: PathBuf,
    #[arg(long, default_value = "complex")]
    pub style: GraphStyle,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}
