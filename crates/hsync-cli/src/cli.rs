use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hsync",
    about = "hsync — document sync gateway and handle directory",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML config file, applied before environment variables
    #[arg(long, global = true, env = "HSYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Data directory (overrides DATA_DIR)
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the gateway until ctrl-c
    Serve(ServeArgs),
    /// Show the handle assigned to an iid
    Lookup(LookupArgs),
    /// Assign a document handle to an iid
    Assign(AssignArgs),
    /// Print this node's sync peer id
    PeerId,
}

#[derive(Args)]
pub struct ServeArgs {
    /// Listen port (overrides PORT)
    #[arg(short, long)]
    pub port: Option<u16>,
    /// Allowed browser origin; repeat to allow several (replaces the list)
    #[arg(long = "allow-origin")]
    pub allow_origins: Vec<String>,
}

#[derive(Args)]
pub struct LookupArgs {
    pub iid: String,
}

#[derive(Args)]
pub struct AssignArgs {
    pub iid: String,
    pub handle: String,
}
