use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "overlay",
    about = "Model overlay core: check configs and replay recorded detections",
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
    /// Parse and validate an overlay configuration file
    CheckConfig(CheckConfigArgs),
    /// Run recorded detection batches through a placement coordinator
    Replay(ReplayArgs),
}

#[derive(Args)]
pub struct CheckConfigArgs {
    pub path: PathBuf,
}

#[derive(Args)]
pub struct ReplayArgs {
    /// Overlay configuration; built-in tables when omitted
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Directory model keys are resolved against
    #[arg(long)]
    pub assets: PathBuf,
    /// JSON file holding an array of frame batches
    #[arg(long)]
    pub detections: PathBuf,
    /// Make every Nth hit test find no surface (0 never misses)
    #[arg(long, default_value = "0")]
    pub miss_every: u64,
}
