use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use gpak_types::LoadMode;

#[derive(Parser)]
#[command(
    name = "gpak",
    about = "Inspect, validate and dump GPAK object containers",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Loader configuration (TOML)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show the header and chunk table
    Inspect(FileArgs),
    /// Run every structural and checksum check
    Validate(ValidateArgs),
    /// Load every object and print its opcodes
    Dump(DumpArgs),
    /// List external resources the container references
    Deps(FileArgs),
    /// Write a small sample container
    Demo(DemoArgs),
}

#[derive(Args)]
pub struct FileArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ValidateArgs {
    pub file: PathBuf,
    /// Skip checksum verification
    #[arg(long)]
    pub release: bool,
}

#[derive(Args)]
pub struct DumpArgs {
    pub file: PathBuf,
    /// full, no-buffers or dependencies
    #[arg(long)]
    pub mode: Option<LoadMode>,
}

#[derive(Args)]
pub struct DemoArgs {
    pub out: PathBuf,
}
