use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tidemark")]
#[command(about = "Count domain mentions on a v1.1-style search API against a reference table")]
pub struct Cli {
    /// Configuration file (YAML); `tidemark.yaml` is picked up
    /// automatically when it exists
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Full collection pass: write the raw rows and a volume summary
    Report,

    /// Single-page pass that appends a timestamp column to the reference
    /// table in place
    Track,
}
