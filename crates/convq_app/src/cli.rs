use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "convq")]
#[command(author, version, about = "Queue media files for one-at-a-time ffmpeg conversion")]
pub struct Cli {
    /// Path to config file (defaults to ./convq.ron when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert the given files one after another, then exit
    Run {
        /// Source files, converted in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Target format, overriding the configured default
        #[arg(short, long)]
        format: Option<String>,

        /// Directory for converted files, overriding the configured one
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Read queue commands from stdin (the default)
    Interactive,

    /// Print the default configuration in RON
    DefaultConfig,
}
