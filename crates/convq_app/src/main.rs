mod cli;
mod platform;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use cli::{Cli, Commands};
use platform::config::{self, AppConfig};

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Interactive);

    match command {
        Commands::DefaultConfig => {
            println!("{}", config::to_ron(&AppConfig::default())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run {
            files,
            format,
            output_dir,
        } => {
            let mut config = setup(cli.config.as_deref(), cli.verbose)?;
            if let Some(format) = format {
                config.default_format = format;
            }
            if let Some(output_dir) = output_dir {
                config.output_dir = output_dir;
            }
            let summary = platform::app::run_batch(config, files)?;
            println!("{summary}");
            Ok(if summary.failed > 0 {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        Commands::Interactive => {
            let config = setup(cli.config.as_deref(), cli.verbose)?;
            platform::app::run_interactive(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Loads the configuration and installs the logger it asks for.
fn setup(config_path: Option<&Path>, verbose: bool) -> Result<AppConfig> {
    let loaded = config::load(config_path)?;
    platform::logging::initialize(&loaded.config, verbose);
    loaded.log_origin();
    Ok(loaded.config)
}
