use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wr_cli::commands::{day, replay};
use wr_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Logs go to stderr so `--json` output stays parseable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let mut stdout = std::io::stdout().lock();
    match &cli.command {
        Some(Commands::Day { date, tasks, json }) => {
            let config = load_config(cli.config.as_deref())?;
            day::run(&mut stdout, &config, date.as_deref(), tasks.as_deref(), *json)?;
        }
        Some(Commands::Replay {
            script,
            date,
            tasks,
            write,
        }) => {
            let config = load_config(cli.config.as_deref())?;
            replay::run(
                &mut stdout,
                &config,
                script,
                date.as_deref(),
                tasks.as_deref(),
                *write,
            )?;
        }
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
