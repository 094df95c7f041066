//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Day timeline for scheduled tasks.
///
/// Shows a day's tasks laid out on the hour grid and replays scripted
/// drag-and-drop sessions against it.
#[derive(Debug, Parser)]
#[command(name = "wr", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the tasks scheduled on one day.
    Day {
        /// Day to show (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Task list to read instead of the configured one.
        #[arg(long)]
        tasks: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Replay a scripted drag session against a day.
    Replay {
        /// JSON script of drag, refresh and navigation steps.
        script: PathBuf,

        /// Day the grid starts on (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,

        /// Task list to read instead of the configured one.
        #[arg(long)]
        tasks: Option<PathBuf>,

        /// Save the resulting task list back to the task file.
        #[arg(long)]
        write: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_day_with_global_flags() {
        let cli =
            Cli::try_parse_from(["wr", "day", "--date", "2025-01-15", "--json", "-v"]).unwrap();
        assert!(cli.verbose);
        match cli.command {
            Some(Commands::Day { date, tasks, json }) => {
                assert_eq!(date.as_deref(), Some("2025-01-15"));
                assert!(tasks.is_none());
                assert!(json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn replay_requires_script() {
        assert!(Cli::try_parse_from(["wr", "replay"]).is_err());
        let cli = Cli::try_parse_from(["wr", "replay", "drag.json", "--write"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Replay { write: true, .. })));
    }
}
