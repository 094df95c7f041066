//! CLI subcommand implementations.

pub mod day;
pub mod replay;
pub mod util;
