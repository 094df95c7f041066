//! Workrail CLI library.
//!
//! This crate provides the command-line interface to the day timeline.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
