//! Piece pricer CLI library.
//!
//! This crate provides the command-line interface for the piece pricer.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands};
pub use config::Config;
