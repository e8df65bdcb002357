//! CLI subcommand implementations.

pub mod helper;
pub mod history;
pub mod material;
pub mod piece;
pub mod pricing;
pub mod rate;
pub mod recipe;
pub mod status;
pub mod timer;
pub mod util;
pub mod watch;
pub mod yarn;
