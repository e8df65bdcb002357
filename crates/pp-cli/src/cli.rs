//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::helper::HelperAction;
use crate::commands::history::HistoryAction;
use crate::commands::material::MaterialAction;
use crate::commands::piece::PieceAction;
use crate::commands::pricing::{MarkupArgs, WasteArgs};
use crate::commands::rate::RateAction;
use crate::commands::recipe::RecipeAction;
use crate::commands::timer::TimerAction;
use crate::commands::yarn::YarnAction;

/// Cost and price calculator for handmade pieces.
///
/// Tracks working time with a stopwatch, adds up yarn and material costs,
/// and turns them into a sale price with indirect costs and profit margin.
#[derive(Debug, Parser)]
#[command(name = "pp", version, about, long_about = None)]
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
    /// Show the piece being priced and its cost breakdown.
    Status {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Control the stopwatch.
    #[command(subcommand)]
    Timer(TimerAction),

    /// Manage yarns.
    #[command(subcommand)]
    Yarn(YarnAction),

    /// Manage auxiliary materials.
    #[command(subcommand)]
    Material(MaterialAction),

    /// Set the cost of wasted material.
    Waste(WasteArgs),

    /// Set indirect cost and profit margin percentages.
    Markup(MarkupArgs),

    /// Manage hourly rates.
    #[command(subcommand)]
    Rate(RateAction),

    /// Name and save the piece.
    #[command(subcommand)]
    Piece(PieceAction),

    /// Browse saved pieces.
    #[command(subcommand)]
    History(HistoryAction),

    /// Manage recipes.
    #[command(subcommand)]
    Recipe(RecipeAction),

    /// Standalone calculators.
    #[command(subcommand)]
    Helper(HelperAction),
}
