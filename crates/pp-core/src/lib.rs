//! Core domain logic for the piece pricer.
//!
//! This crate contains the fundamental types and logic for:
//! - Timer: stopwatch for productive and rework time
//! - Cost aggregation: turning materials and labor into a sale price
//! - Calculator: the session controller that ties the form together
//!
//! Nothing here performs I/O; storage backends implement the traits in
//! [`store`].

mod calculator;
mod cost;
pub mod materials;
pub mod notify;
pub mod numeric;
pub mod piece;
mod state;
pub mod store;
pub mod timer;
pub mod types;

pub use calculator::{CalcError, Calculator, Effect, settle};
pub use cost::{
    CostBreakdown, CostInputs, WEEKS_PER_MONTH, aggregate, price_per_gram, suggested_hourly_rate,
};
pub use materials::{MaterialLine, NewMaterial, NewYarn, YarnLine};
pub use notify::{Notifier, RecordingNotifier, Severity};
pub use piece::{HistoryQuery, HistorySort, PieceSnapshot, RecipeSnapshot, SavedPiece, SavedRecipe};
pub use state::{DEFAULT_BASE_HOURLY_RATE, PricingState, SerializedState};
pub use store::{PieceStore, StateStore};
pub use timer::{TimerEngine, TimerError, TimerPhase, TimerSnapshot};
pub use types::{LineId, PieceId, RecipeId, ValidationError};
