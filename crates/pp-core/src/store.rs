//! Persistence contracts implemented by storage backends.

use crate::piece::PieceSnapshot;
use crate::state::SerializedState;
use crate::types::PieceId;

/// Loads and saves the in-progress calculator form.
pub trait StateStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Returns the saved form, or `None` if nothing usable is stored.
    ///
    /// Unreadable payloads are reported as `None`, not as errors.
    fn load_state(&self) -> Result<Option<SerializedState>, Self::Error>;

    fn save_state(&mut self, state: &SerializedState) -> Result<(), Self::Error>;
}

/// Accepts finalized pieces and assigns them an identifier.
pub trait PieceStore {
    type Error: std::error::Error + Send + Sync + 'static;

    fn save_piece(&mut self, piece: &PieceSnapshot) -> Result<PieceId, Self::Error>;
}
