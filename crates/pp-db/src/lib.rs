//! Storage layer for the piece pricer.
//!
//! Provides persistence for the in-progress form, the piece history, the
//! recipe book and user settings using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but not `Sync`.
//! A `Database` can be moved between threads but not shared without external
//! synchronization. Callers that need two handles (for example a persistence
//! effect next to a command) open the same file twice.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Timestamps are stored as TEXT in RFC 3339 format with millisecond precision
//! (e.g., `2025-01-15T10:30:00.000Z`), so lexicographic ordering matches
//! chronological ordering.
//!
//! ## Payload Storage
//!
//! Form state, pieces and recipes are stored as JSON in a `data` column. The
//! columns next to it (`name`, `saved_at`, `final_price`...) duplicate the
//! fields needed for listing without decoding every payload.
//! When evolving payloads:
//! - Adding fields: give them a serde default so old rows still load
//! - Removing or renaming fields: old rows may fail to decode and are skipped
//!   by the listing queries

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use pp_core::{
    PieceId, PieceSnapshot, PieceStore, RecipeId, RecipeSnapshot, SavedPiece, SavedRecipe,
    SerializedState, StateStore, ValidationError,
};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use uuid::Uuid;

const BASE_HOURLY_RATE_KEY: &str = "base_hourly_rate";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to encode a payload.
    #[error("failed to encode payload: {0}")]
    Json(#[from] serde_json::Error),
    /// A generated or stored identifier was rejected.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] ValidationError),
    /// A stored row could not be decoded.
    #[error("invalid record {id}: {message}")]
    InvalidRecord { id: String, message: String },
    /// A piece carries an amount that cannot be stored as JSON.
    #[error("cannot save {name}: {field} is not a finite amount")]
    NonFiniteAmount { name: String, field: &'static str },
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("path", &self.conn.path())
            .finish()
    }
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch(
            "
            -- Single-row table holding the in-progress calculator form
            CREATE TABLE IF NOT EXISTS form_state (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                data TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS settings (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            -- Pieces: finalized, priced work
            -- saved_at: RFC 3339 (e.g., '2025-01-15T10:30:00.000Z')
            -- data: JSON PieceSnapshot
            CREATE TABLE IF NOT EXISTS pieces (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                piece_type TEXT NOT NULL,
                saved_at TEXT NOT NULL,
                final_price REAL NOT NULL,
                data TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_pieces_saved_at ON pieces(saved_at);

            CREATE TABLE IF NOT EXISTS recipes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL,
                data TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Removes the saved form so the next session starts empty.
    pub fn clear_state(&mut self) -> Result<(), DbError> {
        self.conn.execute("DELETE FROM form_state", [])?;
        Ok(())
    }

    /// Lists every decodable piece, newest first.
    ///
    /// Rows whose payload no longer decodes are skipped with a warning.
    pub fn list_pieces(&self) -> Result<Vec<SavedPiece>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM pieces ORDER BY saved_at DESC, id ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut pieces = Vec::new();
        for row in rows {
            let (id, data) = row?;
            match decode_piece(&id, &data) {
                Ok(piece) => pieces.push(piece),
                Err(err) => tracing::warn!(error = %err, "skipping unreadable piece"),
            }
        }
        Ok(pieces)
    }

    /// Fetches one piece by id.
    pub fn get_piece(&self, id: &PieceId) -> Result<Option<SavedPiece>, DbError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM pieces WHERE id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|data| decode_piece(id.as_str(), &data)).transpose()
    }

    /// Deletes a piece. Returns `false` if no such piece existed.
    pub fn delete_piece(&mut self, id: &PieceId) -> Result<bool, DbError> {
        let deleted = self
            .conn
            .execute("DELETE FROM pieces WHERE id = ?", params![id.as_str()])?;
        Ok(deleted > 0)
    }

    /// Stores a recipe and returns its new id.
    pub fn save_recipe(&mut self, recipe: &RecipeSnapshot) -> Result<RecipeId, DbError> {
        let id = RecipeId::new(Uuid::new_v4().to_string())?;
        let data = serde_json::to_string(recipe)?;
        self.conn.execute(
            "INSERT INTO recipes (id, name, created_at, data) VALUES (?, ?, ?, ?)",
            params![
                id.as_str(),
                recipe.name,
                format_timestamp(recipe.created_at),
                data
            ],
        )?;
        tracing::debug!(recipe_id = %id, name = %recipe.name, "saved recipe");
        Ok(id)
    }

    /// Lists every decodable recipe, newest first.
    pub fn list_recipes(&self) -> Result<Vec<SavedRecipe>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, data FROM recipes ORDER BY created_at DESC, id ASC")?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        let mut recipes = Vec::new();
        for row in rows {
            let (id, data) = row?;
            match decode_recipe(&id, &data) {
                Ok(recipe) => recipes.push(recipe),
                Err(err) => tracing::warn!(error = %err, "skipping unreadable recipe"),
            }
        }
        Ok(recipes)
    }

    pub fn get_recipe(&self, id: &RecipeId) -> Result<Option<SavedRecipe>, DbError> {
        let data: Option<String> = self
            .conn
            .query_row(
                "SELECT data FROM recipes WHERE id = ?",
                params![id.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        data.map(|data| decode_recipe(id.as_str(), &data)).transpose()
    }

    /// Returns the stored base hourly rate, if one was set and is usable.
    pub fn base_hourly_rate(&self) -> Result<Option<f64>, DbError> {
        let value: Option<String> = self
            .conn
            .query_row(
                "SELECT value FROM settings WHERE key = ?",
                params![BASE_HOURLY_RATE_KEY],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value.and_then(|value| match value.parse::<f64>() {
            Ok(rate) if rate.is_finite() && rate >= 0.0 => Some(rate),
            _ => {
                tracing::warn!(value = %value, "ignoring invalid stored base hourly rate");
                None
            }
        }))
    }

    pub fn set_base_hourly_rate(&mut self, rate: f64) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO settings (key, value) VALUES (?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![BASE_HOURLY_RATE_KEY, rate.to_string()],
        )?;
        Ok(())
    }
}

impl StateStore for Database {
    type Error = DbError;

    fn load_state(&self) -> Result<Option<SerializedState>, DbError> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM form_state WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(data.as_deref().and_then(SerializedState::from_json))
    }

    fn save_state(&mut self, state: &SerializedState) -> Result<(), DbError> {
        let data = state.to_json()?;
        self.conn.execute(
            "INSERT INTO form_state (id, data, updated_at) VALUES (1, ?, ?)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, updated_at = excluded.updated_at",
            params![data, format_timestamp(Utc::now())],
        )?;
        Ok(())
    }
}

impl PieceStore for Database {
    type Error = DbError;

    fn save_piece(&mut self, piece: &PieceSnapshot) -> Result<PieceId, DbError> {
        if let Some(field) = piece.non_finite_field() {
            return Err(DbError::NonFiniteAmount {
                name: piece.name.clone(),
                field,
            });
        }
        let id = PieceId::new(Uuid::new_v4().to_string())?;
        let data = serde_json::to_string(piece)?;
        self.conn.execute(
            "INSERT INTO pieces (id, name, piece_type, saved_at, final_price, data)
             VALUES (?, ?, ?, ?, ?, ?)",
            params![
                id.as_str(),
                piece.name,
                piece.piece_type,
                format_timestamp(piece.saved_at),
                piece.breakdown.final_price,
                data,
            ],
        )?;
        tracing::debug!(piece_id = %id, name = %piece.name, "saved piece");
        Ok(id)
    }
}

fn decode_piece(id: &str, data: &str) -> Result<SavedPiece, DbError> {
    let piece = serde_json::from_str(data).map_err(|err| DbError::InvalidRecord {
        id: id.to_string(),
        message: err.to_string(),
    })?;
    Ok(SavedPiece {
        id: PieceId::new(id)?,
        piece,
    })
}

fn decode_recipe(id: &str, data: &str) -> Result<SavedRecipe, DbError> {
    let recipe = serde_json::from_str(data).map_err(|err| DbError::InvalidRecord {
        id: id.to_string(),
        message: err.to_string(),
    })?;
    Ok(SavedRecipe {
        id: RecipeId::new(id)?,
        recipe,
    })
}

fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}
