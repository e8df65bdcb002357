//! Piece history: list, load back into the form, delete.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, Utc};
use clap::Subcommand;
use pp_core::{HistoryQuery, HistorySort, PieceId, SavedPiece};
use serde::Serialize;

use super::util::{format_hms, format_money, note, open_database, open_session, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum HistoryAction {
    /// List saved pieces.
    List {
        /// Only show pieces whose name or type contains this text.
        #[arg(long)]
        search: Option<String>,

        /// Sort order: `date_desc`, `date_asc`, `name_asc` or `name_desc`.
        #[arg(long, default_value_t = HistorySort::DateDesc)]
        sort: HistorySort,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Load a saved piece into the calculator.
    Load { id: PieceId },

    /// Delete a saved piece.
    Delete {
        id: PieceId,

        /// Delete without asking.
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Serialize)]
struct JsonPiece<'a> {
    id: &'a str,
    name: &'a str,
    piece_type: &'a str,
    saved_at: String,
    final_price: f64,
    total_cost: f64,
    productive_seconds: u64,
    rework_seconds: u64,
}

/// Formats pieces as one line each.
pub fn format_history(pieces: &[&SavedPiece], currency: &str) -> String {
    use std::fmt::Write as _;

    if pieces.is_empty() {
        return "No saved pieces.\n".to_string();
    }
    let mut out = String::new();
    for saved in pieces {
        let piece = &saved.piece;
        let _ = writeln!(
            out,
            "{}  {} ({})  {}  time {}  saved {}",
            saved.id,
            piece.name,
            piece.piece_type,
            format_money(currency, piece.breakdown.final_price),
            format_hms(piece.productive_seconds.saturating_add(piece.rework_seconds)),
            piece
                .saved_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
        );
    }
    out
}

fn format_history_json(pieces: &[&SavedPiece]) -> Result<String> {
    let rows: Vec<JsonPiece<'_>> = pieces
        .iter()
        .map(|saved| JsonPiece {
            id: saved.id.as_str(),
            name: &saved.piece.name,
            piece_type: &saved.piece.piece_type,
            saved_at: saved.piece.saved_at.to_rfc3339(),
            final_price: saved.piece.breakdown.final_price,
            total_cost: saved.piece.breakdown.total_cost,
            productive_seconds: saved.piece.productive_seconds,
            rework_seconds: saved.piece.rework_seconds,
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

pub fn run<W: Write>(writer: &mut W, action: &HistoryAction, config: &Config) -> Result<()> {
    run_at(writer, action, config, Utc::now())
}

pub fn run_at<W: Write>(
    writer: &mut W,
    action: &HistoryAction,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        HistoryAction::List { search, sort, json } => {
            let db = open_database(config)?;
            let pieces = db.list_pieces().context("failed to list pieces")?;
            let query = HistoryQuery {
                search: search.clone().unwrap_or_default(),
                sort: *sort,
            };
            let selected = query.apply(&pieces);
            if *json {
                writeln!(writer, "{}", format_history_json(&selected)?)?;
            } else {
                write!(writer, "{}", format_history(&selected, &config.currency))?;
            }
        }
        HistoryAction::Load { id } => {
            let mut session = open_session(config, now)?;
            let Some(saved) = session.db.get_piece(id).context("failed to read piece")? else {
                bail!("no saved piece with id {id}");
            };
            session.calculator.load_piece(&saved.piece, now);
            success(
                writer,
                &format!(
                    "Loaded {} ({}) into the calculator.",
                    saved.piece.name, saved.piece.piece_type
                ),
            );
        }
        HistoryAction::Delete { id, yes } => {
            let mut db = open_database(config)?;
            let Some(saved) = db.get_piece(id).context("failed to read piece")? else {
                bail!("no saved piece with id {id}");
            };
            if !*yes {
                note(
                    writer,
                    &format!(
                        "deleting {} cannot be undone; rerun with --yes to confirm",
                        saved.piece.name
                    ),
                );
                return Ok(());
            }
            db.delete_piece(id).context("failed to delete piece")?;
            success(writer, &format!("Deleted {}.", saved.piece.name));
        }
    }
    Ok(())
}
