//! Piece details and saving finished pieces to the history.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use pp_core::PieceStore;

use super::util::{format_money, open_session, settle, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum PieceAction {
    /// Set the name and type of the piece being priced.
    Set {
        #[arg(long)]
        name: Option<String>,

        #[arg(long = "type")]
        piece_type: Option<String>,
    },

    /// Save the priced piece to the history and start a new one.
    Save,
}

pub fn run<W: Write>(writer: &mut W, action: &PieceAction, config: &Config) -> Result<()> {
    run_at(writer, action, config, Utc::now())
}

pub fn run_at<W: Write>(
    writer: &mut W,
    action: &PieceAction,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut session = open_session(config, now)?;

    match action {
        PieceAction::Set { name, piece_type } => {
            session
                .calculator
                .set_piece_details(name.as_deref(), piece_type.as_deref());
            let state = session.state();
            success(
                writer,
                &format!("Piece: {} ({})", state.piece_name, state.piece_type),
            );
        }
        PieceAction::Save => {
            let Some(piece) = settle(writer, session.calculator.finalize_piece(now))? else {
                return Ok(());
            };
            // The form is only cleared once the piece is safely stored.
            let id = session
                .db
                .save_piece(&piece)
                .context("failed to save piece")?;
            session.calculator.clear_form();
            success(
                writer,
                &format!(
                    "Saved {} ({}) at {} as {id}.",
                    piece.name,
                    piece.piece_type,
                    format_money(&config.currency, piece.breakdown.final_price)
                ),
            );
        }
    }
    Ok(())
}
