//! Shared utilities for CLI commands.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use pp_core::{CalcError, Calculator, CostBreakdown, Effect, Notifier, PricingState, Severity, StateStore};
use pp_db::Database;

use crate::Config;

/// Formats seconds as `HH:MM:SS`. Hours are not capped at 99.
pub fn format_hms(seconds: u64) -> String {
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Formats an amount with two decimals after the currency symbol.
pub fn format_money(currency: &str, amount: f64) -> String {
    format!("{currency} {amount:.2}")
}

/// Formats a yarn price per gram with four decimals.
pub fn format_per_gram(currency: &str, price: f64) -> String {
    format!("{currency} {price:.4}/g")
}

/// Writes notifications to the command output.
///
/// Errors are not written here: they abort the command and are printed by
/// the process exit path.
pub struct Notices<'w, W: Write> {
    writer: &'w mut W,
}

impl<'w, W: Write> Notices<'w, W> {
    pub const fn new(writer: &'w mut W) -> Self {
        Self { writer }
    }
}

impl<W: Write> Notifier for Notices<'_, W> {
    fn notify(&mut self, message: &str, severity: Severity) {
        let written = match severity {
            Severity::Success => writeln!(self.writer, "{message}"),
            Severity::Info => writeln!(self.writer, "note: {message}"),
            Severity::Error => Ok(()),
        };
        if let Err(err) = written {
            tracing::debug!(error = %err, "failed to write notice");
        }
    }
}

/// Notifies the outcome of a calculator operation.
///
/// Recoverable failures are printed as notes and yield `Ok(None)`.
pub fn settle<W: Write, T>(writer: &mut W, result: Result<T, CalcError>) -> Result<Option<T>> {
    let mut notices = Notices::new(writer);
    Ok(pp_core::settle(result, &mut notices)?)
}

/// Prints a success message.
pub fn success<W: Write>(writer: &mut W, message: &str) {
    Notices::new(writer).notify(message, Severity::Success);
}

/// Prints an informational note.
pub fn note<W: Write>(writer: &mut W, message: &str) {
    Notices::new(writer).notify(message, Severity::Info);
}

/// Saves the form after every change.
///
/// Owns its own connection. Failed writes are logged and never undo the
/// in-memory change.
pub struct PersistState {
    db: Database,
}

impl PersistState {
    pub const fn new(db: Database) -> Self {
        Self { db }
    }
}

impl Effect for PersistState {
    fn apply(&mut self, state: &PricingState, _breakdown: &CostBreakdown) {
        if let Err(err) = self.db.save_state(&state.to_serialized()) {
            tracing::warn!(error = %err, "failed to persist calculator state");
        }
    }
}

/// A calculator restored from the database, plus a handle for history and
/// settings queries.
pub struct Session {
    pub calculator: Calculator<'static>,
    pub db: Database,
}

impl Session {
    pub const fn state(&self) -> &PricingState {
        self.calculator.state()
    }
}

/// Opens the database, creating its parent directory if needed.
pub fn open_database(config: &Config) -> Result<Database> {
    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }
    Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))
}

/// Restores the saved form and credits time elapsed since a running timer
/// was last persisted.
pub fn open_session(config: &Config, now: DateTime<Utc>) -> Result<Session> {
    let db = open_database(config)?;
    let base_rate = db
        .base_hourly_rate()
        .context("failed to read base hourly rate")?
        .unwrap_or(config.base_hourly_rate);
    let state = match db.load_state().context("failed to load saved form")? {
        Some(saved) => PricingState::restore(saved, base_rate),
        None => PricingState::with_base_rate(base_rate),
    };

    let mut calculator = Calculator::new(state);
    calculator.subscribe(Box::new(PersistState::new(open_database(config)?)));
    let credited = calculator.catch_up(now);
    if credited > 0 {
        tracing::debug!(seconds = credited, "credited time since last run");
    }
    Ok(Session { calculator, db })
}
