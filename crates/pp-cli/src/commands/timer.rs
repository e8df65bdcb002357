//! Stopwatch commands.

use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::Subcommand;

use super::util::{format_hms, note, open_session, settle, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum TimerAction {
    /// Start or resume the stopwatch.
    Start,

    /// Pause the stopwatch.
    Pause,

    /// Zero every counter and leave rework mode.
    Reset {
        /// Discard unsaved session time without asking.
        #[arg(long)]
        yes: bool,
    },

    /// Toggle rework mode (time spent redoing work).
    Rework,

    /// Add manually tracked time to the total.
    Add {
        #[arg(long, default_value_t = 0)]
        hours: u64,

        #[arg(long, default_value_t = 0)]
        minutes: u64,
    },

    /// Set the total productive time.
    Edit {
        #[arg(long, default_value_t = 0)]
        hours: u64,

        #[arg(long, default_value_t = 0)]
        minutes: u64,
    },

    /// Fold the current session into the total.
    SaveSession,

    /// Run a live stopwatch in the terminal.
    ///
    /// `q` or Ctrl-C pauses the timer on the way out. At end of input the
    /// timer is left running if it was running.
    Watch,
}

pub fn run<W: Write>(writer: &mut W, action: &TimerAction, config: &Config) -> Result<()> {
    if matches!(action, TimerAction::Watch) {
        return super::watch::run(config);
    }
    run_at(writer, action, config, Utc::now())
}

pub fn run_at<W: Write>(
    writer: &mut W,
    action: &TimerAction,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    let mut session = open_session(config, now)?;
    let calc = &mut session.calculator;

    match action {
        TimerAction::Start => {
            if calc.start(now) {
                let mode = if calc.state().timer.is_rework_mode() {
                    " (rework)"
                } else {
                    ""
                };
                success(writer, &format!("Timer started{mode}."));
            } else {
                note(writer, "timer is already running");
            }
        }
        TimerAction::Pause => {
            if calc.pause(now) {
                let timer = &calc.state().timer;
                success(
                    writer,
                    &format!(
                        "Timer paused. Session {}, productive total {}.",
                        format_hms(timer.current_session_seconds()),
                        format_hms(timer.total_productive_seconds())
                    ),
                );
            } else {
                note(writer, "timer is not running");
            }
        }
        TimerAction::Reset { yes } => {
            if settle(writer, calc.reset(now, *yes))?.is_some() {
                success(writer, "Timer reset.");
            }
        }
        TimerAction::Rework => {
            let message = if calc.toggle_rework(now) {
                "Rework mode on: time now counts as rework."
            } else {
                "Rework mode off."
            };
            success(writer, message);
        }
        TimerAction::Add { hours, minutes } => {
            if let Some(added) = settle(writer, calc.add_manual_time(*hours, *minutes))? {
                success(
                    writer,
                    &format!(
                        "Added {}. Productive total {}.",
                        format_hms(added),
                        format_hms(calc.state().timer.total_productive_seconds())
                    ),
                );
            }
        }
        TimerAction::Edit { hours, minutes } => {
            calc.edit_total(*hours, *minutes);
            success(
                writer,
                &format!(
                    "Productive total set to {}.",
                    format_hms(calc.state().timer.total_productive_seconds())
                ),
            );
        }
        TimerAction::SaveSession => {
            if let Some(folded) = settle(writer, calc.save_session(now))? {
                success(
                    writer,
                    &format!(
                        "Saved session of {}. Productive total {}.",
                        format_hms(folded),
                        format_hms(calc.state().timer.total_productive_seconds())
                    ),
                );
            }
        }
        TimerAction::Watch => return super::watch::run(config),
    }
    Ok(())
}
