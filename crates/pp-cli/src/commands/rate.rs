//! Hourly rate commands.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::Subcommand;
use pp_core::suggested_hourly_rate;

use super::util::{format_money, note, open_session, settle, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum RateAction {
    /// Set the default hourly rate, kept across pieces.
    Base { rate: f64 },

    /// Override the hourly rate for the current piece only.
    Custom { rate: String },

    /// Go back to the base rate for the current piece.
    ClearCustom,

    /// Suggest an hourly rate from a target monthly income.
    Suggest {
        #[arg(long)]
        salary: f64,

        #[arg(long)]
        hours_per_day: f64,

        #[arg(long)]
        days_per_week: f64,

        /// Store the suggestion as the base rate.
        #[arg(long)]
        apply: bool,
    },
}

pub fn run<W: Write>(writer: &mut W, action: &RateAction, config: &Config) -> Result<()> {
    let mut session = open_session(config, Utc::now())?;
    let money = |amount| format_money(&config.currency, amount);

    match action {
        RateAction::Base { rate } => {
            if settle(writer, session.calculator.set_base_rate(*rate))?.is_some() {
                session
                    .db
                    .set_base_hourly_rate(*rate)
                    .context("failed to store base hourly rate")?;
                success(writer, &format!("Base hourly rate set to {}/h.", money(*rate)));
                if session.state().has_custom_rate() {
                    note(
                        writer,
                        &format!(
                            "the current piece uses a custom rate of {}/h",
                            money(session.state().hourly_rate())
                        ),
                    );
                }
            }
        }
        RateAction::Custom { rate } => {
            session.calculator.set_custom_rate(rate);
            if session.state().has_custom_rate() {
                success(
                    writer,
                    &format!(
                        "Custom hourly rate for this piece: {}/h.",
                        money(session.state().hourly_rate())
                    ),
                );
            } else {
                note(
                    writer,
                    &format!(
                        "custom rate is not a positive number; using the base rate of {}/h",
                        money(session.state().hourly_rate())
                    ),
                );
            }
        }
        RateAction::ClearCustom => {
            session.calculator.set_custom_rate("");
            success(
                writer,
                &format!(
                    "Using the base hourly rate of {}/h.",
                    money(session.state().hourly_rate())
                ),
            );
        }
        RateAction::Suggest {
            salary,
            hours_per_day,
            days_per_week,
            apply,
        } => {
            let Some(rate) = suggested_hourly_rate(*salary, *hours_per_day, *days_per_week) else {
                bail!("salary, hours per day and days per week must all be greater than zero");
            };
            writeln!(writer, "Suggested hourly rate: {}/h", money(rate))?;
            if *apply {
                settle(writer, session.calculator.set_base_rate(rate))?;
                session
                    .db
                    .set_base_hourly_rate(rate)
                    .context("failed to store base hourly rate")?;
                success(writer, "Stored as the base hourly rate.");
            }
        }
    }
    Ok(())
}
