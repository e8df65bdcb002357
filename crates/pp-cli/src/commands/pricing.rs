//! Waste cost and markup percentages.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use super::util::{format_money, open_session, success};
use crate::Config;

#[derive(Debug, Args)]
pub struct WasteArgs {
    /// Cost of wasted material. Empty or invalid counts as zero.
    pub amount: String,
}

#[derive(Debug, Args)]
pub struct MarkupArgs {
    /// Indirect costs as a percentage of the total (default 15).
    #[arg(long)]
    pub indirect: Option<String>,

    /// Profit margin as a percentage (default 30).
    #[arg(long)]
    pub margin: Option<String>,
}

pub fn run_waste<W: Write>(writer: &mut W, args: &WasteArgs, config: &Config) -> Result<()> {
    let mut session = open_session(config, Utc::now())?;
    session.calculator.set_waste_cost(&args.amount);
    let state = session.state();
    success(
        writer,
        &format!(
            "Waste cost set to {}. Final price {}.",
            format_money(&config.currency, state.waste_cost()),
            format_money(&config.currency, state.breakdown().final_price)
        ),
    );
    Ok(())
}

/// Sets the given percentages and prints the effective values.
pub fn run_markup<W: Write>(writer: &mut W, args: &MarkupArgs, config: &Config) -> Result<()> {
    let mut session = open_session(config, Utc::now())?;
    let calc = &mut session.calculator;
    if let Some(indirect) = &args.indirect {
        calc.set_indirect_percent(indirect);
    }
    if let Some(margin) = &args.margin {
        calc.set_margin_percent(margin);
    }

    let state = calc.state();
    writeln!(writer, "Indirect costs: {}%", state.indirect_percent())?;
    writeln!(writer, "Profit margin: {}%", state.margin_percent())?;
    writeln!(
        writer,
        "Final price: {}",
        format_money(&config.currency, state.breakdown().final_price)
    )?;
    Ok(())
}
