//! Standalone calculators.

use std::io::Write;

use anyhow::{Result, bail};
use clap::Subcommand;
use pp_core::price_per_gram;

use super::util::format_per_gram;
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum HelperAction {
    /// Price per gram of a skein.
    PricePerGram {
        #[arg(long)]
        skein_price: f64,

        /// Skein weight in grams.
        #[arg(long)]
        skein_weight: f64,
    },
}

pub fn run<W: Write>(writer: &mut W, action: &HelperAction, config: &Config) -> Result<()> {
    match action {
        HelperAction::PricePerGram {
            skein_price,
            skein_weight,
        } => {
            let Some(price) = price_per_gram(*skein_price, *skein_weight) else {
                bail!("skein price and weight must both be greater than zero");
            };
            writeln!(writer, "{}", format_per_gram(&config.currency, price))?;
        }
    }
    Ok(())
}
