//! Yarn line commands.

use std::io::Write;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Args, Subcommand};
use pp_core::{LineId, NewYarn, price_per_gram};

use super::util::{format_money, format_per_gram, open_session, settle, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum YarnAction {
    /// Add a yarn to the piece.
    Add(AddYarnArgs),

    /// Record the weight of a yarn before and after use.
    Weigh {
        id: LineId,

        /// Weight in grams before work started.
        #[arg(long)]
        initial: f64,

        /// Weight in grams after work finished.
        #[arg(long = "final")]
        final_weight: f64,
    },

    /// Remove a yarn.
    Remove { id: LineId },

    /// List yarns and their costs.
    List,
}

#[derive(Debug, Args)]
pub struct AddYarnArgs {
    pub name: String,

    /// Price per gram. Alternatively give the skein price and weight.
    #[arg(long, conflicts_with_all = ["skein_price", "skein_weight"])]
    pub price_per_gram: Option<f64>,

    /// Price paid for a whole skein.
    #[arg(long, requires = "skein_weight")]
    pub skein_price: Option<f64>,

    /// Weight of a whole skein in grams.
    #[arg(long, requires = "skein_price")]
    pub skein_weight: Option<f64>,

    #[arg(long, default_value_t = 0.0)]
    pub initial: f64,

    #[arg(long = "final", default_value_t = 0.0)]
    pub final_weight: f64,
}

impl AddYarnArgs {
    fn resolve_price_per_gram(&self) -> Result<f64> {
        match (self.price_per_gram, self.skein_price, self.skein_weight) {
            (Some(price), _, _) => Ok(price),
            (None, Some(skein_price), Some(skein_weight)) => {
                match price_per_gram(skein_price, skein_weight) {
                    Some(price) => Ok(price),
                    None => bail!("skein price and weight must both be greater than zero"),
                }
            }
            _ => bail!("give --price-per-gram, or --skein-price with --skein-weight"),
        }
    }
}

pub fn run<W: Write>(writer: &mut W, action: &YarnAction, config: &Config) -> Result<()> {
    let mut session = open_session(config, Utc::now())?;
    let calc = &mut session.calculator;
    let currency = config.currency.as_str();

    match action {
        YarnAction::Add(args) => {
            let yarn = NewYarn {
                name: args.name.clone(),
                price_per_gram: args.resolve_price_per_gram()?,
                initial_weight: args.initial,
                final_weight: args.final_weight,
            };
            if let Some(id) = settle(writer, calc.add_yarn(yarn))? {
                success(writer, &format!("Added yarn [{id}] {}.", args.name.trim()));
            }
        }
        YarnAction::Weigh {
            id,
            initial,
            final_weight,
        } => {
            if settle(writer, calc.weigh_yarn(*id, *initial, *final_weight))?.is_some() {
                if let Some(yarn) = calc.state().yarns.iter().find(|yarn| yarn.id == *id) {
                    success(
                        writer,
                        &format!(
                            "Yarn [{id}] used {} g, costing {}.",
                            yarn.used_weight(),
                            format_money(currency, yarn.cost())
                        ),
                    );
                }
            }
        }
        YarnAction::Remove { id } => {
            if let Some(removed) = settle(writer, calc.remove_yarn(*id))? {
                success(writer, &format!("Removed yarn [{id}] {}.", removed.name));
            }
        }
        YarnAction::List => {
            let state = calc.state();
            if state.yarns.is_empty() {
                writeln!(writer, "No yarns.")?;
            }
            for yarn in &state.yarns {
                writeln!(
                    writer,
                    "[{}] {}: {} -> {} g, {} g used x {} = {}",
                    yarn.id,
                    yarn.name,
                    yarn.initial_weight,
                    yarn.final_weight,
                    yarn.used_weight(),
                    format_per_gram(currency, yarn.price_per_gram),
                    format_money(currency, yarn.cost())
                )?;
            }
            writeln!(
                writer,
                "Yarn total: {}",
                format_money(currency, state.breakdown().yarn_cost)
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::testing::{output_of, temp_config};
    use insta::assert_snapshot;

    fn add(name: &str, price_per_gram: f64) -> YarnAction {
        YarnAction::Add(AddYarnArgs {
            name: name.to_string(),
            price_per_gram: Some(price_per_gram),
            skein_price: None,
            skein_weight: None,
            initial: 0.0,
            final_weight: 0.0,
        })
    }

    #[test]
    fn add_weigh_list_remove() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp_config(&temp);

        let output = output_of(|out| {
            run(out, &add("Cotton", 0.25), &config)?;
            run(out, &add("Mohair", 0.5), &config)?;
            run(
                out,
                &YarnAction::Weigh {
                    id: LineId::new(1),
                    initial: 100.0,
                    final_weight: 60.0,
                },
                &config,
            )?;
            run(out, &YarnAction::Remove { id: LineId::new(2) }, &config)?;
            run(out, &YarnAction::List, &config)
        });
        assert_snapshot!(output, @r"
        Added yarn [1] Cotton.
        Added yarn [2] Mohair.
        Yarn [1] used 40 g, costing R$ 10.00.
        Removed yarn [2] Mohair.
        [1] Cotton: 100 -> 60 g, 40 g used x R$ 0.2500/g = R$ 10.00
        Yarn total: R$ 10.00
        ");
    }

    #[test]
    fn skein_price_is_converted_per_gram() {
        let args = AddYarnArgs {
            name: "Acrylic".to_string(),
            price_per_gram: None,
            skein_price: Some(20.0),
            skein_weight: Some(500.0),
            initial: 0.0,
            final_weight: 0.0,
        };
        assert!((args.resolve_price_per_gram().unwrap() - 0.04).abs() < 1e-12);
    }

    #[test]
    fn invalid_yarn_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp_config(&temp);
        let mut output = Vec::new();

        let err = run(&mut output, &add(" ", 0.25), &config).unwrap_err();
        assert_eq!(err.to_string(), "yarn name cannot be empty");

        run(&mut output, &add("Cotton", 0.25), &config).unwrap();
        let err = run(
            &mut output,
            &YarnAction::Weigh {
                id: LineId::new(1),
                initial: 10.0,
                final_weight: 20.0,
            },
            &config,
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "final weight (20 g) exceeds initial weight (10 g)"
        );

        let err = run(&mut output, &YarnAction::Remove { id: LineId::new(7) }, &config)
            .unwrap_err();
        assert_eq!(err.to_string(), "no yarn with id 7");
    }
}
