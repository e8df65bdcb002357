//! Auxiliary material commands.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use clap::Subcommand;
use pp_core::{LineId, NewMaterial};

use super::util::{format_money, open_session, settle, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum MaterialAction {
    /// Add a material bought by the unit.
    Add {
        name: String,

        #[arg(long, default_value_t = 1)]
        quantity: u32,

        #[arg(long)]
        unit_price: f64,
    },

    /// Change how many units of a material are used.
    Quantity { id: LineId, quantity: u32 },

    /// Remove a material.
    Remove { id: LineId },

    /// List materials and their costs.
    List,
}

pub fn run<W: Write>(writer: &mut W, action: &MaterialAction, config: &Config) -> Result<()> {
    let mut session = open_session(config, Utc::now())?;
    let calc = &mut session.calculator;
    let money = |amount| format_money(&config.currency, amount);

    match action {
        MaterialAction::Add {
            name,
            quantity,
            unit_price,
        } => {
            let material = NewMaterial {
                name: name.clone(),
                quantity: *quantity,
                unit_price: *unit_price,
            };
            if let Some(id) = settle(writer, calc.add_material(material))? {
                success(
                    writer,
                    &format!(
                        "Added material [{id}] {}: {quantity} x {}.",
                        name.trim(),
                        money(*unit_price)
                    ),
                );
            }
        }
        MaterialAction::Quantity { id, quantity } => {
            if settle(writer, calc.set_material_quantity(*id, *quantity))?.is_some() {
                success(writer, &format!("Material [{id}] quantity set to {quantity}."));
            }
        }
        MaterialAction::Remove { id } => {
            if let Some(removed) = settle(writer, calc.remove_material(*id))? {
                success(writer, &format!("Removed material [{id}] {}.", removed.name));
            }
        }
        MaterialAction::List => {
            let state = calc.state();
            if state.materials.is_empty() {
                writeln!(writer, "No materials.")?;
            }
            for material in &state.materials {
                writeln!(
                    writer,
                    "[{}] {}: {} x {} = {}",
                    material.id,
                    material.name,
                    material.quantity,
                    money(material.unit_price),
                    money(material.cost())
                )?;
            }
            let breakdown = state.breakdown();
            writeln!(
                writer,
                "Materials total: {} (waste {})",
                money(breakdown.materials_cost),
                money(breakdown.waste_cost)
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

    #[test]
    fn add_list_remove() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp_config(&temp);
        let add = |name: &str, quantity, unit_price| MaterialAction::Add {
            name: name.to_string(),
            quantity,
            unit_price,
        };

        let output = output_of(|out| {
            run(out, &add("Safety eyes", 2, 1.5), &config)?;
            run(out, &add("Stuffing", 1, 4.25), &config)?;
            run(out, &MaterialAction::List, &config)?;
            run(out, &MaterialAction::Remove { id: LineId::new(1) }, &config)?;
            run(out, &MaterialAction::List, &config)
        });
        assert_snapshot!(output, @r"
        Added material [1] Safety eyes: 2 x R$ 1.50.
        Added material [2] Stuffing: 1 x R$ 4.25.
        [1] Safety eyes: 2 x R$ 1.50 = R$ 3.00
        [2] Stuffing: 1 x R$ 4.25 = R$ 4.25
        Materials total: R$ 7.25 (waste R$ 0.00)
        Removed material [1] Safety eyes.
        [2] Stuffing: 1 x R$ 4.25 = R$ 4.25
        Materials total: R$ 4.25 (waste R$ 0.00)
        ");
    }

    #[test]
    fn zero_quantity_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp_config(&temp);
        let mut output = Vec::new();
        let err = run(
            &mut output,
            &MaterialAction::Add {
                name: "Bell".to_string(),
                quantity: 0,
                unit_price: 0.8,
            },
            &config,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "quantity must be greater than zero, got 0");
        assert!(output.is_empty());
    }

    #[test]
    fn quantity_edit_updates_cost() {
        let temp = tempfile::tempdir().unwrap();
        let config = temp_config(&temp);

        let output = output_of(|out| {
            run(
                out,
                &MaterialAction::Add {
                    name: "Safety eyes".to_string(),
                    quantity: 2,
                    unit_price: 1.5,
                },
                &config,
            )?;
            run(
                out,
                &MaterialAction::Quantity {
                    id: LineId::new(1),
                    quantity: 3,
                },
                &config,
            )?;
            run(out, &MaterialAction::List, &config)
        });
        assert_snapshot!(output, @r"
        Added material [1] Safety eyes: 2 x R$ 1.50.
        Material [1] quantity set to 3.
        [1] Safety eyes: 3 x R$ 1.50 = R$ 4.50
        Materials total: R$ 4.50 (waste R$ 0.00)
        ");

        let mut sink = Vec::new();
        let err = run(
            &mut sink,
            &MaterialAction::Quantity {
                id: LineId::new(7),
                quantity: 1,
            },
            &config,
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "no material with id 7");
    }
}
