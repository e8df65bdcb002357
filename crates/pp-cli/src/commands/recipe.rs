//! Recipe book: reusable material lists with notes.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use clap::{Args, Subcommand};
use pp_core::RecipeId;

use super::util::{format_hms, format_money, open_database, open_session, settle, success};
use crate::Config;

#[derive(Debug, Subcommand)]
pub enum RecipeAction {
    /// Save the current materials and time as a recipe.
    Save(SaveRecipeArgs),

    /// List saved recipes.
    List,

    /// Load a recipe into the calculator.
    Load { id: RecipeId },
}

#[derive(Debug, Args)]
pub struct SaveRecipeArgs {
    pub name: String,

    #[arg(long, default_value = "")]
    pub description: String,

    /// Step-by-step instructions.
    #[arg(long, default_value = "")]
    pub steps: String,

    /// Price the piece is usually sold for.
    #[arg(long, default_value = "")]
    pub sale_price: String,
}

pub fn run<W: Write>(writer: &mut W, action: &RecipeAction, config: &Config) -> Result<()> {
    run_at(writer, action, config, Utc::now())
}

pub fn run_at<W: Write>(
    writer: &mut W,
    action: &RecipeAction,
    config: &Config,
    now: DateTime<Utc>,
) -> Result<()> {
    match action {
        RecipeAction::Save(args) => {
            let mut session = open_session(config, now)?;
            let snapshot = session.calculator.recipe_snapshot(
                &args.name,
                &args.description,
                &args.steps,
                &args.sale_price,
                now,
            );
            let Some(recipe) = settle(writer, snapshot)? else {
                return Ok(());
            };
            let id = session
                .db
                .save_recipe(&recipe)
                .context("failed to save recipe")?;
            success(writer, &format!("Saved recipe {} as {id}.", recipe.name));
        }
        RecipeAction::List => {
            let db = open_database(config)?;
            let recipes = db.list_recipes().context("failed to list recipes")?;
            if recipes.is_empty() {
                writeln!(writer, "No saved recipes.")?;
            }
            for saved in &recipes {
                let recipe = &saved.recipe;
                write!(writer, "{}  {}", saved.id, recipe.name)?;
                if !recipe.piece_type.is_empty() {
                    write!(writer, " ({})", recipe.piece_type)?;
                }
                write!(writer, "  time {}", format_hms(recipe.productive_seconds))?;
                if recipe.sale_price > 0.0 {
                    write!(
                        writer,
                        "  sells for {}",
                        format_money(&config.currency, recipe.sale_price)
                    )?;
                }
                writeln!(writer)?;
                if !recipe.description.is_empty() {
                    writeln!(writer, "    {}", recipe.description)?;
                }
            }
        }
        RecipeAction::Load { id } => {
            let mut session = open_session(config, now)?;
            let Some(saved) = session.db.get_recipe(id).context("failed to read recipe")? else {
                bail!("no saved recipe with id {id}");
            };
            session.calculator.load_recipe(&saved.recipe, now);
            success(
                writer,
                &format!("Loaded recipe {} into the calculator.", saved.recipe.name),
            );
            if !saved.recipe.steps.is_empty() {
                writeln!(writer, "Steps:\n{}", saved.recipe.steps)?;
            }
        }
    }
    Ok(())
}
