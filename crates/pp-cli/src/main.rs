use std::io::Write;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pp_cli::commands::{helper, history, material, piece, pricing, rate, recipe, status, timer, yarn};
use pp_cli::{Cli, Commands, Config};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let mut out = std::io::stdout().lock();
    match command {
        Commands::Status { json } => status::run(&mut out, *json, &config)?,
        Commands::Timer(action) => timer::run(&mut out, action, &config)?,
        Commands::Yarn(action) => yarn::run(&mut out, action, &config)?,
        Commands::Material(action) => material::run(&mut out, action, &config)?,
        Commands::Waste(args) => pricing::run_waste(&mut out, args, &config)?,
        Commands::Markup(args) => pricing::run_markup(&mut out, args, &config)?,
        Commands::Rate(action) => rate::run(&mut out, action, &config)?,
        Commands::Piece(action) => piece::run(&mut out, action, &config)?,
        Commands::History(action) => history::run(&mut out, action, &config)?,
        Commands::Recipe(action) => recipe::run(&mut out, action, &config)?,
        Commands::Helper(action) => helper::run(&mut out, action, &config)?,
    }
    out.flush()?;

    Ok(())
}
