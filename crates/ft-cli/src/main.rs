use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ft_cli::commands::{block, observe, report, status, tag, track};
use ft_cli::{Cli, Commands, Config};

fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

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
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = load_config(cli.config.as_deref())?;
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Track => track::run(&config)?,
        Commands::Observe(args) => observe::run(args, &config)?,
        Commands::Report(args) => report::run(&mut stdout, args, &config)?,
        Commands::Block { app } => block::block(&mut stdout, app, &config)?,
        Commands::Unblock { app } => block::unblock(&mut stdout, app, &config)?,
        Commands::Blocked => block::list(&mut stdout, &config)?,
        Commands::Tag(args) => tag::run(&mut stdout, args, &config)?,
        Commands::Tags => tag::list(&mut stdout, &config)?,
        Commands::Status => status::run(&mut stdout, &config)?,
        Commands::Drop { yes } => ft_cli::commands::drop::run(&mut stdout, *yes, &config)?,
    }

    stdout.flush()?;
    Ok(())
}
