mod cli;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use console::style;
use std::process;
use tracing_subscriber::EnvFilter;
use youtuberr::{Settings, app};

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    // Validate CLI arguments first
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }

    init_logging(args.verbose);

    let config = match Settings::load(args.config.as_deref())
        .and_then(|file| file.merge(args.settings()).resolve())
    {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} Configuration error: {}", style("❌").red(), e);
            process::exit(1);
        }
    };

    println!(
        "{} {} -> {} ({}, {})",
        style("⬇️").cyan(),
        style(config.input.display()).cyan().bold(),
        style(config.output_dir.display()).cyan(),
        config.list_mode,
        if config.run_once {
            "run once".to_string()
        } else {
            format!("every {:?}", config.ticker)
        }
    );

    if let Err(e) = app::run(config).await {
        eprintln!("{} {:#}", style("❌").red(), e);
        process::exit(1);
    }

    Ok(())
}
