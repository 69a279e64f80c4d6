//! CLI entry point - the composition root.
//!
//! Loads `.env`, installs logging, reads configuration from the environment
//! and dispatches to a handler. Handler errors carry their own exit code.

use clap::Parser;
use tracing_subscriber::EnvFilter;

use fdl_cli::{Cli, CliError, Commands, handlers};
use fdl_core::DownloaderConfig;

/// Logs go to stderr so the progress bar on stdout stays intact.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = DownloaderConfig::from_env().map_err(CliError::from)?;

    match cli.command {
        Commands::Download(args) => handlers::download::execute(&config, &args).await?,
        Commands::CheckDeps => handlers::check_deps::execute(&config).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        eprintln!("Error: {err}");
        std::process::exit(code);
    }
}
