use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use endor::config::Config;

mod commands;

#[derive(Parser)]
#[command(
    name = "endor",
    version,
    about = "Target selection and ion cannon coordination service",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true)]
    log_format: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP attack service
    Serve {
        /// Bind address (overrides ENDOR_BIND_ADDRESS)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Run one attack from a JSON request file
    Attack {
        /// Attack request file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Query every configured ion cannon once
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Reported once logging is up
    let dotenv_error = Config::load_dotenv().err();

    let log_format = cli.log_format.clone();
    let config = Config::load_with(cli.config.as_deref(), |config| {
        if let Some(format) = log_format {
            config.logging.format = format;
        }
    })?;

    setup_tracing(&config, cli.verbose)?;

    if let Some(e) = dotenv_error {
        tracing::warn!(error = %e, "Failed to load .env file");
    }

    tracing::info!(
        environment = %config.environment,
        cannons = config.fleet.cannon_urls.len(),
        "endor starting"
    );

    match cli.command {
        Commands::Serve { bind } => {
            tracing::info!(bind = ?bind, "Starting serve command");
            commands::serve(&config, commands::ServeParams { bind }).await?;
        }

        Commands::Attack { input } => {
            tracing::info!(input = %input.display(), "Starting attack command");
            commands::attack(&config, &input).await?;
        }

        Commands::Status => {
            tracing::info!("Starting status command");
            commands::status(&config).await?;
        }
    }

    Ok(())
}

fn setup_tracing(config: &Config, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { config.log_level() };
    let env_filter =
        tracing_subscriber::EnvFilter::try_new(format!("endor={level},tower_http={level},warn"))?;

    match config.logging.format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}
