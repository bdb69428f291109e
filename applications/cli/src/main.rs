//! Crossplay - one queue across Spotify and SoundCloud

use clap::{Parser, Subcommand};
use crossplay_cli::{app, AppConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "crossplay")]
#[command(about = "Play one queue across Spotify and SoundCloud", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the player console
    Run {
        /// Configuration file path
        #[arg(short, long, env = "CROSSPLAY_CONFIG")]
        config: Option<PathBuf>,
    },
    /// Load and validate the configuration, then print it
    CheckConfig {
        /// Configuration file path
        #[arg(short, long, env = "CROSSPLAY_CONFIG")]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "crossplay_cli=info,crossplay_playback=info,crossplay_providers=info,tower_http=warn"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config } => {
            let config = AppConfig::load(config.as_deref())?;
            config.validate()?;
            app::run(&config).await?;
        }
        Commands::CheckConfig { config } => {
            let mut config = AppConfig::load(config.as_deref())?;
            config.validate()?;
            if let Some(token) = config.backend.session_token.as_mut() {
                *token = "<redacted>".to_string();
            }
            println!("{config:#?}");
            println!("session file: {}", config.session_path().display());
        }
    }

    Ok(())
}
