//! # Waypoint - Guided Deployment Wizard
//!
//! Command-line front end for the Waypoint decision graph.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                    apps/waypoint (THE BINARY)                 │
//! │                                                               │
//! │  ┌─────────────┐    ┌──────────────────┐    ┌─────────────┐  │
//! │  │    CLI      │    │ CacheSynchronizer│◄───│  HTTP/File  │  │
//! │  │   (clap)    │    │     (tokio)      │    │    store    │  │
//! │  └──────┬──────┘    └────────┬─────────┘    └─────────────┘  │
//! │         │                    ▼                                │
//! │         │             ┌─────────────┐                         │
//! │         └────────────►│ redb mirror │                         │
//! │                       └──────┬──────┘                         │
//! │                              ▼                                │
//! │                     ┌────────────────┐                        │
//! │                     │ waypoint-core  │                        │
//! │                     │  (THE LOGIC)   │                        │
//! │                     └────────────────┘                        │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! waypoint demo -o demos/gateway-wizard.json
//! waypoint --store demos/gateway-wizard.json sync
//! waypoint walk -o opt-ai-gateway,opt-managed,opt-premium,feature-selection-submit \
//!     -f token-limits-request
//! waypoint compose -n recipe-prod -f mcp-support,token-limits
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use waypoint::{LogFormat, WaypointConfig};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(2);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "waypoint=info,waypoint_core=info".into());

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        eprintln!("Waypoint v{}", env!("CARGO_PKG_VERSION"));
    }

    if let Err(e) = cli::execute(cli, config).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Defaults, then file, then environment, then flags.
fn load_config(cli: &cli::Cli) -> Result<WaypointConfig, waypoint_core::WizardError> {
    let mut config = WaypointConfig::load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    config.apply_flags(cli.store.clone(), cli.mirror.clone());
    Ok(config)
}
