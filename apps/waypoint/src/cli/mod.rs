//! # Waypoint CLI Module
//!
//! This module implements the CLI interface for Waypoint.
//!
//! ## Available Commands
//!
//! - `sync` - Refresh the mirror from the authoritative store
//! - `clear` - Wipe the mirror and its version token
//! - `status` - Show mirror status
//! - `validate` - Check a dataset file without touching the mirror
//! - `walk` - Replay a sequence of choices and show where it lands
//! - `trace` - Reconstruct the path to a node
//! - `check` - Evaluate compatibility rules over components
//! - `compose` - Compose the recipe of a terminal node for a feature set
//! - `demo` - Write the sample gateway dataset to a file

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use waypoint::WaypointConfig;
use waypoint_core::WizardError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Waypoint - Guided Deployment Wizard
///
/// Walks a decision graph of questions to a deployment recipe tailored to
/// the optional features you pick.
#[derive(Parser, Debug)]
#[command(name = "waypoint")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Path to a TOML config file (default: ./waypoint.toml if present)
    #[arg(short = 'C', long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the redb mirror
    #[arg(short = 'M', long, global = true)]
    pub mirror: Option<PathBuf>,

    /// Authoritative store: HTTP(S) base URL or dataset file
    #[arg(short = 'S', long, global = true)]
    pub store: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Refresh the mirror from the authoritative store
    Sync {
        /// Reload even when the version token matches
        #[arg(short, long)]
        force: bool,
    },

    /// Wipe the mirror and its version token
    Clear,

    /// Show mirror status
    Status,

    /// Validate a dataset file
    Validate {
        /// Path to the dataset document (JSON)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Replay choices from the root
    Walk {
        /// Option ids in order (comma-separated); use feature-selection-submit
        /// to leave a feature-selection node
        #[arg(short, long, value_delimiter = ',')]
        options: Vec<String>,

        /// Features to toggle on before submitting (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,
    },

    /// Reconstruct the path from the root to a node
    Trace {
        /// Target node id
        #[arg(short, long)]
        node: String,
    },

    /// Evaluate compatibility rules
    Check {
        /// Component ids (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        components: Vec<String>,

        /// Ask whether this component can join the others
        #[arg(short, long)]
        add: Option<String>,
    },

    /// Compose a terminal node's recipe
    Compose {
        /// Terminal node id
        #[arg(short, long)]
        node: String,

        /// Selected features (comma-separated)
        #[arg(short, long, value_delimiter = ',')]
        features: Vec<String>,
    },

    /// Write the sample gateway dataset
    Demo {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli, config: WaypointConfig) -> Result<(), WizardError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Sync { force }) => cmd_sync(&config, json_mode, force).await,
        Some(Commands::Clear) => cmd_clear(&config).await,
        Some(Commands::Status) => cmd_status(&config, json_mode),
        Some(Commands::Validate { file }) => cmd_validate(&file, json_mode).await,
        Some(Commands::Walk { options, features }) => {
            cmd_walk(&config, json_mode, &options, &features)
        }
        Some(Commands::Trace { node }) => cmd_trace(&config, json_mode, &node),
        Some(Commands::Check { components, add }) => {
            cmd_check(&config, json_mode, &components, add.as_deref())
        }
        Some(Commands::Compose { node, features }) => {
            cmd_compose(&config, json_mode, &node, &features)
        }
        Some(Commands::Demo { output }) => cmd_demo(&output),
        None => {
            // No subcommand - show status by default
            cmd_status(&config, json_mode)
        }
    }
}
