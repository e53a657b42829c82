//! # Racestage CLI Module
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `report` - Count participants from a local JSON file
//! - `courses` - List courses from the data provider
//! - `splits` - List the stage splits of a course
//! - `chart` - Count participants of a course, fetched live

mod commands;

use crate::config::RacestageConfig;
use clap::{Parser, Subcommand};
use racestage_core::StageError;
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Racestage - race progress by checkpoint
///
/// Classifies participants as waiting, running, finished or invalid from
/// their checkpoint times and counts them per status and per stage.
#[derive(Parser, Debug)]
#[command(name = "racestage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = "racestage.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to (overrides config)
        #[arg(short = 'H', long)]
        host: Option<String>,

        /// Port to bind to (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Count participants from a JSON file shaped like the provider's results
    Report {
        /// Path to the input file
        #[arg(short, long)]
        file: PathBuf,

        /// Stage names in order (comma-separated); defaults to the first record's `_Time` columns
        #[arg(short, long)]
        stages: Option<String>,

        /// Participant filter `field:value`
        #[arg(long, default_value = "all:all")]
        filter: String,
    },

    /// List courses
    Courses,

    /// List the stage splits of a course
    Splits {
        /// Course number
        #[arg(long)]
        course: u32,
    },

    /// Count participants of a course from the data provider
    Chart {
        /// Course number
        #[arg(long)]
        course: u32,

        /// Participant filter `field:value`
        #[arg(long, default_value = "all:all")]
        filter: String,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), StageError> {
    let config = RacestageConfig::load(&cli.config)?;
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(&config, host, port).await,
        Some(Commands::Report {
            file,
            stages,
            filter,
        }) => cmd_report(&file, stages.as_deref(), &filter, json_mode),
        Some(Commands::Courses) => cmd_courses(&config, json_mode).await,
        Some(Commands::Splits { course }) => cmd_splits(&config, course, json_mode).await,
        Some(Commands::Chart { course, filter }) => {
            cmd_chart(&config, course, &filter, json_mode).await
        }
        None => {
            // No subcommand - list courses by default
            cmd_courses(&config, json_mode).await
        }
    }
}
