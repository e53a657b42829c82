//! # Racestage - Race Progress Server
//!
//! The main binary for Racestage.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for reports and provider lookups
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! racestage server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! racestage courses
//! racestage chart --course 2 --filter gender:F
//! racestage report -f results.json
//! ```

use clap::Parser;
use racestage::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // RACESTAGE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("RACESTAGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "racestage=debug,racestage_core=debug,tower_http=debug"
    } else {
        "racestage=info,racestage_core=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Racestage startup banner.
fn print_banner() {
    println!(
        r#"
  Racestage v{}

  waiting / running / finished, stage by stage
"#,
        env!("CARGO_PKG_VERSION")
    );
}
