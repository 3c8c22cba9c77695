//! # Facsimile - Snapshot Cloner
//!
//! The main binary for the Facsimile deep-copy engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                 apps/facsimile (THE BINARY)              │
//! │                                                          │
//! │  ┌─────────────┐   ┌──────────────┐   ┌──────────────┐   │
//! │  │    CLI      │   │   Document   │   │    Config    │   │
//! │  │   (clap)    │   │ (serde_json) │   │    (toml)    │   │
//! │  └──────┬──────┘   └──────┬───────┘   └──────┬───────┘   │
//! │         └─────────────────┼──────────────────┘           │
//! │                           ▼                              │
//! │                  ┌────────────────┐                      │
//! │                  │ facsimile-core │                      │
//! │                  │  (THE LOGIC)   │                      │
//! │                  └────────────────┘                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Clone a document to a file
//! facsimile clone -i state.json -o copy.json --depth 8
//!
//! # Audit a copy for shared nodes
//! facsimile verify -i state.json --require-independent
//!
//! # Show effective options
//! facsimile config
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing. FACSIMILE_LOG_FORMAT=json enables machine-parseable output.
    // Logs go to stderr so documents on stdout stay clean.
    let log_format = std::env::var("FACSIMILE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "facsimile=debug,facsimile_core=debug"
    } else {
        "facsimile=warn,facsimile_core=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Execute command
    if let Err(e) = cli::execute(cli) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
