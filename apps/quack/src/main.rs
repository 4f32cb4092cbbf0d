//! # Quack - Photo Sharing Server
//!
//! The main binary for the Quack social network.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for every engine operation
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │               apps/quack (THE BINARY)            │
//! │                                                  │
//! │     ┌─────────────┐         ┌─────────────┐      │
//! │     │    CLI      │         │  HTTP API   │      │
//! │     │   (clap)    │         │   (axum)    │      │
//! │     └──────┬──────┘         └──────┬──────┘      │
//! │            └──────────┬────────────┘             │
//! │                       ▼                          │
//! │               ┌───────────────┐                  │
//! │               │  quack-core   │                  │
//! │               │   (Network)   │                  │
//! │               └───────────────┘                  │
//! └──────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! quack server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! quack register alice --password secret
//! quack follow alice bob
//! quack feed alice
//! ```

use clap::Parser;
use quack::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // QUACK_LOG_FORMAT=json enables machine-parseable output. Logs go to
    // stderr so `--json-mode` output on stdout stays parseable.
    let log_format = std::env::var("QUACK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "quack=info,quack_core=info,tower_http=debug".into());

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

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!(kind = e.kind().as_str(), "Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Quack startup banner.
fn print_banner() {
    println!(
        r#"
   __
 <(o )___    Q U A C K
  ( ._> /    photo sharing v{}
   `---'
"#,
        env!("CARGO_PKG_VERSION")
    );
}
