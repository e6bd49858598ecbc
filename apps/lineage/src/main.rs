//! # Lineage - Family Tree Keeper
//!
//! The main binary for the Lineage genealogy model.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/lineage (THE BINARY)          │
//! │                                               │
//! │  ┌─────────────┐   ┌──────────────────────┐   │
//! │  │    CLI      │   │  Tree directory I/O  │   │
//! │  │   (clap)    │   │ (atomic save, files) │   │
//! │  └──────┬──────┘   └──────────┬───────────┘   │
//! │         └───────────┬─────────┘               │
//! │                     ▼                         │
//! │             ┌───────────────┐                 │
//! │             │ lineage-core  │                 │
//! │             │  (THE MODEL)  │                 │
//! │             └───────────────┘                 │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! lineage init family --name "Doe family" --root Ada --last-name Doe
//! lineage info family --json
//! lineage attach family portrait.png --person 0 --main
//! ```

use clap::Parser;
use lineage::cli;
use lineage::config::{Config, LOG_FORMAT_ENV, LogFormat};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

fn main() {
    let cli = cli::Cli::parse();

    // A broken config still gets logged with default settings.
    let (config, config_error) = match Config::load(cli.config.as_deref()) {
        Ok(config) => (config, None),
        Err(e) => (Config::default(), Some(e)),
    };
    init_tracing(&config, cli.verbose);

    if let Some(e) = config_error {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }

    if let Err(e) = cli::execute(cli, &config) {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing: LINEAGE_LOG_FORMAT=json enables machine-parseable output.
fn init_tracing(config: &Config, verbose: bool) {
    let format_env = std::env::var(LOG_FORMAT_ENV).ok();
    let filter_env = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    let directive = config.log_filter(verbose, filter_env.as_deref());
    let filter = EnvFilter::try_new(&directive)
        .unwrap_or_else(|_| EnvFilter::new(lineage::config::DEFAULT_LOG_FILTER));

    match config.log_format(format_env.as_deref()) {
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
}
