//! # Catalog Service
//!
//! The `catalog` binary is intentionally thin: it parses arguments, sets up
//! logging and serves the [`catalogapp`] facade over HTTP. Everything about
//! categories, products and attribute filtering lives in the library crate.
//!
//! ## Layering
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Process (crates/catalog)                                   │
//! │  - clap arguments + confique config layering (setup.rs)     │
//! │  - tracing-subscriber output (logging.rs)                   │
//! │  - axum routes, problem details, cancellation (server.rs)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Facade (crates/catalogapp/src/api.rs)                  │
//! │  - One session per call, DTOs in and out                    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Testing Approach
//!
//! - **Routes**: `tests/http_api.rs` drives [`server::router`] with
//!   `tower::ServiceExt::oneshot` over an in-memory backend.
//! - **Binary**: `tests/cli.rs` runs the built executable with `assert_cmd`.

pub mod logging;
pub mod server;
pub mod setup;

use catalogapp::config::CatalogConfig;
use setup::{Cli, Commands};

/// Execute the command selected on the command line.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.selected() {
        Commands::Config => {
            print!("{}", CatalogConfig::template());
            Ok(())
        }
        Commands::Serve => {
            let config = cli.resolve()?;
            logging::init(&config.log_filter, config.log_json)?;
            server::run(config).await
        }
    }
}
