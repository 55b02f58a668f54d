//! FormForge submission service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Browser / HTML form
//!            │  POST /f/{public_id}
//!            ▼
//!     ┌─────────────┐   ┌──────────────────────────────────────────────┐
//!     │ http server │──▶│ intake: form lookup → rate limit → payload   │
//!     └─────────────┘   │         → spam check → store → notify        │
//!            ▲          └──────────────────────────────────────────────┘
//!            │                     │                 │
//!     redirect / HTML / JSON   storage (memory    notify (detached,
//!     + CORS headers           + JSON snapshot)   failures logged)
//!
//!     Cross-cutting: config (TOML + hot reload), observability
//!     (tracing + Prometheus), lifecycle (signals, drain), admin API
//! ```

use clap::Parser;
use std::path::PathBuf;

use formforge::config::{load_config, FormforgeConfig};
use formforge::lifecycle::startup;
use formforge::observability::logging::init_logging;

#[derive(Parser)]
#[command(name = "formforge", version, about = "Form submission intake service")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "FORMFORGE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => FormforgeConfig::default(),
    };

    init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        forms = config.forms.len(),
        submissions_per_minute = config.rate_limit.submissions_per_minute,
        admin_enabled = config.admin.enabled,
        "FormForge starting"
    );

    startup::run(config, args.config).await?;
    Ok(())
}
