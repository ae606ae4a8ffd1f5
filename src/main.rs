//! Label-routed streaming reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request           ┌──────────┐    ┌────────────┐    ┌──────────┐
//!     ────────────────────────▶│   http   │───▶│  routing   │───▶│ registry │
//!                              │  server  │    │ dispatcher │    │  lookup  │
//!                              └──────────┘    └─────┬──────┘    └──────────┘
//!                                                    │ 303 / 404 / forward
//!                                                    ▼
//!     Client Response          ┌──────────┐    ┌────────────┐
//!     ◀────────────────────────│  relay   │◀──▶│  backend   │◀──────────▶ Backend
//!                              │  bodies  │    │    pool    │             Server
//!                              └──────────┘    └────────────┘
//!
//!     Plain HTTP ─────────────▶ SSL redirector ──▶ 303 https://<host>:<port>/...
//! ```

use std::path::PathBuf;

use clap::Parser;

use label_proxy::lifecycle::{signals, startup};
use label_proxy::net::KeystoreConfig;
use label_proxy::observability::logging;
use label_proxy::Shutdown;

#[derive(Parser)]
#[command(name = "label-proxy")]
#[command(about = "Asynchronous label-routed reverse proxy", long_about = None)]
struct Cli {
    /// Properties file with routes and listener settings
    #[arg(short, long, default_value = "config.properties")]
    config: PathBuf,

    /// PEM keystore (certificate chain + private key) enabling HTTPS
    #[arg(long, env = "jkspath")]
    keystore: Option<PathBuf>,

    /// Keystore passphrase; HTTPS is enabled only when both are set
    #[arg(long, env = "jkspass", hide_env_values = true)]
    keystore_pass: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "label-proxy starting");

    let settings = startup::load_settings(&cli.config)?;
    let keystore = KeystoreConfig::from_parts(cli.keystore, cli.keystore_pass);

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::shutdown_signal().await;
        trigger.trigger();
    });

    startup::run(settings, keystore, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
