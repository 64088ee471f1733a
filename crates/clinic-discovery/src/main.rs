//! Clinic role election entry point.
//!
//! Runs one LAN election and reports the result: either another instance
//! already serves (this one becomes its client), or nobody answered within the
//! discovery timeout and this instance becomes the server and starts
//! broadcasting beacons.  Beacons continue until Ctrl-C.
//!
//! Starting and supervising the backend process is the job of whatever
//! embeds this crate; the binary only logs what it would hand over.
//!
//! # Usage
//!
//! ```text
//! clinic-discovery [OPTIONS]
//!
//! Options:
//!   --config       <PATH>   TOML config file [default: platform config dir]
//!   --port         <PORT>   Discovery UDP port (overrides config)
//!   --backend-port <PORT>   Backend HTTP port (overrides config)
//!   --log-level    <LEVEL>  Log level when RUST_LOG is unset (overrides config)
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable                 | Description                 |
//! |--------------------------|-----------------------------|
//! | `CLINIC_CONFIG`          | Config file path            |
//! | `CLINIC_DISCOVERY_PORT`  | Discovery UDP port          |
//! | `CLINIC_BACKEND_PORT`    | Backend HTTP port           |
//! | `RUST_LOG`               | Full `tracing` filter       |

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use clap::Parser;
use clinic_core::AppMode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use clinic_discovery::application::elect_role::{ElectRoleError, ElectRoleUseCase, RoleObserver};
use clinic_discovery::infrastructure::network::{detect_local_ip, DiscoveryCoordinator};
use clinic_discovery::infrastructure::storage::config::{self, AppConfig};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Zero-configuration server/client election for clinic instances on a LAN.
#[derive(Debug, Parser)]
#[command(name = "clinic-discovery", version)]
struct Cli {
    /// TOML config file.  Defaults to the platform config directory.
    #[arg(long, env = "CLINIC_CONFIG")]
    config: Option<PathBuf>,

    /// UDP port used for beacons.  Must match every other instance.
    #[arg(long, env = "CLINIC_DISCOVERY_PORT")]
    port: Option<u16>,

    /// TCP port of the backend service.
    #[arg(long, env = "CLINIC_BACKEND_PORT")]
    backend_port: Option<u16>,

    /// Log level used when `RUST_LOG` is unset.
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn into_app_config(self) -> anyhow::Result<AppConfig> {
        let mut cfg = match &self.config {
            Some(path) => config::load_config_from(path)
                .with_context(|| format!("cannot load config from {}", path.display()))?,
            None => config::load_config().context("cannot load config")?,
        };
        if let Some(port) = self.port {
            cfg.discovery.port = port;
        }
        if let Some(port) = self.backend_port {
            cfg.server.backend_port = port;
        }
        if let Some(level) = self.log_level {
            cfg.logging.log_level = level;
        }
        Ok(cfg)
    }
}

// ── Collaborator ──────────────────────────────────────────────────────────────

/// Logs the hand-over that a desktop shell would act on.
struct LoggingObserver;

#[async_trait]
impl RoleObserver for LoggingObserver {
    async fn on_server_found(&self, server_ip: IpAddr) {
        info!("connecting to clinic server at {server_ip}");
    }

    async fn on_become_server(&self) {
        info!("this machine is now the clinic server");
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_app_config()?;

    // `RUST_LOG` wins; otherwise the configured level applies.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.log_level)),
        )
        .init();

    let settings = cfg.discovery.to_settings()?;
    info!("clinic discovery starting - mode {}", AppMode::Discovering);

    let coordinator = DiscoveryCoordinator::new(settings);
    let outcome_rx = coordinator
        .start()
        .await
        .context("network discovery could not start")?;

    let use_case = ElectRoleUseCase::new(
        Arc::new(LoggingObserver),
        cfg.server.backend_port,
        detect_local_ip(),
    );

    tokio::select! {
        result = use_case.run(outcome_rx) => match result {
            Ok(assignment) => info!("backend url: {}", assignment.server.url()),
            Err(ElectRoleError::Cancelled) => warn!("discovery cancelled before a role was decided"),
        },
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received during discovery");
            coordinator.stop();
            return Ok(());
        }
    }

    info!("ready.  Press Ctrl-C to exit.");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("shutdown signal received");
    coordinator.stop();
    Ok(())
}
