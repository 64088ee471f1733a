//! ElectRoleUseCase: turns the election outcome into an application role.
//!
//! The coordinator only says "server found at X" or "become the server".  The
//! rest of the application needs more than that: which mode to run in, and
//! the URL of the backend to open.  This use case waits for the single
//! outcome, notifies the [`RoleObserver`] (the collaborator that starts the
//! backend process or opens the client window), and returns a
//! [`RoleAssignment`].
//!
//! # Architecture
//!
//! This use case depends only on the [`RoleObserver`] trait and on domain
//! types.  The outcome arrives on a `oneshot` channel, so it can be driven in
//! tests without any socket.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use clinic_core::{AppMode, ElectionOutcome, ServerInfo};
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::info;

/// Error type for the elect-role use case.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ElectRoleError {
    /// Discovery was stopped before a role was decided.
    #[error("discovery stopped before a role was decided")]
    Cancelled,
}

/// The collaborator notified of the election result.
///
/// Exactly one of the two methods is called, exactly once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoleObserver: Send + Sync {
    /// Another instance serves at `server_ip`; run as its client.
    async fn on_server_found(&self, server_ip: IpAddr);

    /// This instance is the server; start hosting the backend.  Beacons are
    /// already being handled by the coordinator.
    async fn on_become_server(&self);
}

/// The role this process ended up with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleAssignment {
    pub mode: AppMode,
    /// Where the backend lives: a peer for clients, this machine for the server.
    pub server: ServerInfo,
}

/// The Elect Role use case.
pub struct ElectRoleUseCase {
    observer: Arc<dyn RoleObserver>,
    backend_port: u16,
    local_ip: IpAddr,
}

impl ElectRoleUseCase {
    /// `local_ip` is reported as the server address when this instance wins.
    pub fn new(observer: Arc<dyn RoleObserver>, backend_port: u16, local_ip: IpAddr) -> Self {
        Self {
            observer,
            backend_port,
            local_ip,
        }
    }

    /// Waits for the election outcome and notifies the observer.
    ///
    /// # Errors
    ///
    /// Returns [`ElectRoleError::Cancelled`] if the outcome sender was dropped,
    /// i.e. the coordinator was stopped while still probing.
    pub async fn run(
        &self,
        outcome_rx: oneshot::Receiver<ElectionOutcome>,
    ) -> Result<RoleAssignment, ElectRoleError> {
        let outcome = outcome_rx.await.map_err(|_| ElectRoleError::Cancelled)?;
        let assignment = self.assign(outcome);

        match outcome {
            ElectionOutcome::ServerFound(ip) => self.observer.on_server_found(ip).await,
            ElectionOutcome::BecomeServer => self.observer.on_become_server().await,
        }

        info!(
            "running as {} - backend at {}",
            assignment.mode,
            assignment.server.url()
        );
        Ok(assignment)
    }

    fn assign(&self, outcome: ElectionOutcome) -> RoleAssignment {
        match outcome {
            ElectionOutcome::ServerFound(ip) => RoleAssignment {
                mode: AppMode::Client,
                server: ServerInfo::new(ip, self.backend_port),
            },
            ElectionOutcome::BecomeServer => RoleAssignment {
                mode: AppMode::Server,
                server: ServerInfo::new(self.local_ip, self.backend_port),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
