//! The role election state machine.
//!
//! ```text
//! Idle ──start()──► Probing ──beacon accepted──► Found(peer)   emits ServerFound(peer)
//!                      │
//!                      └──timeout, no beacon──► Server         emits BecomeServer
//!
//! any phase ──stop()──► stopped
//! ```
//!
//! The role is decided once.  `Found` and `Server` are terminal: neither moves
//! back to `Probing` and neither moves to the other.  After `stop()` every
//! input is ignored, so a timer or datagram that was already in flight when
//! the caller stopped cannot produce an outcome.
//!
//! [`Election`] owns no sockets and no timers.  The coordinator in
//! `clinic-discovery` keeps it behind a mutex and forwards every datagram and
//! the timer expiry into it; whatever comes back is the one and only outcome.

use std::net::IpAddr;

use thiserror::Error;
use tracing::{debug, trace};

use crate::protocol::beacon::decode_beacon;

/// The two terminal results of an election.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionOutcome {
    /// Another instance is already serving at this address.
    ServerFound(IpAddr),
    /// No beacon was heard within the timeout: this instance is the server.
    BecomeServer,
}

/// Where the election currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Created, not started.
    Idle,
    /// Listening for beacons; the election timer is armed.
    Probing,
    /// A beacon was accepted from this peer.
    Found(IpAddr),
    /// The timeout elapsed; this instance serves.
    Server,
}

/// Errors returned by [`Election::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ElectionError {
    #[error("discovery already started")]
    AlreadyStarted,
    #[error("discovery has been stopped")]
    Stopped,
}

/// Role election state for one process lifetime.
#[derive(Debug)]
pub struct Election {
    phase: Phase,
    stopped: bool,
}

impl Election {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            stopped: false,
        }
    }

    /// Moves from `Idle` to `Probing`.
    ///
    /// # Errors
    ///
    /// [`ElectionError::Stopped`] after [`stop`](Self::stop), and
    /// [`ElectionError::AlreadyStarted`] when not `Idle`.
    pub fn start(&mut self) -> Result<(), ElectionError> {
        if self.stopped {
            return Err(ElectionError::Stopped);
        }
        if self.phase != Phase::Idle {
            return Err(ElectionError::AlreadyStarted);
        }
        self.phase = Phase::Probing;
        Ok(())
    }

    /// Feeds one inbound datagram.
    ///
    /// Returns [`ElectionOutcome::ServerFound`] for the first valid beacon seen
    /// while probing, and `None` for everything else: malformed payloads,
    /// foreign `type`s, or any datagram once the role is decided or stopped.
    pub fn on_datagram(&mut self, payload: &[u8], from: IpAddr) -> Option<ElectionOutcome> {
        if self.stopped || self.phase != Phase::Probing {
            trace!(%from, "datagram after decision ignored");
            return None;
        }
        match decode_beacon(payload) {
            Ok(_) => {
                self.phase = Phase::Found(from);
                Some(ElectionOutcome::ServerFound(from))
            }
            Err(e) => {
                debug!(%from, "discarding non-beacon datagram: {e}");
                None
            }
        }
    }

    /// Feeds the election timer expiry.
    ///
    /// Returns [`ElectionOutcome::BecomeServer`] only if still probing.
    pub fn on_timeout(&mut self) -> Option<ElectionOutcome> {
        if self.stopped || self.phase != Phase::Probing {
            return None;
        }
        self.phase = Phase::Server;
        Some(ElectionOutcome::BecomeServer)
    }

    /// Stops the election.  Returns `true` on the first call only.
    pub fn stop(&mut self) -> bool {
        !std::mem::replace(&mut self.stopped, true)
    }

    /// The current phase.  A stopped election keeps the phase it reached.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

impl Default for Election {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
