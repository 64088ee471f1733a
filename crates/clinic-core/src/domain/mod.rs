//! Domain entities for clinic LAN role election.
//!
//! Pure logic with no sockets and no clock of its own: the caller feeds
//! datagrams and timer expiries into [`election::Election`] and acts on the
//! single [`election::ElectionOutcome`] it hands back.

/// The election state machine.
pub mod election;

/// Application roles and the server location reported to the collaborator.
pub mod role;

/// Network constants and the beacon-period/timeout invariant.
pub mod timing;
