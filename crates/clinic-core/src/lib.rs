//! # clinic-core
//!
//! Shared library for clinic LAN role election.  It contains the beacon wire
//! codec, the discovery timing rules, and the pure election state machine.
//!
//! This crate has zero dependencies on sockets, timers, or an async runtime.
//! The `clinic-discovery` crate drives it with real UDP endpoints.
//!
//! # How role election works (for beginners)
//!
//! Several identical clinic instances start on the same LAN.  None of them
//! knows about the others, yet exactly one must host the backend while the rest
//! connect to it:
//!
//! 1. Every instance listens on a well-known UDP port for *beacons*.
//! 2. If a beacon arrives within the election timeout, somebody is already
//!    serving: the instance records the sender's address and becomes a client.
//! 3. If the timeout elapses in silence, the instance becomes the server and
//!    starts broadcasting its own beacon on a shorter period, so late starters
//!    hear it before their own timeout fires.
//!
//! - **`protocol`** – The beacon datagram: a tiny JSON object.
//!
//! - **`domain`** – Timing constants and their invariant, the election state
//!   machine, and the role/server-info types handed to the application.

pub mod domain;
pub mod protocol;

pub use domain::election::{Election, ElectionError, ElectionOutcome, Phase};
pub use domain::role::{AppMode, ServerInfo};
pub use domain::timing::{
    DiscoveryTiming, TimingError, BEACON_PERIOD, BROADCAST_ADDR, BROADCAST_PORT,
    DISCOVERY_TIMEOUT,
};
pub use protocol::beacon::{decode_beacon, encode_beacon, BeaconMessage, ProtocolError};
