//! Network infrastructure for role election.
//!
//! # Sub-modules
//!
//! - **`coordinator`** – Owns the UDP receive and broadcast endpoints and the
//!   election/beacon timers.  Decides, once per process, whether this instance
//!   is the LAN's server or a client of another instance.
//!
//! - **`local_ip`** – Finds this machine's LAN address so a server can report
//!   where clients should connect.

pub mod coordinator;
pub mod local_ip;

pub use coordinator::{DiscoveryCoordinator, DiscoveryError, DiscoverySettings};
pub use local_ip::detect_local_ip;
