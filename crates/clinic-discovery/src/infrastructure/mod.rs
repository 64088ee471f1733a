//! Infrastructure layer for clinic role election.
//!
//! Contains OS-facing adapters: UDP sockets and timers for the election, and
//! file-system storage for the TOML configuration.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `clinic_core`, but MUST NOT be imported by the `application` or domain
//! layers.

pub mod network;
pub mod storage;
