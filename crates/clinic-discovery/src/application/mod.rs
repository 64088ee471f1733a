//! Application layer use cases for role election.
//!
//! Use cases in this layer orchestrate domain objects, depend on traits rather
//! than concrete infrastructure, and contain no OS calls of their own.
//!
//! # Sub-modules
//!
//! - **`elect_role`** – Waits for the coordinator's single outcome, notifies
//!   the collaborator, and reports the resulting mode and backend URL.

pub mod elect_role;
