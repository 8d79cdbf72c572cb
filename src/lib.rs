//! # kdfwrap
//!
//! Host-side recovery of keys derived inside a secure element.
//!
//! The element keeps a parent key in a protected slot, runs its KDF internally
//! and returns the derived key masked with a one-time pad built from a secret
//! shared with the host and a fresh device nonce. The host rebuilds the pad
//! and unmasks the key locally, so the key never crosses the bus in the clear.
//!
//! ## Public API
//!
//! - [`recover_key`] / [`recover::recover`]: the pure unwrap transform.
//! - [`device::SecureElement`]: the contract a device session fulfils;
//!   [`simulator::SimulatedElement`] is an in-memory implementation.
//! - [`Host`]: provisioning and recovery driven from a [`Config`], with an
//!   audit trail of every recovery.

// Module declarations.
pub(crate) mod crypto;
pub mod audit;
pub mod config;
pub mod device;
pub mod error;
pub mod host;
pub mod keys;
pub mod mode;
pub mod recover;
pub mod simulator;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use config::{Config, RunMode};
pub use error::KdfWrapError;
pub use host::{Host, Recovery, RunOutcome};
pub use recover::{recover_key, session_mask};
