//! Endpoint registry subsystem.
//!
//! # Data Flow
//! ```text
//! Admin add/remove ──────────────┐
//! Prober outcomes ───────────────┤
//! Forwarder outcomes ────────────┼──▶ EndpointRegistry (single lock)
//! Eviction sweep ────────────────┘         │
//!                                          ▼
//!                              snapshots → Selector / admin read model
//! ```
//!
//! # Design Decisions
//! - The registry is the sole owner of endpoint lifetime and the only
//!   shared mutable state in the dispatcher
//! - Status transitions happen only through probe or forward outcomes,
//!   never through administrative operations
//! - No network or file I/O while the lock is held

pub mod endpoint;
pub mod pool;

pub use endpoint::{Endpoint, EndpointStats, EndpointStatus, EndpointView};
pub use pool::{EndpointRegistry, PoolCounts, RegistryError};
