//! Lifecycle management subsystem.
//!
//! # Design Decisions
//! - Ordered startup: config first, then registry and prober, then listener
//! - Ordered shutdown: stop accepting, then stop and join the prober, so no
//!   probe outcome mutates state after shutdown completes

pub mod shutdown;

pub use shutdown::Shutdown;
