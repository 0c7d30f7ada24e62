//! Healthy-subset selection.
//!
//! # Data Flow
//! ```text
//! Forwarder
//!     → registry.healthy_snapshot() (stable order)
//!     → Selector::pick (atomic cursor advance)
//!     → chosen endpoint or "none available"
//! ```
//!
//! # Design Decisions
//! - The selector never filters; it rotates over whatever healthy subset it
//!   is handed
//! - Read-and-advance is a single atomic operation, never blocking I/O
//! - Positional rotation over a subset that can shrink between calls is
//!   accepted: over any window with stable membership, each healthy endpoint
//!   is selected with equal frequency

pub mod round_robin;

use crate::registry::EndpointView;

/// Strategy for handing out the next endpoint from the healthy subset.
pub trait Selector: Send + Sync {
    fn pick(&self, healthy: &[EndpointView]) -> Option<EndpointView>;
}

pub use round_robin::RoundRobin;
