//! Health probing subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer
//!     → snapshot registry addresses
//!     → probe all endpoints concurrently, each with its own timeout
//!     → record outcomes in the registry
//!     → eviction sweep
//! ```
//!
//! # Design Decisions
//! - Probes within a tick run concurrently, so one slow endpoint cannot
//!   stall the rest
//! - Forwarded-request failures feed the same counters (see registry), so
//!   active and passive signals are complementary
//! - The sleep between ticks is the cancellation point

pub mod prober;
pub mod report;

pub use prober::{HealthMonitor, ProberHandle};
pub use report::ProbeReport;
