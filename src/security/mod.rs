//! Suspicious-IP gating.
//!
//! # Design Decisions
//! - The classifier is an external collaborator behind a trait; the
//!   dispatcher only consumes a boolean verdict
//! - Fail-open: a classifier outage must never take down forwarding, so
//!   absence or any error means "not suspicious"

pub mod classifier;

pub use classifier::{AllowAll, RemoteClassifier, ThreatDetector};
