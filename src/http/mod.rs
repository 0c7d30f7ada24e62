//! HTTP edge subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, admin routes)
//!     → forward.rs (suspicious-IP gate → selector → relay)
//!     → upstream response returned unchanged
//! ```

pub mod forward;
pub mod request;
pub mod server;

pub use request::RequestUuid;
pub use server::{AppState, HttpServer};
