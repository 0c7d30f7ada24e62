//! Endpoint snapshot persistence.
//!
//! # Responsibilities
//! - Durable save/load of the endpoint address list only
//! - Seed the registry at startup, record every membership change
//!
//! # Design Decisions
//! - Persistence is best-effort: failures are logged and swallowed, an
//!   administrative operation never fails because the snapshot could not
//!   be written
//! - Health state is not persisted; restored endpoints start over as Unknown

pub mod store;

pub use store::{EndpointStore, JsonFileStore, NullStore, PersistenceError};
