//! Health-Aware Request Dispatcher Library

pub mod admin;
pub mod balancer;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod persistence;
pub mod registry;
pub mod security;

pub use config::DispatcherConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use registry::EndpointRegistry;
