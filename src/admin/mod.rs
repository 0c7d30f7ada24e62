//! Administrative surface consumed by the dashboard layer.
//!
//! Add/remove/list endpoints and the aggregate read model. These routes call
//! the same registry operations as everything else; they never touch health
//! status directly.

pub mod handlers;

use axum::{routing::get, Router};

use crate::http::server::AppState;
use self::handlers::{add_endpoint, get_stats, list_endpoints, remove_endpoint};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/dispatcher/endpoints",
            get(list_endpoints).post(add_endpoint).delete(remove_endpoint),
        )
        .route("/api/dispatcher/stats", get(get_stats))
}
