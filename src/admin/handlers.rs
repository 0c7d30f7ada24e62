use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::registry::{EndpointStats, EndpointStatus, PoolCounts, RegistryError};

#[derive(Debug, Deserialize)]
pub struct EndpointPayload {
    pub url: String,
}

#[derive(Serialize)]
pub struct EndpointEntry {
    pub address: String,
    pub status: EndpointStatus,
    pub failures: u32,
    /// Seconds since the last probe or forward outcome.
    pub last_check_secs: f64,
    pub stats: EndpointStats,
}

#[derive(Serialize)]
pub struct EndpointList {
    pub endpoints: Vec<EndpointEntry>,
}

#[derive(Serialize)]
pub struct Message {
    pub message: String,
}

pub async fn list_endpoints(State(state): State<AppState>) -> Json<EndpointList> {
    let endpoints = state
        .registry
        .snapshot()
        .into_iter()
        .map(|ep| EndpointEntry {
            address: ep.address,
            status: ep.status,
            failures: ep.consecutive_failures,
            last_check_secs: ep.last_check.elapsed().as_secs_f64(),
            stats: ep.stats,
        })
        .collect();

    Json(EndpointList { endpoints })
}

pub async fn add_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<EndpointPayload>,
) -> impl IntoResponse {
    match state.registry.add(&payload.url) {
        Ok(address) => (
            StatusCode::CREATED,
            Json(Message {
                message: format!("endpoint {address} registered"),
            }),
        ),
        Err(e @ RegistryError::InvalidAddress(_)) => (
            StatusCode::BAD_REQUEST,
            Json(Message {
                message: e.to_string(),
            }),
        ),
        Err(e @ RegistryError::Duplicate(_)) => (
            StatusCode::CONFLICT,
            Json(Message {
                message: e.to_string(),
            }),
        ),
    }
}

pub async fn remove_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<EndpointPayload>,
) -> impl IntoResponse {
    if state.registry.remove(&payload.url) {
        (
            StatusCode::OK,
            Json(Message {
                message: format!("endpoint {} removed", payload.url),
            }),
        )
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(Message {
                message: format!("endpoint {} not found", payload.url),
            }),
        )
    }
}

pub async fn get_stats(State(state): State<AppState>) -> Json<PoolCounts> {
    Json(state.registry.counts())
}
