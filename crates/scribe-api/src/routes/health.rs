use axum::{extract::State, Json};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::{error::ApiResult, state::AppState};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub services: HashMap<String, String>,
}

/// Health check endpoint
///
/// Returns the health status of the API and its dependencies
pub async fn health_check(State(state): State<Arc<AppState>>) -> ApiResult<Json<HealthResponse>> {
    let mut services = HashMap::new();

    // Cheap MongoDB probe: a lookup on a fresh id returns Ok(None) when the
    // connection is healthy.
    match state.store.find_thread(ObjectId::new()).await {
        Ok(_) => services.insert("mongodb".to_string(), "connected".to_string()),
        Err(_) => services.insert("mongodb".to_string(), "disconnected".to_string()),
    };

    services.insert("rag".to_string(), state.config.rag.url.clone());

    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        services,
    }))
}
