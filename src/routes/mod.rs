pub mod admin;
pub mod auth;
pub mod bugs;
pub mod cities;
pub mod prefs;
pub mod properties;
pub mod users;

use axum::{Json, Router};
use serde::Serialize;
use serde_json::json;

use crate::state::AppState;

/// Standard success envelope; errors carry `success: false` via AppError.
pub fn ok<T: Serialize>(message: &str, data: T) -> Json<serde_json::Value> {
    Json(json!({ "success": true, "message": message, "data": data }))
}

/// The full API surface, merged per resource.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .merge(auth::router())
        .merge(properties::router())
        .merge(cities::router())
        .merge(users::router())
        .merge(prefs::router())
        .merge(bugs::router())
        .merge(admin::router())
}
