use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{RecentSearch, SavedSearch, UserPreference};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/preferences", get(get_preferences))
        .route("/api/preferences/saved-searches", post(add_saved_search))
        .route(
            "/api/preferences/saved-searches/{index}",
            axum::routing::delete(remove_saved_search),
        )
        .route("/api/preferences/recent-searches", post(add_recent_search))
        .route("/api/preferences/notifications", get(notifications))
        .route(
            "/api/preferences/notifications/read",
            post(mark_notifications_read),
        )
}

#[derive(Deserialize)]
pub struct SavedSearchInput {
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub property_type: String,
    #[serde(default)]
    pub status: String,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_bedrooms: Option<u32>,
    #[serde(default)]
    pub notify_by_email: bool,
}

#[derive(Deserialize)]
pub struct RecentSearchInput {
    pub query: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

async fn load_or_default(state: &AppState, user_id: &str) -> AppResult<UserPreference> {
    Ok(state
        .preferences
        .load(user_id)
        .await?
        .unwrap_or_else(|| UserPreference::new(user_id)))
}

/// GET /api/preferences
async fn get_preferences(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let prefs = load_or_default(&state, &user.id).await?;
    Ok(ok("Preferences", json!({ "preferences": prefs })).into_response())
}

/// POST /api/preferences/saved-searches — duplicates of location+type+status
/// are rejected.
async fn add_saved_search(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<SavedSearchInput>,
) -> AppResult<Response> {
    let mut prefs = load_or_default(&state, &user.id).await?;

    let search = SavedSearch {
        location: input.location.trim().to_string(),
        property_type: input.property_type,
        status: input.status,
        min_price: input.min_price,
        max_price: input.max_price,
        min_bedrooms: input.min_bedrooms,
        notify_by_email: input.notify_by_email,
        created_at: Utc::now().to_rfc3339(),
    };

    prefs
        .add_saved_search(search)
        .map_err(|_| AppError::Conflict("An identical saved search already exists".into()))?;
    state.preferences.save(&prefs).await?;

    Ok(ok(
        "Saved search added",
        json!({ "saved_searches": prefs.saved_searches }),
    )
    .into_response())
}

/// DELETE /api/preferences/saved-searches/{index}
async fn remove_saved_search(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(index): Path<usize>,
) -> AppResult<Response> {
    let mut prefs = load_or_default(&state, &user.id).await?;
    if index >= prefs.saved_searches.len() {
        return Err(AppError::NotFound(format!("No saved search at {}", index)));
    }

    prefs.saved_searches.remove(index);
    state.preferences.save(&prefs).await?;

    Ok(ok(
        "Saved search removed",
        json!({ "saved_searches": prefs.saved_searches }),
    )
    .into_response())
}

/// POST /api/preferences/recent-searches — capped log, newest first
async fn add_recent_search(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<RecentSearchInput>,
) -> AppResult<Response> {
    let mut prefs = load_or_default(&state, &user.id).await?;

    prefs.add_recent_search(RecentSearch {
        query: input.query,
        params: input.params,
        searched_at: Utc::now().to_rfc3339(),
    });
    state.preferences.save(&prefs).await?;

    Ok(ok(
        "Recent search recorded",
        json!({ "recent_searches": prefs.recent_searches }),
    )
    .into_response())
}

/// GET /api/preferences/notifications
async fn notifications(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let prefs = load_or_default(&state, &user.id).await?;
    let unread = prefs.notifications.iter().filter(|n| !n.read).count();

    Ok(ok(
        "Notifications",
        json!({ "notifications": prefs.notifications, "unread": unread }),
    )
    .into_response())
}

/// POST /api/preferences/notifications/read — mark everything read
async fn mark_notifications_read(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Response> {
    let mut prefs = load_or_default(&state, &user.id).await?;
    for n in &mut prefs.notifications {
        n.read = true;
    }
    state.preferences.save(&prefs).await?;

    Ok(ok("Notifications marked read", json!({})).into_response())
}
