use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::City;
use crate::error::{AppError, AppResult};
use crate::extractors::AdminUser;
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/cities", get(list).post(create))
        .route("/api/cities/{id}", axum::routing::put(update).delete(delete))
}

#[derive(Deserialize)]
pub struct CityInput {
    pub name: String,
    #[serde(default)]
    pub state: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CityPatch {
    pub state: Option<String>,
    pub image_url: Option<String>,
    pub is_active: Option<bool>,
}

fn row_to_city(row: &rusqlite::Row<'_>) -> rusqlite::Result<City> {
    Ok(City {
        id: row.get(0)?,
        name: row.get(1)?,
        state: row.get(2)?,
        property_count: row.get(3)?,
        search_count: row.get(4)?,
        is_active: row.get(5)?,
        image_url: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const CITY_COLUMNS: &str =
    "id, name, state, property_count, search_count, is_active, image_url, created_at";

/// GET /api/cities — active cities ordered by listing volume
async fn list(State(state): State<AppState>) -> AppResult<Response> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM cities WHERE is_active = 1 ORDER BY property_count DESC, name",
        CITY_COLUMNS
    ))?;
    let cities: Vec<City> = stmt
        .query_map([], row_to_city)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ok("Cities", json!({ "cities": cities })).into_response())
}

/// POST /api/cities — admin create
async fn create(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(input): Json<CityInput>,
) -> AppResult<Response> {
    let name = input.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("City name is required".into()));
    }

    let conn = state.db.get()?;
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM cities WHERE name = ?1 COLLATE NOCASE",
        params![name],
        |row| row.get(0),
    )?;
    if exists {
        return Err(AppError::Conflict(format!("City {} already exists", name)));
    }

    let id = uuid::Uuid::now_v7().to_string();
    conn.execute(
        "INSERT INTO cities (id, name, state, image_url) VALUES (?1, ?2, ?3, ?4)",
        params![id, name, input.state, input.image_url],
    )?;

    Ok(ok("City created", json!({ "id": id, "name": name })).into_response())
}

/// PUT /api/cities/{id} — admin update
async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<CityPatch>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let city = conn
        .query_row(
            &format!("SELECT {} FROM cities WHERE id = ?1", CITY_COLUMNS),
            params![id],
            row_to_city,
        )
        .map_err(|_| AppError::NotFound(format!("City {} not found", id)))?;

    let state_name = patch.state.unwrap_or(city.state);
    let image_url = patch.image_url.or(city.image_url);
    let is_active = patch.is_active.unwrap_or(city.is_active);

    conn.execute(
        "UPDATE cities SET state = ?2, image_url = ?3, is_active = ?4 WHERE id = ?1",
        params![id, state_name, image_url, is_active],
    )?;

    Ok(ok("City updated", json!({ "id": id })).into_response())
}

/// DELETE /api/cities/{id} — admin delete
async fn delete(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let rows = conn.execute("DELETE FROM cities WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("City {} not found", id)));
    }

    Ok(ok("City deleted", json!({ "id": id })).into_response())
}
