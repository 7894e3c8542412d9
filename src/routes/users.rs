use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{Role, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser};
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/users", get(list))
        .route("/api/users/{id}", axum::routing::delete(delete))
        .route("/api/users/me", put(update_me))
        .route("/api/users/me/deactivate", post(deactivate_me))
}

#[derive(Deserialize)]
pub struct ProfilePatch {
    pub name: Option<String>,
    pub phone: Option<String>,
}

/// GET /api/users — admin account listing
async fn list(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let mut stmt = conn.prepare(
        "SELECT id, name, email, phone, role, is_active, oauth_provider_id, created_at
         FROM users ORDER BY created_at DESC",
    )?;
    let users: Vec<User> = stmt
        .query_map([], |row| {
            let role_str: String = row.get(4)?;
            Ok(User {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password_hash: None,
                phone: row.get(3)?,
                role: Role::parse(&role_str).unwrap_or(Role::User),
                is_active: row.get(5)?,
                oauth_provider_id: row.get(6)?,
                created_at: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ok("Users", json!({ "users": users })).into_response())
}

/// DELETE /api/users/{id} — admin delete; the preference document goes with
/// the account via the FK cascade.
async fn delete(
    State(state): State<AppState>,
    admin: AdminUser,
    Path(id): Path<String>,
) -> AppResult<Response> {
    if admin.0.id == id {
        return Err(AppError::BadRequest(
            "Admins cannot delete their own account".into(),
        ));
    }

    let conn = state.db.get()?;
    let rows = conn.execute("DELETE FROM users WHERE id = ?1", params![id])?;
    if rows == 0 {
        return Err(AppError::NotFound(format!("User {} not found", id)));
    }

    Ok(ok("User deleted", json!({ "id": id })).into_response())
}

/// PUT /api/users/me — profile update
async fn update_me(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(patch): Json<ProfilePatch>,
) -> AppResult<Response> {
    let name = match patch.name {
        Some(n) if n.trim().is_empty() => {
            return Err(AppError::BadRequest("Name cannot be empty".into()))
        }
        Some(n) => n.trim().to_string(),
        None => user.name.clone(),
    };

    let conn = state.db.get()?;
    conn.execute(
        "UPDATE users SET name = ?2, phone = COALESCE(?3, phone), updated_at = datetime('now')
         WHERE id = ?1",
        params![user.id, name, patch.phone],
    )?;

    Ok(ok("Profile updated", json!({ "id": user.id, "name": name })).into_response())
}

/// POST /api/users/me/deactivate — self-service soft delete; sessions are
/// dropped so the account is signed out everywhere.
async fn deactivate_me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    conn.execute(
        "UPDATE users SET is_active = 0, updated_at = datetime('now') WHERE id = ?1",
        params![user.id],
    )?;
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user.id])?;

    Ok(ok("Account deactivated", json!({ "id": user.id })).into_response())
}
