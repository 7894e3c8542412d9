use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::auth;
use crate::db::models::UserPreference;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/me", get(me))
        .route("/api/auth/forgot-password", post(forgot_password))
        .route("/api/auth/reset-password", post(reset_password))
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub code: String,
    pub new_password: String,
}

fn session_cookie(name: &str, token: &str, max_age_hours: u64) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        name,
        token,
        max_age_hours * 3600
    )
}

fn clear_session_cookie(name: &str) -> String {
    format!("{}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0", name)
}

/// POST /api/auth/register — create an account and start a session
async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let name = req.name.trim().to_string();
    let email = req.email.trim().to_lowercase();
    if name.is_empty() || email.is_empty() {
        return Err(AppError::BadRequest("Name and email are required".into()));
    }
    if !email.contains('@') {
        return Err(AppError::BadRequest("Invalid email address".into()));
    }
    if req.password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let conn = state.db.get()?;
    let exists: bool = conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
        params![email],
        |row| row.get(0),
    )?;
    if exists {
        return Err(AppError::Conflict("Email is already registered".into()));
    }

    let user_id = uuid::Uuid::now_v7().to_string();
    let password_hash = auth::hash_password(&req.password)?;
    conn.execute(
        "INSERT INTO users (id, name, email, password_hash, phone) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![user_id, name, email, password_hash, req.phone],
    )?;
    drop(conn);

    // Every account starts with an empty preference document
    state
        .preferences
        .save(&UserPreference::new(user_id.clone()))
        .await?;

    let token = auth::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        ok(
            "Registered",
            json!({ "id": user_id, "name": name, "email": email }),
        ),
    )
        .into_response())
}

/// POST /api/auth/login
async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Response> {
    let email = req.email.trim().to_lowercase();
    let conn = state.db.get()?;

    let row: Result<(String, Option<String>, bool), rusqlite::Error> = conn.query_row(
        "SELECT id, password_hash, is_active FROM users WHERE email = ?1",
        params![email],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    );

    let (user_id, hash, is_active) = match row {
        Ok(r) => r,
        Err(rusqlite::Error::QueryReturnedNoRows) => return Err(AppError::Unauthorized),
        Err(e) => return Err(e.into()),
    };
    drop(conn);

    let hash = hash.ok_or(AppError::Unauthorized)?;
    if !is_active || !auth::verify_password(&req.password, &hash) {
        return Err(AppError::Unauthorized);
    }

    let token = auth::create_session(&state.db, &user_id, state.config.auth.session_hours)?;
    let cookie = session_cookie(
        &state.config.auth.cookie_name,
        &token,
        state.config.auth.session_hours,
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        ok("Logged in", json!({ "id": user_id })),
    )
        .into_response())
}

/// POST /api/auth/logout — drop the session, clear the cookie
async fn logout(State(state): State<AppState>, headers: HeaderMap) -> AppResult<Response> {
    let cookie_name = state.config.auth.cookie_name.clone();
    if let Some(token) = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|c| c.strip_prefix(&format!("{}=", cookie_name)))
    {
        auth::delete_session(&state.db, token)?;
    }

    Ok((
        [(header::SET_COOKIE, clear_session_cookie(&cookie_name))],
        ok("Logged out", json!({})),
    )
        .into_response())
}

/// GET /api/auth/me
async fn me(user: CurrentUser) -> AppResult<Response> {
    Ok(ok(
        "Current user",
        json!({
            "id": user.id,
            "name": user.name,
            "email": user.email,
            "role": user.role.as_str(),
        }),
    )
    .into_response())
}

/// POST /api/auth/forgot-password — issue a one-time reset code.
/// Responds identically whether or not the account exists.
async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> AppResult<Response> {
    let email = req.email.trim().to_lowercase();
    let conn = state.db.get()?;

    let code = auth::generate_reset_code();
    let updated = conn.execute(
        "UPDATE users SET reset_code = ?2,
             reset_code_expires_at = datetime('now', ?3)
         WHERE email = ?1 AND is_active = 1",
        params![
            email,
            code,
            format!("+{} minutes", state.config.auth.reset_code_minutes)
        ],
    )?;

    if updated > 0 {
        if state.config.mail.enabled {
            tracing::info!("Queueing password reset email to {}", email);
        } else {
            tracing::info!("Mail disabled; reset code for {} is {}", email, code);
        }
    }

    Ok(ok("If that account exists, a reset code has been sent", json!({})).into_response())
}

/// POST /api/auth/reset-password — redeem the one-time code
async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> AppResult<Response> {
    if req.new_password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters".into(),
        ));
    }

    let email = req.email.trim().to_lowercase();
    let conn = state.db.get()?;
    let password_hash = auth::hash_password(&req.new_password)?;

    let updated = conn.execute(
        "UPDATE users SET password_hash = ?3, reset_code = NULL, reset_code_expires_at = NULL
         WHERE email = ?1 AND reset_code = ?2
           AND reset_code_expires_at > datetime('now')",
        params![email, req.code, password_hash],
    )?;

    if updated == 0 {
        return Err(AppError::BadRequest("Invalid or expired reset code".into()));
    }

    Ok(ok("Password updated", json!({})).into_response())
}
