use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;
use rusqlite::params;

use crate::db::models::Role;
use crate::error::AppError;
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Extractor that requires a valid, unexpired session on an active account.
/// Returns 401 otherwise.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_session_token(parts, &state.config.auth.cookie_name)
            .ok_or(AppError::Unauthorized)?;

        let conn = state.db.get()?;
        let (id, name, email, role_str): (String, String, String, String) = conn
            .query_row(
                "SELECT u.id, u.name, u.email, u.role FROM sessions s \
                 JOIN users u ON u.id = s.user_id \
                 WHERE s.token = ?1 AND s.expires_at > datetime('now') AND u.is_active = 1",
                params![token],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .map_err(|_| AppError::Unauthorized)?;

        let role = Role::parse(&role_str).ok_or(AppError::Unauthorized)?;

        Ok(CurrentUser {
            id,
            name,
            email,
            role,
        })
    }
}

/// Extractor that additionally requires the admin role. Returns 403 for an
/// authenticated non-admin.
pub struct AdminUser(pub CurrentUser);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = CurrentUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::Forbidden);
        }
        Ok(AdminUser(user))
    }
}

fn extract_session_token<'a>(parts: &'a Parts, cookie_name: &str) -> Option<&'a str> {
    parts
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .map(|s| s.trim())
        .find_map(|cookie| {
            let mut split = cookie.splitn(2, '=');
            let key = split.next()?.trim();
            let val = split.next()?.trim();
            if key == cookie_name {
                Some(val)
            } else {
                None
            }
        })
}
