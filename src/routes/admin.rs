use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::extractors::AdminUser;
use crate::matching::notify;
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/admin/stats", get(stats))
        .route("/api/admin/notify-users", post(notify_users))
}

#[derive(Deserialize)]
pub struct NotifyRequest {
    #[serde(rename = "propertyIds", default)]
    pub property_ids: Vec<String>,
}

/// POST /api/admin/notify-users — run the saved-search match scan over an
/// explicit property batch (typically just-imported listings).
async fn notify_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(req): Json<NotifyRequest>,
) -> AppResult<Response> {
    let outcome = notify::notify_matching_users(
        state.properties.as_ref(),
        state.preferences.as_ref(),
        &state.config.mail,
        &req.property_ids,
    )
    .await?;

    Ok(ok(
        &format!("Notified {} users", outcome.notified_users.len()),
        json!({
            "notifiedUsers": outcome.notified_users,
            "properties": outcome.properties,
        }),
    )
    .into_response())
}

/// GET /api/admin/stats — aggregate dashboard counters
async fn stats(State(state): State<AppState>, _admin: AdminUser) -> AppResult<Response> {
    let conn = state.db.get()?;
    let stats = gather_stats(&conn)?;
    Ok(ok("Stats", stats).into_response())
}

fn gather_stats(conn: &rusqlite::Connection) -> Result<serde_json::Value, rusqlite::Error> {
    let count = |sql: &str| -> Result<i64, rusqlite::Error> {
        conn.query_row(sql, [], |row| row.get(0))
    };

    let total_properties = count("SELECT COUNT(*) FROM properties WHERE is_active = 1")?;
    let for_sale = count("SELECT COUNT(*) FROM properties WHERE is_active = 1 AND status = 'sale'")?;
    let for_rent = count("SELECT COUNT(*) FROM properties WHERE is_active = 1 AND status = 'rent'")?;
    let total_users = count("SELECT COUNT(*) FROM users WHERE is_active = 1")?;
    let total_cities = count("SELECT COUNT(*) FROM cities WHERE is_active = 1")?;
    let open_bugs = count("SELECT COUNT(*) FROM bug_reports WHERE status IN ('open', 'in-progress')")?;
    let total_views = count("SELECT COALESCE(SUM(views), 0) FROM properties")?;

    let mut stmt = conn.prepare(
        "SELECT property_type, COUNT(*) FROM properties WHERE is_active = 1
         GROUP BY property_type ORDER BY COUNT(*) DESC",
    )?;
    let by_type: Vec<serde_json::Value> = {
        let rows = stmt
            .query_map([], |row| {
                Ok(json!({
                    "type": row.get::<_, String>(0)?,
                    "count": row.get::<_, i64>(1)?,
                }))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };

    Ok(json!({
        "properties": {
            "total": total_properties,
            "forSale": for_sale,
            "forRent": for_rent,
            "byType": by_type,
            "totalViews": total_views,
        },
        "users": total_users,
        "cities": total_cities,
        "openBugs": open_bugs,
    }))
}
