use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use rusqlite::params;
use serde::Deserialize;
use serde_json::json;

use crate::db::models::{BugReport, BugStatus, Severity};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminUser, CurrentUser};
use crate::routes::ok;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/bugs", get(list).post(create))
        .route("/api/bugs/{id}", axum::routing::put(update))
}

#[derive(Deserialize)]
pub struct BugInput {
    pub title: String,
    pub description: String,
    pub steps: Option<String>,
    pub severity: Option<Severity>,
}

#[derive(Deserialize)]
pub struct BugPatch {
    pub status: Option<BugStatus>,
    pub severity: Option<Severity>,
    pub note: Option<String>,
}

#[derive(Deserialize)]
pub struct BugListQuery {
    pub status: Option<String>,
}

const BUG_COLUMNS: &str = "id, title, description, steps, severity, reporter_name, \
     reporter_email, status, notes, created_at, resolved_at";

fn row_to_bug(row: &rusqlite::Row<'_>) -> rusqlite::Result<BugReport> {
    let severity_str: String = row.get(4)?;
    let status_str: String = row.get(7)?;
    Ok(BugReport {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        steps: row.get(3)?,
        severity: Severity::parse(&severity_str).unwrap_or(Severity::Medium),
        reporter_name: row.get(5)?,
        reporter_email: row.get(6)?,
        status: BugStatus::parse(&status_str).unwrap_or(BugStatus::Open),
        notes: row.get(8)?,
        created_at: row.get(9)?,
        resolved_at: row.get(10)?,
    })
}

/// POST /api/bugs — any signed-in user may report
async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(input): Json<BugInput>,
) -> AppResult<Response> {
    let title = input.title.trim().to_string();
    if title.is_empty() || input.description.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and description are required".into(),
        ));
    }

    let id = uuid::Uuid::now_v7().to_string();
    let severity = input.severity.unwrap_or(Severity::Medium);

    let conn = state.db.get()?;
    conn.execute(
        "INSERT INTO bug_reports (id, title, description, steps, severity, reporter_name, reporter_email)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            id,
            title,
            input.description,
            input.steps,
            severity.as_str(),
            user.name,
            user.email
        ],
    )?;

    Ok(ok("Bug report filed", json!({ "id": id })).into_response())
}

/// GET /api/bugs — admin listing, optional status filter
async fn list(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<BugListQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let bugs: Vec<BugReport> = match q.status.as_deref() {
        Some(s) if !s.is_empty() => {
            let status = BugStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown bug status: {}", s)))?;
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM bug_reports WHERE status = ?1 ORDER BY created_at DESC",
                BUG_COLUMNS
            ))?;
            let rows = stmt
                .query_map(params![status.as_str()], row_to_bug)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
        _ => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM bug_reports ORDER BY created_at DESC",
                BUG_COLUMNS
            ))?;
            let rows = stmt
                .query_map([], row_to_bug)?
                .collect::<Result<Vec<_>, _>>()?;
            rows
        }
    };

    Ok(ok("Bug reports", json!({ "bugs": bugs })).into_response())
}

/// PUT /api/bugs/{id} — admin triage: status/severity change, note append.
/// Notes are an append-only log; each entry is prefixed with an ISO timestamp.
async fn update(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
    Json(patch): Json<BugPatch>,
) -> AppResult<Response> {
    let conn = state.db.get()?;

    let bug = conn
        .query_row(
            &format!("SELECT {} FROM bug_reports WHERE id = ?1", BUG_COLUMNS),
            params![id],
            row_to_bug,
        )
        .map_err(|_| AppError::NotFound(format!("Bug report {} not found", id)))?;

    let status = patch.status.unwrap_or(bug.status);
    let severity = patch.severity.unwrap_or(bug.severity);

    let mut notes = bug.notes;
    if let Some(note) = patch.note.filter(|n| !n.trim().is_empty()) {
        if !notes.is_empty() {
            notes.push('\n');
        }
        notes.push_str(&format!("[{}] {}", Utc::now().to_rfc3339(), note.trim()));
    }

    let resolved_at = match (status, bug.resolved_at) {
        (BugStatus::Resolved | BugStatus::Closed, None) => Some(Utc::now().to_rfc3339()),
        (BugStatus::Resolved | BugStatus::Closed, existing) => existing,
        _ => None,
    };

    conn.execute(
        "UPDATE bug_reports SET status = ?2, severity = ?3, notes = ?4, resolved_at = ?5
         WHERE id = ?1",
        params![id, status.as_str(), severity.as_str(), notes, resolved_at],
    )?;

    Ok(ok(
        "Bug report updated",
        json!({ "id": id, "status": status.as_str() }),
    )
    .into_response())
}
