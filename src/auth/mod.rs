use rand::Rng;
use rusqlite::params;

use crate::error::{AppError, AppResult};
use crate::state::DbPool;

pub fn hash_password(plain: &str) -> AppResult<String> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("bcrypt hash failed: {}", e)))
}

pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: &str, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Delete a session by token.
pub fn delete_session(pool: &DbPool, token: &str) -> AppResult<()> {
    let conn = pool.get()?;
    conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
    Ok(())
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Six-digit one-time code for password resets.
pub fn generate_reset_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(0..1_000_000))
}
