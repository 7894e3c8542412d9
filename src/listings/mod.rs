pub mod repository;

use rusqlite::params;

use crate::db::RepositoryError;
use crate::state::DbPool;

/// Ensure a city row exists for a newly listed property and bump its
/// denormalized property count. Counters are incremental and may drift from
/// the actual property rows; they are not authoritative.
pub fn upsert_city_for_property(
    pool: &DbPool,
    name: &str,
    state: &str,
) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    conn.execute(
        "INSERT INTO cities (id, name, state, property_count)
         VALUES (?1, ?2, ?3, 1)
         ON CONFLICT(name) DO UPDATE SET
           property_count = property_count + 1",
        params![uuid::Uuid::now_v7().to_string(), name, state],
    )?;
    Ok(())
}

/// Decrement the city property count when a listing is hard-deleted.
/// Floors at zero rather than going negative.
pub fn decrement_city_property_count(pool: &DbPool, name: &str) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE cities SET property_count = MAX(property_count - 1, 0)
         WHERE name = ?1 COLLATE NOCASE",
        params![name],
    )?;
    Ok(())
}

/// Bump the search counter when a property search names this city.
pub fn bump_city_search_count(pool: &DbPool, name: &str) -> Result<(), RepositoryError> {
    let conn = pool.get()?;
    conn.execute(
        "UPDATE cities SET search_count = search_count + 1
         WHERE name = ?1 COLLATE NOCASE",
        params![name],
    )?;
    Ok(())
}
