use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::listings::repository::{DynPropertyRepository, SqlitePropertyRepository};
use crate::prefs::repository::{DynPreferenceRepository, SqlitePreferenceRepository};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub properties: DynPropertyRepository,
    pub preferences: DynPreferenceRepository,
}

impl AppState {
    pub fn new(db: DbPool, config: Config) -> Self {
        let properties = Arc::new(SqlitePropertyRepository::new(db.clone()));
        let preferences = Arc::new(SqlitePreferenceRepository::new(db.clone()));
        Self {
            db,
            config,
            properties,
            preferences,
        }
    }
}
