// Library exports for basera
// This allows integration tests and external code to use basera modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod listings;
pub mod matching;
pub mod prefs;
pub mod routes;
pub mod state;
