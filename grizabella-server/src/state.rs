//! Shared application state: a single open [`GrizabellaDb`] handed to every
//! handler via axum's `State` extractor.

use std::sync::Arc;

use grizabella_core::db_manager::GrizabellaDb;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<GrizabellaDb>,
}

impl AppState {
    pub fn new(db: Arc<GrizabellaDb>) -> Self {
        Self { db }
    }
}
