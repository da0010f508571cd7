//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use crate::web::auth::TokenKeys;
use std::sync::Arc;
use study_assistant_core::ports::{
    DatabaseService, ObjectStorageService, StudyAiService, TopicContentService,
};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseService>,
    pub storage: Arc<dyn ObjectStorageService>,
    pub ai: Arc<dyn StudyAiService>,
    pub topics: Arc<dyn TopicContentService>,
    pub config: Arc<Config>,
    pub tokens: Arc<TokenKeys>,
}

impl AppState {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        storage: Arc<dyn ObjectStorageService>,
        ai: Arc<dyn StudyAiService>,
        topics: Arc<dyn TopicContentService>,
        config: Arc<Config>,
    ) -> Self {
        let tokens = Arc::new(TokenKeys::new(config.jwt_secret.as_bytes()));
        Self {
            db,
            storage,
            ai,
            topics,
            config,
            tokens,
        }
    }
}
