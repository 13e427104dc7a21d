//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use saga_core::ports::{TableStore, TextGenerationService};
use saga_core::repository::StoryRepository;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: StoryRepository,
    pub config: Arc<Config>,
    /// Writes and revises pages.
    pub story_model: Arc<dyn TextGenerationService>,
    /// Folds new pages into the rolling summary.
    pub summary_model: Arc<dyn TextGenerationService>,
    summary_failures: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn TableStore>,
        config: Arc<Config>,
        story_model: Arc<dyn TextGenerationService>,
        summary_model: Arc<dyn TextGenerationService>,
    ) -> Self {
        Self {
            repo: StoryRepository::new(store),
            config,
            story_model,
            summary_model,
            summary_failures: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn record_summary_failure(&self) {
        self.summary_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn summary_failures(&self) -> u64 {
        self.summary_failures.load(Ordering::Relaxed)
    }
}
