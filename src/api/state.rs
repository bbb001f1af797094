use std::sync::Arc;

use crate::{db::RecommendationStore, services::RecommendationService};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommendations: Arc<RecommendationService>,
}

impl AppState {
    /// Creates application state over the given backing store
    pub fn new(store: Arc<dyn RecommendationStore>) -> Self {
        Self {
            recommendations: Arc::new(RecommendationService::new(store)),
        }
    }
}
