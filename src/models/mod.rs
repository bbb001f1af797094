mod interaction;
mod post;

pub use interaction::{
    BlockPair, CandidateInteraction, InteractionKind, NeighborInteraction, PopularPost,
    UserInteraction,
};
pub use post::{AuthorProfile, Post};

use serde::{Deserialize, Serialize};

/// Response body for the recommendations endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Post>,
    pub recommendation_count: usize,
    /// True when popular posts were appended to a short personalized list
    pub backfilled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backfilled_count: Option<usize>,
}

impl RecommendationResponse {
    /// Builds the response for a fully personalized or backfilled result
    pub fn new(recommendations: Vec<Post>, backfilled_count: usize) -> Self {
        Self {
            recommendation_count: recommendations.len(),
            backfilled: backfilled_count > 0,
            backfilled_count: (backfilled_count > 0).then_some(backfilled_count),
            recommendations,
        }
    }

    /// Builds the response for a pure popularity result (cold start or no
    /// neighbors). The whole list is the fallback, so it is not a backfill.
    pub fn popular(recommendations: Vec<Post>) -> Self {
        Self {
            recommendation_count: recommendations.len(),
            backfilled: false,
            backfilled_count: None,
            recommendations,
        }
    }
}
