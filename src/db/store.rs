use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        BlockPair, CandidateInteraction, InteractionKind, NeighborInteraction, PopularPost,
        UserInteraction,
    },
};

/// Query/mutate interface over the relational backend.
///
/// The engine receives this as an injected dependency so tests can substitute
/// an in-memory double. Every method is an independent round trip; the engine
/// does not rely on transaction semantics across calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    /// All block rows where the user is blocker or blocked
    async fn blocks_involving(&self, user_id: Uuid) -> AppResult<Vec<BlockPair>>;

    /// Ids of users the given user follows
    async fn following_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Ids of users following the given user
    async fn follower_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// The user's interactions of one kind, joined with each post's author id
    async fn interactions_by_user(
        &self,
        user_id: Uuid,
        kind: InteractionKind,
    ) -> AppResult<Vec<UserInteraction>>;

    /// Post ids already served to this user by previous requests
    async fn recommended_post_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Other users' interactions of one kind with any of the given posts,
    /// excluding the requesting user
    async fn interactions_on_posts(
        &self,
        kind: InteractionKind,
        post_ids: &[Uuid],
        exclude_user: Uuid,
    ) -> AppResult<Vec<NeighborInteraction>>;

    /// Interactions of one kind by the given users, excluding the given
    /// posts, each joined with full post content, author profile and tags
    async fn candidate_interactions(
        &self,
        kind: InteractionKind,
        user_ids: &[Uuid],
        exclude_posts: &[Uuid],
    ) -> AppResult<Vec<CandidateInteraction>>;

    /// The most recently created posts with engagement counts, newest first
    async fn recent_posts_with_counts(&self, limit: i64) -> AppResult<Vec<PopularPost>>;

    /// Batch-inserts one recommendation record per post for the user
    async fn record_recommendations(&self, user_id: Uuid, post_ids: &[Uuid]) -> AppResult<()>;
}
