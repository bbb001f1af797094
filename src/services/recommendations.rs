use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    db::RecommendationStore,
    error::AppResult,
    models::{BlockPair, InteractionKind, Post, RecommendationResponse},
    services::scoring::{self, Visibility, NEIGHBOR_LIMIT, POPULAR_WINDOW, RESULT_SIZE},
};

/// Personalized post-recommendation engine.
///
/// Turns a user's historical likes, comments and bookmarks into a ranked
/// list of unseen posts via weighted collaborative filtering with time
/// decay, falling back to a privacy-aware popularity ranking for cold
/// starts and short result lists.
///
/// The engine is stateless between requests; all score maps live for one
/// call to [`recommend`](Self::recommend). The backing store is injected so
/// tests can substitute a double.
pub struct RecommendationService {
    store: Arc<dyn RecommendationStore>,
}

impl RecommendationService {
    pub fn new(store: Arc<dyn RecommendationStore>) -> Self {
        Self { store }
    }

    /// Runs the full recommendation pipeline for one user.
    ///
    /// Stages are sequential, but independent fetches within a stage (the
    /// three interaction kinds, the relationship queries) are issued
    /// concurrently and joined before the next stage. Any fetch failure
    /// aborts the whole request.
    pub async fn recommend(&self, user_id: Uuid) -> AppResult<RecommendationResponse> {
        // Relationships: block set and mutual-follow set
        let (blocks, following, followers) = tokio::try_join!(
            self.store.blocks_involving(user_id),
            self.store.following_ids(user_id),
            self.store.follower_ids(user_id),
        )?;
        let blocked = blocked_set(user_id, &blocks);
        let mutual = mutual_set(following, followers);
        let visibility = Visibility {
            user_id,
            blocked: &blocked,
            mutual: &mutual,
        };

        // Interaction history and previously served recommendations
        let (likes, comments, bookmarks, prior) = tokio::try_join!(
            self.store
                .interactions_by_user(user_id, InteractionKind::Like),
            self.store
                .interactions_by_user(user_id, InteractionKind::Comment),
            self.store
                .interactions_by_user(user_id, InteractionKind::Bookmark),
            self.store.recommended_post_ids(user_id),
        )?;

        // Cold start: no history at all, serve popular posts
        if likes.is_empty() && comments.is_empty() && bookmarks.is_empty() {
            tracing::info!(%user_id, "No interaction history, serving popular posts");
            let excluded = prior.into_iter().collect();
            let posts = self.popular(&visibility, &excluded).await?;
            return Ok(RecommendationResponse::popular(posts));
        }

        tracing::info!(
            %user_id,
            likes = likes.len(),
            comments = comments.len(),
            bookmarks = bookmarks.len(),
            "Weighting interaction history"
        );

        // Weighted, time-decayed relevance per interacted post
        let now = Utc::now();
        let profile = scoring::build_profile(
            user_id,
            now,
            tagged(InteractionKind::Like, likes)
                .chain(tagged(InteractionKind::Comment, comments))
                .chain(tagged(InteractionKind::Bookmark, bookmarks)),
        );
        let interacted: Vec<Uuid> = profile.interacted.iter().copied().collect();

        // The universal exclusion set: interacted plus previously served
        let mut excluded: HashSet<Uuid> = profile.interacted.clone();
        excluded.extend(prior);

        // Neighbors: users who engaged with the same posts
        let (neighbor_likes, neighbor_comments, neighbor_bookmarks) = tokio::try_join!(
            self.store
                .interactions_on_posts(InteractionKind::Like, &interacted, user_id),
            self.store
                .interactions_on_posts(InteractionKind::Comment, &interacted, user_id),
            self.store
                .interactions_on_posts(InteractionKind::Bookmark, &interacted, user_id),
        )?;

        let similarity = scoring::score_neighbors(
            &profile,
            &blocked,
            tagged(InteractionKind::Like, neighbor_likes)
                .chain(tagged(InteractionKind::Comment, neighbor_comments))
                .chain(tagged(InteractionKind::Bookmark, neighbor_bookmarks)),
        );
        let neighbors = scoring::top_neighbors(&similarity, NEIGHBOR_LIMIT);

        if neighbors.is_empty() {
            tracing::info!(%user_id, "No overlapping users, serving popular posts");
            let posts = self.popular(&visibility, &excluded).await?;
            return Ok(RecommendationResponse::popular(posts));
        }

        tracing::info!(%user_id, neighbors = neighbors.len(), "Fetching candidate posts");

        // Candidates: unseen posts the neighbors engaged with
        let exclude: Vec<Uuid> = excluded.iter().copied().collect();
        let (candidate_likes, candidate_comments, candidate_bookmarks) = tokio::try_join!(
            self.store
                .candidate_interactions(InteractionKind::Like, &neighbors, &exclude),
            self.store
                .candidate_interactions(InteractionKind::Comment, &neighbors, &exclude),
            self.store
                .candidate_interactions(InteractionKind::Bookmark, &neighbors, &exclude),
        )?;

        let personalized = scoring::score_candidates(
            &visibility,
            &similarity,
            tagged(InteractionKind::Like, candidate_likes)
                .chain(tagged(InteractionKind::Comment, candidate_comments))
                .chain(tagged(InteractionKind::Bookmark, candidate_bookmarks)),
        );

        // Backfill short lists from the popularity pool
        let (posts, backfilled_count) = if personalized.len() < RESULT_SIZE {
            let pool = self.popular(&visibility, &excluded).await?;
            scoring::backfill(personalized, pool, RESULT_SIZE)
        } else {
            (personalized, 0)
        };

        self.record_served(user_id, &posts).await;

        tracing::info!(
            %user_id,
            count = posts.len(),
            backfilled = backfilled_count,
            "Recommendations ready"
        );

        Ok(RecommendationResponse::new(posts, backfilled_count))
    }

    /// Popularity fallback: recent posts ranked by weighted engagement
    /// counts, filtered to what the requester may see and has not seen
    async fn popular(
        &self,
        visibility: &Visibility<'_>,
        excluded: &HashSet<Uuid>,
    ) -> AppResult<Vec<Post>> {
        let posts = self.store.recent_posts_with_counts(POPULAR_WINDOW).await?;
        Ok(scoring::rank_popular(visibility, excluded, posts))
    }

    /// Persists served post ids so they are excluded from future requests.
    /// A write failure is logged but never voids the computed response;
    /// recommendations are still useful even if exclusion bookkeeping for
    /// the next request is incomplete.
    async fn record_served(&self, user_id: Uuid, posts: &[Post]) {
        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        if ids.is_empty() {
            return;
        }
        if let Err(e) = self.store.record_recommendations(user_id, &ids).await {
            tracing::warn!(%user_id, error = %e, "Failed to record served recommendations");
        }
    }
}

/// Union of both block directions: either side hides content from the other
fn blocked_set(user_id: Uuid, blocks: &[BlockPair]) -> HashSet<Uuid> {
    blocks
        .iter()
        .map(|b| {
            if b.blocker_id == user_id {
                b.blocked_id
            } else {
                b.blocker_id
            }
        })
        .collect()
}

/// Users the requester follows who also follow the requester
fn mutual_set(following: Vec<Uuid>, followers: Vec<Uuid>) -> HashSet<Uuid> {
    let followers: HashSet<Uuid> = followers.into_iter().collect();
    following
        .into_iter()
        .filter(|id| followers.contains(id))
        .collect()
}

fn tagged<T>(
    kind: InteractionKind,
    rows: Vec<T>,
) -> impl Iterator<Item = (InteractionKind, T)> {
    rows.into_iter().map(move |row| (kind, row))
}
