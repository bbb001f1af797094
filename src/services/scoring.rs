use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    AuthorProfile, CandidateInteraction, InteractionKind, NeighborInteraction, PopularPost, Post,
    UserInteraction,
};

/// Exponential decay rate per day of age; ln(2)/30, so an interaction's
/// influence halves roughly every 30 days
pub const DECAY_RATE_PER_DAY: f64 = 0.023;

/// How many similar users to consider when fetching candidates
pub const NEIGHBOR_LIMIT: usize = 20;

/// Minimum and maximum size of the returned recommendation list
pub const RESULT_SIZE: usize = 20;

/// How many recent posts the popularity fallback considers
pub const POPULAR_WINDOW: i64 = 50;

/// Weight multiplier for an interaction's age. 1.0 at age zero, ~0.5 at 30
/// days. Older signals fade smoothly rather than via a hard cutoff.
pub fn recency_factor(created_at: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let age_days = (now - created_at).num_seconds() as f64 / 86_400.0;
    (-DECAY_RATE_PER_DAY * age_days).exp()
}

/// The requesting user's weighted interaction history
#[derive(Debug, Default)]
pub struct InteractionProfile {
    /// Post id -> accumulated decayed relevance score
    pub scores: HashMap<Uuid, f64>,
    /// Every post the user interacted with, regardless of authorship
    pub interacted: HashSet<Uuid>,
}

/// Folds raw interactions into an interaction profile.
///
/// Self-authored posts are recorded as interacted (they must never be
/// re-served) but contribute no relevance score, so a user's own posts do
/// not bias the neighbor search.
pub fn build_profile(
    user_id: Uuid,
    now: DateTime<Utc>,
    interactions: impl IntoIterator<Item = (InteractionKind, UserInteraction)>,
) -> InteractionProfile {
    interactions
        .into_iter()
        .fold(InteractionProfile::default(), |mut profile, (kind, it)| {
            profile.interacted.insert(it.post_id);
            if it.post_author_id != user_id {
                let score = kind.weight() * recency_factor(it.created_at, now);
                *profile.scores.entry(it.post_id).or_insert(0.0) += score;
            }
            profile
        })
}

/// Per-request visibility rules: who the requester may see content from
#[derive(Debug, Clone, Copy)]
pub struct Visibility<'a> {
    pub user_id: Uuid,
    /// Users blocked in either direction
    pub blocked: &'a HashSet<Uuid>,
    /// Users with a mutual follow relationship with the requester
    pub mutual: &'a HashSet<Uuid>,
}

impl Visibility<'_> {
    /// Whether a post by this author may appear in the requester's results.
    /// Private profiles are visible only through a mutual follow.
    pub fn allows(&self, author: &AuthorProfile) -> bool {
        if author.id == self.user_id || self.blocked.contains(&author.id) {
            return false;
        }
        !author.is_private || self.mutual.contains(&author.id)
    }
}

/// Accumulates similarity scores for users who interacted with the
/// requester's posts. Each overlap contributes the requester's relevance
/// score for that post times the overlap's interaction weight. Blocked
/// users accumulate nothing.
pub fn score_neighbors(
    profile: &InteractionProfile,
    blocked: &HashSet<Uuid>,
    rows: impl IntoIterator<Item = (InteractionKind, NeighborInteraction)>,
) -> HashMap<Uuid, f64> {
    rows.into_iter()
        .fold(HashMap::new(), |mut similarity, (kind, row)| {
            if blocked.contains(&row.user_id) {
                return similarity;
            }
            let post_weight = profile.scores.get(&row.post_id).copied().unwrap_or(0.0);
            *similarity.entry(row.user_id).or_insert(0.0) += post_weight * kind.weight();
            similarity
        })
}

/// Selects the most similar users, highest score first. Ties break on user
/// id so the ordering is deterministic.
pub fn top_neighbors(similarity: &HashMap<Uuid, f64>, limit: usize) -> Vec<Uuid> {
    let mut ranked: Vec<(Uuid, f64)> = similarity.iter().map(|(u, s)| (*u, *s)).collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    ranked.into_iter().take(limit).map(|(u, _)| u).collect()
}

/// Scores candidate posts by the similarity of the neighbors who surfaced
/// them, applies block/self/privacy filters, and returns the top ranked
/// posts. One representative post object is kept per id; post content is
/// invariant across interaction kinds, so last write wins.
pub fn score_candidates(
    visibility: &Visibility<'_>,
    similarity: &HashMap<Uuid, f64>,
    rows: impl IntoIterator<Item = (InteractionKind, CandidateInteraction)>,
) -> Vec<Post> {
    let (scores, posts) = rows.into_iter().fold(
        (HashMap::new(), HashMap::new()),
        |(mut scores, mut posts), (kind, row)| {
            if visibility.allows(&row.post.author) {
                let neighbor_similarity =
                    similarity.get(&row.neighbor_id).copied().unwrap_or(0.0);
                *scores.entry(row.post.id).or_insert(0.0) += neighbor_similarity * kind.weight();
                posts.insert(row.post.id, row.post);
            }
            (scores, posts)
        },
    );

    rank(scores, posts, RESULT_SIZE)
}

/// Scores recent posts by aggregate engagement counts using the same weight
/// table as personalized scoring, after filtering out excluded posts and
/// authors the requester may not see.
pub fn rank_popular(
    visibility: &Visibility<'_>,
    excluded: &HashSet<Uuid>,
    posts: Vec<PopularPost>,
) -> Vec<Post> {
    let (scores, posts) = posts
        .into_iter()
        .filter(|p| !excluded.contains(&p.post.id) && visibility.allows(&p.post.author))
        .fold(
            (HashMap::new(), HashMap::new()),
            |(mut scores, mut by_id), p| {
                let score = p.like_count as f64 * InteractionKind::Like.weight()
                    + p.comment_count as f64 * InteractionKind::Comment.weight()
                    + p.bookmark_count as f64 * InteractionKind::Bookmark.weight();
                scores.insert(p.post.id, score);
                by_id.insert(p.post.id, p.post);
                (scores, by_id)
            },
        );

    rank(scores, posts, RESULT_SIZE)
}

/// Appends posts from the fallback pool until the list reaches the target
/// size or the pool runs out, skipping posts already present. Returns the
/// final list and how many posts were appended.
pub fn backfill(mut posts: Vec<Post>, pool: Vec<Post>, target: usize) -> (Vec<Post>, usize) {
    let present: HashSet<Uuid> = posts.iter().map(|p| p.id).collect();
    let mut added = 0;

    for post in pool {
        if posts.len() >= target {
            break;
        }
        if present.contains(&post.id) {
            continue;
        }
        posts.push(post);
        added += 1;
    }

    (posts, added)
}

/// Orders post ids by score descending (ties broken by id for determinism)
/// and resolves them to their post objects
fn rank(scores: HashMap<Uuid, f64>, mut posts: HashMap<Uuid, Post>, limit: usize) -> Vec<Post> {
    let mut ranked: Vec<(Uuid, f64)> = scores.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    ranked
        .into_iter()
        .take(limit)
        .filter_map(|(id, _)| posts.remove(&id))
        .collect()
}
