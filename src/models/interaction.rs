use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Post;

/// The three engagement signals the engine understands.
///
/// Each kind carries a fixed weight reflecting how strong a signal it is:
/// a bookmark indicates intent to return, a comment costs effort, a like
/// is the cheapest gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Like,
    Comment,
    Bookmark,
}

impl InteractionKind {
    /// Base weight applied wherever this kind of interaction is scored
    pub fn weight(self) -> f64 {
        match self {
            InteractionKind::Like => 1.0,
            InteractionKind::Comment => 2.0,
            InteractionKind::Bookmark => 3.0,
        }
    }
}

/// One historical interaction by the requesting user, joined with the
/// target post's author so self-interactions can be excluded from scoring
#[derive(Debug, Clone, PartialEq)]
pub struct UserInteraction {
    pub post_id: Uuid,
    pub post_author_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Another user's interaction with one of the requester's interacted posts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeighborInteraction {
    pub user_id: Uuid,
    pub post_id: Uuid,
}

/// A neighbor's interaction with a candidate post, carrying the full post
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateInteraction {
    pub neighbor_id: Uuid,
    pub post: Post,
}

/// A recent post with denormalized engagement counts, used for
/// popularity-based fallback scoring
#[derive(Debug, Clone, PartialEq)]
pub struct PopularPost {
    pub post: Post,
    pub like_count: i64,
    pub comment_count: i64,
    pub bookmark_count: i64,
}

/// A directed block relationship; filtering treats it as symmetric
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockPair {
    pub blocker_id: Uuid,
    pub blocked_id: Uuid,
}
