use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public profile of a post author, as exposed alongside recommended posts
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthorProfile {
    pub id: Uuid,
    pub username: String,
    pub avatar_url: Option<String>,
    /// Private profiles are visible only to mutual followers
    pub is_private: bool,
}

/// A post as returned to the client, with author profile and tags denormalized
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub author: AuthorProfile,
    pub tags: Vec<String>,
}
