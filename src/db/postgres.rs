use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        AuthorProfile, BlockPair, CandidateInteraction, InteractionKind, NeighborInteraction,
        PopularPost, Post, UserInteraction,
    },
};

use super::RecommendationStore;

/// Creates a PostgreSQL connection pool
///
/// Establishes a pool of database connections for efficient reuse.
/// The pool automatically manages connection lifecycle and limits.
pub async fn create_pool(database_url: &str) -> anyhow::Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await?;

    Ok(pool)
}

/// Maps an interaction kind to its backing table. Only these static names
/// are ever interpolated into SQL; all values go through bind parameters.
fn interaction_table(kind: InteractionKind) -> &'static str {
    match kind {
        InteractionKind::Like => "likes",
        InteractionKind::Comment => "comments",
        InteractionKind::Bookmark => "bookmarks",
    }
}

/// `RecommendationStore` backed by PostgreSQL
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct BlockRow {
    blocker_id: Uuid,
    blocked_id: Uuid,
}

#[derive(FromRow)]
struct UserInteractionRow {
    post_id: Uuid,
    post_author_id: Uuid,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct NeighborRow {
    user_id: Uuid,
    post_id: Uuid,
}

/// Flat candidate row; `into_candidate` rebuilds the nested post model
#[derive(FromRow)]
struct CandidateRow {
    neighbor_id: Uuid,
    post_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    username: String,
    avatar_url: Option<String>,
    is_private: bool,
    tags: Vec<String>,
}

impl CandidateRow {
    fn into_candidate(self) -> CandidateInteraction {
        CandidateInteraction {
            neighbor_id: self.neighbor_id,
            post: Post {
                id: self.post_id,
                author_id: self.author_id,
                content: self.content,
                created_at: self.created_at,
                author: AuthorProfile {
                    id: self.author_id,
                    username: self.username,
                    avatar_url: self.avatar_url,
                    is_private: self.is_private,
                },
                tags: self.tags,
            },
        }
    }
}

#[derive(FromRow)]
struct PopularRow {
    post_id: Uuid,
    author_id: Uuid,
    content: String,
    created_at: DateTime<Utc>,
    username: String,
    avatar_url: Option<String>,
    is_private: bool,
    tags: Vec<String>,
    like_count: i64,
    comment_count: i64,
    bookmark_count: i64,
}

impl PopularRow {
    fn into_popular(self) -> PopularPost {
        PopularPost {
            post: Post {
                id: self.post_id,
                author_id: self.author_id,
                content: self.content,
                created_at: self.created_at,
                author: AuthorProfile {
                    id: self.author_id,
                    username: self.username,
                    avatar_url: self.avatar_url,
                    is_private: self.is_private,
                },
                tags: self.tags,
            },
            like_count: self.like_count,
            comment_count: self.comment_count,
            bookmark_count: self.bookmark_count,
        }
    }
}

#[async_trait]
impl RecommendationStore for PostgresStore {
    async fn blocks_involving(&self, user_id: Uuid) -> AppResult<Vec<BlockPair>> {
        let rows: Vec<BlockRow> = sqlx::query_as(
            "SELECT blocker_id, blocked_id FROM blocks WHERE blocker_id = $1 OR blocked_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| BlockPair {
                blocker_id: r.blocker_id,
                blocked_id: r.blocked_id,
            })
            .collect())
    }

    async fn following_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT following_id FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn follower_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids = sqlx::query_scalar("SELECT follower_id FROM follows WHERE following_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    async fn interactions_by_user(
        &self,
        user_id: Uuid,
        kind: InteractionKind,
    ) -> AppResult<Vec<UserInteraction>> {
        let sql = format!(
            "SELECT i.post_id, i.created_at, p.author_id AS post_author_id \
             FROM {} i \
             JOIN posts p ON p.id = i.post_id \
             WHERE i.user_id = $1",
            interaction_table(kind)
        );

        let rows: Vec<UserInteractionRow> = sqlx::query_as(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| UserInteraction {
                post_id: r.post_id,
                post_author_id: r.post_author_id,
                created_at: r.created_at,
            })
            .collect())
    }

    async fn recommended_post_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        let ids =
            sqlx::query_scalar("SELECT post_id FROM post_recommendations WHERE user_id = $1")
                .bind(user_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(ids)
    }

    async fn interactions_on_posts(
        &self,
        kind: InteractionKind,
        post_ids: &[Uuid],
        exclude_user: Uuid,
    ) -> AppResult<Vec<NeighborInteraction>> {
        let sql = format!(
            "SELECT user_id, post_id FROM {} WHERE post_id = ANY($1) AND user_id <> $2",
            interaction_table(kind)
        );

        let rows: Vec<NeighborRow> = sqlx::query_as(&sql)
            .bind(post_ids)
            .bind(exclude_user)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| NeighborInteraction {
                user_id: r.user_id,
                post_id: r.post_id,
            })
            .collect())
    }

    async fn candidate_interactions(
        &self,
        kind: InteractionKind,
        user_ids: &[Uuid],
        exclude_posts: &[Uuid],
    ) -> AppResult<Vec<CandidateInteraction>> {
        let sql = format!(
            "SELECT i.user_id AS neighbor_id, p.id AS post_id, p.author_id, p.content, \
                    p.created_at, pr.username, pr.avatar_url, pr.is_private, \
                    COALESCE(array_agg(t.name) FILTER (WHERE t.name IS NOT NULL), '{{}}') AS tags \
             FROM {} i \
             JOIN posts p ON p.id = i.post_id \
             JOIN profiles pr ON pr.id = p.author_id \
             LEFT JOIN post_tags pt ON pt.post_id = p.id \
             LEFT JOIN tags t ON t.id = pt.tag_id \
             WHERE i.user_id = ANY($1) AND i.post_id <> ALL($2) \
             GROUP BY i.user_id, p.id, p.author_id, p.content, p.created_at, \
                      pr.username, pr.avatar_url, pr.is_private \
             ORDER BY p.created_at DESC",
            interaction_table(kind)
        );

        let rows: Vec<CandidateRow> = sqlx::query_as(&sql)
            .bind(user_ids)
            .bind(exclude_posts)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CandidateRow::into_candidate).collect())
    }

    async fn recent_posts_with_counts(&self, limit: i64) -> AppResult<Vec<PopularPost>> {
        let rows: Vec<PopularRow> = sqlx::query_as(
            "SELECT p.id AS post_id, p.author_id, p.content, p.created_at, \
                    pr.username, pr.avatar_url, pr.is_private, \
                    COALESCE(array_agg(t.name) FILTER (WHERE t.name IS NOT NULL), '{}') AS tags, \
                    (SELECT COUNT(*) FROM likes l WHERE l.post_id = p.id) AS like_count, \
                    (SELECT COUNT(*) FROM comments c WHERE c.post_id = p.id) AS comment_count, \
                    (SELECT COUNT(*) FROM bookmarks b WHERE b.post_id = p.id) AS bookmark_count \
             FROM posts p \
             JOIN profiles pr ON pr.id = p.author_id \
             LEFT JOIN post_tags pt ON pt.post_id = p.id \
             LEFT JOIN tags t ON t.id = pt.tag_id \
             GROUP BY p.id, p.author_id, p.content, p.created_at, \
                      pr.username, pr.avatar_url, pr.is_private \
             ORDER BY p.created_at DESC \
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PopularRow::into_popular).collect())
    }

    async fn record_recommendations(&self, user_id: Uuid, post_ids: &[Uuid]) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO post_recommendations (user_id, post_id) \
             SELECT $1, unnest($2::uuid[])",
        )
        .bind(user_id)
        .bind(post_ids)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
