use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum_test::TestServer;
use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use pulse_api::api::{create_router, AppState};
use pulse_api::db::RecommendationStore;
use pulse_api::error::AppResult;
use pulse_api::models::{
    AuthorProfile, BlockPair, CandidateInteraction, InteractionKind, NeighborInteraction,
    PopularPost, Post, UserInteraction,
};

/// In-memory store double backing the API under test
#[derive(Default)]
struct StubStore {
    blocks: Vec<BlockPair>,
    /// (follower, following) pairs
    follows: Vec<(Uuid, Uuid)>,
    /// (user, post, created_at) per interaction kind
    likes: Vec<(Uuid, Uuid, DateTime<Utc>)>,
    comments: Vec<(Uuid, Uuid, DateTime<Utc>)>,
    bookmarks: Vec<(Uuid, Uuid, DateTime<Utc>)>,
    posts: HashMap<Uuid, Post>,
    /// (user, post) recommendation records, seeded and appended
    recorded: Mutex<Vec<(Uuid, Uuid)>>,
}

impl StubStore {
    fn interactions(&self, kind: InteractionKind) -> &[(Uuid, Uuid, DateTime<Utc>)] {
        match kind {
            InteractionKind::Like => &self.likes,
            InteractionKind::Comment => &self.comments,
            InteractionKind::Bookmark => &self.bookmarks,
        }
    }

    fn count_for(&self, kind: InteractionKind, post_id: Uuid) -> i64 {
        self.interactions(kind)
            .iter()
            .filter(|(_, p, _)| *p == post_id)
            .count() as i64
    }
}

#[async_trait]
impl RecommendationStore for StubStore {
    async fn blocks_involving(&self, user_id: Uuid) -> AppResult<Vec<BlockPair>> {
        Ok(self
            .blocks
            .iter()
            .filter(|b| b.blocker_id == user_id || b.blocked_id == user_id)
            .copied()
            .collect())
    }

    async fn following_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .follows
            .iter()
            .filter(|(follower, _)| *follower == user_id)
            .map(|(_, following)| *following)
            .collect())
    }

    async fn follower_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .follows
            .iter()
            .filter(|(_, following)| *following == user_id)
            .map(|(follower, _)| *follower)
            .collect())
    }

    async fn interactions_by_user(
        &self,
        user_id: Uuid,
        kind: InteractionKind,
    ) -> AppResult<Vec<UserInteraction>> {
        Ok(self
            .interactions(kind)
            .iter()
            .filter(|(u, _, _)| *u == user_id)
            .filter_map(|(_, post_id, created_at)| {
                self.posts.get(post_id).map(|post| UserInteraction {
                    post_id: *post_id,
                    post_author_id: post.author_id,
                    created_at: *created_at,
                })
            })
            .collect())
    }

    async fn recommended_post_ids(&self, user_id: Uuid) -> AppResult<Vec<Uuid>> {
        Ok(self
            .recorded
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, _)| *u == user_id)
            .map(|(_, p)| *p)
            .collect())
    }

    async fn interactions_on_posts(
        &self,
        kind: InteractionKind,
        post_ids: &[Uuid],
        exclude_user: Uuid,
    ) -> AppResult<Vec<NeighborInteraction>> {
        Ok(self
            .interactions(kind)
            .iter()
            .filter(|(u, p, _)| *u != exclude_user && post_ids.contains(p))
            .map(|(u, p, _)| NeighborInteraction {
                user_id: *u,
                post_id: *p,
            })
            .collect())
    }

    async fn candidate_interactions(
        &self,
        kind: InteractionKind,
        user_ids: &[Uuid],
        exclude_posts: &[Uuid],
    ) -> AppResult<Vec<CandidateInteraction>> {
        Ok(self
            .interactions(kind)
            .iter()
            .filter(|(u, p, _)| user_ids.contains(u) && !exclude_posts.contains(p))
            .filter_map(|(u, p, _)| {
                self.posts.get(p).map(|post| CandidateInteraction {
                    neighbor_id: *u,
                    post: post.clone(),
                })
            })
            .collect())
    }

    async fn recent_posts_with_counts(&self, limit: i64) -> AppResult<Vec<PopularPost>> {
        let mut posts: Vec<&Post> = self.posts.values().collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(posts
            .into_iter()
            .take(limit as usize)
            .map(|post| PopularPost {
                post: post.clone(),
                like_count: self.count_for(InteractionKind::Like, post.id),
                comment_count: self.count_for(InteractionKind::Comment, post.id),
                bookmark_count: self.count_for(InteractionKind::Bookmark, post.id),
            })
            .collect())
    }

    async fn record_recommendations(&self, user_id: Uuid, post_ids: &[Uuid]) -> AppResult<()> {
        let mut recorded = self.recorded.lock().unwrap();
        recorded.extend(post_ids.iter().map(|p| (user_id, *p)));
        Ok(())
    }
}

fn make_post(author_id: Uuid, is_private: bool, age_minutes: i64) -> Post {
    Post {
        id: Uuid::new_v4(),
        author_id,
        content: "content".to_string(),
        created_at: Utc::now() - Duration::minutes(age_minutes),
        author: AuthorProfile {
            id: author_id,
            username: format!("user-{}", &author_id.to_string()[..8]),
            avatar_url: None,
            is_private,
        },
        tags: vec![],
    }
}

fn create_test_server(store: StubStore) -> TestServer {
    let state = AppState::new(Arc::new(store));
    let app = create_router(state);
    TestServer::new(app).unwrap()
}

fn recommendations_path(user_id: Uuid) -> String {
    format!("/api/v1/users/{}/recommendations", user_id)
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(StubStore::default());
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_invalid_user_id_is_rejected() {
    let server = create_test_server(StubStore::default());
    let response = server.get("/api/v1/users/not-a-uuid/recommendations").await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cold_start_serves_popularity_ranking() {
    let user = Uuid::new_v4();
    let author = Uuid::new_v4();
    let liker = Uuid::new_v4();

    let quiet = make_post(author, false, 10);
    let busy = make_post(author, false, 20);
    let own = make_post(user, false, 5);

    let mut store = StubStore::default();
    // 2 bookmarks (6.0) beat 3 likes (3.0)
    store.likes = (0..3)
        .map(|_| (Uuid::new_v4(), quiet.id, Utc::now()))
        .collect();
    store.bookmarks = (0..2)
        .map(|_| (Uuid::new_v4(), busy.id, Utc::now()))
        .collect();
    // A single like by another user is not an interaction of the requester
    store.likes.push((liker, own.id, Utc::now()));
    store.posts = HashMap::from([
        (quiet.id, quiet.clone()),
        (busy.id, busy.clone()),
        (own.id, own.clone()),
    ]);

    let server = create_test_server(store);
    let response = server.get(&recommendations_path(user)).await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["backfilled"], false);
    assert_eq!(body["recommendation_count"], 2);
    // The requester's own post never appears
    assert_eq!(body["recommendations"][0]["id"], busy.id.to_string());
    assert_eq!(body["recommendations"][1]["id"], quiet.id.to_string());
    assert!(body.get("backfilled_count").is_none());
}

#[tokio::test]
async fn test_neighbor_overlap_drives_personalized_results() {
    // A liked P1 and bookmarked P2; D liked P1 and P3. P3 is proposed to
    // A; P1 and P2 stay excluded; popular posts pad the short list.
    let user_a = Uuid::new_v4();
    let user_d = Uuid::new_v4();
    let author_b = Uuid::new_v4();
    let author_c = Uuid::new_v4();

    let p1 = make_post(author_b, false, 60);
    let p2 = make_post(author_c, false, 90);
    let p3 = make_post(author_c, false, 30);
    let padding = make_post(author_b, false, 15);

    let mut store = StubStore::default();
    store.likes = vec![
        (user_a, p1.id, Utc::now() - Duration::days(10)),
        (user_d, p1.id, Utc::now()),
        (user_d, p3.id, Utc::now()),
    ];
    store.bookmarks = vec![(user_a, p2.id, Utc::now() - Duration::days(40))];
    store.comments = vec![(Uuid::new_v4(), padding.id, Utc::now())];
    store.posts = HashMap::from([
        (p1.id, p1.clone()),
        (p2.id, p2.clone()),
        (p3.id, p3.clone()),
        (padding.id, padding.clone()),
    ]);

    let server = create_test_server(store);
    let response = server.get(&recommendations_path(user_a)).await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let ids: Vec<String> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_str().unwrap().to_string())
        .collect();

    // The personalized pick leads, the popular post backfills
    assert_eq!(ids[0], p3.id.to_string());
    assert!(ids.contains(&padding.id.to_string()));
    assert!(!ids.contains(&p1.id.to_string()));
    assert!(!ids.contains(&p2.id.to_string()));
    assert_eq!(body["backfilled"], true);
    assert_eq!(body["backfilled_count"], 1);
}

#[tokio::test]
async fn test_served_posts_are_recorded_and_suppressed() {
    let user_a = Uuid::new_v4();
    let user_d = Uuid::new_v4();
    let author = Uuid::new_v4();

    let p1 = make_post(author, false, 60);
    let p3 = make_post(author, false, 30);

    let mut store = StubStore::default();
    store.likes = vec![
        (user_a, p1.id, Utc::now()),
        (user_d, p1.id, Utc::now()),
        (user_d, p3.id, Utc::now()),
    ];
    store.posts = HashMap::from([(p1.id, p1.clone()), (p3.id, p3.clone())]);

    let server = create_test_server(store);

    let first: serde_json::Value = server.get(&recommendations_path(user_a)).await.json();
    assert_eq!(first["recommendations"][0]["id"], p3.id.to_string());

    // P3 is now a recommendation record, so a second request cannot
    // re-serve it and no other candidate exists
    let second: serde_json::Value = server.get(&recommendations_path(user_a)).await.json();
    assert_eq!(second["recommendation_count"], 0);
}

#[tokio::test]
async fn test_blocked_author_is_hidden_both_directions() {
    let user = Uuid::new_v4();
    let blocked_author = Uuid::new_v4();
    let open_author = Uuid::new_v4();

    let hidden = make_post(blocked_author, false, 10);
    let visible = make_post(open_author, false, 20);

    let mut store = StubStore::default();
    // The author blocked the requester; the direction must not matter
    store.blocks = vec![BlockPair {
        blocker_id: blocked_author,
        blocked_id: user,
    }];
    store.likes = vec![
        (Uuid::new_v4(), hidden.id, Utc::now()),
        (Uuid::new_v4(), visible.id, Utc::now()),
    ];
    store.posts = HashMap::from([(hidden.id, hidden.clone()), (visible.id, visible.clone())]);

    let server = create_test_server(store);
    let body: serde_json::Value = server.get(&recommendations_path(user)).await.json();

    assert_eq!(body["recommendation_count"], 1);
    assert_eq!(body["recommendations"][0]["id"], visible.id.to_string());
}

#[tokio::test]
async fn test_private_author_requires_mutual_follow() {
    let user = Uuid::new_v4();
    let private_author = Uuid::new_v4();
    let post = make_post(private_author, true, 10);

    let mut store = StubStore::default();
    store.likes = vec![(Uuid::new_v4(), post.id, Utc::now())];
    store.posts = HashMap::from([(post.id, post.clone())]);

    // One-way follow is not enough
    store.follows = vec![(user, private_author)];
    let server = create_test_server(store);
    let body: serde_json::Value = server.get(&recommendations_path(user)).await.json();
    assert_eq!(body["recommendation_count"], 0);

    // Mutual follow grants visibility
    let mut store = StubStore::default();
    store.likes = vec![(Uuid::new_v4(), post.id, Utc::now())];
    store.posts = HashMap::from([(post.id, post.clone())]);
    store.follows = vec![(user, private_author), (private_author, user)];
    let server = create_test_server(store);
    let body: serde_json::Value = server.get(&recommendations_path(user)).await.json();
    assert_eq!(body["recommendation_count"], 1);
    assert_eq!(body["recommendations"][0]["id"], post.id.to_string());
}
