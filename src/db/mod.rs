pub mod postgres;
pub mod store;

pub use postgres::create_pool;
pub use postgres::PostgresStore;
pub use store::RecommendationStore;

#[cfg(test)]
pub use store::MockRecommendationStore;
