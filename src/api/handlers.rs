use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{error::AppResult, models::RecommendationResponse};

use super::AppState;

/// Health check endpoint
pub async fn health_check() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Handler for personalized post recommendations
pub async fn get_recommendations(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(%user_id, "Generating recommendations");

    let response = state.recommendations.recommend(user_id).await?;

    tracing::info!(
        %user_id,
        count = response.recommendation_count,
        backfilled = response.backfilled,
        "Recommendations served"
    );

    Ok(Json(response))
}
