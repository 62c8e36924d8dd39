use axum::{extract::State, Json};
use petmind_core::memory::{Embedder, FactDocument};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{ApiError, ErrorBody};
use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddFactRequest {
    pub content: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AddFactResponse {
    pub id: i64,
    pub collection: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SearchFactsRequest {
    pub query: String,
    /// Defaults to the configured `facts_k`
    #[serde(default)]
    pub k: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SearchFactsResponse {
    #[schema(value_type = Vec<Object>)]
    pub documents: Vec<FactDocument>,
}

/// Embed and store a fact document
#[utoipa::path(
    post,
    path = "/api/v1/facts",
    tag = "facts",
    request_body = AddFactRequest,
    responses(
        (status = 200, description = "Stored document id", body = AddFactResponse),
        (status = 400, description = "Empty content", body = ErrorBody),
        (status = 503, description = "Embedder or index unavailable", body = ErrorBody)
    )
)]
pub async fn add_fact(
    State(state): State<AppState>,
    Json(req): Json<AddFactRequest>,
) -> Result<Json<AddFactResponse>, ApiError> {
    if req.content.trim().is_empty() {
        return Err(ApiError::bad_request("content must not be empty"));
    }
    let embedding = state.embedder.embed(&req.content).await?;
    let id = state.index.add_document(&req.content, embedding).await?;
    Ok(Json(AddFactResponse {
        id,
        collection: state.index.collection().to_string(),
    }))
}

/// Similarity search over the fact collection
#[utoipa::path(
    post,
    path = "/api/v1/facts/search",
    tag = "facts",
    request_body = SearchFactsRequest,
    responses(
        (status = 200, description = "Documents, most similar first", body = SearchFactsResponse),
        (status = 400, description = "Non-positive k", body = ErrorBody)
    )
)]
pub async fn search_facts(
    State(state): State<AppState>,
    Json(req): Json<SearchFactsRequest>,
) -> Result<Json<SearchFactsResponse>, ApiError> {
    let k = req.k.unwrap_or(state.config.facts_k);
    let documents = state.sources.facts.search(req.query, k).await?;
    Ok(Json(SearchFactsResponse { documents }))
}
