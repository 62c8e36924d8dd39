//! # Memory API
//!
//! One-shot aggregation of facts, chat history and profile for a question.

use axum::{extract::State, Json};
use petmind_core::aggregation::{AggregationReport, AggregationStrategy, MemoryAggregator};
use petmind_core::state::AgentState;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{ApiError, ErrorBody};
use super::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct AggregateRequest {
    pub question: String,
    pub user_id: String,
    /// Search facts by this vector instead of embedding the question
    #[serde(default)]
    pub embedded_question: Option<Vec<f32>>,
    /// `parallel` or `sequential`; the server default when omitted
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub strategy: Option<AggregationStrategy>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AggregateResponse {
    #[schema(value_type = Object)]
    pub state: AgentState,
    #[schema(value_type = Object)]
    pub report: AggregationReport,
}

/// Aggregate memory for a question
#[utoipa::path(
    post,
    path = "/api/v1/memory/aggregate",
    tag = "memory",
    request_body = AggregateRequest,
    responses(
        (status = 200, description = "Aggregated agent state", body = AggregateResponse),
        (status = 400, description = "Invalid question, user or k", body = ErrorBody),
        (status = 503, description = "Every memory source failed", body = ErrorBody),
        (status = 504, description = "Aggregation timed out", body = ErrorBody)
    )
)]
pub async fn aggregate(
    State(state): State<AppState>,
    Json(req): Json<AggregateRequest>,
) -> Result<Json<AggregateResponse>, ApiError> {
    let strategy = req.strategy.unwrap_or(state.config.strategy);
    let aggregator = MemoryAggregator::new(state.sources.clone(), strategy)
        .with_facts_k(state.config.facts_k)
        .with_request_timeout(state.config.request_timeout());

    let mut seed = AgentState::new(req.question, req.user_id)
        .with_session_store(state.config.db_path.clone());
    if let Some(vector) = req.embedded_question {
        seed = seed.with_embedded_question(vector);
    }

    let (agent_state, report) = aggregator.aggregate_with_report(seed).await?;
    Ok(Json(AggregateResponse {
        state: agent_state,
        report,
    }))
}
