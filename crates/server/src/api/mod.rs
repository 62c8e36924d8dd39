//! # HTTP API
//!
//! Versioned routes over the memory stores and the aggregator.

pub mod chat;
pub mod error;
pub mod facts;
pub mod memory;
pub mod profile;

use axum::{
    http::header,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use petmind_core::aggregation::MemorySources;
use petmind_core::config::MemoryConfig;
use petmind_core::memory::{
    Embedder, FactsMemorySource, MemoryError, SqliteChatHistory, SqliteProfileStore,
    SqliteVectorIndex,
};
use petmind_core::state::PetmindDb;
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

/// Shared handler state; every store wraps the same database
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<MemoryConfig>,
    pub sources: MemorySources,
    pub chat: Arc<SqliteChatHistory>,
    pub profiles: Arc<SqliteProfileStore>,
    pub index: Arc<SqliteVectorIndex>,
    pub embedder: Arc<dyn Embedder>,
}

impl AppState {
    pub fn new(db: &PetmindDb, config: MemoryConfig) -> Result<Self, MemoryError> {
        let embedder = config.embedding.build()?;
        let chat = Arc::new(SqliteChatHistory::new(db));
        let profiles = Arc::new(SqliteProfileStore::new(db));
        let index = Arc::new(SqliteVectorIndex::new(db, config.collection.clone()));

        let sources = MemorySources {
            facts: FactsMemorySource::new(embedder.clone(), index.clone()),
            chat_history: chat.clone(),
            profile: profiles.clone(),
        };

        Ok(Self {
            config: Arc::new(config),
            sources,
            chat,
            profiles,
            index,
            embedder,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Server is up", body = HealthResponse))
)]
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PetMind API",
        version = "1.0.0",
        description = "Conversational memory aggregation for a pet-advice agent"
    ),
    paths(
        health,
        memory::aggregate,
        chat::get_history,
        chat::append_message,
        profile::get_profile,
        profile::record_profile,
        facts::add_fact,
        facts::search_facts
    ),
    components(
        schemas(
            HealthResponse,
            error::ErrorBody,
            memory::AggregateRequest,
            memory::AggregateResponse,
            chat::ChatHistoryResponse,
            chat::AppendMessageRequest,
            profile::ProfileSummaryResponse,
            profile::RecordProfileRequest,
            facts::AddFactRequest,
            facts::AddFactResponse,
            facts::SearchFactsRequest,
            facts::SearchFactsResponse
        )
    ),
    tags(
        (name = "health", description = "Liveness"),
        (name = "memory", description = "Memory aggregation"),
        (name = "chat", description = "Chat history"),
        (name = "profile", description = "Pet profile questionnaire"),
        (name = "facts", description = "Breed fact collection")
    )
)]
pub struct ApiDoc;

async fn serve_openapi() -> impl IntoResponse {
    let doc = ApiDoc::openapi().to_json().unwrap_or_default();
    ([(header::CONTENT_TYPE, "application/json")], doc)
}

pub fn router(state: AppState) -> Router {
    let memory_routes = Router::new().route("/aggregate", post(memory::aggregate));

    let chat_routes = Router::new().route(
        "/:user_id",
        get(chat::get_history).post(chat::append_message),
    );

    let profile_routes = Router::new().route(
        "/:user_id",
        get(profile::get_profile).post(profile::record_profile),
    );

    let fact_routes = Router::new()
        .route("/", post(facts::add_fact))
        .route("/search", post(facts::search_facts));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1/memory", memory_routes)
        .nest("/api/v1/chat", chat_routes)
        .nest("/api/v1/profile", profile_routes)
        .nest("/api/v1/facts", fact_routes)
        .route("/api/v1/openapi.json", get(serve_openapi))
        .with_state(state)
}
