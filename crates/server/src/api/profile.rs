use axum::{
    extract::{Path, State},
    Json,
};
use petmind_core::memory::{NewProfile, ProfileRecord, ProfileStore};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{ApiError, ErrorBody};
use super::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct ProfileSummaryResponse {
    /// Zero or one line
    pub summary: Vec<String>,
}

/// Questionnaire answers
#[derive(Debug, Deserialize, ToSchema)]
pub struct RecordProfileRequest {
    /// Breed
    pub category: String,
    pub age: i64,
    pub name: String,
    /// Temperament
    #[serde(default)]
    pub descriptor: String,
}

impl From<RecordProfileRequest> for NewProfile {
    fn from(req: RecordProfileRequest) -> Self {
        NewProfile {
            category: req.category,
            age: req.age,
            name: req.name,
            descriptor: req.descriptor,
            timestamp: None,
        }
    }
}

/// Latest profile summary for a user
#[utoipa::path(
    get,
    path = "/api/v1/profile/{user_id}",
    tag = "profile",
    params(("user_id" = String, Path, description = "User identifier")),
    responses(
        (
            status = 200,
            description = "Summary, empty when no profile exists",
            body = ProfileSummaryResponse
        ),
        (status = 503, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ProfileSummaryResponse>, ApiError> {
    let summary = state.profiles.latest_summary(&user_id).await?;
    Ok(Json(ProfileSummaryResponse { summary }))
}

/// Record questionnaire answers
#[utoipa::path(
    post,
    path = "/api/v1/profile/{user_id}",
    tag = "profile",
    params(("user_id" = String, Path, description = "User identifier")),
    request_body = RecordProfileRequest,
    responses(
        (status = 200, description = "Stored record"),
        (status = 400, description = "Blank user", body = ErrorBody)
    )
)]
pub async fn record_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(req): Json<RecordProfileRequest>,
) -> Result<Json<ProfileRecord>, ApiError> {
    let record = state.profiles.record(&user_id, &req.into()).await?;
    tracing::info!("Recorded profile {} for user '{}'", record.id, user_id);
    Ok(Json(record))
}
