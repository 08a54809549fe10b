use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use tracing::{info, instrument};

use super::types::HealthResponse;
use super::{ApiError, AppState};
use crate::identity::AuthenticatedUser;
use crate::presenter::{present, UsagePayload};

type ApiResult<T> = Result<Json<T>, ApiError>;

/// `GET {prefix}usage`. The extractor has already resolved the identity (or answered 401).
#[instrument(skip_all, fields(request_id = %uuid::Uuid::new_v4()))]
pub async fn get_usage(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> ApiResult<UsagePayload> {
    let AuthenticatedUser(identity) = user;

    let result = state.adapter.fetch(&identity).await?;
    let payload = present(&result);

    info!(
        percent_used = payload.percent_used,
        over_quota = payload.over_quota,
        "Usage served"
    );

    Ok(Json(payload))
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "usage-quota".to_string(),
        backend: state.adapter.backend_name().to_string(),
    })
}
