use std::sync::Arc;

use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use shared::responses::ApiResponse;
use utoipa::ToSchema;

use crate::{
    api::state::NotificationAppState,
    domain::classifier::{Classification, ShiftInterval},
    error::NotificationServiceError,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ClassifyShiftRequest {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[utoipa::path(
    post,
    path = "/api/v1/shifts/classify",
    tag = "Shifts",
    operation_id = "classify_shift",
    request_body = ClassifyShiftRequest,
    responses(
        (status = 200, description = "Duration and journey of the shift", body = ApiResponse<Classification>),
        (status = 400, description = "End is not after start")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn classify(
    State(state): State<Arc<NotificationAppState>>,
    Json(req): Json<ClassifyShiftRequest>,
) -> Result<Json<ApiResponse<Classification>>, NotificationServiceError> {
    let interval = ShiftInterval::from_utc(req.start, req.end, state.timezone)?;

    Ok(Json(ApiResponse::ok(interval.classify())))
}
