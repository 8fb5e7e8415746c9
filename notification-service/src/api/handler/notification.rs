use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use shared::{responses::ApiResponse, types::ChangeOperation};

use crate::{
    api::state::NotificationAppState,
    domain::dispatcher::{DispatchOutcome, ManualNotification},
    error::NotificationServiceError,
};

#[utoipa::path(
    post,
    path = "/api/v1/notifications/dispatch",
    tag = "Notifications",
    operation_id = "dispatch_change_notification",
    request_body = ChangeOperation,
    responses(
        (status = 200, description = "Sent or skipped", body = ApiResponse<DispatchOutcome>),
        (status = 500, description = "Report could not be rendered"),
        (status = 502, description = "Backend failure; data carries intended_recipients")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn dispatch(
    State(state): State<Arc<NotificationAppState>>,
    Json(operation): Json<ChangeOperation>,
) -> Result<Json<ApiResponse<DispatchOutcome>>, NotificationServiceError> {
    let outcome = state
        .dispatcher
        .dispatch_change_notification(operation)
        .await?;
    Ok(Json(ApiResponse::ok(outcome)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/dispatch/async",
    tag = "Notifications",
    operation_id = "spawn_change_notification",
    request_body = ChangeOperation,
    responses(
        (status = 202, description = "Dispatch accepted and running in the background")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn dispatch_async(
    State(state): State<Arc<NotificationAppState>>,
    Json(operation): Json<ChangeOperation>,
) -> impl IntoResponse {
    let schedule_id = operation.target_id;
    state.dispatcher.spawn_dispatch(operation);
    (StatusCode::ACCEPTED, Json(ApiResponse::ok(schedule_id)))
}

#[utoipa::path(
    post,
    path = "/api/v1/notifications/manual",
    tag = "Notifications",
    operation_id = "send_manual_notification",
    request_body = ManualNotification,
    responses(
        (status = 200, description = "Sent or skipped", body = ApiResponse<DispatchOutcome>),
        (status = 400, description = "Invalid address"),
        (status = 502, description = "Transport failure")
    )
)]
#[tracing::instrument(skip(state, notification), fields(count = notification.addresses.len()))]
pub async fn manual(
    State(state): State<Arc<NotificationAppState>>,
    Json(notification): Json<ManualNotification>,
) -> Result<Json<ApiResponse<DispatchOutcome>>, NotificationServiceError> {
    let outcome = state.dispatcher.send_manual(notification).await?;
    Ok(Json(ApiResponse::ok(outcome)))
}
