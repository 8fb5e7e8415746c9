use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use shared::{responses::ApiResponse, types::NotificationRecipient};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    api::state::NotificationAppState, domain::recipient::RecipientStateUpdate,
    error::NotificationServiceError,
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddRecipientRequest {
    pub address: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectionRequest {
    pub selected: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PermanentRequest {
    pub active: bool,
}

#[utoipa::path(
    get,
    path = "/api/v1/recipients",
    tag = "Recipients",
    operation_id = "list_recipients",
    responses(
        (status = 200, description = "All recipients, active or not", body = ApiResponse<Vec<NotificationRecipient>>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn find_all(
    State(state): State<Arc<NotificationAppState>>,
) -> Result<Json<ApiResponse<Vec<NotificationRecipient>>>, NotificationServiceError> {
    let recipients = state.recipient_service.list().await?;
    Ok(Json(ApiResponse::ok(recipients)))
}

#[utoipa::path(
    get,
    path = "/api/v1/recipients/active",
    tag = "Recipients",
    operation_id = "list_active_recipients",
    responses(
        (status = 200, description = "Recipients that receive automatic notifications", body = ApiResponse<Vec<NotificationRecipient>>)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn find_active(
    State(state): State<Arc<NotificationAppState>>,
) -> Result<Json<ApiResponse<Vec<NotificationRecipient>>>, NotificationServiceError> {
    let recipients = state.recipient_service.list_active().await?;
    Ok(Json(ApiResponse::ok(recipients)))
}

#[utoipa::path(
    post,
    path = "/api/v1/recipients",
    tag = "Recipients",
    operation_id = "add_recipient",
    request_body = AddRecipientRequest,
    responses(
        (status = 201, description = "Recipient added, inactive", body = ApiResponse<NotificationRecipient>),
        (status = 400, description = "Invalid address")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn create(
    State(state): State<Arc<NotificationAppState>>,
    Json(req): Json<AddRecipientRequest>,
) -> Result<impl IntoResponse, NotificationServiceError> {
    let recipient = state.recipient_service.add_recipient(&req.address).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(recipient))))
}

#[utoipa::path(
    put,
    path = "/api/v1/recipients/{id}/selection",
    tag = "Recipients",
    operation_id = "set_recipient_selection",
    params(
        ("id" = Uuid, Path, description = "Recipient ID")
    ),
    request_body = SelectionRequest,
    responses(
        (status = 200, description = "Selection updated", body = ApiResponse<NotificationRecipient>),
        (status = 404, description = "Recipient not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn set_selection(
    State(state): State<Arc<NotificationAppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<SelectionRequest>,
) -> Result<Json<ApiResponse<NotificationRecipient>>, NotificationServiceError> {
    let recipient = state
        .recipient_service
        .set_selection(id, req.selected)
        .await?;
    Ok(Json(ApiResponse::ok(recipient)))
}

#[utoipa::path(
    put,
    path = "/api/v1/recipients/{id}/permanent",
    tag = "Recipients",
    operation_id = "set_recipient_permanent",
    params(
        ("id" = Uuid, Path, description = "Recipient ID")
    ),
    request_body = PermanentRequest,
    responses(
        (status = 200, description = "Permanent flag updated", body = ApiResponse<NotificationRecipient>),
        (status = 404, description = "Recipient not found")
    )
)]
#[tracing::instrument(skip(state))]
pub async fn set_permanent(
    State(state): State<Arc<NotificationAppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<PermanentRequest>,
) -> Result<Json<ApiResponse<NotificationRecipient>>, NotificationServiceError> {
    let recipient = state
        .recipient_service
        .set_permanent_active(id, req.active)
        .await?;
    Ok(Json(ApiResponse::ok(recipient)))
}

#[utoipa::path(
    put,
    path = "/api/v1/recipients/batch",
    tag = "Recipients",
    operation_id = "batch_update_recipients",
    request_body = Vec<RecipientStateUpdate>,
    responses(
        (status = 204, description = "All updates applied"),
        (status = 404, description = "At least one recipient not found")
    )
)]
#[tracing::instrument(skip(state, updates), fields(count = updates.len()))]
pub async fn batch_update(
    State(state): State<Arc<NotificationAppState>>,
    Json(updates): Json<Vec<RecipientStateUpdate>>,
) -> Result<StatusCode, NotificationServiceError> {
    state.recipient_service.update_recipients(updates).await?;
    Ok(StatusCode::NO_CONTENT)
}
