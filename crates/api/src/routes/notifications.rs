//! Notification lifecycle and query routes.

use axum::extract::{Path, Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use herald_common::error::AppError;
use herald_common::types::{
    DeliveryRecord, DeliverySummary, DispatchSummary, Notification, RecipientNotification,
};
use herald_engine::ledger::DeliveryLedger;
use herald_engine::notification::{CreateNotificationParams, NotificationService};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/notifications", post(create_notification))
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread-count", get(unread_count))
        .route("/api/notifications/{id}", get(get_notification))
        .route("/api/notifications/{id}", delete(delete_notification))
        .route("/api/notifications/{id}/resend", post(resend_notification))
        .route("/api/notifications/{id}/read", post(mark_read))
        .route("/api/notifications/{id}/deliveries", get(list_deliveries))
}

#[derive(Debug, Serialize)]
struct CreateNotificationResponse {
    notification_id: Uuid,
    summary: DispatchSummary,
}

/// POST /api/notifications — Create a notification and dispatch it.
async fn create_notification(
    State(state): State<AppState>,
    Json(params): Json<CreateNotificationParams>,
) -> Result<Json<CreateNotificationResponse>, AppError> {
    let (notification_id, summary) =
        NotificationService::create_and_send(&state.pool, &state.engine, &params).await?;
    Ok(Json(CreateNotificationResponse {
        notification_id,
        summary,
    }))
}

#[derive(Debug, Deserialize)]
struct RecipientQuery {
    recipient_id: Uuid,
    school_id: Uuid,
    #[serde(default)]
    page: u32,
}

/// GET /api/notifications — List notifications visible to a recipient.
async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> Result<Json<Vec<RecipientNotification>>, AppError> {
    let notifications = NotificationService::list_for_recipient(
        &state.pool,
        query.recipient_id,
        query.school_id,
        query.page,
    )
    .await?;
    Ok(Json(notifications))
}

/// GET /api/notifications/unread-count — Unread count for a recipient.
async fn unread_count(
    State(state): State<AppState>,
    Query(query): Query<RecipientQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let unread =
        DeliveryLedger::unread_count(&state.pool, query.recipient_id, query.school_id).await?;
    Ok(Json(serde_json::json!({ "unread": unread })))
}

/// GET /api/notifications/:id — Fetch one notification.
async fn get_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Notification>, AppError> {
    let notification = NotificationService::get(&state.pool, id).await?;
    Ok(Json(notification))
}

/// DELETE /api/notifications/:id — Delete a notification and its ledger.
async fn delete_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, AppError> {
    let deleted = NotificationService::delete(&state.pool, id).await?;
    if deleted {
        Ok(Json(serde_json::json!({"deleted": true})))
    } else {
        Err(AppError::NotFound(format!("Notification {} not found", id)))
    }
}

/// POST /api/notifications/:id/resend — Re-run dispatch.
async fn resend_notification(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DispatchSummary>, AppError> {
    let summary = NotificationService::resend(&state.pool, &state.engine, id).await?;
    Ok(Json(summary))
}

#[derive(Debug, Deserialize)]
struct MarkReadParams {
    recipient_id: Uuid,
}

/// POST /api/notifications/:id/read — Mark read for a recipient.
async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(params): Json<MarkReadParams>,
) -> Result<Json<DeliveryRecord>, AppError> {
    // 404 before touching the ledger so an unknown id doesn't surface as a
    // storage error.
    NotificationService::get(&state.pool, id).await?;
    let record =
        DeliveryLedger::mark_read(&state.pool, id, params.recipient_id, Utc::now()).await?;
    Ok(Json(record))
}

#[derive(Debug, Serialize)]
struct DeliveriesResponse {
    summary: DeliverySummary,
    records: Vec<DeliveryRecord>,
}

/// GET /api/notifications/:id/deliveries — Delivery summary and records.
async fn list_deliveries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<DeliveriesResponse>, AppError> {
    let summary = NotificationService::delivery_summary(&state.pool, id).await?;
    let records = DeliveryLedger::list_for_notification(&state.pool, id).await?;
    Ok(Json(DeliveriesResponse { summary, records }))
}
