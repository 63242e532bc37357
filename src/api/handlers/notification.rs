use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::error::AppError;
use std::sync::Arc;

pub async fn list_user_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let notifications = state.notification_service.list_for_user(&user.user_id).await?;
    Ok(Json(notifications))
}

pub async fn list_salon_notifications(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let notifications = state.notification_service.list_for_salon_owner(&user.user_id).await?;
    Ok(Json(notifications))
}

pub async fn mark_notification_read(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let notification = state.notification_service.mark_read(&notification_id, &user.user_id).await?;
    Ok(Json(notification))
}

pub async fn delete_notification(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.notification_service.delete(&notification_id, &user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
