use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::extractors::auth::AuthUser;
use crate::api::dtos::requests::{CreateBookingRequest, StatusQuery};
use crate::api::dtos::responses::{BookedSlot, BookingResponse};
use crate::domain::services::booking_service::CreateBookingCommand;
use crate::error::AppError;
use std::sync::Arc;
use chrono::NaiveDate;
use tracing::info;

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let command = CreateBookingCommand::try_from(payload)?;
    info!(services = command.service_ids.len(), "create_booking: start {}", command.start_time);

    let link = state.booking_service.create_booking(&user.user_id, command).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.booking_service.get_booking(&booking_id, &user.user_id).await?;
    Ok(Json(BookingResponse::from(booking)))
}

pub async fn list_customer_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_service.list_customer_bookings(&user.user_id).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect::<Vec<_>>()))
}

pub async fn list_salon_bookings(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let bookings = state.booking_service.list_salon_bookings(&user.user_id).await?;
    Ok(Json(bookings.into_iter().map(BookingResponse::from).collect::<Vec<_>>()))
}

pub async fn get_salon_report(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let report = state.booking_service.get_salon_booking_report(&user.user_id).await?;
    Ok(Json(report))
}

pub async fn update_booking_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(booking_id): Path<String>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let status = query.parse()?;
    let booking = state.booking_service
        .update_booking_status(&booking_id, status, &user.user_id)
        .await?;
    Ok(Json(BookingResponse::from(booking)))
}

pub async fn get_booked_slots(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(date): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))?;

    let slots: Vec<BookedSlot> = state.booking_service
        .booked_slots(&user.user_id, date)
        .await?
        .into_iter()
        .map(BookedSlot::from)
        .collect();
    Ok(Json(slots))
}
