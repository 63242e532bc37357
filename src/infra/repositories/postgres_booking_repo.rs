use crate::domain::{
    models::{booking::{Booking, BookingRecord, BookingStatus}, outbox::OutboxMessage},
    ports::BookingRepository,
};
use crate::error::AppError;
use super::postgres_outbox_repo::enqueue;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

pub struct PostgresBookingRepo {
    pool: PgPool,
}

impl PostgresBookingRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_bookings(records: Vec<BookingRecord>) -> Result<Vec<Booking>, AppError> {
    records.into_iter().map(Booking::try_from).collect()
}

#[async_trait]
impl BookingRepository for PostgresBookingRepo {
    async fn create(&self, booking: &Booking) -> Result<Booking, AppError> {
        let record = sqlx::query_as::<_, BookingRecord>(
            "INSERT INTO bookings (id, salon_id, customer_user_id, start_time, end_time, service_ids, status, total_price, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.salon_id).bind(&booking.customer_user_id)
            .bind(booking.start_time).bind(booking.end_time).bind(Json(&booking.service_ids))
            .bind(booking.status.as_str()).bind(booking.total_price.to_string()).bind(booking.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;
        record.try_into()
    }
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRecord>("SELECT * FROM bookings WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(Booking::try_from).transpose()
    }
    async fn list_by_customer(&self, customer_user_id: &str) -> Result<Vec<Booking>, AppError> {
        let records = sqlx::query_as::<_, BookingRecord>("SELECT * FROM bookings WHERE customer_user_id = $1 ORDER BY start_time ASC")
            .bind(customer_user_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        into_bookings(records)
    }
    async fn list_by_salon(&self, salon_id: &str) -> Result<Vec<Booking>, AppError> {
        let records = sqlx::query_as::<_, BookingRecord>("SELECT * FROM bookings WHERE salon_id = $1 ORDER BY start_time ASC")
            .bind(salon_id).fetch_all(&self.pool).await.map_err(AppError::Database)?;
        into_bookings(records)
    }
    async fn update_status(&self, id: &str, status: BookingStatus) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, BookingRecord>("UPDATE bookings SET status = $1 WHERE id = $2 RETURNING *")
            .bind(status.as_str()).bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(Booking::try_from).transpose()
    }
    async fn confirm_pending(&self, id: &str, messages: Vec<OutboxMessage>) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let result = sqlx::query("UPDATE bookings SET status = 'CONFIRMED' WHERE id = $1 AND status = 'PENDING'")
            .bind(id).execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        for message in &messages {
            enqueue(&mut *tx, message).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }
}
