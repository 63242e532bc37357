use crate::domain::{
    models::{outbox::OutboxMessage, payment::{PaymentOrder, PaymentOrderRecord, PaymentOrderStatus}},
    ports::PaymentOrderRepository,
};
use crate::error::AppError;
use super::postgres_outbox_repo::enqueue;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresPaymentRepo {
    pool: PgPool,
}

impl PostgresPaymentRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentOrderRepository for PostgresPaymentRepo {
    async fn create(&self, order: &PaymentOrder) -> Result<PaymentOrder, AppError> {
        let record = sqlx::query_as::<_, PaymentOrderRecord>(
            "INSERT INTO payment_orders (id, booking_id, customer_user_id, salon_id, amount, payment_method, session_id, status, version, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
             RETURNING *"
        )
            .bind(&order.id).bind(&order.booking_id).bind(&order.customer_user_id).bind(&order.salon_id)
            .bind(order.amount.to_string()).bind(order.payment_method.as_str()).bind(&order.session_id)
            .bind(order.status.as_str()).bind(order.version).bind(order.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;
        record.try_into()
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<PaymentOrder>, AppError> {
        sqlx::query_as::<_, PaymentOrderRecord>("SELECT * FROM payment_orders WHERE id = $1")
            .bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .map(PaymentOrder::try_from).transpose()
    }

    async fn set_session_id(&self, id: &str, session_id: &str) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE payment_orders SET session_id = $1, version = version + 1 WHERE id = $2 AND session_id IS NULL"
        )
            .bind(session_id).bind(id)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!("Payment order {} already has a checkout session", id)));
        }
        Ok(())
    }

    async fn apply_status(
        &self,
        id: &str,
        expected_version: i64,
        status: PaymentOrderStatus,
        message: Option<OutboxMessage>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;
        let result = sqlx::query(
            "UPDATE payment_orders SET status = $1, version = version + 1 WHERE id = $2 AND version = $3"
        )
            .bind(status.as_str()).bind(id).bind(expected_version)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if result.rows_affected() == 0 {
            return Ok(false);
        }
        if let Some(message) = &message {
            enqueue(&mut *tx, message).await?;
        }
        tx.commit().await.map_err(AppError::Database)?;
        Ok(true)
    }
}
