use crate::domain::{models::outbox::OutboxMessage, ports::OutboxRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use chrono::{DateTime, Duration, Utc};

pub struct PostgresOutboxRepo {
    pool: PgPool,
}

impl PostgresOutboxRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

pub(super) async fn enqueue(conn: &mut PgConnection, message: &OutboxMessage) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO outbox_messages (id, queue, payload, status, attempts, available_at, claimed_at, last_error, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
    )
        .bind(&message.id)
        .bind(&message.queue)
        .bind(&message.payload)
        .bind(&message.status)
        .bind(message.attempts)
        .bind(message.available_at)
        .bind(message.claimed_at)
        .bind(&message.last_error)
        .bind(message.created_at)
        .execute(conn)
        .await
        .map_err(AppError::Database)?;
    Ok(())
}

#[async_trait]
impl OutboxRepository for PostgresOutboxRepo {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        enqueue(&mut *conn, message).await
    }

    async fn claim_batch(&self, limit: i32, visibility: Duration) -> Result<Vec<OutboxMessage>, AppError> {
        let now = Utc::now();
        let messages = sqlx::query_as::<_, OutboxMessage>(
            r#"
            UPDATE outbox_messages
            SET status = 'PROCESSING', claimed_at = $1
            WHERE id IN (
                SELECT id
                FROM outbox_messages
                WHERE (status = 'PENDING' AND available_at <= $1)
                   OR (status = 'PROCESSING' AND claimed_at <= $2)
                ORDER BY available_at ASC
                LIMIT $3
                FOR UPDATE SKIP LOCKED
            )
            RETURNING *
            "#
        )
            .bind(now)
            .bind(now - visibility)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)?;

        Ok(messages)
    }

    async fn mark_delivered(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_messages SET status = 'DELIVERED', last_error = NULL WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_retry(&self, id: &str, attempts: i32, available_at: DateTime<Utc>, error: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_messages SET status = 'PENDING', attempts = $1, available_at = $2, claimed_at = NULL, last_error = $3 WHERE id = $4")
            .bind(attempts)
            .bind(available_at)
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_dead(&self, id: &str, attempts: i32, error: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_messages SET status = 'DEAD', attempts = $1, last_error = $2 WHERE id = $3")
            .bind(attempts)
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<OutboxMessage>, AppError> {
        sqlx::query_as::<_, OutboxMessage>("SELECT * FROM outbox_messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
