use crate::domain::{models::outbox::OutboxMessage, ports::OutboxRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};
use chrono::{DateTime, Duration, Utc};

pub struct SqliteOutboxRepo {
    pool: SqlitePool,
}

impl SqliteOutboxRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

/// Inserts on the caller's connection so the message commits with the
/// caller's own writes.
pub(super) async fn enqueue(conn: &mut SqliteConnection, message: &OutboxMessage) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO outbox_messages (id, queue, payload, status, attempts, available_at, claimed_at, last_error, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
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
impl OutboxRepository for SqliteOutboxRepo {
    async fn publish(&self, message: &OutboxMessage) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await.map_err(AppError::Database)?;
        enqueue(&mut *conn, message).await
    }

    async fn claim_batch(&self, limit: i32, visibility: Duration) -> Result<Vec<OutboxMessage>, AppError> {
        let now = Utc::now();
        let stale = now - visibility;
        sqlx::query_as::<_, OutboxMessage>(
            "UPDATE outbox_messages SET status = 'PROCESSING', claimed_at = ?
             WHERE id IN (
                SELECT id FROM outbox_messages
                WHERE (status = 'PENDING' AND available_at <= ?)
                   OR (status = 'PROCESSING' AND claimed_at <= ?)
                ORDER BY available_at ASC
                LIMIT ?
             )
             RETURNING *"
        )
            .bind(now)
            .bind(now)
            .bind(stale)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn mark_delivered(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_messages SET status = 'DELIVERED', last_error = NULL WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn mark_retry(&self, id: &str, attempts: i32, available_at: DateTime<Utc>, error: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE outbox_messages SET status = 'PENDING', attempts = ?, available_at = ?, claimed_at = NULL, last_error = ? WHERE id = ?")
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
        sqlx::query("UPDATE outbox_messages SET status = 'DEAD', attempts = ?, last_error = ? WHERE id = ?")
            .bind(attempts)
            .bind(error)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<OutboxMessage>, AppError> {
        sqlx::query_as::<_, OutboxMessage>("SELECT * FROM outbox_messages WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(AppError::Database)
    }
}
