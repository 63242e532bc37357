use std::sync::Arc;
use chrono::Utc;
use rand::Rng;
use tokio::time::sleep;
use tracing::{debug, error, info, warn, info_span, Instrument};
use crate::domain::models::outbox::OutboxMessage;
use crate::error::AppError;
use crate::state::AppState;

const BATCH_SIZE: i32 = 10;
const BASE_BACKOFF_SECS: i64 = 2;
const MAX_BACKOFF_SECS: i64 = 300;

/// Claimed messages not acknowledged within this window become visible again.
pub fn visibility_timeout() -> chrono::Duration {
    chrono::Duration::seconds(60)
}

pub async fn start_event_relay(state: Arc<AppState>) {
    info!("Starting outbox relay...");

    loop {
        match relay_once(&state).await {
            Ok(0) => {}
            Ok(handled) => debug!(handled, "Relay batch finished"),
            Err(e) => error!("Failed to claim outbox messages: {:?}", e),
        }
        sleep(state.config.relay_poll_interval).await;
    }
}

/// Claims one batch and delivers it. Returns how many messages were handled.
pub async fn relay_once(state: &AppState) -> Result<usize, AppError> {
    let messages = state.outbox_repo.claim_batch(BATCH_SIZE, visibility_timeout()).await?;
    let handled = messages.len();

    for message in messages {
        let span = info_span!(
            "outbox_message",
            message_id = %message.id,
            queue = %message.queue,
            attempt = message.attempts + 1
        );
        deliver(state, message).instrument(span).await;
    }

    Ok(handled)
}

async fn deliver(state: &AppState, message: OutboxMessage) {
    let attempts = message.attempts + 1;

    let Some(consumer) = state.consumer_for(&message.queue) else {
        warn!("No consumer bound to queue, dead-lettering");
        if let Err(e) = state.outbox_repo.mark_dead(&message.id, attempts, "No consumer bound to queue").await {
            error!("Failed to dead-letter message: {:?}", e);
        }
        return;
    };

    let outcome = match consumer.consume(&message).await {
        Ok(()) => {
            info!("Message delivered");
            state.outbox_repo.mark_delivered(&message.id).await
        }
        // A payload that does not decode will never succeed.
        Err(AppError::Validation(reason)) => {
            error!("Rejecting malformed message: {}", reason);
            state.outbox_repo.mark_dead(&message.id, attempts, &reason).await
        }
        Err(e) => {
            let reason = e.to_string();
            if attempts >= state.config.relay_max_attempts {
                error!(attempts, "Delivery failed, giving up: {}", reason);
                state.outbox_repo.mark_dead(&message.id, attempts, &reason).await
            } else {
                let jitter = chrono::Duration::milliseconds(rand::thread_rng().gen_range(0..500));
                let delay = backoff(attempts) + jitter;
                warn!(attempts, delay_ms = delay.num_milliseconds(), "Delivery failed, will retry: {}", reason);
                state.outbox_repo.mark_retry(&message.id, attempts, Utc::now() + delay, &reason).await
            }
        }
    };

    if let Err(e) = outcome {
        error!("Failed to record delivery outcome: {:?}", e);
    }
}

/// 2s, 4s, 8s ... capped at five minutes.
pub fn backoff(attempts: i32) -> chrono::Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    let secs = BASE_BACKOFF_SECS.saturating_mul(2_i64.pow(exponent));
    chrono::Duration::seconds(secs.min(MAX_BACKOFF_SECS))
}
