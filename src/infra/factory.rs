use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use anyhow::Context;
use sqlx::{postgres::{PgPoolOptions, PgConnectOptions}, sqlite::{SqlitePoolOptions, SqliteJournalMode, SqliteConnectOptions}};
use sqlx::{PgPool, SqlitePool, ConnectOptions};
use tracing::info;
use tracing::log::LevelFilter;

use crate::config::Config;
use crate::domain::ports::PaymentLinkClient;
use crate::state::{AppState, Collaborators, Repositories};
use crate::infra::checkout::stripe_checkout::{StripeCheckoutProvider, StripeSettings};
use crate::infra::clients::{
    collaborator_http::CollaboratorHttp,
    http_payment_client::HttpPaymentClient,
    http_salon_client::HttpSalonClient,
    http_service_offering_client::HttpServiceOfferingClient,
    http_user_client::HttpUserClient,
    resilience::{CircuitBreaker, Resilience, RetryPolicy},
};
use crate::infra::repositories::{
    postgres_booking_repo::PostgresBookingRepo, postgres_notification_repo::PostgresNotificationRepo,
    postgres_outbox_repo::PostgresOutboxRepo, postgres_payment_repo::PostgresPaymentRepo,
    sqlite_booking_repo::SqliteBookingRepo, sqlite_notification_repo::SqliteNotificationRepo,
    sqlite_outbox_repo::SqliteOutboxRepo, sqlite_payment_repo::SqlitePaymentRepo,
};

pub async fn bootstrap_state(config: &Config) -> anyhow::Result<AppState> {
    let database_url = &config.database_url;

    let repos = if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        info!("Initializing PostgreSQL connection...");

        let opts: PgConnectOptions = database_url.parse().context("Invalid Postgres URL")?;
        let opts = opts.log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect_with(opts)
            .await
            .context("Failed to connect to Postgres")?;

        sqlx::migrate!("./migrations/postgres")
            .run(&pool)
            .await
            .context("Failed to run Postgres migrations")?;

        postgres_repositories(pool)
    } else {
        info!("Initializing SQLite connection with WAL Mode...");

        let opts = SqliteConnectOptions::from_str(database_url)
            .context("Invalid SQLite connection string")?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .log_statements(LevelFilter::Debug)
            .log_slow_statements(LevelFilter::Warn, Duration::from_millis(500));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await
            .context("Failed to connect to SQLite")?;

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .context("Failed to run SQLite migrations")?;

        sqlite_repositories(pool)
    };

    let collaborators = http_collaborators(config)?;
    Ok(AppState::assemble(config.clone(), repos, collaborators))
}

pub fn sqlite_repositories(pool: SqlitePool) -> Repositories {
    Repositories {
        bookings: Arc::new(SqliteBookingRepo::new(pool.clone())),
        payment_orders: Arc::new(SqlitePaymentRepo::new(pool.clone())),
        outbox: Arc::new(SqliteOutboxRepo::new(pool.clone())),
        notifications: Arc::new(SqliteNotificationRepo::new(pool)),
    }
}

pub fn postgres_repositories(pool: PgPool) -> Repositories {
    Repositories {
        bookings: Arc::new(PostgresBookingRepo::new(pool.clone())),
        payment_orders: Arc::new(PostgresPaymentRepo::new(pool.clone())),
        outbox: Arc::new(PostgresOutboxRepo::new(pool.clone())),
        notifications: Arc::new(PostgresNotificationRepo::new(pool)),
    }
}

fn collaborator(config: &Config, name: &'static str, base_url: &str, attempts: usize) -> anyhow::Result<CollaboratorHttp> {
    let resilience = Resilience::new(
        name,
        CircuitBreaker::new(config.circuit_failure_threshold, config.circuit_open_duration),
        RetryPolicy::with_attempts(attempts),
    );
    CollaboratorHttp::new(base_url, config.internal_service_token.clone(), config.http_timeout, resilience)
        .with_context(|| format!("Failed to build HTTP client for {}", name))
}

/// Every collaborator owns its own breaker. Payment creation is not
/// idempotent on the remote side, so it is never retried.
pub fn http_collaborators(config: &Config) -> anyhow::Result<Collaborators> {
    let retries = config.retry_max_attempts;

    let payment_links = match &config.payment_service_url {
        Some(url) => {
            info!("Payment links are requested from {}", url);
            let http = collaborator(config, "payment-service", url, 1)?;
            Some(Arc::new(HttpPaymentClient::new(http)) as Arc<dyn PaymentLinkClient>)
        }
        None => None,
    };

    let checkout = StripeCheckoutProvider::new(
        StripeSettings {
            api_base: config.stripe_api_base.clone(),
            api_key: config.stripe_api_key.clone(),
            currency: config.checkout_currency.clone(),
            success_url: config.checkout_success_url.clone(),
            cancel_url: config.checkout_cancel_url.clone(),
        },
        config.http_timeout,
    ).context("Failed to build Stripe client")?;

    Ok(Collaborators {
        users: Arc::new(HttpUserClient::new(collaborator(config, "user-service", &config.user_service_url, retries)?)),
        salons: Arc::new(HttpSalonClient::new(collaborator(config, "salon-service", &config.salon_service_url, retries)?)),
        catalog: Arc::new(HttpServiceOfferingClient::new(
            collaborator(config, "service-offering-service", &config.service_offering_service_url, retries)?,
        )),
        checkout: Arc::new(checkout),
        payment_links,
    })
}
