use salon_booking::{
    api::router::create_router,
    background::relay_once,
    config::{Config, JwtKey},
    domain::models::collaborators::{Salon, ServiceOffering, UserProfile},
    domain::models::payment::{CheckoutSession, PaymentOrder},
    domain::ports::{CheckoutProvider, PaymentOrderRepository, SalonDirectory, ServiceOfferingCatalog, UserDirectory},
    error::AppError,
    infra::factory::sqlite_repositories,
    state::{AppState, Collaborators},
};
use sqlx::{sqlite::{SqliteConnectOptions, SqlitePoolOptions}, Pool, Sqlite};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;
use axum::{
    body::Body,
    http::{Request, header},
    response::Response,
    Router,
};
use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use hmac::{Hmac, Mac};
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub const CUSTOMER: &str = "cust-1";
pub const OWNER: &str = "owner-1";
pub const OTHER_OWNER: &str = "owner-2";
pub const SALON: &str = "salon-1";

pub struct FakeUsers(pub HashMap<String, UserProfile>);

#[async_trait]
impl UserDirectory for FakeUsers {
    async fn get_user(&self, user_id: &str) -> Result<UserProfile, AppError> {
        self.0.get(user_id).cloned()
            .ok_or(AppError::NotFound(format!("User {} not found", user_id)))
    }
}

pub struct FakeSalons(pub Vec<Salon>);

#[async_trait]
impl SalonDirectory for FakeSalons {
    async fn get_salon_by_id(&self, salon_id: &str) -> Result<Salon, AppError> {
        self.0.iter().find(|s| s.salon_id == salon_id).cloned()
            .ok_or(AppError::NotFound(format!("Salon {} not found", salon_id)))
    }

    async fn get_salon_by_owner(&self, owner_user_id: &str) -> Result<Salon, AppError> {
        self.0.iter().find(|s| s.owner_user_id == owner_user_id).cloned()
            .ok_or(AppError::NotFound("No salon found for this owner".into()))
    }
}

pub struct FakeCatalog(pub Vec<ServiceOffering>);

#[async_trait]
impl ServiceOfferingCatalog for FakeCatalog {
    async fn get_offerings_by_ids(&self, ids: &[String]) -> Result<Vec<ServiceOffering>, AppError> {
        Ok(self.0.iter().filter(|o| ids.contains(&o.id)).cloned().collect())
    }
}

/// Session ids are derived from the order id so tests can forge matching events.
#[derive(Default)]
pub struct FakeCheckout {
    pub sessions: Mutex<Vec<(String, String)>>,
}

pub fn session_id_for(order_id: &str) -> String {
    format!("cs_test_{}", order_id)
}

#[async_trait]
impl CheckoutProvider for FakeCheckout {
    async fn create_session(&self, order: &PaymentOrder, customer_email: &str) -> Result<CheckoutSession, AppError> {
        self.sessions.lock().unwrap().push((order.id.clone(), customer_email.to_string()));
        Ok(CheckoutSession {
            id: session_id_for(&order.id),
            url: format!("https://checkout.test/pay/{}", order.id),
        })
    }
}

fn salon(id: &str, name: &str, owner: &str) -> Salon {
    Salon {
        salon_id: id.to_string(),
        name: name.to_string(),
        owner_user_id: owner.to_string(),
        open_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        close_time: NaiveTime::from_hms_opt(18, 0, 0).unwrap(),
        timezone: chrono_tz::UTC,
    }
}

fn offering(id: &str, salon_id: &str, price: &str, minutes: i64) -> ServiceOffering {
    ServiceOffering {
        id: id.to_string(),
        salon_id: salon_id.to_string(),
        price: Decimal::from_str(price).unwrap(),
        duration_minutes: minutes,
    }
}

fn user(id: &str, email: &str, name: Option<(&str, &str)>) -> (String, UserProfile) {
    (id.to_string(), UserProfile {
        user_id: id.to_string(),
        email: email.to_string(),
        first_name: name.map(|(first, _)| first.to_string()),
        last_name: name.map(|(_, last)| last.to_string()),
    })
}

pub fn test_config(database_url: &str) -> Config {
    Config {
        database_url: database_url.to_string(),
        port: 0,
        user_service_url: "http://localhost".to_string(),
        salon_service_url: "http://localhost".to_string(),
        service_offering_service_url: "http://localhost".to_string(),
        payment_service_url: None,
        internal_service_token: None,
        jwt_key: JwtKey::Secret(JWT_SECRET.to_string()),
        jwt_issuer: None,
        jwt_audience: None,
        stripe_api_key: "sk_test".to_string(),
        stripe_api_base: "http://localhost".to_string(),
        stripe_webhook_secret: WEBHOOK_SECRET.to_string(),
        checkout_success_url: "http://localhost/success".to_string(),
        checkout_cancel_url: "http://localhost/cancel".to_string(),
        checkout_currency: "usd".to_string(),
        http_timeout: Duration::from_secs(1),
        retry_max_attempts: 1,
        circuit_failure_threshold: 5,
        circuit_open_duration: Duration::from_secs(30),
        relay_poll_interval: Duration::from_millis(50),
        relay_max_attempts: 3,
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub router: Router,
    pub pool: Pool<Sqlite>,
    pub db_filename: String,
    pub state: Arc<AppState>,
    pub checkout: Arc<FakeCheckout>,
}

#[allow(dead_code)]
impl TestApp {
    pub async fn new() -> Self {
        Self::with_payment_orders(|orders, _| orders).await
    }

    /// Lets a test wrap the payment order store before the app is assembled.
    pub async fn with_payment_orders<F>(wrap: F) -> Self
    where
        F: FnOnce(Arc<dyn PaymentOrderRepository>, Pool<Sqlite>) -> Arc<dyn PaymentOrderRepository>,
    {
        let db_filename = format!("test_{}.db", Uuid::new_v4());
        let db_url = format!("sqlite://{}?mode=rwc", db_filename);

        let connection_options = SqliteConnectOptions::from_str(&db_url)
            .unwrap()
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .connect_with(connection_options)
            .await
            .expect("Failed to connect to test db");

        sqlx::migrate!("./migrations/sqlite")
            .run(&pool)
            .await
            .expect("Failed to migrate test db");

        let checkout = Arc::new(FakeCheckout::default());

        let collaborators = Collaborators {
            users: Arc::new(FakeUsers(HashMap::from([
                user(CUSTOMER, "customer@example.com", Some(("Jane", "Doe"))),
                user(OWNER, "owner@example.com", None),
                user(OTHER_OWNER, "other@example.com", None),
            ]))),
            salons: Arc::new(FakeSalons(vec![
                salon(SALON, "Studio One", OWNER),
                salon("salon-2", "Studio Two", OTHER_OWNER),
            ])),
            catalog: Arc::new(FakeCatalog(vec![
                offering("svc-cut", SALON, "25.00", 30),
                offering("svc-color", SALON, "40.50", 45),
                offering("svc-other", "salon-2", "15.00", 20),
                offering("svc-broken", SALON, "5.00", -15),
                offering("svc-endless", SALON, "5.00", i64::MAX),
            ])),
            checkout: checkout.clone(),
            payment_links: None,
        };

        let mut repositories = sqlite_repositories(pool.clone());
        repositories.payment_orders = wrap(repositories.payment_orders, pool.clone());

        let state = Arc::new(AppState::assemble(test_config(&db_url), repositories, collaborators));

        let router = create_router(state.clone());

        Self {
            router,
            pool,
            db_filename,
            state,
            checkout,
        }
    }

    pub fn token_for(&self, user_id: &str) -> String {
        let claims = json!({
            "sub": user_id,
            "exp": (Utc::now().timestamp() + 3600) as usize,
        });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).unwrap()
    }

    pub async fn send(&self, method: &str, uri: &str, user_id: Option<&str>, body: Option<Value>) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user_id) = user_id {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", self.token_for(user_id)));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.router.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    pub async fn create_booking(&self, start_time: &str, service_ids: &[&str]) -> Response {
        self.send(
            "POST",
            "/api/v1/bookings",
            Some(CUSTOMER),
            Some(json!({ "startTime": start_time, "serviceIds": service_ids, "paymentMethod": "STRIPE" })),
        ).await
    }

    pub async fn post_webhook(&self, payload: &str, signature: &str) -> Response {
        self.router.clone().oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/payments/webhook")
                .header("Stripe-Signature", signature)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap()
        ).await.unwrap()
    }

    /// Runs the relay until no message is due.
    pub async fn drain_outbox(&self) -> usize {
        let mut total = 0;
        for _ in 0..10 {
            let handled = relay_once(&self.state).await.unwrap();
            if handled == 0 {
                break;
            }
            total += handled;
        }
        total
    }

    pub async fn only_booking_id(&self) -> String {
        sqlx::query_scalar("SELECT id FROM bookings")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn order_for_booking(&self, booking_id: &str) -> (String, String) {
        sqlx::query_as("SELECT id, status FROM payment_orders WHERE booking_id = ?")
            .bind(booking_id)
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }

    pub async fn count(&self, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(&self.pool).await.unwrap()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.db_filename);
        let _ = std::fs::remove_file(format!("{}-wal", self.db_filename));
        let _ = std::fs::remove_file(format!("{}-shm", self.db_filename));
    }
}

#[allow(dead_code)]
pub fn sign_webhook(payload: &str, secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.{}", timestamp, payload).as_bytes());
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}

#[allow(dead_code)]
pub fn checkout_event(kind: &str, session_id: &str, order_id: &str, payment_status: &str) -> String {
    json!({
        "id": format!("evt_{}", Uuid::new_v4().simple()),
        "type": kind,
        "data": {
            "object": {
                "id": session_id,
                "object": "checkout.session",
                "payment_status": payment_status,
                "metadata": { "orderId": order_id }
            }
        }
    }).to_string()
}

/// Order id from a link minted by `FakeCheckout`.
#[allow(dead_code)]
pub fn order_id_from_link(body: &Value) -> String {
    body["paymentLinkUrl"].as_str().unwrap()
        .rsplit('/')
        .next()
        .unwrap()
        .to_string()
}

#[allow(dead_code)]
pub async fn parse_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[allow(dead_code)]
pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
