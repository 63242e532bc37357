use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Validation failed")]
    InvalidFields(BTreeMap<String, String>),
    #[error("Dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("Payment gateway error: {0}")]
    PaymentGateway(String),
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    /// Stable machine-readable code exposed in every problem response.
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) | AppError::InvalidSignature => "VALIDATION",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::Conflict(_) => "CONFLICT",
            AppError::DependencyUnavailable(_) => "DEPENDENCY_UNAVAILABLE",
            AppError::PaymentGateway(_) => "PAYMENT_GATEWAY_ERROR",
            AppError::Database(_) | AppError::Internal | AppError::InternalWithMsg(_) => "INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::InvalidFields(_) | AppError::InvalidSignature => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::DependencyUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::PaymentGateway(_)
            | AppError::Database(_)
            | AppError::Internal
            | AppError::InternalWithMsg(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn is_unique_violation(&self) -> bool {
        if let AppError::Database(e) = self
            && let Some(db_err) = e.as_database_error() {
            let code = db_err.code().unwrap_or_default();
            // 2067 = SQLite Unique Constraint
            // 23505 = PostgreSQL Unique Violation
            return code == "2067" || code == "23505";
        }
        false
    }
}

fn problem(status: StatusCode, category: &str, title: &str, detail: String, errors: Value) -> Response {
    let body = Json(json!({
        "type": "about:blank",
        "title": title,
        "status": status.as_u16(),
        "category": category,
        "detail": detail,
        "timestamp": Utc::now().to_rfc3339(),
        "errors": errors,
    }));
    (status, body).into_response()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_unique_violation() {
            return problem(
                StatusCode::CONFLICT,
                "CONFLICT",
                "Conflict",
                "Resource already exists (duplicate entry)".to_string(),
                Value::Null,
            );
        }

        let status = self.status();
        let category = self.category();

        let (title, detail, errors) = match &self {
            AppError::Database(e) => {
                error!("Database error: {:?}", e);
                ("Internal Server Error", "Internal server error".to_string(), Value::Null)
            }
            AppError::NotFound(msg) => ("Resource Not Found", msg.clone(), Value::Null),
            AppError::Unauthorized => ("Unauthorized", "Unauthorized".to_string(), Value::Null),
            AppError::Forbidden(msg) => ("Forbidden", msg.clone(), Value::Null),
            AppError::Conflict(msg) => ("Conflict", msg.clone(), Value::Null),
            AppError::Validation(msg) => ("Validation Failed", msg.clone(), Value::Null),
            AppError::InvalidFields(fields) => ("Validation Failed", "Validation failed".to_string(), json!(fields)),
            AppError::InvalidSignature => ("Invalid Signature", "Invalid signature".to_string(), Value::Null),
            AppError::DependencyUnavailable(msg) => {
                warn!("Dependency unavailable: {}", msg);
                ("Service Unavailable", msg.clone(), Value::Null)
            }
            AppError::PaymentGateway(msg) => {
                error!("Payment gateway error: {}", msg);
                ("Payment Gateway Error", "Error while creating payment link".to_string(), Value::Null)
            }
            AppError::Internal => ("Internal Server Error", "Internal error".to_string(), Value::Null),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                ("Internal Server Error", "Internal error".to_string(), Value::Null)
            }
        };

        problem(status, category, title, detail, errors)
    }
}
