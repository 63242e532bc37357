use axum::{
    extract::{FromRequestParts, FromRef},
    http::{header::AUTHORIZATION, request::Parts},
};
use crate::config::{Config, JwtKey};
use crate::error::AppError;
use crate::state::AppState;
use std::sync::Arc;
use jsonwebtoken::{decode, DecodingKey, Validation, Algorithm};
use serde::Deserialize;
use tracing::{debug, Span};

#[derive(Debug, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// The caller identified by a verified bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
}

pub fn verify_token(config: &Config, token: &str) -> Result<Claims, AppError> {
    let (decoding_key, algorithm) = match &config.jwt_key {
        JwtKey::Secret(secret) => (DecodingKey::from_secret(secret.as_bytes()), Algorithm::HS256),
        JwtKey::RsaPublicPem(pem) => (
            DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|e| AppError::InternalWithMsg(format!("Invalid JWT public key: {}", e)))?,
            Algorithm::RS256,
        ),
    };

    let mut validation = Validation::new(algorithm);
    match &config.jwt_audience {
        Some(audience) => validation.set_audience(&[audience]),
        None => validation.validate_aud = false,
    }
    if let Some(issuer) = &config.jwt_issuer {
        validation.set_issuer(&[issuer]);
    }

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("Rejected bearer token: {}", e);
            AppError::Unauthorized
        })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts.headers.get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let app_state = <Arc<AppState> as FromRef<S>>::from_ref(state);
        let claims = verify_token(&app_state.config, token)?;

        Span::current().record("user_id", claims.sub.as_str());

        Ok(AuthUser { user_id: claims.sub })
    }
}
