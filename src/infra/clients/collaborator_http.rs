use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use crate::error::AppError;
use super::resilience::{HopError, Resilience};

/// Shared reqwest plumbing for one collaborator: base url, optional service
/// token, per-hop timeout and the collaborator's own breaker.
pub struct CollaboratorHttp {
    client: Client,
    base_url: Url,
    token: Option<String>,
    resilience: Resilience,
}

impl CollaboratorHttp {
    pub fn new(
        base_url: &str,
        token: Option<String>,
        timeout: Duration,
        resilience: Resilience,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| AppError::InternalWithMsg(format!("Invalid base url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::InternalWithMsg(format!("Base url '{}' cannot carry a path", base_url)));
        }
        let client = Client::builder().timeout(timeout).build()
            .map_err(|e| AppError::InternalWithMsg(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url,
            token,
            resilience,
        })
    }

    pub fn resilience(&self) -> &Resilience {
        &self.resilience
    }

    /// Appends `segments` to the base path, percent-encoding each one so an
    /// identifier can never reach another route or add a query string.
    pub fn url_for(&self, segments: &[&str]) -> Result<Url, AppError> {
        if let Some(bad) = segments.iter().find(|s| s.is_empty() || **s == "." || **s == "..") {
            return Err(AppError::Validation(format!("Invalid identifier '{}'", bad)));
        }

        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::InternalWithMsg(format!("Base url '{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// `missing` is the NotFound detail used when the collaborator answers 404.
    pub async fn get_json<T: DeserializeOwned>(&self, segments: &[&str], missing: &str) -> Result<T, AppError> {
        let url = self.url_for(segments)?;
        self.resilience.run(|| self.send(self.client.get(url.clone()), missing)).await
    }

    pub async fn post_json<B, T>(&self, segments: &[&str], body: &B, missing: &str) -> Result<T, AppError>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url_for(segments)?;
        self.resilience.run(|| self.send(self.client.post(url.clone()).json(body), missing)).await
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, missing: &str) -> Result<T, HopError> {
        let request = match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let res = request.send().await
            .map_err(|e| HopError::Transient(format!("connection error: {}", e)))?;

        let status = res.status();
        debug!(collaborator = self.resilience.name(), status = status.as_u16(), "Collaborator responded");

        if status == StatusCode::NOT_FOUND {
            return Err(HopError::Permanent(AppError::NotFound(missing.to_string())));
        }
        if status.is_server_error() {
            return Err(HopError::Transient(format!("status {}", status)));
        }
        if !status.is_success() {
            let text = res.text().await.unwrap_or_default();
            return Err(HopError::Permanent(AppError::InternalWithMsg(format!(
                "{} rejected request. Status: {}, Body: {}", self.resilience.name(), status, text
            ))));
        }

        res.json::<T>().await.map_err(|e| {
            HopError::Permanent(AppError::InternalWithMsg(format!(
                "{} returned an unreadable body: {}", self.resilience.name(), e
            )))
        })
    }
}
