use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;
use crate::domain::models::collaborators::{opaque_id, parse_duration_minutes, ServiceOffering};
use crate::domain::ports::ServiceOfferingCatalog;
use crate::error::AppError;
use super::collaborator_http::CollaboratorHttp;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct OfferingPayload {
    #[serde(deserialize_with = "opaque_id")]
    id: String,
    #[serde(deserialize_with = "opaque_id")]
    salon_id: String,
    price: Decimal,
    #[serde(alias = "duration")]
    duration_minutes: Value,
}

pub struct HttpServiceOfferingClient {
    http: CollaboratorHttp,
}

impl HttpServiceOfferingClient {
    pub fn new(http: CollaboratorHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ServiceOfferingCatalog for HttpServiceOfferingClient {
    async fn get_offerings_by_ids(&self, ids: &[String]) -> Result<Vec<ServiceOffering>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // The collaborator splits the single path segment on commas.
        if let Some(bad) = ids.iter().find(|id| id.contains(',')) {
            return Err(AppError::Validation(format!("Invalid service id '{}'", bad)));
        }
        let joined = ids.join(",");

        let payload: Vec<OfferingPayload> = self.http
            .get_json(&["api", "v1", "salonservices", "list", joined.as_str()], "Service offerings not found")
            .await?;

        payload.into_iter().map(|p| {
            let duration_minutes = parse_duration_minutes(&p.duration_minutes)
                .ok_or_else(|| AppError::InternalWithMsg(format!("Service offering {} has an unreadable duration", p.id)))?;
            Ok(ServiceOffering { id: p.id, salon_id: p.salon_id, price: p.price, duration_minutes })
        }).collect()
    }
}
