use async_trait::async_trait;
use chrono_tz::Tz;
use serde::Deserialize;
use crate::domain::models::collaborators::{opaque_id, parse_wall_clock, Salon};
use crate::domain::ports::SalonDirectory;
use crate::error::AppError;
use super::collaborator_http::CollaboratorHttp;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalonOwner {
    #[serde(deserialize_with = "opaque_id")]
    user_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SalonPayload {
    #[serde(deserialize_with = "opaque_id", alias = "id")]
    salon_id: String,
    #[serde(alias = "name")]
    salon_name: Option<String>,
    owner_user_id: Option<String>,
    user: Option<SalonOwner>,
    open_time: String,
    close_time: String,
    timezone: Option<String>,
}

impl TryFrom<SalonPayload> for Salon {
    type Error = AppError;

    fn try_from(p: SalonPayload) -> Result<Self, Self::Error> {
        let corrupt = |what: &str| AppError::InternalWithMsg(format!("Salon {} has invalid {}", p.salon_id, what));

        let owner_user_id = p.owner_user_id.clone()
            .or_else(|| p.user.as_ref().map(|u| u.user_id.clone()))
            .ok_or_else(|| corrupt("owner"))?;
        let open_time = parse_wall_clock(&p.open_time).ok_or_else(|| corrupt("openTime"))?;
        let close_time = parse_wall_clock(&p.close_time).ok_or_else(|| corrupt("closeTime"))?;
        let timezone = match p.timezone.as_deref() {
            Some(name) if !name.is_empty() => name.parse::<Tz>().map_err(|_| corrupt("timezone"))?,
            _ => chrono_tz::UTC,
        };

        Ok(Salon {
            salon_id: p.salon_id,
            name: p.salon_name.unwrap_or_default(),
            owner_user_id,
            open_time,
            close_time,
            timezone,
        })
    }
}

pub struct HttpSalonClient {
    http: CollaboratorHttp,
}

impl HttpSalonClient {
    pub fn new(http: CollaboratorHttp) -> Self {
        Self { http }
    }
}

#[async_trait]
impl SalonDirectory for HttpSalonClient {
    async fn get_salon_by_id(&self, salon_id: &str) -> Result<Salon, AppError> {
        let payload: SalonPayload = self.http
            .get_json(&["api", "v1", "salons", salon_id], &format!("Salon {} not found", salon_id))
            .await?;
        payload.try_into()
    }

    async fn get_salon_by_owner(&self, owner_user_id: &str) -> Result<Salon, AppError> {
        let payload: SalonPayload = self.http
            .get_json(&["api", "v1", "salons", "owner", owner_user_id], "No salon found for this owner")
            .await?;
        payload.try_into()
    }
}
