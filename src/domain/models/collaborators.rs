use chrono::NaiveTime;
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Identity record owned by the user service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "opaque_id")]
    pub user_id: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl UserProfile {
    /// "First Last" when either name is known, the email otherwise.
    pub fn display_name(&self) -> String {
        let name = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if name.is_empty() { self.email.clone() } else { name }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOffering {
    pub id: String,
    pub salon_id: String,
    pub price: Decimal,
    pub duration_minutes: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Salon {
    pub salon_id: String,
    /// Empty when the salon service did not send one.
    pub name: String,
    pub owner_user_id: String,
    pub open_time: NaiveTime,
    pub close_time: NaiveTime,
    pub timezone: Tz,
}

impl Salon {
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() { &self.salon_id } else { &self.name }
    }
}

/// Collaborators serialize ids either as JSON numbers or strings; both are
/// kept as opaque strings here.
pub fn opaque_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

pub fn parse_wall_clock(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S%.f")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Accepts whole minutes or an ISO-8601 duration such as `PT1H15M`.
pub fn parse_duration_minutes(value: &serde_json::Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }

    let text = value.as_str()?.strip_prefix("PT")?;
    let mut minutes = 0i64;
    let mut digits = String::new();
    for c in text.chars() {
        match c {
            '0'..='9' => digits.push(c),
            'H' => minutes += digits.parse::<i64>().ok()? * 60,
            'M' => minutes += digits.parse::<i64>().ok()?,
            'S' => {}
            _ => return None,
        }
        if !c.is_ascii_digit() {
            digits.clear();
        }
    }

    if digits.is_empty() { Some(minutes) } else { None }
}
