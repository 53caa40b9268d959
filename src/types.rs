use crate::error::ValidationError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const MIN_OCCUPANCY: i64 = 1;
pub const MAX_OCCUPANCY: i64 = 10;
pub const DEFAULT_OCCUPANCY: u8 = 2;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        RequestId(uuid::Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External identity a notification is delivered to (e.g. a chat user id).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Owner(pub String);

impl Owner {
    pub fn new(id: impl Into<String>) -> Self {
        Owner(id.into())
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Guest count, always within [`MIN_OCCUPANCY`, `MAX_OCCUPANCY`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Occupancy(u8);

impl Occupancy {
    pub fn new(n: i64) -> std::result::Result<Self, ValidationError> {
        if !(MIN_OCCUPANCY..=MAX_OCCUPANCY).contains(&n) {
            return Err(ValidationError::OccupancyOutOfRange(n));
        }
        Ok(Occupancy(n as u8))
    }

    pub fn parse(raw: &str) -> std::result::Result<Self, ValidationError> {
        let n: i64 = raw
            .trim()
            .parse()
            .map_err(|_| ValidationError::InvalidOccupancy(raw.to_string()))?;
        Self::new(n)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Occupancy {
    fn default() -> Self {
        Occupancy(DEFAULT_OCCUPANCY)
    }
}

impl TryFrom<i64> for Occupancy {
    type Error = ValidationError;
    fn try_from(n: i64) -> std::result::Result<Self, Self::Error> {
        Occupancy::new(n)
    }
}

impl From<Occupancy> for i64 {
    fn from(o: Occupancy) -> i64 {
        o.0 as i64
    }
}

impl fmt::Display for Occupancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strict `YYYY-MM-DD` date parsing.
pub fn parse_date(raw: &str) -> std::result::Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    // chrono accepts "2025-1-5"; the chat format does not
    let well_formed = raw.len() == 10
        && raw
            .char_indices()
            .all(|(i, c)| if i == 4 || i == 7 { c == '-' } else { c.is_ascii_digit() });
    if !well_formed {
        return Err(ValidationError::InvalidDate(raw.to_string()));
    }
    NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}

/// Hotel page reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub url: String,
    #[serde(default)]
    pub resolved_url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl Target {
    pub fn new(url: &str) -> std::result::Result<Self, ValidationError> {
        let parsed =
            Url::parse(url.trim()).map_err(|_| ValidationError::InvalidUrl(url.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
            return Err(ValidationError::InvalidUrl(url.to_string()));
        }
        Ok(Target {
            url: url.trim().to_string(),
            resolved_url: None,
            name: None,
        })
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// URL to build searches from: the resolved one when known.
    pub fn effective_url(&self) -> &str {
        self.resolved_url.as_deref().unwrap_or(&self.url)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.url)
    }
}

/// Dates + guests appended to the target's search URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchParams {
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub occupancy: Occupancy,
}

impl SearchParams {
    pub fn new(
        checkin: NaiveDate,
        checkout: NaiveDate,
        occupancy: Occupancy,
    ) -> std::result::Result<Self, ValidationError> {
        if checkout <= checkin {
            return Err(ValidationError::CheckoutNotAfterCheckin {
                checkin: checkin.format(DATE_FORMAT).to_string(),
                checkout: checkout.format(DATE_FORMAT).to_string(),
            });
        }
        Ok(Self {
            checkin,
            checkout,
            occupancy,
        })
    }

    pub fn nights(&self) -> i64 {
        (self.checkout - self.checkin).num_days()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Deactivation {
    Cancelled,
    Available,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringRequest {
    pub id: RequestId,
    pub owner: Owner,
    pub target: Target,
    pub checkin: NaiveDate,
    pub checkout: NaiveDate,
    pub occupancy: Occupancy,
    #[serde(default)]
    pub room_type: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub deactivated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deactivation: Option<Deactivation>,
}

impl MonitoringRequest {
    pub fn new(owner: Owner, target: Target, params: SearchParams) -> Self {
        Self {
            id: RequestId::generate(),
            owner,
            target,
            checkin: params.checkin,
            checkout: params.checkout,
            occupancy: params.occupancy,
            room_type: None,
            active: true,
            created_at: Utc::now(),
            deactivated_at: None,
            deactivation: None,
        }
    }

    pub fn with_room_type(mut self, room_type: Option<String>) -> Self {
        self.room_type = room_type;
        self
    }

    pub fn params(&self) -> SearchParams {
        SearchParams {
            checkin: self.checkin,
            checkout: self.checkout,
            occupancy: self.occupancy,
        }
    }

    /// Same owner, page and stay.
    pub fn same_stay(&self, other: &MonitoringRequest) -> bool {
        self.owner == other.owner
            && self.target.url == other.target.url
            && self.checkin == other.checkin
            && self.checkout == other.checkout
            && self.occupancy == other.occupancy
    }
}

/// Raw page plus where it actually came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageContent {
    pub body: String,
    pub final_url: String,
    pub resolved_url: String,
    pub status: u16,
    pub fetched_at: DateTime<Utc>,
}

/// Which classifier rule produced a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    PageLoadAnomaly,
    NegativeIndicator,
    PositiveIndicator,
    BookingAnchor,
    PricePattern,
    AvailabilityTable,
    FallbackPositive,
    Inconclusive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub available: bool,
    pub reason: String,
    pub rule: Rule,
}

impl Verdict {
    pub fn available(rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            available: true,
            reason: reason.into(),
            rule,
        }
    }

    pub fn unavailable(rule: Rule, reason: impl Into<String>) -> Self {
        Self {
            available: false,
            reason: reason.into(),
            rule,
        }
    }
}

/// Chat message handed to the command handler by the webhook collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub owner: Owner,
    pub text: String,
    #[serde(default)]
    pub reply_token: Option<String>,
}

impl InboundEvent {
    pub fn new(owner: Owner, text: impl Into<String>) -> Self {
        Self {
            owner,
            text: text.into(),
            reply_token: None,
        }
    }
}

/// Immediate acknowledgement for an inbound event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reply {
    pub reply_token: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}
impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }
    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
