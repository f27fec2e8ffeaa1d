use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{PropertyId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyStatus {
    #[default]
    Active,
    Inactive,
}

/// A rentable listing. `price` is the nightly rate and is never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub owner_id: UserId,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    pub status: PropertyStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Only active listings accept booking requests.
    pub fn is_bookable(&self) -> bool {
        self.status == PropertyStatus::Active
    }
}

/// Listing query. Empty fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PropertyFilter {
    pub owner_id: Option<UserId>,
    pub status: Option<PropertyStatus>,
    /// Case-insensitive substring of `location`.
    pub location: Option<String>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        if self.owner_id.is_some_and(|owner| owner != property.owner_id) {
            return false;
        }
        if self.status.is_some_and(|status| status != property.status) {
            return false;
        }
        match &self.location {
            Some(needle) => property
                .location
                .to_lowercase()
                .contains(&needle.to_lowercase()),
            None => true,
        }
    }
}
