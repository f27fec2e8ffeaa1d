use garde::Validate;
use serde::{Deserialize, Serialize};
use staybook_kernel::model::PropertyStatus;

/// Upper bound on a nightly rate. Keeps a stay total finite.
pub const MAX_NIGHTLY_PRICE: f64 = 1_000_000.0;

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateProperty {
    #[garde(length(min = 1, max = 200))]
    pub name: String,
    #[garde(length(min = 1, max = 200))]
    pub location: String,
    #[serde(default)]
    #[garde(length(max = 5000))]
    pub description: String,
    /// Nightly rate
    #[garde(range(min = 0.0, max = 1_000_000.0))]
    pub price: f64,
    #[serde(default)]
    #[garde(skip)]
    pub status: PropertyStatus,
}

/// Partial update; absent fields are left alone.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateProperty {
    #[garde(inner(length(min = 1, max = 200)))]
    pub name: Option<String>,
    #[garde(inner(length(min = 1, max = 200)))]
    pub location: Option<String>,
    #[garde(inner(length(max = 5000)))]
    pub description: Option<String>,
    #[garde(inner(range(min = 0.0, max = 1_000_000.0)))]
    pub price: Option<f64>,
    #[garde(skip)]
    pub status: Option<PropertyStatus>,
}
