use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A listing from the external search API, normalized to one shape.
///
/// Every field has a deterministic default when the upstream payload omits it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalListingRecord {
    pub external_id: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub price: Decimal,
    pub beds: u32,
    pub baths: f64,
    pub sqft: u32,
    pub property_type: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub image_url: String,
    pub source_url: String,
    pub listing_status: String,
    pub year_built: Option<u32>,
    pub description: String,
}

/// Contact extracted from a listing detail payload. Empty string means "not found".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingContact {
    pub name: String,
    pub phone: String,
    pub email: String,
}

impl ListingContact {
    pub fn is_empty(&self) -> bool {
        self.name.is_empty() && self.phone.is_empty() && self.email.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListingDetails {
    pub external_id: String,
    pub images: Vec<String>,
    pub contact: ListingContact,
}

/// Optional search narrowing. Unset fields are left out of the upstream query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub min_price: Option<u64>,
    pub max_price: Option<u64>,
    pub min_beds: Option<u32>,
    pub min_baths: Option<u32>,
    /// Upstream home type, e.g. `Houses`, `LotsLand`.
    pub home_type: Option<String>,
    pub page: Option<u32>,
}
