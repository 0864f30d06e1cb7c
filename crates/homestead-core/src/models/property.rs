use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

use super::listing::ExternalListingRecord;

pub const LAND_PROPERTY_TYPE: &str = "land";
const DEFAULT_PROPERTY_TYPE: &str = "house";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PropertyRowError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

/// A property ready to be persisted by the property-creation path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProperty {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub price: Option<Decimal>,
    pub bedrooms: u32,
    pub bathrooms: f64,
    pub sqft: u32,
    pub year_built: Option<u32>,
    pub property_type: String,
    pub description: String,
    pub external_id: Option<String>,
    pub image_url: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Secret handed to the owner so they can claim the listing.
    pub claim_token: String,
}

/// 32 hex characters from 16 random bytes.
pub fn generate_claim_token() -> String {
    hex::encode(rand::random::<[u8; 16]>())
}

/// Parses `$150,000`, `150000.50`, ` 1,200 ` into a decimal amount.
pub fn parse_money(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '$' | ',' | ' ' | '\t'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned).ok()
}

fn parse_count(raw: Option<&str>) -> u32 {
    raw.and_then(|s| {
        let cleaned: String = s.chars().filter(|c| *c != ',').collect();
        let cleaned = cleaned.trim();
        cleaned
            .parse::<u32>()
            .ok()
            .or_else(|| cleaned.parse::<f64>().ok().map(|f| f.max(0.0).round() as u32))
    })
    .unwrap_or(0)
}

fn parse_float(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
}

impl NewProperty {
    /// Maps one imported CSV row (header → cell) into a property.
    ///
    /// Header names are matched case-insensitively; common aliases are accepted.
    pub fn from_row(row: &HashMap<String, String>) -> Result<Self, PropertyRowError> {
        let normalized: HashMap<String, &str> = row
            .iter()
            .map(|(k, v)| (k.trim().to_lowercase(), v.trim()))
            .collect();
        let get = |keys: &[&str]| -> Option<&str> {
            keys.iter()
                .filter_map(|k| normalized.get(*k).copied())
                .find(|v| !v.is_empty())
        };

        let address = get(&["address", "street", "street_address"])
            .ok_or(PropertyRowError::MissingField("address"))?;

        let property = Self {
            address: address.to_string(),
            city: get(&["city"]).unwrap_or_default().to_string(),
            state: get(&["state"]).unwrap_or_default().to_string(),
            zip: get(&["zip", "zip_code", "zipcode", "postal_code"])
                .unwrap_or_default()
                .to_string(),
            price: get(&["price", "list_price"]).and_then(parse_money),
            bedrooms: parse_count(get(&["bedrooms", "beds"])),
            bathrooms: parse_float(get(&["bathrooms", "baths"])).unwrap_or(0.0),
            sqft: parse_count(get(&["sqft", "square_feet", "living_area"])),
            year_built: get(&["year_built"]).and_then(|s| s.parse().ok()),
            property_type: get(&["property_type", "type"])
                .map(|s| s.to_lowercase())
                .unwrap_or_else(|| DEFAULT_PROPERTY_TYPE.to_string()),
            description: get(&["description"]).unwrap_or_default().to_string(),
            external_id: get(&["external_id", "zpid"]).map(String::from),
            image_url: get(&["image_url", "photo_url"]).map(String::from),
            latitude: parse_float(get(&["latitude", "lat"])),
            longitude: parse_float(get(&["longitude", "lon", "lng"])),
            claim_token: generate_claim_token(),
        };

        Ok(property.apply_land_rule())
    }

    /// Maps a normalized external listing into the same creation path.
    pub fn from_listing(record: &ExternalListingRecord) -> Self {
        let property_type = if record.property_type.trim().is_empty() {
            DEFAULT_PROPERTY_TYPE.to_string()
        } else {
            record.property_type.trim().to_lowercase()
        };

        Self {
            address: record.address.clone(),
            city: record.city.clone(),
            state: record.state.clone(),
            zip: record.zip.clone(),
            price: (!record.price.is_zero()).then_some(record.price),
            bedrooms: record.beds,
            bathrooms: record.baths,
            sqft: record.sqft,
            year_built: record.year_built,
            property_type,
            description: record.description.clone(),
            external_id: (!record.external_id.is_empty()).then(|| record.external_id.clone()),
            image_url: (!record.image_url.is_empty()).then(|| record.image_url.clone()),
            latitude: record.lat,
            longitude: record.lon,
            claim_token: generate_claim_token(),
        }
        .apply_land_rule()
    }

    pub fn is_land(&self) -> bool {
        self.property_type.eq_ignore_ascii_case(LAND_PROPERTY_TYPE)
    }

    /// Land has no rooms, living area, or construction year.
    pub fn apply_land_rule(mut self) -> Self {
        if self.is_land() {
            self.bedrooms = 0;
            self.bathrooms = 0.0;
            self.sqft = 0;
            self.year_built = None;
        }
        self
    }

    pub fn has_coordinates(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn land_row_is_zeroed_and_gets_claim_token() {
        let property = NewProperty::from_row(&row(&[
            ("address", "123 Main St"),
            ("city", "Tulsa"),
            ("price", "$150,000"),
            ("property_type", "land"),
            ("bedrooms", "3"),
            ("year_built", "1999"),
        ]))
        .unwrap();

        assert_eq!(property.bedrooms, 0);
        assert_eq!(property.bathrooms, 0.0);
        assert_eq!(property.sqft, 0);
        assert_eq!(property.year_built, None);
        assert_eq!(property.price, Some(Decimal::from(150_000)));
        assert_eq!(property.claim_token.len(), 32);
        assert!(property.claim_token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn house_row_keeps_counts() {
        let property = NewProperty::from_row(&row(&[
            ("Address", " 9 Elm Ave "),
            ("Beds", "4"),
            ("Baths", "2.5"),
            ("SqFt", "1,850"),
            ("Year_Built", "2004"),
        ]))
        .unwrap();

        assert_eq!(property.address, "9 Elm Ave");
        assert_eq!(property.property_type, "house");
        assert_eq!(property.bedrooms, 4);
        assert_eq!(property.bathrooms, 2.5);
        assert_eq!(property.sqft, 1850);
        assert_eq!(property.year_built, Some(2004));
    }

    #[test]
    fn missing_address_is_rejected() {
        let err = NewProperty::from_row(&row(&[("city", "Tulsa")])).unwrap_err();
        assert_eq!(err, PropertyRowError::MissingField("address"));
    }

    #[test]
    fn claim_tokens_are_unique() {
        assert_ne!(generate_claim_token(), generate_claim_token());
    }

    #[test]
    fn parse_money_variants() {
        assert_eq!(parse_money("$1,200.50"), Decimal::from_str("1200.50").ok());
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("call"), None);
    }

    #[test]
    fn listing_land_is_zeroed() {
        let record = ExternalListingRecord {
            external_id: "123".to_string(),
            address: "Lot 4 County Rd".to_string(),
            property_type: "LAND".to_string(),
            beds: 2,
            sqft: 900,
            year_built: Some(1980),
            ..Default::default()
        };
        let property = NewProperty::from_listing(&record);
        assert!(property.is_land());
        assert_eq!(property.bedrooms, 0);
        assert_eq!(property.sqft, 0);
        assert_eq!(property.year_built, None);
        assert_eq!(property.price, None);
        assert_eq!(property.external_id.as_deref(), Some("123"));
    }
}
