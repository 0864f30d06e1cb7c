use homestead_core::models::property::parse_money;
use homestead_core::models::ExternalListingRecord;
use rust_decimal::Decimal;
use serde_json::Value;

use super::{as_text, extract_photos, first_f64, first_text, lookup};

const LISTING_SITE: &str = "https://www.zillow.com";

/// Where search responses keep their result list, in lookup order.
const RESULT_LIST_PATHS: &[&str] = &[
    "props",
    "results",
    "searchResults",
    "listResults",
    "cat1.searchResults.listResults",
];

/// Upstream home type → local property type.
const HOME_TYPES: &[(&str, &str)] = &[
    ("SINGLE_FAMILY", "house"),
    ("TOWNHOUSE", "townhouse"),
    ("CONDO", "condo"),
    ("MULTI_FAMILY", "multi-family"),
    ("APARTMENT", "apartment"),
    ("MANUFACTURED", "manufactured"),
    ("LOT", "land"),
    ("LAND", "land"),
];

/// Normalized records from a search response. Unknown layouts yield no records.
pub fn extract_records(payload: &Value) -> Vec<ExternalListingRecord> {
    let items = RESULT_LIST_PATHS
        .iter()
        .find_map(|p| lookup(payload, p).and_then(Value::as_array))
        .or_else(|| payload.as_array());

    match items {
        Some(items) => items
            .iter()
            .filter(|item| item.is_object())
            .map(normalize_record)
            .collect(),
        None => {
            tracing::debug!("Search response has no recognizable result list");
            Vec::new()
        }
    }
}

pub fn normalize_record(item: &Value) -> ExternalListingRecord {
    let home_info = lookup(item, "hdpData.homeInfo").unwrap_or(&Value::Null);

    let text = |paths: &[&str]| {
        first_text(item, paths)
            .or_else(|| first_text(home_info, paths))
            .unwrap_or_default()
    };
    let number = |paths: &[&str]| first_f64(item, paths).or_else(|| first_f64(home_info, paths));

    ExternalListingRecord {
        external_id: text(&["zpid", "id"]),
        address: text(&["streetAddress", "address.streetAddress", "address"]),
        city: text(&["city", "address.city", "addressCity"]),
        state: text(&["state", "address.state", "addressState"]),
        zip: text(&["zipcode", "address.zipcode", "addressZipcode", "zip"]),
        price: price(item).or_else(|| price(home_info)).unwrap_or(Decimal::ZERO),
        beds: count(number(&["bedrooms", "beds"])),
        baths: number(&["bathrooms", "baths"]).unwrap_or(0.0).max(0.0),
        sqft: count(number(&["livingArea", "area", "livingAreaValue"])),
        property_type: property_type(&text(&["homeType", "propertyType"])),
        lat: number(&["latitude", "latLong.latitude", "lat"]),
        lon: number(&["longitude", "latLong.longitude", "lon", "lng"]),
        image_url: extract_photos(item).into_iter().next().unwrap_or_default(),
        source_url: source_url(&text(&["detailUrl", "url", "hdpUrl"])),
        listing_status: text(&["listingStatus", "statusType", "homeStatus"]),
        year_built: number(&["yearBuilt"]).filter(|y| *y > 0.0).map(|y| y as u32),
        description: text(&["description"]),
    }
}

fn price(value: &Value) -> Option<Decimal> {
    ["unformattedPrice", "price"]
        .iter()
        .filter_map(|key| value.get(*key))
        .find_map(|v| as_text(v).and_then(|raw| parse_money(&raw)))
}

fn count(value: Option<f64>) -> u32 {
    value.map(|v| v.max(0.0).round() as u32).unwrap_or(0)
}

fn property_type(home_type: &str) -> String {
    if home_type.is_empty() {
        return String::new();
    }
    HOME_TYPES
        .iter()
        .find(|(upstream, _)| upstream.eq_ignore_ascii_case(home_type))
        .map(|(_, local)| local.to_string())
        .unwrap_or_else(|| home_type.to_lowercase())
}

fn source_url(detail: &str) -> String {
    if detail.starts_with('/') {
        format!("{}{}", LISTING_SITE, detail)
    } else {
        detail.to_string()
    }
}
