use async_trait::async_trait;
use homestead_core::models::geocode::join_street;
use homestead_core::models::{AddressComponents, Coordinates, GeocodeQuery};
use homestead_core::GeocodingConfig;
use serde::Deserialize;

use super::{transport, Declined, GeocodeProvider};

/// Google Geocoding API response
#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    #[serde(default)]
    address_components: Vec<AddressComponent>,
    geometry: Option<Geometry>,
}

#[derive(Debug, Deserialize)]
struct AddressComponent {
    #[serde(default)]
    long_name: String,
    #[serde(default)]
    short_name: String,
    #[serde(default)]
    types: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

impl GeocodeResult {
    fn component(&self, kind: &str) -> Option<&AddressComponent> {
        self.address_components
            .iter()
            .find(|c| c.types.iter().any(|t| t == kind))
    }

    fn long(&self, kind: &str) -> &str {
        self.component(kind).map(|c| c.long_name.as_str()).unwrap_or("")
    }

    fn address(&self) -> AddressComponents {
        let city = ["locality", "sublocality", "postal_town"]
            .iter()
            .map(|kind| self.long(kind))
            .find(|name| !name.is_empty())
            .unwrap_or("");

        AddressComponents {
            address: join_street(self.long("street_number"), self.long("route")),
            city: city.to_string(),
            state: self
                .component("administrative_area_level_1")
                .map(|c| c.short_name.clone())
                .unwrap_or_default(),
            zip: self.long("postal_code").to_string(),
            formatted: self.formatted_address.clone(),
        }
    }
}

/// Key-gated primary provider.
pub struct GoogleProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GoogleProvider {
    pub fn new(config: &GeocodingConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.google_base_url.trim_end_matches('/').to_string(),
            api_key: config
                .google_api_key
                .clone()
                .filter(|k| !k.trim().is_empty()),
        }
    }

    async fn lookup(&self, params: &[(&str, String)]) -> Result<GeocodeResult, Declined> {
        let key = self.api_key.as_deref().ok_or(Declined::NotConfigured)?;

        let response = self
            .http
            .get(format!("{}/geocode/json", self.base_url))
            .query(params)
            .query(&[("key", key)])
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Declined::Status(status.as_u16()));
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| Declined::Malformed(e.to_string()))?;

        if body.status != "OK" {
            if let Some(message) = &body.error_message {
                tracing::debug!(status = %body.status, message = %message, "Google geocoding status");
            }
            return Err(Declined::ProviderStatus(body.status));
        }

        body.results.into_iter().next().ok_or(Declined::NoResults)
    }
}

#[async_trait]
impl GeocodeProvider for GoogleProvider {
    fn name(&self) -> &'static str {
        "google"
    }

    async fn forward(&self, query: &GeocodeQuery) -> Result<Coordinates, Declined> {
        let result = self.lookup(&[("address", query.one_line())]).await?;
        let location = result
            .geometry
            .map(|g| g.location)
            .ok_or_else(|| Declined::Malformed("result has no geometry".to_string()))?;

        Ok(Coordinates {
            latitude: location.lat,
            longitude: location.lng,
        })
    }

    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressComponents, Declined> {
        let result = self
            .lookup(&[("latlng", format!("{},{}", latitude, longitude))])
            .await?;
        Ok(result.address())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> GeocodeResult {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn address_joins_street_parts_and_short_state() {
        let result = parse(
            r#"{
                "formatted_address": "123 Main St, Tulsa, OK 74103, USA",
                "address_components": [
                    {"long_name": "123", "short_name": "123", "types": ["street_number"]},
                    {"long_name": "Main Street", "short_name": "Main St", "types": ["route"]},
                    {"long_name": "Tulsa", "short_name": "Tulsa", "types": ["locality", "political"]},
                    {"long_name": "Oklahoma", "short_name": "OK", "types": ["administrative_area_level_1", "political"]},
                    {"long_name": "74103", "short_name": "74103", "types": ["postal_code"]}
                ]
            }"#,
        );
        let address = result.address();
        assert_eq!(address.address, "123 Main Street");
        assert_eq!(address.city, "Tulsa");
        assert_eq!(address.state, "OK");
        assert_eq!(address.zip, "74103");
    }

    #[test]
    fn city_falls_back_and_missing_parts_are_empty() {
        let result = parse(
            r#"{
                "address_components": [
                    {"long_name": "Elm Road", "short_name": "Elm Rd", "types": ["route"]},
                    {"long_name": "Brooklyn", "short_name": "Brooklyn", "types": ["sublocality", "political"]}
                ]
            }"#,
        );
        let address = result.address();
        assert_eq!(address.address, "Elm Road");
        assert_eq!(address.city, "Brooklyn");
        assert_eq!(address.state, "");
        assert_eq!(address.zip, "");
        assert_eq!(address.formatted, "");

        let result = parse(
            r#"{"address_components": [{"long_name": "Reading", "short_name": "Reading", "types": ["postal_town"]}]}"#,
        );
        assert_eq!(result.address().city, "Reading");
    }

    #[tokio::test]
    async fn no_key_declines_without_request() {
        let provider = GoogleProvider::new(
            &GeocodingConfig {
                google_base_url: "http://127.0.0.1:9".to_string(),
                ..GeocodingConfig::default()
            },
            reqwest::Client::new(),
        );
        let err = provider
            .forward(&GeocodeQuery::new("1 Main", "", "", ""))
            .await
            .unwrap_err();
        assert_eq!(err, Declined::NotConfigured);
    }
}
