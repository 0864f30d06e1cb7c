use async_trait::async_trait;
use homestead_core::models::geocode::join_street;
use homestead_core::models::{AddressComponents, Coordinates, GeocodeQuery};
use homestead_core::GeocodingConfig;
use serde::Deserialize;

use super::{transport, Declined, GeocodeProvider};

/// Nominatim API response for forward geocoding
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Nominatim API response for reverse geocoding
#[derive(Debug, Deserialize)]
struct ReverseHit {
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    address: NominatimAddress,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    house_number: Option<String>,
    road: Option<String>,
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    hamlet: Option<String>,
    state: Option<String>,
    postcode: Option<String>,
    /// e.g. `US-OK`
    #[serde(rename = "ISO3166-2-lvl4")]
    state_code: Option<String>,
}

impl NominatimAddress {
    fn city(&self) -> &str {
        [&self.city, &self.town, &self.village, &self.hamlet]
            .into_iter()
            .filter_map(|v| v.as_deref())
            .find(|v| !v.trim().is_empty())
            .unwrap_or("")
    }

    fn state(&self) -> String {
        self.state_code
            .as_deref()
            .and_then(|code| code.split_once('-'))
            .map(|(_, state)| state.to_string())
            .or_else(|| self.state.clone())
            .unwrap_or_default()
    }
}

/// Keyless terminal fallback (OpenStreetMap).
pub struct NominatimProvider {
    http: reqwest::Client,
    base_url: String,
    user_agent: String,
}

impl NominatimProvider {
    pub fn new(config: &GeocodingConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.nominatim_base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T, Declined> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("User-Agent", &self.user_agent)
            .query(params)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Declined::Status(status.as_u16()));
        }

        response
            .json()
            .await
            .map_err(|e| Declined::Malformed(e.to_string()))
    }
}

#[async_trait]
impl GeocodeProvider for NominatimProvider {
    fn name(&self) -> &'static str {
        "nominatim"
    }

    async fn forward(&self, query: &GeocodeQuery) -> Result<Coordinates, Declined> {
        let hits: Vec<SearchHit> = self
            .get(
                "/search",
                &[
                    ("q", query.one_line()),
                    ("format", "json".to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        let hit = hits.into_iter().next().ok_or(Declined::NoResults)?;
        let latitude = hit
            .lat
            .parse()
            .map_err(|e| Declined::Malformed(format!("Invalid latitude: {}", e)))?;
        let longitude = hit
            .lon
            .parse()
            .map_err(|e| Declined::Malformed(format!("Invalid longitude: {}", e)))?;

        Ok(Coordinates {
            latitude,
            longitude,
        })
    }

    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressComponents, Declined> {
        let hit: ReverseHit = self
            .get(
                "/reverse",
                &[
                    ("lat", latitude.to_string()),
                    ("lon", longitude.to_string()),
                    ("format", "json".to_string()),
                ],
            )
            .await?;

        if let Some(error) = hit.error {
            tracing::debug!(error = %error, "Nominatim reverse lookup error");
            return Err(Declined::NoResults);
        }

        let a = &hit.address;
        Ok(AddressComponents {
            address: join_street(
                a.house_number.as_deref().unwrap_or(""),
                a.road.as_deref().unwrap_or(""),
            ),
            city: a.city().to_string(),
            state: a.state(),
            zip: a.postcode.clone().unwrap_or_default(),
            formatted: hit.display_name,
        })
    }
}
