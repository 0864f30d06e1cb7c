use anyhow::{Context, Result};
use homestead_core::models::{ExternalListingRecord, ListingDetails, SearchFilters};
use homestead_core::{Classify, ListingApiConfig, LogLevel};
use homestead_infra::{Backoff, RetryState, Sleeper, TokioSleeper};
use serde_json::{json, Map, Value};
use std::sync::Arc;

use super::error::ListingApiError;
use super::normalize::{extract_contact, extract_photos, extract_records, unwrap_property};

/// Total attempts for a rate-limited request, including the first.
pub const RATE_LIMIT_ATTEMPTS: u32 = 3;
const RATE_LIMIT_BACKOFF: Backoff = Backoff::Exponential { base: 2 };

const SEARCH_SITE_URL: &str = "https://www.zillow.com/homes/";

/// Upstream filter flags, one per home type. Selecting a type turns the others off.
const HOME_TYPE_FLAGS: &[&str] = &["sf", "tow", "mf", "con", "land", "apa", "manu"];

pub struct ListingClient {
    http: reqwest::Client,
    config: ListingApiConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl ListingClient {
    pub fn new(config: ListingApiConfig) -> Result<Self> {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: ListingApiConfig, sleeper: Arc<dyn Sleeper>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to create HTTP client for listing API")?;

        Ok(Self {
            http,
            config,
            sleeper,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Searches listings around `location` and normalizes every result.
    #[tracing::instrument(skip(self, filters))]
    pub async fn search(
        &self,
        location: &str,
        filters: &SearchFilters,
    ) -> Result<Vec<ExternalListingRecord>, ListingApiError> {
        let page = filters.page.unwrap_or(1).max(1);
        let params = [
            ("url", search_url(location, filters)),
            ("page", page.to_string()),
        ];

        let payload = self
            .get_json(
                &format!("{}/api/search/byurl", self.config.search_base_url()),
                &self.config.host,
                &params,
            )
            .await?;

        let records = extract_records(&payload);
        tracing::info!(count = records.len(), page, "Listing search completed");
        Ok(records)
    }

    /// Photos and contact for one listing.
    #[tracing::instrument(skip(self))]
    pub async fn fetch_details(&self, external_id: &str) -> Result<ListingDetails, ListingApiError> {
        let payload = self
            .get_json(
                &format!("{}/property", self.config.details_base_url()),
                &self.config.images_host,
                &[("zpid", external_id.to_string())],
            )
            .await?;

        let property = unwrap_property(&payload);
        let details = ListingDetails {
            external_id: external_id.to_string(),
            images: extract_photos(property),
            contact: extract_contact(property),
        };

        tracing::info!(
            images = details.images.len(),
            has_contact = !details.contact.is_empty(),
            "Listing details fetched"
        );
        Ok(details)
    }

    /// GET with API headers. Only HTTP 429 is retried.
    async fn get_json(
        &self,
        url: &str,
        host: &str,
        params: &[(&str, String)],
    ) -> Result<Value, ListingApiError> {
        let key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or(ListingApiError::NotConfigured)?;

        let mut state = RetryState::new(RATE_LIMIT_ATTEMPTS, RATE_LIMIT_BACKOFF);
        loop {
            let attempt = state.begin_attempt();
            let response = self
                .http
                .get(url)
                .header("x-rapidapi-host", host)
                .header("x-rapidapi-key", key)
                .query(params)
                .send()
                .await
                .map_err(|e| ListingApiError::Transport(e.to_string()))?;

            let status = response.status();
            if status.is_success() {
                return response
                    .json::<Value>()
                    .await
                    .map_err(|e| ListingApiError::Decode(e.to_string()));
            }

            let body = response.text().await.unwrap_or_default();
            let error = ListingApiError::from_response(status.as_u16(), body);

            if matches!(error, ListingApiError::RateLimited { .. }) && !state.exhausted() {
                let delay = state.next_delay();
                tracing::warn!(
                    attempt,
                    max_attempts = state.max_attempts,
                    delay_secs = delay.as_secs(),
                    "Listing API rate limited; backing off"
                );
                self.sleeper.sleep(delay).await;
                continue;
            }

            log_failure(url, attempt, &error);
            return Err(error);
        }
    }
}

fn log_failure(url: &str, attempt: u32, error: &ListingApiError) {
    let code = error.class().code();
    match error.log_level() {
        LogLevel::Debug => tracing::debug!(url, attempt, error_code = code, error = %error, "Listing API request failed"),
        LogLevel::Warn => tracing::warn!(url, attempt, error_code = code, error = %error, "Listing API request failed"),
        LogLevel::Error => tracing::error!(url, attempt, error_code = code, error = %error, "Listing API request failed"),
    }
}

/// Listing-site search page URL carrying the filters as `searchQueryState`.
pub fn search_url(location: &str, filters: &SearchFilters) -> String {
    let mut filter_state = Map::new();

    let mut price = Map::new();
    if let Some(min) = filters.min_price {
        price.insert("min".into(), json!(min));
    }
    if let Some(max) = filters.max_price {
        price.insert("max".into(), json!(max));
    }
    if !price.is_empty() {
        filter_state.insert("price".into(), Value::Object(price));
    }
    if let Some(beds) = filters.min_beds {
        filter_state.insert("beds".into(), json!({ "min": beds }));
    }
    if let Some(baths) = filters.min_baths {
        filter_state.insert("baths".into(), json!({ "min": baths }));
    }
    if let Some(selected) = filters.home_type.as_deref().and_then(home_type_flag) {
        for flag in HOME_TYPE_FLAGS.iter().filter(|f| **f != selected) {
            filter_state.insert((*flag).into(), json!({ "value": false }));
        }
    }

    let state = json!({
        "pagination": { "currentPage": filters.page.unwrap_or(1).max(1) },
        "usersSearchTerm": location,
        "filterState": filter_state,
        "isListVisible": true
    });

    let path = location
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    format!("{}{}/?searchQueryState={}", SEARCH_SITE_URL, path, state)
}

fn home_type_flag(home_type: &str) -> Option<&'static str> {
    let flag = match home_type.to_ascii_lowercase().as_str() {
        "houses" | "house" | "single_family" => "sf",
        "townhomes" | "townhouse" => "tow",
        "multifamily" | "multi-family" | "multi_family" => "mf",
        "condos" | "condo" | "condos/co-ops" => "con",
        "lotsland" | "lots/land" | "land" | "lot" => "land",
        "apartments" | "apartment" => "apa",
        "manufactured" => "manu",
        _ => return None,
    };
    Some(flag)
}
