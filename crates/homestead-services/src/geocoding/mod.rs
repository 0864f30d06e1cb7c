//! Geocoding resolver.
//!
//! Providers are tried in a fixed order; the first one that answers wins. A provider
//! that cannot answer returns [`Declined`] instead of an error, and the resolver moves
//! on. When every provider declines the result is `None`: geocoding never fails the
//! caller.

mod google;
mod nominatim;

pub use google::GoogleProvider;
pub use nominatim::NominatimProvider;

use anyhow::{Context, Result};
use async_trait::async_trait;
use homestead_core::models::{AddressComponents, Coordinates, GeocodeQuery};
use homestead_core::{Classify, ErrorClass, GeocodingConfig, LogLevel};
use std::sync::Arc;
use thiserror::Error;

/// Why a provider produced no answer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Declined {
    #[error("provider is not configured")]
    NotConfigured,

    #[error("HTTP {0}")]
    Status(u16),

    /// Provider-level status such as `ZERO_RESULTS` or `REQUEST_DENIED`.
    #[error("provider status {0}")]
    ProviderStatus(String),

    #[error("no results")]
    NoResults,

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl Classify for Declined {
    fn class(&self) -> ErrorClass {
        match self {
            Declined::NotConfigured => ErrorClass::ConfigurationMissing,
            Declined::Status(429) => ErrorClass::UpstreamRateLimited,
            Declined::ProviderStatus(s) if s == "OVER_QUERY_LIMIT" => {
                ErrorClass::UpstreamRateLimited
            }
            Declined::Transport(_) => ErrorClass::TransientIo,
            Declined::Status(_)
            | Declined::ProviderStatus(_)
            | Declined::NoResults
            | Declined::Malformed(_) => ErrorClass::UpstreamRejected,
        }
    }

    // Every decline is handled by falling through to the next provider.
    fn log_level(&self) -> LogLevel {
        match self.class() {
            ErrorClass::ConfigurationMissing => LogLevel::Debug,
            _ => LogLevel::Warn,
        }
    }
}

#[async_trait]
pub trait GeocodeProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn forward(&self, query: &GeocodeQuery) -> Result<Coordinates, Declined>;

    async fn reverse(&self, latitude: f64, longitude: f64) -> Result<AddressComponents, Declined>;
}

/// Builds the shared HTTP client used by the providers.
pub(crate) fn http_client(config: &GeocodingConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .context("Failed to create HTTP client for geocoding")
}

#[derive(Clone)]
pub struct GeocodingResolver {
    providers: Vec<Arc<dyn GeocodeProvider>>,
}

impl GeocodingResolver {
    pub fn new(providers: Vec<Arc<dyn GeocodeProvider>>) -> Self {
        Self { providers }
    }

    /// Google first (when a key is configured), Nominatim as the terminal fallback.
    pub fn from_config(config: &GeocodingConfig) -> Result<Self> {
        let http = http_client(config)?;
        let providers: Vec<Arc<dyn GeocodeProvider>> = vec![
            Arc::new(GoogleProvider::new(config, http.clone())),
            Arc::new(NominatimProvider::new(config, http)),
        ];
        Ok(Self::new(providers))
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    #[tracing::instrument(skip(self), fields(address = %query.one_line()))]
    pub async fn geocode(&self, query: &GeocodeQuery) -> Option<Coordinates> {
        if query.is_empty() {
            tracing::debug!("Empty address; skipping geocode");
            return None;
        }

        for provider in &self.providers {
            match provider.forward(query).await {
                Ok(coordinates) => {
                    tracing::info!(
                        provider = provider.name(),
                        latitude = coordinates.latitude,
                        longitude = coordinates.longitude,
                        "Address geocoded"
                    );
                    return Some(coordinates);
                }
                Err(reason) => log_decline(provider.name(), &reason),
            }
        }

        tracing::warn!("No geocoding provider could resolve the address");
        None
    }

    #[tracing::instrument(skip(self))]
    pub async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> Option<AddressComponents> {
        for provider in &self.providers {
            match provider.reverse(latitude, longitude).await {
                Ok(address) => {
                    tracing::info!(
                        provider = provider.name(),
                        formatted = %address.formatted,
                        "Coordinates reverse geocoded"
                    );
                    return Some(address);
                }
                Err(reason) => log_decline(provider.name(), &reason),
            }
        }

        tracing::warn!("No geocoding provider could resolve the coordinates");
        None
    }
}

fn log_decline(provider: &str, reason: &Declined) {
    match reason.log_level() {
        LogLevel::Debug => tracing::debug!(provider, reason = %reason, "Geocoding provider declined"),
        LogLevel::Warn => tracing::warn!(provider, reason = %reason, "Geocoding provider declined"),
        LogLevel::Error => tracing::error!(provider, reason = %reason, "Geocoding provider declined"),
    }
}

/// Maps a request failure to a decline.
pub(crate) fn transport(e: reqwest::Error) -> Declined {
    match e.status() {
        Some(status) => Declined::Status(status.as_u16()),
        None => Declined::Transport(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixed {
        name: &'static str,
        answer: Result<Coordinates, Declined>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl GeocodeProvider for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn forward(&self, _query: &GeocodeQuery) -> Result<Coordinates, Declined> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }

        async fn reverse(&self, _lat: f64, _lon: f64) -> Result<AddressComponents, Declined> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(Declined::NoResults)
        }
    }

    fn fixed(name: &'static str, answer: Result<Coordinates, Declined>) -> Arc<Fixed> {
        Arc::new(Fixed {
            name,
            answer,
            calls: AtomicUsize::new(0),
        })
    }

    fn resolver(providers: &[&Arc<Fixed>]) -> GeocodingResolver {
        GeocodingResolver::new(
            providers
                .iter()
                .map(|p| (*p).clone() as Arc<dyn GeocodeProvider>)
                .collect(),
        )
    }

    #[tokio::test]
    async fn first_success_wins() {
        let here = Coordinates {
            latitude: 36.15,
            longitude: -95.99,
        };
        let first = fixed("first", Ok(here));
        let second = fixed("second", Err(Declined::NoResults));
        let resolver = resolver(&[&first, &second]);

        let got = resolver
            .geocode(&GeocodeQuery::new("123 Main St", "Tulsa", "OK", ""))
            .await;
        assert_eq!(got, Some(here));
        assert_eq!(second.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn every_decline_yields_none() {
        let a = fixed("a", Err(Declined::NotConfigured));
        let b = fixed("b", Err(Declined::Transport("timeout".into())));
        let resolver = resolver(&[&a, &b]);

        assert_eq!(
            resolver.geocode(&GeocodeQuery::new("x", "", "", "")).await,
            None
        );
        assert_eq!(resolver.reverse_geocode(1.0, 2.0).await, None);
        assert_eq!(a.calls.load(Ordering::SeqCst), 2);
        assert_eq!(b.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn empty_query_calls_nobody() {
        let a = fixed("a", Err(Declined::NoResults));
        let resolver = resolver(&[&a]);
        assert_eq!(resolver.geocode(&GeocodeQuery::default()).await, None);
        assert_eq!(a.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn decline_classes() {
        assert_eq!(Declined::NotConfigured.log_level(), LogLevel::Debug);
        assert_eq!(Declined::Status(429).class(), ErrorClass::UpstreamRateLimited);
        assert_eq!(
            Declined::ProviderStatus("ZERO_RESULTS".into()).class(),
            ErrorClass::UpstreamRejected
        );
        assert_eq!(Declined::NoResults.log_level(), LogLevel::Warn);
    }
}
