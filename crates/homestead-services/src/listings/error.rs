use homestead_core::{Classify, ErrorClass};
use thiserror::Error;

/// Body fragments the upstream uses on 404 when the API plan has lapsed.
const SUBSCRIPTION_MARKERS: [&str; 2] = ["not subscribed", "subscription"];

#[derive(Debug, Error)]
pub enum ListingApiError {
    #[error("Listing API key is not configured")]
    NotConfigured,

    #[error("Listing API subscription is not active")]
    SubscriptionExpired,

    #[error("Listing API rate limit exceeded (HTTP {status})")]
    RateLimited { status: u16, body: String },

    #[error("Listing API denied access")]
    AccessDenied,

    #[error("Listing API rejected the request: {0}")]
    BadRequest(String),

    #[error("Listing API returned HTTP {status}")]
    Upstream { status: u16 },

    #[error("Listing API request failed: {0}")]
    Transport(String),

    #[error("Listing API response could not be decoded: {0}")]
    Decode(String),
}

impl ListingApiError {
    /// Classify a non-success response.
    pub fn from_response(status: u16, body: String) -> Self {
        match status {
            404 if has_subscription_marker(&body) => ListingApiError::SubscriptionExpired,
            429 => ListingApiError::RateLimited { status, body },
            403 => ListingApiError::AccessDenied,
            400 => ListingApiError::BadRequest(upstream_message(&body)),
            _ => ListingApiError::Upstream { status },
        }
    }

    /// Message suitable for showing to an operator in the admin UI.
    pub fn user_message(&self) -> String {
        match self {
            ListingApiError::NotConfigured => {
                "Listing import is not configured. Add a listing API key to enable it.".to_string()
            }
            ListingApiError::SubscriptionExpired => {
                "The listing data subscription is not active. Renew the API subscription to continue importing."
                    .to_string()
            }
            ListingApiError::RateLimited { .. } => {
                "The listing service is receiving too many requests. Wait a minute and try again."
                    .to_string()
            }
            ListingApiError::AccessDenied => {
                "Access to the listing service was denied. Check that the API key is valid for this endpoint."
                    .to_string()
            }
            ListingApiError::BadRequest(message) => {
                format!("The listing service rejected the search: {}", message)
            }
            ListingApiError::Upstream { status } => format!(
                "The listing service returned an unexpected error (HTTP {}). Try again later.",
                status
            ),
            ListingApiError::Transport(_) => {
                "Could not reach the listing service. Check the network connection and try again."
                    .to_string()
            }
            ListingApiError::Decode(_) => {
                "The listing service returned a response that could not be read.".to_string()
            }
        }
    }
}

impl Classify for ListingApiError {
    fn class(&self) -> ErrorClass {
        match self {
            ListingApiError::NotConfigured => ErrorClass::ConfigurationMissing,
            ListingApiError::RateLimited { .. } => ErrorClass::UpstreamRateLimited,
            ListingApiError::SubscriptionExpired
            | ListingApiError::AccessDenied
            | ListingApiError::BadRequest(_)
            | ListingApiError::Decode(_) => ErrorClass::UpstreamRejected,
            ListingApiError::Upstream { .. } | ListingApiError::Transport(_) => {
                ErrorClass::TransientIo
            }
        }
    }
}

fn has_subscription_marker(body: &str) -> bool {
    let body = body.to_lowercase();
    SUBSCRIPTION_MARKERS.iter().any(|m| body.contains(m))
}

/// `{"message": ...}` / `{"error": ...}` bodies, or the trimmed raw body.
fn upstream_message(body: &str) -> String {
    let from_json = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["message", "error", "errors"]
                .iter()
                .find_map(|k| v.get(*k).and_then(|m| m.as_str()).map(String::from))
        });

    match from_json {
        Some(message) if !message.trim().is_empty() => message.trim().to_string(),
        _ if !body.trim().is_empty() => body.trim().chars().take(300).collect(),
        _ => "Bad request".to_string(),
    }
}
