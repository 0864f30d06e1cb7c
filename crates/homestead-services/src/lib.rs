//! Outbound integrations that feed property records.
//!
//! - [`geocoding`]: address ↔ coordinates through an ordered list of providers
//! - [`listings`]: external listing search/detail API with rate-limit retry and
//!   response normalization
//! - [`import`]: the property-creation path both of the above feed into

pub mod geocoding;
pub mod import;
pub mod listings;

pub use geocoding::{Declined, GeocodeProvider, GeocodingResolver};
pub use import::{CreatedProperty, ImportSummary, ImportWorkflow, PropertyStore, SkippedRow};
pub use listings::{ListingApiError, ListingClient};
