//! Homestead Core Library
//!
//! This crate provides the domain models, configuration, and error classification
//! shared by the ingestion, storage, geocoding, and listing-import components.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{
    CdnConfig, Config, GeocodingConfig, ListingApiConfig, LocalStorageConfig, QueueConfig,
};
pub use error::{Classify, ErrorClass, LogLevel};
