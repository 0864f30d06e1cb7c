//! External listing search API client.

pub mod client;
pub mod error;
pub mod normalize;

pub use client::ListingClient;
pub use error::ListingApiError;
