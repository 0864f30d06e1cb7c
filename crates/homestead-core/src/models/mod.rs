//! Domain models shared by the integration components.

pub mod asset;
pub mod geocode;
pub mod listing;
pub mod property;
pub mod upload;

pub use asset::{StorageTier, StoredAsset, TransformedImage};
pub use geocode::{AddressComponents, Coordinates, GeocodeQuery};
pub use listing::{ExternalListingRecord, ListingContact, ListingDetails, SearchFilters};
pub use property::{NewProperty, PropertyRowError};
pub use upload::UploadTask;
