//! Homestead Storage Library
//!
//! Durable placement of transcoded images: a local filesystem tier, a CDN tier
//! reached over FTP, and the policy choosing between them.
//!
//! # Path format
//!
//! Every tier uses the same relative path, e.g. `properties/42/porch-1a2b3c4d5e6f.webp`.
//! Paths must not contain `..`. A leading `/` or `/storage/` prefix is tolerated and
//! stripped by [`keys::normalize_key`].

pub mod cdn;
pub mod error;
pub mod keys;
pub mod local;
pub mod policy;

// Re-export commonly used types
pub use cdn::{CdnClient, CdnError, Connection, Connector, FtpConnector, FtpTransport};
pub use error::{StorageError, StorageResult};
pub use keys::cdn_url;
pub use local::LocalStorage;
pub use policy::StoragePolicy;
