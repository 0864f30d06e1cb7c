//! CDN transfer client.
//!
//! The CDN origin only speaks FTP: a stateful session with a working directory,
//! explicit login, and no recursive `mkdir`. The protocol is reached through the
//! [`Connector`] / [`FtpTransport`] seam so the client logic can run against an
//! in-memory server in tests.

mod client;
mod connection;
mod ftp;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;

pub use client::CdnClient;
pub use connection::Connection;
pub use ftp::FtpConnector;

use homestead_core::{CdnConfig, Classify, ErrorClass};
use std::io::Read;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CdnError {
    #[error("CDN is not configured")]
    NotConfigured,

    #[error("Failed to connect to {host}: {message}")]
    Connect { host: String, message: String },

    #[error("Login rejected by {host}: {message}")]
    Auth { host: String, message: String },

    #[error("Could not ensure remote directory {path}: {message}")]
    Directory { path: String, message: String },

    #[error("Transfer of {path} failed: {message}")]
    Transfer { path: String, message: String },

    #[error("FTP command failed: {0}")]
    Command(String),

    #[error("Connection is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CDN worker failed: {0}")]
    Worker(String),
}

impl Classify for CdnError {
    fn class(&self) -> ErrorClass {
        match self {
            CdnError::NotConfigured => ErrorClass::ConfigurationMissing,
            CdnError::Auth { .. } => ErrorClass::UpstreamRejected,
            _ => ErrorClass::TransientIo,
        }
    }
}

/// One logged-in FTP session. Paths are absolute (`/a/b`) or relative to the
/// current working directory.
pub trait FtpTransport: Send {
    fn cwd(&mut self, path: &str) -> Result<(), CdnError>;
    fn mkdir(&mut self, path: &str) -> Result<(), CdnError>;
    /// Store the reader's contents as `name`, in binary mode.
    fn put(&mut self, name: &str, reader: &mut dyn Read) -> Result<u64, CdnError>;
    fn size(&mut self, path: &str) -> Result<usize, CdnError>;
    fn remove(&mut self, path: &str) -> Result<(), CdnError>;
    fn quit(&mut self) -> Result<(), CdnError>;
}

/// Opens sessions: connect, passive mode, login, binary transfer type.
pub trait Connector: Send + Sync {
    fn connect(&self, config: &CdnConfig) -> Result<Box<dyn FtpTransport>, CdnError>;
}
