use homestead_core::CdnConfig;

use super::{CdnError, Connector, FtpTransport};

/// An open, logged-in session. Sends QUIT when closed or dropped.
pub struct Connection {
    transport: Option<Box<dyn FtpTransport>>,
    host: String,
}

impl Connection {
    pub fn open(connector: &dyn Connector, config: &CdnConfig) -> Result<Self, CdnError> {
        if !config.is_configured() {
            return Err(CdnError::NotConfigured);
        }

        let host = config.host.clone().unwrap_or_default();
        let transport = connector.connect(config)?;
        tracing::debug!(host = %host, port = config.port, "CDN connection opened");

        Ok(Self {
            transport: Some(transport),
            host,
        })
    }

    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    pub fn transport(&mut self) -> Result<&mut Box<dyn FtpTransport>, CdnError> {
        self.transport.as_mut().ok_or(CdnError::Closed)
    }

    /// Idempotent. QUIT failures are logged, never returned.
    pub fn close(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            match transport.quit() {
                Ok(()) => tracing::debug!(host = %self.host, "CDN connection closed"),
                Err(e) => tracing::debug!(host = %self.host, error = %e, "QUIT failed; dropping session"),
            }
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("host", &self.host)
            .field("open", &self.is_open())
            .finish()
    }
}
