use homestead_core::CdnConfig;
use std::io::{Seek, SeekFrom, Write};
use std::sync::Arc;

use super::{CdnError, Connection, Connector};
use crate::keys::{cdn_url, split_parent};

/// Blocking CDN client. One instance per placement; never shared between threads.
///
/// The session is opened on first use and closed when the client is dropped.
pub struct CdnClient {
    config: CdnConfig,
    connector: Arc<dyn Connector>,
    connection: Option<Connection>,
}

impl CdnClient {
    pub fn new(config: CdnConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            config,
            connector,
            connection: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(Connection::is_open)
    }

    /// Open the session now instead of on first use.
    pub fn connect(&mut self) -> Result<(), CdnError> {
        self.connection().map(|_| ())
    }

    pub fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }

    fn connection(&mut self) -> Result<&mut Connection, CdnError> {
        if !self.is_connected() {
            let connection = Connection::open(self.connector.as_ref(), &self.config)?;
            self.connection = Some(connection);
        }
        self.connection.as_mut().ok_or(CdnError::Closed)
    }

    /// Public URL for `path` under the configured pull zone.
    pub fn url(&self, path: &str) -> Result<String, CdnError> {
        let zone = self
            .config
            .pull_zone
            .as_deref()
            .ok_or(CdnError::NotConfigured)?;
        Ok(cdn_url(zone, path))
    }

    /// Make sure every segment of `directory` exists, leaving the session inside it.
    ///
    /// Walks from `/`: CWD into each segment, MKD it on failure, then CWD again. A
    /// failed MKD is tolerated when the follow-up CWD succeeds, which covers both a
    /// directory created by a concurrent client and servers that answer MKD on an
    /// existing directory with an error.
    #[tracing::instrument(skip(self))]
    pub fn ensure_directory(&mut self, directory: &str) -> Result<(), CdnError> {
        let ftp = self.connection()?.transport()?;
        ftp.cwd("/").map_err(|e| CdnError::Directory {
            path: "/".to_string(),
            message: e.to_string(),
        })?;

        let mut current = String::new();
        for segment in directory.split('/').filter(|s| !s.is_empty()) {
            current.push('/');
            current.push_str(segment);

            if ftp.cwd(segment).is_ok() {
                continue;
            }

            match ftp.mkdir(segment) {
                Ok(()) => tracing::debug!(path = %current, "Created remote directory"),
                Err(e) => tracing::debug!(path = %current, error = %e, "MKD failed; retrying CWD"),
            }

            ftp.cwd(segment).map_err(|e| CdnError::Directory {
                path: current.clone(),
                message: e.to_string(),
            })?;
        }

        Ok(())
    }

    /// Upload `data` to `remote_path` and return its public CDN URL.
    ///
    /// The payload is written to a local temp file first; the transfer streams from
    /// that file. No internal retry.
    #[tracing::instrument(skip(self, data), fields(size_bytes = data.len()))]
    pub fn upload(&mut self, data: &[u8], remote_path: &str) -> Result<String, CdnError> {
        let remote_path = remote_path.trim_start_matches('/');
        let (directory, file_name) = split_parent(remote_path);
        if file_name.is_empty() {
            return Err(CdnError::Transfer {
                path: remote_path.to_string(),
                message: "path does not name a file".to_string(),
            });
        }

        let start = std::time::Instant::now();

        let mut staged = tempfile::NamedTempFile::new()?;
        staged.write_all(data)?;
        staged.flush()?;
        staged.as_file_mut().seek(SeekFrom::Start(0))?;

        self.ensure_directory(directory)?;

        let ftp = self.connection()?.transport()?;
        let written = ftp.put(file_name, staged.as_file_mut())?;

        let url = self.url(remote_path)?;

        tracing::info!(
            remote_path = %remote_path,
            url = %url,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "CDN upload successful"
        );

        Ok(url)
    }

    /// Whether `remote_path` exists. Any failure, including connecting, reads as `false`.
    pub fn exists(&mut self, remote_path: &str) -> bool {
        let rooted = format!("/{}", remote_path.trim_start_matches('/'));
        let result = self
            .connection()
            .and_then(|c| c.transport())
            .and_then(|ftp| ftp.size(&rooted));
        match result {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(remote_path = %rooted, error = %e, "SIZE failed; treating as absent");
                false
            }
        }
    }

    /// Best-effort delete. Returns whether the server confirmed the removal.
    pub fn delete(&mut self, remote_path: &str) -> bool {
        let rooted = format!("/{}", remote_path.trim_start_matches('/'));
        let result = self
            .connection()
            .and_then(|c| c.transport())
            .and_then(|ftp| ftp.remove(&rooted));
        match result {
            Ok(()) => {
                tracing::info!(remote_path = %rooted, "CDN delete successful");
                true
            }
            Err(e) => {
                tracing::warn!(remote_path = %rooted, error = %e, "CDN delete failed");
                false
            }
        }
    }
}

impl Drop for CdnClient {
    fn drop(&mut self) {
        self.close();
    }
}
