//! In-memory FTP server for tests.
//!
//! Mirrors the semantics the client depends on: `MKD` of an existing directory
//! fails, `CWD` into a missing directory fails, `STOR` requires the parent to exist.

use homestead_core::CdnConfig;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{CdnError, Connector, FtpTransport};

#[derive(Debug, Default)]
pub struct MemoryFtpState {
    pub dirs: BTreeSet<String>,
    pub files: BTreeMap<String, Vec<u8>>,
    pub connects: usize,
    pub quits: usize,
    pub mkdir_calls: usize,
    pub refuse_connect: bool,
    pub refuse_login: bool,
    pub fail_transfers: bool,
    /// Directories another client "creates" between our CWD and MKD.
    pub race_mkdir: BTreeSet<String>,
}

/// Shared handle to the fake server; clones observe the same state.
#[derive(Debug, Clone)]
pub struct MemoryFtp {
    state: Arc<Mutex<MemoryFtpState>>,
}

impl Default for MemoryFtp {
    fn default() -> Self {
        let mut state = MemoryFtpState::default();
        state.dirs.insert("/".to_string());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl MemoryFtp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MemoryFtpState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }
}

impl Connector for MemoryFtp {
    fn connect(&self, config: &CdnConfig) -> Result<Box<dyn FtpTransport>, CdnError> {
        let host = config.host.clone().unwrap_or_default();
        let mut state = self.state();
        state.connects += 1;
        if state.refuse_connect {
            return Err(CdnError::Connect {
                host,
                message: "connection refused".to_string(),
            });
        }
        if state.refuse_login {
            return Err(CdnError::Auth {
                host,
                message: "530 Login incorrect".to_string(),
            });
        }
        Ok(Box::new(MemorySession {
            server: self.clone(),
            cwd: "/".to_string(),
        }))
    }
}

struct MemorySession {
    server: MemoryFtp,
    cwd: String,
}

impl MemorySession {
    fn resolve(&self, path: &str) -> String {
        let joined = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("{}/{}", self.cwd.trim_end_matches('/'), path)
        };
        let parts: Vec<&str> = joined.split('/').filter(|s| !s.is_empty()).collect();
        format!("/{}", parts.join("/"))
    }

    fn parent(path: &str) -> String {
        match path.rsplit_once('/') {
            Some(("", _)) | None => "/".to_string(),
            Some((dir, _)) => dir.to_string(),
        }
    }
}

impl FtpTransport for MemorySession {
    fn cwd(&mut self, path: &str) -> Result<(), CdnError> {
        let target = self.resolve(path);
        if self.server.state().dirs.contains(&target) {
            self.cwd = target;
            Ok(())
        } else {
            Err(CdnError::Command(format!("550 {}: No such directory", target)))
        }
    }

    fn mkdir(&mut self, path: &str) -> Result<(), CdnError> {
        let target = self.resolve(path);
        let mut state = self.server.state();
        state.mkdir_calls += 1;
        if state.race_mkdir.remove(&target) {
            state.dirs.insert(target.clone());
            return Err(CdnError::Command(format!("550 {}: File exists", target)));
        }
        if state.dirs.contains(&target) {
            return Err(CdnError::Command(format!("550 {}: File exists", target)));
        }
        if !state.dirs.contains(&Self::parent(&target)) {
            return Err(CdnError::Command(format!("550 {}: No such directory", target)));
        }
        state.dirs.insert(target);
        Ok(())
    }

    fn put(&mut self, name: &str, reader: &mut dyn Read) -> Result<u64, CdnError> {
        let target = self.resolve(name);
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;

        let mut state = self.server.state();
        if state.fail_transfers {
            return Err(CdnError::Transfer {
                path: target,
                message: "451 Requested action aborted".to_string(),
            });
        }
        if !state.dirs.contains(&Self::parent(&target)) {
            return Err(CdnError::Transfer {
                path: target,
                message: "553 No such directory".to_string(),
            });
        }
        let len = data.len() as u64;
        state.files.insert(target, data);
        Ok(len)
    }

    fn size(&mut self, path: &str) -> Result<usize, CdnError> {
        let target = self.resolve(path);
        self.server
            .state()
            .files
            .get(&target)
            .map(Vec::len)
            .ok_or_else(|| CdnError::Command(format!("550 {}: not found", target)))
    }

    fn remove(&mut self, path: &str) -> Result<(), CdnError> {
        let target = self.resolve(path);
        self.server
            .state()
            .files
            .remove(&target)
            .map(|_| ())
            .ok_or_else(|| CdnError::Command(format!("550 {}: not found", target)))
    }

    fn quit(&mut self) -> Result<(), CdnError> {
        self.server.state().quits += 1;
        Ok(())
    }
}
