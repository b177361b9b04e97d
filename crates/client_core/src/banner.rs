//! Dismissible banners whose dismissal survives restarts.

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BannerError {
    #[error("failed to access dismissal file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("dismissal file '{path}' is malformed: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub trait DismissalBackend {
    fn load(&self) -> Result<BTreeSet<String>, BannerError>;
    fn save(&mut self, dismissed: &BTreeSet<String>) -> Result<(), BannerError>;
}

#[derive(Debug, Default)]
pub struct MemoryDismissals {
    dismissed: BTreeSet<String>,
}

impl DismissalBackend for MemoryDismissals {
    fn load(&self) -> Result<BTreeSet<String>, BannerError> {
        Ok(self.dismissed.clone())
    }

    fn save(&mut self, dismissed: &BTreeSet<String>) -> Result<(), BannerError> {
        self.dismissed = dismissed.clone();
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DismissalFile {
    #[serde(default)]
    dismissed: BTreeSet<String>,
}

/// JSON file backend. A missing file means nothing was dismissed yet.
#[derive(Debug, Clone)]
pub struct FileDismissals {
    path: PathBuf,
}

impl FileDismissals {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> BannerError {
        BannerError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl DismissalBackend for FileDismissals {
    fn load(&self) -> Result<BTreeSet<String>, BannerError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
            Err(err) => return Err(self.io_error(err)),
        };
        let file: DismissalFile =
            serde_json::from_str(&raw).map_err(|source| BannerError::Malformed {
                path: self.path.clone(),
                source,
            })?;
        Ok(file.dismissed)
    }

    fn save(&mut self, dismissed: &BTreeSet<String>) -> Result<(), BannerError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }
        let file = DismissalFile {
            dismissed: dismissed.clone(),
        };
        let raw = serde_json::to_string_pretty(&file).map_err(|source| BannerError::Malformed {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, raw).map_err(|err| self.io_error(err))
    }
}

pub struct DismissalStore<B> {
    backend: B,
    dismissed: BTreeSet<String>,
}

impl<B: DismissalBackend> DismissalStore<B> {
    pub fn open(backend: B) -> Result<Self, BannerError> {
        let dismissed = backend.load()?;
        Ok(Self { backend, dismissed })
    }

    pub fn is_dismissed(&self, key: &str) -> bool {
        self.dismissed.contains(key)
    }

    /// Idempotent; only writes when the key is new.
    pub fn dismiss(&mut self, key: &str) -> Result<(), BannerError> {
        if !self.dismissed.insert(key.to_string()) {
            return Ok(());
        }
        debug!(banner = key, "banner dismissed");
        if let Err(err) = self.backend.save(&self.dismissed) {
            self.dismissed.remove(key);
            return Err(err);
        }
        Ok(())
    }

    pub fn restore(&mut self, key: &str) -> Result<(), BannerError> {
        if self.dismissed.remove(key) {
            self.backend.save(&self.dismissed)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/banner_tests.rs"]
mod tests;
