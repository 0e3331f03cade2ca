use crate::docs::types::DocRecord;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

const ARTIFACT_EXTENSION: &str = "json";
const TEMP_PREFIX: &str = ".docgraph-";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Error, Debug)]
pub enum BundleError {
    #[error("failed to create bundle directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to clear bundle directory {}: {source}", path.display())]
    Clear {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialise record of '{identity}': {source}")]
    Serialize {
        identity: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write artifact {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read artifact {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("artifact {} is not a valid record: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persisted documentation bundles, one directory per root namespace and one
/// JSON artifact per symbol identity.
#[derive(Debug, Clone)]
pub struct BundleStore {
    root: PathBuf,
}

impl BundleStore {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn bundle_dir(&self, namespace: &str) -> PathBuf {
        self.root.join(file_stem(namespace))
    }

    pub fn artifact_path(&self, namespace: &str, identity: &str) -> PathBuf {
        self.bundle_dir(namespace)
            .join(format!("{}.{ARTIFACT_EXTENSION}", file_stem(identity)))
    }

    /// Removes every artifact and leftover temporary file of `namespace`,
    /// creating the bundle directory if needed. Other files and other
    /// namespaces' bundles are left alone. Returns how many files were removed.
    pub fn clear(&self, namespace: &str) -> Result<usize, BundleError> {
        let dir = self.bundle_dir(namespace);
        fs::create_dir_all(&dir).map_err(|source| BundleError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let clear_error = |source| BundleError::Clear {
            path: dir.clone(),
            source,
        };
        let mut removed = 0;
        for entry in fs::read_dir(&dir).map_err(clear_error)? {
            let path = entry.map_err(clear_error)?.path();
            if !path.is_file() || !(is_artifact(&path) || is_temp_file(&path)) {
                continue;
            }
            fs::remove_file(&path).map_err(clear_error)?;
            removed += 1;
        }

        info!("Cleared {removed} files from bundle {}", dir.display());
        Ok(removed)
    }

    /// Writes the artifact of `identity` atomically: the record is fully
    /// written to a temporary file in the bundle directory, then renamed over
    /// the final path.
    pub fn write(
        &self,
        namespace: &str,
        identity: &str,
        record: &DocRecord,
    ) -> Result<PathBuf, BundleError> {
        let json = serde_json::to_vec_pretty(record).map_err(|source| BundleError::Serialize {
            identity: identity.to_string(),
            source,
        })?;

        let dir = self.bundle_dir(namespace);
        let path = self.artifact_path(namespace, identity);
        let write_error = |source| BundleError::Write {
            path: path.clone(),
            source,
        };

        let mut file = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&dir)
            .map_err(write_error)?;
        file.write_all(&json).map_err(write_error)?;
        file.as_file().sync_all().map_err(write_error)?;
        file.persist(&path).map_err(|e| write_error(e.error))?;

        debug!("Wrote {}", path.display());
        Ok(path)
    }

    pub fn read(&self, namespace: &str, identity: &str) -> Result<DocRecord, BundleError> {
        let path = self.artifact_path(namespace, identity);
        let bytes = fs::read(&path).map_err(|source| BundleError::Read {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| BundleError::Corrupt { path, source })
    }

    /// Identities with an artifact in the bundle of `namespace`, sorted. A
    /// missing bundle directory is an empty bundle.
    pub fn list(&self, namespace: &str) -> Result<Vec<String>, BundleError> {
        let dir = self.bundle_dir(namespace);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let read_error = |source| BundleError::Read {
            path: dir.clone(),
            source,
        };

        let mut identities = Vec::new();
        for entry in fs::read_dir(&dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if !is_artifact(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                identities.push(stem.to_string());
            }
        }
        identities.sort();
        Ok(identities)
    }
}

fn file_stem(name: &str) -> String {
    name.replace(['/', '\\'], "_")
}

fn is_artifact(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == ARTIFACT_EXTENSION)
        && !path
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with('.'))
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX))
}
