use anyhow::{Context, Result};
use indexer::docs::oracle::Bindings;
use indexer::execution::config::{IndexingConfig, IndexingConfigBuilder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings read from a TOML file. Command-line flags take precedence.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub bundle_dir: Option<PathBuf>,
    pub threads: Option<usize>,
    pub infer: Option<bool>,
    pub skip_prefixes: Option<Vec<String>>,
    pub bindings: Bindings,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Loads `explicit` when given, otherwise `~/.docgraph/config.toml` if
    /// it exists, otherwise the empty configuration.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        match get_docgraph_dir().map(|dir| dir.join(CONFIG_FILE_NAME)) {
            Some(path) if path.is_file() => {
                debug!("Using config file {}", path.display());
                Self::from_file(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn bundle_root(&self, flag: Option<PathBuf>) -> Result<PathBuf> {
        if let Some(dir) = flag.or_else(|| self.bundle_dir.clone()) {
            return Ok(dir);
        }
        get_docgraph_dir()
            .map(|dir| dir.join("bundles"))
            .context("Could not determine the home directory; pass --bundle-dir")
    }

    pub fn indexing_config(
        &self,
        threads: Option<usize>,
        no_infer: bool,
        bindings: Vec<(String, String)>,
    ) -> IndexingConfig {
        let mut builder = IndexingConfigBuilder::new()
            .threads(threads.or(self.threads).unwrap_or(0))
            .infer(!no_infer && self.infer.unwrap_or(true))
            .bindings(self.bindings.clone())
            .bindings(bindings.into_iter().collect());
        if let Some(skip_prefixes) = &self.skip_prefixes {
            builder = builder.skip_prefixes(skip_prefixes.clone());
        }
        builder.build()
    }
}

/// `~/.docgraph`
fn get_docgraph_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".docgraph"))
}
