use anyhow::{Context, Result};
use indexer::bundle::BundleStore;
use std::path::PathBuf;
use tracing::info;

pub fn run(bundle_root: PathBuf, namespaces: &[String]) -> Result<()> {
    let store = BundleStore::new(bundle_root);
    for namespace in namespaces {
        let removed = store
            .clear(namespace)
            .with_context(|| format!("Failed to clean bundle '{namespace}'"))?;
        info!("Removed {removed} artifacts from bundle '{namespace}'");
    }
    info!("Clean completed");
    Ok(())
}
