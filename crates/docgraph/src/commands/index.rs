use anyhow::{Context, Result};
use indexer::bundle::BundleStore;
use indexer::execution::config::IndexingConfig;
use indexer::execution::executor::BundleIndexer;
use indexer::graph::ObjectGraph;
use indexer::runner::run_indexer;
use indexer::stats::IndexStatistics;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};

fn handle_statistics_output(statistics: &IndexStatistics, stats_output: Option<Option<PathBuf>>) {
    if let Some(stats_path_option) = stats_output {
        // Save to file if path provided
        if let Some(stats_path) = stats_path_option {
            match statistics.export_to_file(&stats_path) {
                Ok(_) => {
                    info!("Statistics saved to: {}", stats_path.display());
                }
                Err(e) => {
                    error!("Failed to save statistics: {e}");
                }
            }
        }

        info!("Indexing Summary:");
        info!("  - Total Namespaces: {}", statistics.total_namespaces);
        info!("  - Total Symbols: {}", statistics.total_symbols);
        info!("  - Artifacts Written: {}", statistics.total_written);

        if !statistics.namespaces.is_empty() {
            info!("Namespace Timing:");
            for run in &statistics.namespaces {
                info!(
                    "  - {}: {:.2}s ({} symbols, {} written, {} failed; extraction {:.2}s, inference {:.2}s)",
                    run.namespace,
                    run.duration_seconds,
                    run.symbols_crawled,
                    run.written,
                    run.failed,
                    run.extraction_seconds,
                    run.inference_seconds
                );
            }
        }
    }
}

pub fn run(
    graph_path: &Path,
    bundle_root: PathBuf,
    namespaces: &[String],
    config: &IndexingConfig,
    stats_output: Option<Option<PathBuf>>,
) -> Result<()> {
    let graph = ObjectGraph::from_file(graph_path)
        .with_context(|| format!("Failed to load namespace dump: {}", graph_path.display()))?;
    info!("Loaded {} objects from {}", graph.len(), graph_path.display());

    let indexer = BundleIndexer::new(Arc::new(graph), BundleStore::new(bundle_root));
    let statistics = run_indexer(&indexer, namespaces, config, |msg| println!("{msg}"))?;

    handle_statistics_output(&statistics, stats_output);
    Ok(())
}
