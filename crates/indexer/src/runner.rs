use crate::execution::config::IndexingConfig;
use crate::execution::executor::BundleIndexer;
use crate::stats::IndexStatistics;
use anyhow::{Context, Result};
use std::time::Instant;
use tracing::{Level, error, info, warn};

fn progress_with_tracing<F>(message: &str, progress: &mut F, level: Level)
where
    F: FnMut(&str),
{
    progress(message);
    match level {
        Level::INFO => info!("{message}"),
        Level::WARN => warn!("{message}"),
        Level::ERROR => error!("{message}"),
        _ => info!("{message}"),
    }
}

/// Rebuilds the bundle of every namespace in order. The first fatal error
/// stops the whole run; bundles rebuilt before it stay in place.
pub fn run_indexer<F>(
    indexer: &BundleIndexer,
    namespaces: &[String],
    config: &IndexingConfig,
    mut progress: F,
) -> Result<IndexStatistics>
where
    F: FnMut(&str),
{
    let start_time = Instant::now();
    progress_with_tracing(
        "🚀 Starting documentation indexing...",
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing(
        &format!("📂 Bundle root: {}", indexer.store().root().display()),
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing("⚙️ Indexing configuration:", &mut progress, Level::INFO);
    progress_with_tracing(
        &format!("  • Worker threads: {}", config.worker_threads),
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing(
        &format!("  • Inference: {}", if config.infer { "on" } else { "off" }),
        &mut progress,
        Level::INFO,
    );
    if !config.extra_bindings.is_empty() {
        let bindings: Vec<String> = config
            .extra_bindings
            .iter()
            .map(|(name, identity)| format!("{name}={identity}"))
            .collect();
        progress_with_tracing(
            &format!("  • Bindings: {}", bindings.join(", ")),
            &mut progress,
            Level::INFO,
        );
    }

    let mut statistics = IndexStatistics::new(indexer.store().root().display().to_string(), 0.0);

    for (index, namespace) in namespaces.iter().enumerate() {
        progress_with_tracing(
            &format!(
                "\n📖 Processing namespace {}/{}: {namespace}",
                index + 1,
                namespaces.len()
            ),
            &mut progress,
            Level::INFO,
        );

        let run = indexer
            .run(namespace, config)
            .with_context(|| format!("Failed to index namespace '{namespace}'"))?;

        progress_with_tracing(
            &format!(
                "  ✅ {} symbols crawled, {} artifacts written, {} undocumented in {:.2}s",
                run.symbols_crawled, run.written, run.undocumented, run.duration_seconds
            ),
            &mut progress,
            Level::INFO,
        );
        if run.aliases_dropped > 0 || run.reconciliation_anomalies > 0 {
            progress_with_tracing(
                &format!(
                    "  🔁 Reconciliation: {} aliases dropped, {} anomalies",
                    run.aliases_dropped, run.reconciliation_anomalies
                ),
                &mut progress,
                Level::INFO,
            );
        }
        if !run.failed_symbols.is_empty() {
            progress_with_tracing(
                &format!(
                    "  ⚠️ Unparseable documentation ({} total):",
                    run.failed_symbols.len()
                ),
                &mut progress,
                Level::WARN,
            );
            for identity in run.failed_symbols.iter().take(5) {
                progress_with_tracing(&format!("    • {identity}"), &mut progress, Level::WARN);
            }
            if run.failed_symbols.len() > 5 {
                progress_with_tracing(
                    &format!("    • ... and {} more", run.failed_symbols.len() - 5),
                    &mut progress,
                    Level::WARN,
                );
            }
        }

        statistics.add_run(run);
    }

    let total_time = start_time.elapsed();
    statistics.metadata.indexing_duration_seconds = total_time.as_secs_f64();

    progress_with_tracing(
        &format!("\n🎉 Indexing completed in {total_time:?}"),
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing("📊 Summary:", &mut progress, Level::INFO);
    progress_with_tracing(
        &format!("  • Namespaces: {}", statistics.total_namespaces),
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing(
        &format!("  • Symbols: {}", statistics.total_symbols),
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing(
        &format!("  • Artifacts written: {}", statistics.total_written),
        &mut progress,
        Level::INFO,
    );
    progress_with_tracing(
        &format!("  • Failed: {}", statistics.total_failed),
        &mut progress,
        Level::INFO,
    );

    Ok(statistics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::BundleStore;
    use crate::execution::config::IndexingConfigBuilder;
    use crate::testing::demo_graph;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_run_indexer_reports_progress_and_totals() {
        let temp_dir = TempDir::new().unwrap();
        let indexer = BundleIndexer::new(Arc::new(demo_graph()), BundleStore::new(temp_dir.path()));
        let config = IndexingConfigBuilder::new().threads(2).infer(false).build();
        let mut messages = Vec::new();

        let statistics = run_indexer(&indexer, &["demo".to_string()], &config, |message| {
            messages.push(message.to_string())
        })
        .unwrap();

        assert_eq!(statistics.total_namespaces, 1);
        assert_eq!(statistics.total_symbols, 6);
        assert_eq!(statistics.total_written, 4);
        assert!(messages.iter().any(|m| m.contains("Processing namespace 1/1: demo")));
        assert!(messages.iter().any(|m| m.contains("Inference: off")));
    }

    #[test]
    fn test_run_indexer_stops_at_first_fatal_error() {
        let temp_dir = TempDir::new().unwrap();
        let indexer = BundleIndexer::new(Arc::new(demo_graph()), BundleStore::new(temp_dir.path()));
        let config = IndexingConfigBuilder::new().threads(1).build();

        let error = run_indexer(
            &indexer,
            &["missing".to_string(), "demo".to_string()],
            &config,
            |_| {},
        )
        .unwrap_err();

        assert!(error.to_string().contains("Failed to index namespace 'missing'"));
        assert!(indexer.store().list("demo").unwrap().is_empty());
    }
}
