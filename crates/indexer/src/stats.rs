use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Counters and timings of one namespace run. Never written into artifacts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub namespace: String,
    pub symbols_crawled: usize,
    /// Objects that claimed an identity bound to a different object.
    pub identity_conflicts: usize,
    pub aliases_dropped: usize,
    pub reconciliation_anomalies: usize,
    pub documented: usize,
    pub undocumented: usize,
    pub failed: usize,
    pub written: usize,
    pub failed_symbols: Vec<String>,
    pub extraction_seconds: f64,
    pub inference_seconds: f64,
    pub duration_seconds: f64,
}

impl RunStatistics {
    pub fn new(namespace: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            ..Default::default()
        }
    }

    pub fn add_extraction_time(&mut self, parse: Duration, inference: Duration) {
        self.extraction_seconds += (parse + inference).as_secs_f64();
        self.inference_seconds += inference.as_secs_f64();
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsMetadata {
    pub docgraph_version: String,
    pub timestamp: DateTime<Utc>,
    pub bundle_root: String,
    pub indexing_duration_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStatistics {
    pub metadata: StatisticsMetadata,
    pub total_namespaces: usize,
    pub total_symbols: usize,
    pub total_written: usize,
    pub total_failed: usize,
    pub namespaces: Vec<RunStatistics>,
}

impl IndexStatistics {
    pub fn new(bundle_root: String, indexing_duration_seconds: f64) -> Self {
        Self {
            metadata: StatisticsMetadata {
                docgraph_version: env!("CARGO_PKG_VERSION").to_string(),
                timestamp: Utc::now(),
                bundle_root,
                indexing_duration_seconds,
            },
            total_namespaces: 0,
            total_symbols: 0,
            total_written: 0,
            total_failed: 0,
            namespaces: Vec::new(),
        }
    }

    pub fn add_run(&mut self, run: RunStatistics) {
        self.total_symbols += run.symbols_crawled;
        self.total_written += run.written;
        self.total_failed += run.failed;
        self.namespaces.push(run);
        self.total_namespaces = self.namespaces.len();
    }

    pub fn export_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
