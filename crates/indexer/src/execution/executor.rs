use crate::bundle::{BundleError, BundleStore};
use crate::crawler::{CrawlError, Crawler, Symbol, SymbolMap};
use crate::docs::annotate::ExampleAnnotator;
use crate::docs::extract::DocExtractor;
use crate::docs::lexer::{Lexer, PythonLexer};
use crate::docs::oracle::{NameTableProvider, OracleProvider};
use crate::docs::sections::{NumpydocParser, SectionParser};
use crate::execution::config::IndexingConfig;
use crate::identity::IdentityResolver;
use crate::object::{LoadError, NamespaceLoader};
use crate::stats::RunStatistics;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("cannot load root namespace '{name}': {source}")]
    RootNotLoadable {
        name: String,
        #[source]
        source: LoadError,
    },

    #[error(transparent)]
    Crawl(#[from] CrawlError),

    #[error(transparent)]
    Bundle(#[from] BundleError),

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Builds the documentation bundle of a root namespace from scratch.
pub struct BundleIndexer {
    loader: Arc<dyn NamespaceLoader>,
    parser: Arc<dyn SectionParser>,
    lexer: Arc<dyn Lexer>,
    oracles: Arc<dyn OracleProvider>,
    store: BundleStore,
}

enum Outcome {
    Undocumented,
    Failed(String),
    Written {
        parse_time: Duration,
        inference_time: Duration,
    },
}

impl BundleIndexer {
    /// An indexer using the built-in numpydoc parser, Python lexer and
    /// name-table oracles over `loader`.
    pub fn new(loader: Arc<dyn NamespaceLoader>, store: BundleStore) -> Self {
        Self {
            oracles: Arc::new(NameTableProvider::new(loader.clone())),
            parser: Arc::new(NumpydocParser::new()),
            lexer: Arc::new(PythonLexer::new()),
            loader,
            store,
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn SectionParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn with_lexer(mut self, lexer: Arc<dyn Lexer>) -> Self {
        self.lexer = lexer;
        self
    }

    pub fn with_oracles(mut self, oracles: Arc<dyn OracleProvider>) -> Self {
        self.oracles = oracles;
        self
    }

    pub fn store(&self) -> &BundleStore {
        &self.store
    }

    /// Rebuilds the bundle of `root_name`.
    ///
    /// Loading the root, crawling and every bundle operation are fatal.
    /// Symbols whose documentation fails to parse are logged, counted and
    /// left out of the bundle.
    pub fn run(
        &self,
        root_name: &str,
        config: &IndexingConfig,
    ) -> Result<RunStatistics, IndexerError> {
        let start_time = Instant::now();
        let mut stats = RunStatistics::new(root_name);
        info!("Indexing namespace '{root_name}'");

        let root = self
            .loader
            .load(root_name)
            .map_err(|source| IndexerError::RootNotLoadable {
                name: root_name.to_string(),
                source,
            })?;

        // No artifact of this run may be written before the clear completes.
        self.store.clear(root_name)?;

        let resolver = IdentityResolver::new(self.loader.clone())
            .with_skip_prefixes(config.skip_prefixes.clone());
        let crawl = Crawler::new(&resolver).crawl(&root)?;
        stats.symbols_crawled = crawl.symbols.len();
        stats.identity_conflicts = crawl.conflicts;
        info!(
            "Crawled {} symbols under '{root_name}' ({} identity conflicts)",
            crawl.symbols.len(),
            crawl.conflicts
        );

        let reconciled = reconcile(crawl.symbols);
        stats.aliases_dropped = reconciled.aliases_dropped;
        stats.reconciliation_anomalies = reconciled.anomalies;
        let symbols = reconciled.symbols.into_symbols();

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|index| format!("docgraph-worker-{index}"))
            .build()?;
        info!(
            "Extracting documentation of {} symbols with {} workers",
            symbols.len(),
            config.worker_threads
        );

        let outcomes: Vec<Outcome> = pool.install(|| {
            symbols
                .par_iter()
                .map(|symbol| self.process_symbol(root_name, symbol, &resolver, config))
                .collect::<Result<Vec<_>, BundleError>>()
        })?;

        for outcome in outcomes {
            match outcome {
                Outcome::Undocumented => stats.undocumented += 1,
                Outcome::Failed(identity) => {
                    stats.documented += 1;
                    stats.failed += 1;
                    stats.failed_symbols.push(identity);
                }
                Outcome::Written {
                    parse_time,
                    inference_time,
                } => {
                    stats.documented += 1;
                    stats.written += 1;
                    stats.add_extraction_time(parse_time, inference_time);
                }
            }
        }
        stats.failed_symbols.sort();
        stats.duration_seconds = start_time.elapsed().as_secs_f64();

        info!(
            "Finished '{root_name}': {} artifacts written, {} failed, {} undocumented in {:.2}s",
            stats.written, stats.failed, stats.undocumented, stats.duration_seconds
        );
        Ok(stats)
    }

    fn process_symbol(
        &self,
        namespace: &str,
        symbol: &Symbol,
        resolver: &IdentityResolver,
        config: &IndexingConfig,
    ) -> Result<Outcome, BundleError> {
        let Some(raw) = symbol.object.doc().filter(|doc| !doc.trim().is_empty()) else {
            return Ok(Outcome::Undocumented);
        };

        let annotator = ExampleAnnotator::new(self.lexer.as_ref(), self.oracles.as_ref(), resolver);
        let extractor = DocExtractor::new(self.parser.as_ref(), annotator, &config.extra_bindings);
        let mut extraction = match extractor.extract(symbol, raw, config.infer) {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!("Skipping {}: {e}", symbol.identity);
                return Ok(Outcome::Failed(symbol.identity.clone()));
            }
        };

        let candidates = std::mem::take(&mut extraction.record.refs);
        extraction.record.refs = finalize_refs(resolver, candidates);
        self.store
            .write(namespace, &symbol.identity, &extraction.record)?;

        Ok(Outcome::Written {
            parse_time: extraction.parse_time,
            inference_time: extraction.inference_time,
        })
    }
}

/// Deduplicates and sorts `candidates`, normalises each entry, and
/// deduplicates and sorts again since normalisation can merge entries.
pub fn finalize_refs(resolver: &IdentityResolver, mut candidates: Vec<String>) -> Vec<String> {
    candidates.retain(|candidate| !candidate.is_empty());
    candidates.sort();
    candidates.dedup();

    let mut refs: Vec<String> = candidates
        .iter()
        .map(|candidate| resolver.normalize(candidate))
        .collect();
    refs.sort();
    refs.dedup();
    refs
}

#[derive(Debug)]
pub struct Reconciled {
    pub symbols: SymbolMap,
    pub aliases_dropped: usize,
    pub anomalies: usize,
}

/// Recomputes every bound identity without the crawl's memo table.
///
/// A symbol bound under an identity other than its recomputed one is an
/// alias when the recomputed identity is bound to the same object; the alias
/// entry is dropped. Any other disagreement is logged and both entries stay.
pub fn reconcile(mut symbols: SymbolMap) -> Reconciled {
    let mut aliases_dropped = 0;
    let mut anomalies = 0;

    let bound: Vec<Symbol> = symbols.iter().cloned().collect();
    for symbol in bound {
        let recomputed = match IdentityResolver::compute_identity(symbol.object.as_ref()) {
            Ok(recomputed) => recomputed,
            Err(e) => {
                anomalies += 1;
                warn!("Cannot recompute identity of '{}': {e}", symbol.identity);
                continue;
            }
        };
        if recomputed.as_deref() == Some(symbol.identity.as_str()) {
            continue;
        }

        let canonical = recomputed
            .as_deref()
            .and_then(|identity| symbols.get(identity))
            .map(|canonical| canonical.object.object_id());
        if canonical == Some(symbol.object.object_id()) {
            debug!(
                "Dropping alias '{}' of '{}'",
                symbol.identity,
                recomputed.as_deref().unwrap_or_default()
            );
            symbols.remove(&symbol.identity);
            aliases_dropped += 1;
        } else {
            anomalies += 1;
            warn!(
                "'{}' now identifies as {:?}; keeping both entries",
                symbol.identity, recomputed
            );
        }
    }

    Reconciled {
        symbols,
        aliases_dropped,
        anomalies,
    }
}
