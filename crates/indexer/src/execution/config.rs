use crate::docs::oracle::Bindings;
use crate::identity::DEFAULT_SKIP_PREFIXES;

/// Settings of one indexing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingConfig {
    /// Per-symbol workers; always at least one once built.
    pub worker_threads: usize,
    /// Query resolution oracles for example tokens.
    pub infer: bool,
    /// References under these prefixes are never normalised.
    pub skip_prefixes: Vec<String>,
    /// Names visible to every example snippet, e.g. `np` → `numpy`.
    pub extra_bindings: Bindings,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        IndexingConfigBuilder::new().build()
    }
}

#[derive(Debug, Clone)]
pub struct IndexingConfigBuilder {
    threads: usize,
    infer: bool,
    skip_prefixes: Vec<String>,
    extra_bindings: Bindings,
}

impl Default for IndexingConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexingConfigBuilder {
    pub fn new() -> Self {
        Self {
            threads: 0,
            infer: true,
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|p| p.to_string()).collect(),
            extra_bindings: Bindings::new(),
        }
    }

    /// `0` means one worker per CPU.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn infer(mut self, infer: bool) -> Self {
        self.infer = infer;
        self
    }

    pub fn skip_prefixes(mut self, skip_prefixes: Vec<String>) -> Self {
        self.skip_prefixes = skip_prefixes;
        self
    }

    pub fn bind(mut self, name: impl Into<String>, identity: impl Into<String>) -> Self {
        self.extra_bindings.insert(name.into(), identity.into());
        self
    }

    pub fn bindings(mut self, bindings: Bindings) -> Self {
        self.extra_bindings.extend(bindings);
        self
    }

    pub fn build(self) -> IndexingConfig {
        IndexingConfig {
            worker_threads: Self::get_effective_threads(self.threads),
            infer: self.infer,
            skip_prefixes: self.skip_prefixes,
            extra_bindings: self.extra_bindings,
        }
    }

    pub fn get_effective_threads(threads: usize) -> usize {
        if threads == 0 {
            num_cpus::get()
        } else {
            threads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_with_zero_threads() {
        let config = IndexingConfigBuilder::new().threads(0).build();

        assert!(config.worker_threads > 0);
        assert!(config.infer);
        assert_eq!(config.skip_prefixes, vec!["builtins.", "__main__"]);
        assert!(config.extra_bindings.is_empty());
    }

    #[test]
    fn test_later_bindings_override_earlier_ones() {
        let config = IndexingConfigBuilder::new()
            .threads(3)
            .infer(false)
            .bind("np", "numpy")
            .bindings(Bindings::from([("np".to_string(), "numpy.core".to_string())]))
            .build();

        assert_eq!(config.worker_threads, 3);
        assert!(!config.infer);
        assert_eq!(config.extra_bindings["np"], "numpy.core");
    }
}
