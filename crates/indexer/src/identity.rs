//! Canonical identities of symbols.
//!
//! A canonical identity is the dotted name an object declares for itself:
//! a namespace's own name, or `module.qualname` for anything else. References
//! found in documentation are often import paths instead, so [`IdentityResolver::normalize`]
//! upgrades them to the canonical form on a best-effort basis.

use crate::object::{Category, Introspect, IntrospectError, LoadError, NamespaceLoader, ObjectId};
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// References under these prefixes are never worth resolving.
pub const DEFAULT_SKIP_PREFIXES: &[&str] = &["builtins.", "__main__"];

#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("'{0}' has no owning namespace")]
    Unqualified(String),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("'{owner}' has no attribute '{name}'")]
    MissingAttribute { owner: String, name: String },

    #[error(transparent)]
    Introspect(#[from] IntrospectError),
}

/// Derives and normalises canonical identities. Both operations are memoised
/// for the lifetime of the resolver, which is one indexing run.
pub struct IdentityResolver {
    loader: Arc<dyn NamespaceLoader>,
    skip_prefixes: Vec<String>,
    identities: DashMap<ObjectId, Option<String>>,
    normalized: DashMap<String, String>,
}

impl IdentityResolver {
    pub fn new(loader: Arc<dyn NamespaceLoader>) -> Self {
        Self {
            loader,
            skip_prefixes: DEFAULT_SKIP_PREFIXES.iter().map(|p| p.to_string()).collect(),
            identities: DashMap::new(),
            normalized: DashMap::new(),
        }
    }

    pub fn with_skip_prefixes(mut self, skip_prefixes: Vec<String>) -> Self {
        self.skip_prefixes = skip_prefixes;
        self
    }

    pub fn loader(&self) -> &Arc<dyn NamespaceLoader> {
        &self.loader
    }

    /// Identity of `object`, or `None` when it does not declare enough
    /// metadata to be indexed. Errors are not memoised.
    pub fn identity_of(&self, object: &dyn Introspect) -> Result<Option<String>, IntrospectError> {
        let id = object.object_id();
        if let Some(cached) = self.identities.get(&id) {
            return Ok(cached.clone());
        }
        let identity = Self::compute_identity(object)?;
        self.identities.insert(id, identity.clone());
        Ok(identity)
    }

    /// Uncached identity computation.
    pub fn compute_identity(object: &dyn Introspect) -> Result<Option<String>, IntrospectError> {
        let metadata = object.metadata()?;
        let identity = match object.category() {
            Category::Namespace => metadata.name.map(str::to_string),
            Category::Type | Category::Callable | Category::Other => {
                match (metadata.module, metadata.qualname.or(metadata.name)) {
                    (Some(module), Some(name)) if !module.is_empty() => {
                        Some(format!("{module}.{name}"))
                    }
                    _ => None,
                }
            }
        };
        Ok(identity.filter(|identity| !identity.is_empty()))
    }

    /// Best-effort upgrade of `reference` to a canonical identity.
    ///
    /// Anything that cannot be resolved comes back unchanged. Single steps are
    /// repeated until the result is stable; if they cycle, the smallest member
    /// of the cycle is returned so that the answer is the same from every
    /// entry point and `normalize(normalize(x)) == normalize(x)`.
    pub fn normalize(&self, reference: &str) -> String {
        if let Some(cached) = self.normalized.get(reference) {
            return cached.clone();
        }

        let mut chain = vec![reference.to_string()];
        let mut current = reference.to_string();
        let resolved = loop {
            let next = self.normalize_once(&current);
            if next == current {
                break current;
            }
            if let Some(start) = chain.iter().position(|seen| *seen == next) {
                break chain[start..].iter().min().cloned().unwrap_or(next);
            }
            chain.push(next.clone());
            current = next;
        };

        for entry in chain {
            self.normalized.insert(entry, resolved.clone());
        }
        resolved
    }

    fn normalize_once(&self, reference: &str) -> String {
        match self.resolve_reference(reference) {
            Ok(Some(identity)) => identity,
            Ok(None) => reference.to_string(),
            Err(e) => {
                debug!("Keeping reference '{reference}' unresolved: {e}");
                reference.to_string()
            }
        }
    }

    /// `Ok(None)` means the reference is fine as it is.
    fn resolve_reference(&self, reference: &str) -> Result<Option<String>, ResolutionError> {
        if self
            .skip_prefixes
            .iter()
            .any(|prefix| reference.starts_with(prefix.as_str()))
        {
            return Ok(None);
        }

        let (owner, name) = reference
            .rsplit_once('.')
            .ok_or_else(|| ResolutionError::Unqualified(reference.to_string()))?;
        let namespace = self.loader.load(owner)?;
        let object = namespace
            .attribute(name)
            .ok_or_else(|| ResolutionError::MissingAttribute {
                owner: owner.to_string(),
                name: name.to_string(),
            })?;

        if object.category() == Category::Namespace {
            return Ok(None);
        }
        Ok(self.identity_of(object.as_ref())?)
    }
}
