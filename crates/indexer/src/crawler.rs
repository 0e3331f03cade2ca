//! Depth-first traversal of a namespace tree.
//!
//! Every object reachable from the root whose identity lies inside the root
//! namespace is bound exactly once. Objects are memoised by [`ObjectId`], so
//! re-export cycles (a submodule importing its parent, a type re-exported by
//! several namespaces) are visited only the first time they are reached.

use crate::identity::IdentityResolver;
use crate::object::{Category, IntrospectError, MemberScope, ObjectId, ObjectRef};
use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum CrawlError {
    #[error("cannot crawl from a {0}: the root must be a namespace")]
    RootNotNamespace(&'static str),

    #[error("the root namespace has no identity")]
    RootWithoutIdentity,

    #[error("error visiting {path}: {source}")]
    Identity {
        path: String,
        #[source]
        source: IntrospectError,
    },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub identity: String,
    pub category: Category,
    pub object: ObjectRef,
}

/// Identity to symbol mapping that keeps insertion order.
#[derive(Debug, Default, Clone)]
pub struct SymbolMap {
    entries: Vec<Symbol>,
    index: FxHashMap<String, usize>,
}

impl SymbolMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `symbol` unless its identity is already taken. Returns whether it was bound.
    pub fn insert(&mut self, symbol: Symbol) -> bool {
        if self.index.contains_key(&symbol.identity) {
            return false;
        }
        self.index.insert(symbol.identity.clone(), self.entries.len());
        self.entries.push(symbol);
        true
    }

    pub fn get(&self, identity: &str) -> Option<&Symbol> {
        self.index.get(identity).map(|&slot| &self.entries[slot])
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.index.contains_key(identity)
    }

    pub fn remove(&mut self, identity: &str) -> Option<Symbol> {
        let slot = self.index.remove(identity)?;
        let removed = self.entries.remove(slot);
        for position in self.index.values_mut() {
            if *position > slot {
                *position -= 1;
            }
        }
        Some(removed)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.entries.iter()
    }

    pub fn identities(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|symbol| symbol.identity.as_str())
    }

    pub fn into_symbols(self) -> Vec<Symbol> {
        self.entries
    }
}

#[derive(Debug, Default)]
pub struct CrawlResult {
    pub symbols: SymbolMap,
    /// Distinct objects that claimed an identity already bound to another object.
    pub conflicts: usize,
}

pub struct Crawler<'a> {
    resolver: &'a IdentityResolver,
}

impl<'a> Crawler<'a> {
    pub fn new(resolver: &'a IdentityResolver) -> Self {
        Self { resolver }
    }

    pub fn crawl(&self, root: &ObjectRef) -> Result<CrawlResult, CrawlError> {
        if root.category() != Category::Namespace {
            return Err(CrawlError::RootNotNamespace(root.category().as_str()));
        }
        let root_identity = self
            .resolver
            .identity_of(root.as_ref())
            .map_err(|source| CrawlError::Identity {
                path: "<root>".to_string(),
                source,
            })?
            .ok_or(CrawlError::RootWithoutIdentity)?;

        let mut state = CrawlState {
            resolver: self.resolver,
            path: vec![root_identity.clone()],
            root: root_identity,
            seen: FxHashSet::default(),
            result: CrawlResult::default(),
        };
        state.visit(root)?;

        debug!(
            "Crawled {} symbols under '{}'",
            state.result.symbols.len(),
            state.root
        );
        Ok(state.result)
    }
}

struct CrawlState<'a> {
    resolver: &'a IdentityResolver,
    root: String,
    path: Vec<String>,
    seen: FxHashSet<ObjectId>,
    result: CrawlResult,
}

impl CrawlState<'_> {
    fn visit(&mut self, object: &ObjectRef) -> Result<(), CrawlError> {
        let identity = match self.resolver.identity_of(object.as_ref()) {
            Ok(Some(identity)) => identity,
            Ok(None) => return Ok(()),
            Err(source) => {
                return Err(CrawlError::Identity {
                    path: self.path.join("."),
                    source,
                });
            }
        };

        if !is_within(&identity, &self.root) {
            return Ok(());
        }
        if !self.seen.insert(object.object_id()) {
            return Ok(());
        }

        let category = object.category();
        let bound = self.result.symbols.insert(Symbol {
            identity: identity.clone(),
            category,
            object: object.clone(),
        });
        if !bound {
            self.result.conflicts += 1;
            warn!(
                "'{}' is claimed by another object (reached via {}); keeping the first binding",
                identity,
                self.path.join(".")
            );
            return Ok(());
        }

        match category {
            Category::Namespace => self.visit_members(object, MemberScope::All),
            Category::Type => self.visit_members(object, MemberScope::Declared),
            Category::Callable | Category::Other => Ok(()),
        }
    }

    fn visit_members(&mut self, object: &ObjectRef, scope: MemberScope) -> Result<(), CrawlError> {
        for (name, member) in object.members(scope) {
            self.path.push(name);
            let visited = self.visit(&member);
            self.path.pop();
            visited?;
        }
        Ok(())
    }
}

/// `identity` is `root` itself or lies below it.
fn is_within(identity: &str, root: &str) -> bool {
    identity
        .strip_prefix(root)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, ObjectGraph};
    use crate::object::NamespaceLoader;
    use crate::signature::SignatureNode;
    use crate::testing::{StubObject, demo_graph};
    use std::sync::Arc;
    use tracing_test::traced_test;

    fn crawl(graph: &ObjectGraph, root: &str) -> Result<CrawlResult, CrawlError> {
        let resolver = IdentityResolver::new(Arc::new(graph.clone()));
        let root = graph.load(root).unwrap();
        Crawler::new(&resolver).crawl(&root)
    }

    fn identities(result: &CrawlResult) -> Vec<&str> {
        let mut identities: Vec<&str> = result.symbols.identities().collect();
        identities.sort();
        identities
    }

    #[test]
    fn test_reexported_class_is_bound_once_under_declared_identity() {
        let result = crawl(&demo_graph(), "demo").unwrap();
        assert_eq!(
            identities(&result),
            vec!["demo", "demo.A", "demo.A.bar", "demo.A.foo", "demo.B", "demo.helper"]
        );
        assert!(!result.symbols.contains("demo.B.A"));
        assert_eq!(result.conflicts, 0);
    }

    #[test]
    fn test_import_cycle_terminates() {
        let mut builder = GraphBuilder::new();
        let pkg = builder.namespace("pkg");
        let sub = builder.namespace("pkg.sub");
        let f = builder.function("pkg.sub", "f", SignatureNode::default());
        builder
            .member(pkg, "sub", sub)
            .member(sub, "pkg", pkg)
            .member(sub, "f", f)
            .member(pkg, "f", f);
        let result = crawl(&builder.build().unwrap(), "pkg").unwrap();
        assert_eq!(identities(&result), vec!["pkg", "pkg.sub", "pkg.sub.f"]);
    }

    #[test]
    fn test_foreign_and_unnamed_objects_are_pruned() {
        let mut builder = GraphBuilder::new();
        let pkg = builder.namespace("pkg");
        let foreign = builder.function("numpy", "array", SignatureNode::default());
        let lookalike = builder.class("pkgextra", "Thing");
        let constant = builder.value();
        let np = builder.namespace("numpy");
        builder
            .member(pkg, "array", foreign)
            .member(pkg, "Thing", lookalike)
            .member(pkg, "LIMIT", constant)
            .member(pkg, "np", np);
        let result = crawl(&builder.build().unwrap(), "pkg").unwrap();
        assert_eq!(identities(&result), vec!["pkg"]);
    }

    #[test]
    fn test_types_recurse_into_declared_members_only() {
        let mut builder = GraphBuilder::new();
        let pkg = builder.namespace("pkg");
        let base = builder.class("other", "Base");
        let child = builder.class("pkg", "Child");
        let inherited = builder.function("pkg", "Sibling.method", SignatureNode::default());
        let own = builder.function("pkg", "Child.own", SignatureNode::default());
        builder
            .member(pkg, "Child", child)
            .member(pkg, "Base", base)
            .inherited_member(child, "method", inherited)
            .member(child, "own", own);
        let result = crawl(&builder.build().unwrap(), "pkg").unwrap();
        assert_eq!(identities(&result), vec!["pkg", "pkg.Child", "pkg.Child.own"]);
    }

    #[traced_test]
    #[test]
    fn test_first_binding_wins_on_identity_clash() {
        let mut builder = GraphBuilder::new();
        let pkg = builder.namespace("pkg");
        let first = builder.class("pkg", "Thing");
        let impostor = builder.class("pkg", "Thing");
        builder
            .member(pkg, "Thing", first)
            .member(pkg, "Other", impostor);
        let result = crawl(&builder.build().unwrap(), "pkg").unwrap();

        assert_eq!(result.symbols.len(), 2);
        assert_eq!(
            result.symbols.get("pkg.Thing").unwrap().object.object_id(),
            ObjectId(first)
        );
        assert_eq!(result.conflicts, 1);
        assert!(logs_contain("keeping the first binding"));
    }

    #[test]
    fn test_identity_failure_aborts_with_path() {
        let broken = StubObject::callable(7, "pkg", "Thing.broken").failing().into_ref();
        let thing = StubObject::type_(6, "pkg", "Thing")
            .with_member("broken", broken)
            .into_ref();
        let root = StubObject::namespace(5, "pkg")
            .with_member("Thing", thing)
            .into_ref();
        let resolver = IdentityResolver::new(Arc::new(GraphBuilder::new().build().unwrap()));

        let error = Crawler::new(&resolver).crawl(&root).unwrap_err();
        match &error {
            CrawlError::Identity { path, .. } => assert_eq!(path, "pkg.Thing.broken"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(error.to_string().contains("pkg.Thing.broken"));
    }

    #[test]
    fn test_root_must_be_a_namespace() {
        let root = StubObject::type_(1, "pkg", "Thing").into_ref();
        let resolver = IdentityResolver::new(Arc::new(GraphBuilder::new().build().unwrap()));
        assert!(matches!(
            Crawler::new(&resolver).crawl(&root),
            Err(CrawlError::RootNotNamespace("type"))
        ));
    }

    #[test]
    fn test_symbol_map_remove_keeps_order() {
        let graph = demo_graph();
        let mut symbols = crawl(&graph, "demo").unwrap().symbols;
        let before: Vec<String> = symbols.identities().map(str::to_string).collect();
        symbols.remove("demo.A.foo").unwrap();
        let after: Vec<&str> = symbols.identities().collect();
        let expected: Vec<&str> = before
            .iter()
            .map(String::as_str)
            .filter(|identity| *identity != "demo.A.foo")
            .collect();
        assert_eq!(after, expected);
        assert!(symbols.get("demo.A.bar").is_some());
    }

    #[test]
    fn test_is_within_respects_dotted_boundaries() {
        assert!(is_within("demo", "demo"));
        assert!(is_within("demo.A", "demo"));
        assert!(!is_within("demox.A", "demo"));
        assert!(!is_within("other", "demo"));
    }
}
