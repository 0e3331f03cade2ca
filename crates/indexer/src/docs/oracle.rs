//! Resolution oracles answer "what does the expression at this position refer to?".
//!
//! Oracles are created per snippet through an [`OracleProvider`] and are never
//! shared between threads, so implementations do not need to be `Sync`.

use crate::identity::IdentityResolver;
use crate::object::NamespaceLoader;
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Extra name → identity bindings visible to example snippets, e.g. `np` → `numpy`.
pub type Bindings = BTreeMap<String, String>;

/// A position inside a snippet: 1-based line, 0-based byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let before = &source[..offset.min(source.len())];
        match before.rfind('\n') {
            Some(newline) => Self {
                line: before.matches('\n').count() + 1,
                column: offset - newline - 1,
            },
            None => Self {
                line: 1,
                column: offset,
            },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InferenceError {
    #[error("no expression at {line}:{column}")]
    NoExpression { line: usize, column: usize },

    #[error("cannot resolve '{0}'")]
    Unresolved(String),

    #[error("inference timed out")]
    Timeout,

    #[error("inference failed: {0}")]
    Failed(String),
}

pub trait ResolutionOracle {
    /// Identity of the expression at `position`. `Ok(None)` means the oracle
    /// has no opinion.
    fn resolve(&mut self, position: Position) -> Result<Option<String>, InferenceError>;
}

pub trait OracleProvider: Send + Sync {
    /// Oracle over `source` that also sees `bindings`.
    fn seeded<'a>(
        &'a self,
        source: &'a str,
        bindings: &Bindings,
    ) -> Box<dyn ResolutionOracle + 'a>;

    /// Oracle over `source` alone.
    fn generic<'a>(&'a self, source: &'a str) -> Box<dyn ResolutionOracle + 'a>;
}

/// Provides [`NameTableOracle`]s backed by a namespace loader.
pub struct NameTableProvider {
    loader: Arc<dyn NamespaceLoader>,
    imports: Regex,
    from_imports: Regex,
}

impl NameTableProvider {
    pub fn new(loader: Arc<dyn NamespaceLoader>) -> Self {
        Self {
            loader,
            imports: Regex::new(r"^\s*import\s+(?P<targets>[\w., ]+?)\s*$")
                .expect("valid regex"),
            from_imports: Regex::new(
                r"^\s*from\s+(?P<module>[\w.]+)\s+import\s+\(?(?P<targets>[\w, ]+?)\)?\s*$",
            )
            .expect("valid regex"),
        }
    }

    /// Names bound by the snippet's own import statements.
    fn imported_names(&self, source: &str) -> FxHashMap<String, String> {
        let mut names = FxHashMap::default();
        for line in source.lines() {
            if let Some(captures) = self.imports.captures(line) {
                for target in captures["targets"].split(',') {
                    let target = target.trim();
                    match target.split_once(" as ") {
                        Some((module, alias)) => {
                            names.insert(alias.trim().to_string(), module.trim().to_string())
                        }
                        None => {
                            let head = target.split('.').next().unwrap_or(target);
                            names.insert(head.to_string(), head.to_string())
                        }
                    };
                }
            } else if let Some(captures) = self.from_imports.captures(line) {
                let module = &captures["module"];
                for target in captures["targets"].split(',') {
                    let target = target.trim();
                    if target.is_empty() {
                        continue;
                    }
                    let (name, alias) = target.split_once(" as ").unwrap_or((target, target));
                    names.insert(alias.trim().to_string(), format!("{module}.{}", name.trim()));
                }
            }
        }
        names
    }
}

impl OracleProvider for NameTableProvider {
    fn seeded<'a>(
        &'a self,
        source: &'a str,
        bindings: &Bindings,
    ) -> Box<dyn ResolutionOracle + 'a> {
        let mut names = self.imported_names(source);
        names.extend(bindings.iter().map(|(k, v)| (k.clone(), v.clone())));
        Box::new(NameTableOracle {
            source,
            names,
            loader: self.loader.as_ref(),
        })
    }

    fn generic<'a>(&'a self, source: &'a str) -> Box<dyn ResolutionOracle + 'a> {
        Box::new(NameTableOracle {
            source,
            names: self.imported_names(source),
            loader: self.loader.as_ref(),
        })
    }
}

/// Resolves dotted names by looking their head up in a name table and
/// walking the rest through the namespace loader.
pub struct NameTableOracle<'a> {
    source: &'a str,
    names: FxHashMap<String, String>,
    loader: &'a dyn NamespaceLoader,
}

impl NameTableOracle<'_> {
    /// The dotted expression whose last identifier covers `position`.
    fn expression_at(&self, position: Position) -> Option<&str> {
        let line = self.source.lines().nth(position.line.checked_sub(1)?)?;
        let bytes = line.as_bytes();
        let is_ident = |b: u8| b.is_ascii_alphanumeric() || b == b'_';
        if position.column >= bytes.len() || !is_ident(bytes[position.column]) {
            return None;
        }

        let mut end = position.column;
        while end < bytes.len() && is_ident(bytes[end]) {
            end += 1;
        }
        let mut start = position.column;
        loop {
            while start > 0 && is_ident(bytes[start - 1]) {
                start -= 1;
            }
            if start >= 2 && bytes[start - 1] == b'.' && is_ident(bytes[start - 2]) {
                start -= 1;
                continue;
            }
            break;
        }

        let expression = &line[start..end];
        if expression.as_bytes()[0].is_ascii_digit() {
            return None;
        }
        Some(expression)
    }

    fn lookup(&self, path: &str) -> Result<Option<String>, InferenceError> {
        let segments: Vec<&str> = path.split('.').collect();
        for split in (1..=segments.len()).rev() {
            let Ok(mut object) = self.loader.load(&segments[..split].join(".")) else {
                continue;
            };
            for segment in &segments[split..] {
                object = object
                    .attribute(segment)
                    .ok_or_else(|| InferenceError::Unresolved(path.to_string()))?;
            }
            return IdentityResolver::compute_identity(object.as_ref())
                .map_err(|e| InferenceError::Failed(e.to_string()))?
                .map(Some)
                .ok_or_else(|| InferenceError::Unresolved(path.to_string()));
        }
        Err(InferenceError::Unresolved(path.to_string()))
    }
}

impl ResolutionOracle for NameTableOracle<'_> {
    fn resolve(&mut self, position: Position) -> Result<Option<String>, InferenceError> {
        let expression = self
            .expression_at(position)
            .ok_or(InferenceError::NoExpression {
                line: position.line,
                column: position.column,
            })?;

        let (head, rest) = match expression.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (expression, None),
        };
        let bound = self
            .names
            .get(head)
            .ok_or_else(|| InferenceError::Unresolved(expression.to_string()))?;
        let path = match rest {
            Some(rest) => format!("{bound}.{rest}"),
            None => bound.clone(),
        };
        self.lookup(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::demo_graph;

    fn provider() -> NameTableProvider {
        NameTableProvider::new(Arc::new(demo_graph()))
    }

    fn resolve_at(
        oracle: &mut Box<dyn ResolutionOracle + '_>,
        source: &str,
        needle: &str,
    ) -> Result<Option<String>, InferenceError> {
        let offset = source.find(needle).unwrap();
        oracle.resolve(Position::from_offset(source, offset))
    }

    #[test]
    fn test_position_from_offset() {
        let source = "a = 1\nbb = a\n";
        assert_eq!(Position::from_offset(source, 0), Position { line: 1, column: 0 });
        assert_eq!(Position::from_offset(source, 8), Position { line: 2, column: 2 });
        assert_eq!(Position::from_offset(source, 6), Position { line: 2, column: 0 });
    }

    #[test]
    fn test_seeded_oracle_uses_bindings() {
        let provider = provider();
        let source = "d.A().foo()";
        let bindings = Bindings::from([("d".to_string(), "demo".to_string())]);
        let mut oracle = provider.seeded(source, &bindings);

        assert_eq!(resolve_at(&mut oracle, source, "d.").unwrap().as_deref(), Some("demo"));
        assert_eq!(resolve_at(&mut oracle, source, "A(").unwrap().as_deref(), Some("demo.A"));
        assert!(matches!(
            resolve_at(&mut oracle, source, "foo"),
            Err(InferenceError::Unresolved(_))
        ));
        assert!(matches!(
            resolve_at(&mut oracle, source, "("),
            Err(InferenceError::NoExpression { .. })
        ));
    }

    #[test]
    fn test_generic_oracle_reads_imports() {
        let provider = provider();
        let source = "from demo.B import A as Alias\nimport demo\nAlias.foo\ndemo.helper(1)";
        let mut oracle = provider.generic(source);

        assert_eq!(
            resolve_at(&mut oracle, source, "foo").unwrap().as_deref(),
            Some("demo.A.foo")
        );
        assert_eq!(
            resolve_at(&mut oracle, source, "helper").unwrap().as_deref(),
            Some("demo.helper")
        );
    }

    #[test]
    fn test_generic_oracle_without_imports_is_unresolved() {
        let provider = provider();
        let source = "np.zeros(3)";
        let mut oracle = provider.generic(source);
        assert!(matches!(
            resolve_at(&mut oracle, source, "zeros"),
            Err(InferenceError::Unresolved(name)) if name == "np.zeros"
        ));
    }
}
