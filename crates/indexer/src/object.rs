//! Introspection interfaces over the namespace tree being indexed.
//!
//! The indexer never inspects objects directly. Everything it knows about a
//! module, type or callable comes through [`Introspect`], and root namespaces
//! are obtained through a [`NamespaceLoader`].

use crate::signature::SignatureNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Stable identity of an underlying object, independent of the names it is
/// reachable under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Namespace,
    Type,
    Callable,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Namespace => "namespace",
            Category::Type => "type",
            Category::Callable => "callable",
            Category::Other => "other",
        }
    }
}

/// Which members an object should enumerate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberScope {
    /// Every named member, including re-exports.
    All,
    /// Only members declared by the object itself (no inherited ones).
    Declared,
}

/// Declared naming metadata of an object. Any piece may be missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metadata<'a> {
    pub name: Option<&'a str>,
    pub module: Option<&'a str>,
    pub qualname: Option<&'a str>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntrospectError {
    #[error("metadata of {object} is unreadable: {reason}")]
    Unreadable { object: ObjectId, reason: String },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("namespace '{0}' not found")]
    NotFound(String),
    #[error("'{name}' is not a namespace")]
    NotANamespace { name: String },
}

pub type ObjectRef = Arc<dyn Introspect>;

pub trait Introspect: Send + Sync {
    fn object_id(&self) -> ObjectId;

    fn category(&self) -> Category;

    fn metadata(&self) -> Result<Metadata<'_>, IntrospectError>;

    /// Named members in a deterministic order.
    fn members(&self, scope: MemberScope) -> Vec<(String, ObjectRef)>;

    fn attribute(&self, name: &str) -> Option<ObjectRef>;

    /// Raw documentation text, if the object carries any.
    fn doc(&self) -> Option<&str>;

    /// Declared parameter list; only meaningful for callables.
    fn signature(&self) -> Option<SignatureNode>;
}

impl fmt::Debug for dyn Introspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Object")
            .field("id", &self.object_id())
            .field("category", &self.category())
            .finish()
    }
}

pub trait NamespaceLoader: Send + Sync {
    fn load(&self, name: &str) -> Result<ObjectRef, LoadError>;
}

