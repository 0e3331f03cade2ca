//! In-memory object graph.
//!
//! [`ObjectGraph`] is the built-in implementation of [`Introspect`] and
//! [`NamespaceLoader`]. It is either assembled with [`GraphBuilder`] or read
//! from a JSON namespace dump produced by an external introspection tool:
//!
//! ```json
//! {"objects": [
//!   {"id": 1, "category": "namespace", "name": "demo",
//!    "members": [{"name": "A", "target": 2}]},
//!   {"id": 2, "category": "type", "name": "A", "module": "demo", "qualname": "A"}
//! ]}
//! ```

use crate::object::{
    Category, Introspect, IntrospectError, LoadError, MemberScope, Metadata, NamespaceLoader,
    ObjectId, ObjectRef,
};
use crate::signature::SignatureNode;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GraphError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("object id {0} is declared twice")]
    DuplicateId(u64),

    #[error("member '{name}' of object {owner} points to unknown object {target}")]
    DanglingMember { owner: u64, name: String, target: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSpec {
    pub name: String,
    pub target: u64,
    /// Inherited members are listed by the owner but not declared by it.
    #[serde(default)]
    pub inherited: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSpec {
    pub id: u64,
    pub category: Category,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub module: Option<String>,
    #[serde(default)]
    pub qualname: Option<String>,
    #[serde(default)]
    pub doc: Option<String>,
    #[serde(default)]
    pub members: Vec<MemberSpec>,
    #[serde(default)]
    pub signature: Option<SignatureNode>,
}

impl ObjectSpec {
    fn new(id: u64, category: Category) -> Self {
        Self {
            id,
            category,
            name: None,
            module: None,
            qualname: None,
            doc: None,
            members: Vec::new(),
            signature: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphDump {
    pub objects: Vec<ObjectSpec>,
}

#[derive(Debug)]
struct GraphInner {
    objects: Vec<ObjectSpec>,
    /// Member lists with targets resolved to indices into `objects`.
    members: Vec<Vec<(String, usize, bool)>>,
    namespaces: FxHashMap<String, usize>,
}

#[derive(Debug, Clone)]
pub struct ObjectGraph {
    inner: Arc<GraphInner>,
}

impl ObjectGraph {
    pub fn from_dump(dump: GraphDump) -> Result<Self, GraphError> {
        let mut by_id = FxHashMap::default();
        for (index, object) in dump.objects.iter().enumerate() {
            if by_id.insert(object.id, index).is_some() {
                return Err(GraphError::DuplicateId(object.id));
            }
        }

        let mut members = Vec::with_capacity(dump.objects.len());
        for object in &dump.objects {
            let mut resolved = Vec::with_capacity(object.members.len());
            for member in &object.members {
                let target = *by_id
                    .get(&member.target)
                    .ok_or_else(|| GraphError::DanglingMember {
                        owner: object.id,
                        name: member.name.clone(),
                        target: member.target,
                    })?;
                resolved.push((member.name.clone(), target, member.inherited));
            }
            members.push(resolved);
        }

        let namespaces = dump
            .objects
            .iter()
            .enumerate()
            .filter(|(_, object)| object.category == Category::Namespace)
            .filter_map(|(index, object)| object.name.clone().map(|name| (name, index)))
            .collect();

        Ok(Self {
            inner: Arc::new(GraphInner {
                objects: dump.objects,
                members,
                namespaces,
            }),
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Self::from_dump(serde_json::from_str(json)?)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, GraphError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn len(&self) -> usize {
        self.inner.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.objects.is_empty()
    }

    /// Looks an object up by its dump id.
    pub fn object(&self, id: u64) -> Option<ObjectRef> {
        self.inner
            .objects
            .iter()
            .position(|object| object.id == id)
            .map(|index| self.handle(index))
    }

    fn handle(&self, index: usize) -> ObjectRef {
        Arc::new(GraphObject {
            graph: Arc::clone(&self.inner),
            index,
        })
    }
}

impl NamespaceLoader for ObjectGraph {
    /// Resolves a dotted namespace name. Registered namespaces are found
    /// directly; otherwise the path is walked from its first segment the way
    /// a package import would reach a submodule.
    fn load(&self, name: &str) -> Result<ObjectRef, LoadError> {
        if let Some(&index) = self.inner.namespaces.get(name) {
            return Ok(self.handle(index));
        }

        let mut segments = name.split('.');
        let head = segments.next().unwrap_or_default();
        let &start = self
            .inner
            .namespaces
            .get(head)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;

        let mut current: ObjectRef = self.handle(start);
        for segment in segments {
            current = current
                .attribute(segment)
                .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        }

        if current.category() != Category::Namespace {
            return Err(LoadError::NotANamespace {
                name: name.to_string(),
            });
        }
        Ok(current)
    }
}

struct GraphObject {
    graph: Arc<GraphInner>,
    index: usize,
}

impl GraphObject {
    fn spec(&self) -> &ObjectSpec {
        &self.graph.objects[self.index]
    }

    fn handle(&self, index: usize) -> ObjectRef {
        Arc::new(GraphObject {
            graph: Arc::clone(&self.graph),
            index,
        })
    }
}

impl Introspect for GraphObject {
    fn object_id(&self) -> ObjectId {
        ObjectId(self.spec().id)
    }

    fn category(&self) -> Category {
        self.spec().category
    }

    fn metadata(&self) -> Result<Metadata<'_>, IntrospectError> {
        let spec = self.spec();
        Ok(Metadata {
            name: spec.name.as_deref(),
            module: spec.module.as_deref(),
            qualname: spec.qualname.as_deref(),
        })
    }

    fn members(&self, scope: MemberScope) -> Vec<(String, ObjectRef)> {
        self.graph.members[self.index]
            .iter()
            .filter(|(_, _, inherited)| scope == MemberScope::All || !inherited)
            .map(|(name, target, _)| (name.clone(), self.handle(*target)))
            .collect()
    }

    fn attribute(&self, name: &str) -> Option<ObjectRef> {
        self.graph.members[self.index]
            .iter()
            .find(|(member, _, _)| member == name)
            .map(|(_, target, _)| self.handle(*target))
    }

    fn doc(&self) -> Option<&str> {
        self.spec().doc.as_deref()
    }

    fn signature(&self) -> Option<SignatureNode> {
        self.spec().signature.clone()
    }
}

/// Assembles an [`ObjectGraph`] programmatically.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    objects: Vec<ObjectSpec>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, spec: ObjectSpec) -> u64 {
        let id = spec.id;
        self.objects.push(spec);
        id
    }

    fn next_id(&self) -> u64 {
        self.objects.len() as u64 + 1
    }

    pub fn namespace(&mut self, name: &str) -> u64 {
        let mut spec = ObjectSpec::new(self.next_id(), Category::Namespace);
        spec.name = Some(name.to_string());
        self.push(spec)
    }

    pub fn class(&mut self, module: &str, qualname: &str) -> u64 {
        self.declared(Category::Type, module, qualname)
    }

    pub fn function(&mut self, module: &str, qualname: &str, signature: SignatureNode) -> u64 {
        let id = self.declared(Category::Callable, module, qualname);
        self.object_mut(id).signature = Some(signature);
        id
    }

    /// An object with no naming metadata at all, e.g. a plain constant.
    pub fn value(&mut self) -> u64 {
        self.push(ObjectSpec::new(self.next_id(), Category::Other))
    }

    pub fn declared(&mut self, category: Category, module: &str, qualname: &str) -> u64 {
        let mut spec = ObjectSpec::new(self.next_id(), category);
        spec.name = qualname.rsplit('.').next().map(str::to_string);
        spec.module = Some(module.to_string());
        spec.qualname = Some(qualname.to_string());
        self.push(spec)
    }

    pub fn doc(&mut self, id: u64, text: &str) -> &mut Self {
        self.object_mut(id).doc = Some(text.to_string());
        self
    }

    pub fn member(&mut self, owner: u64, name: &str, target: u64) -> &mut Self {
        self.add_member(owner, name, target, false)
    }

    pub fn inherited_member(&mut self, owner: u64, name: &str, target: u64) -> &mut Self {
        self.add_member(owner, name, target, true)
    }

    fn add_member(&mut self, owner: u64, name: &str, target: u64, inherited: bool) -> &mut Self {
        self.object_mut(owner).members.push(MemberSpec {
            name: name.to_string(),
            target,
            inherited,
        });
        self
    }

    /// Ids are handed out sequentially from 1, so `id - 1` is the slot.
    pub fn object_mut(&mut self, id: u64) -> &mut ObjectSpec {
        &mut self.objects[(id - 1) as usize]
    }

    pub fn dump(&self) -> GraphDump {
        GraphDump {
            objects: self.objects.clone(),
        }
    }

    pub fn build(self) -> Result<ObjectGraph, GraphError> {
        ObjectGraph::from_dump(GraphDump {
            objects: self.objects,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn demo() -> ObjectGraph {
        let mut builder = GraphBuilder::new();
        let demo = builder.namespace("demo");
        let sub = builder.namespace("demo.sub");
        let base = builder.class("demo", "Base");
        let a = builder.class("demo", "A");
        let helper = builder.function("demo", "Base.helper", SignatureNode::default());
        builder
            .member(demo, "sub", sub)
            .member(demo, "A", a)
            .member(demo, "Base", base)
            .member(base, "helper", helper)
            .inherited_member(a, "helper", helper);
        builder.build().unwrap()
    }

    #[test]
    fn test_load_registered_and_walked_namespaces() {
        let graph = demo();
        assert_eq!(graph.load("demo").unwrap().category(), Category::Namespace);
        assert_eq!(graph.load("demo.sub").unwrap().object_id(), ObjectId(2));
        assert!(matches!(
            graph.load("missing"),
            Err(LoadError::NotFound(name)) if name == "missing"
        ));
        assert!(matches!(
            graph.load("demo.A"),
            Err(LoadError::NotANamespace { .. })
        ));
    }

    #[test]
    fn test_declared_scope_hides_inherited_members() {
        let graph = demo();
        let a = graph.object(4).unwrap();
        assert_eq!(a.members(MemberScope::All).len(), 1);
        assert!(a.members(MemberScope::Declared).is_empty());
        assert!(a.attribute("helper").is_some());
    }

    #[test]
    fn test_json_dump_round_trips_through_loader() {
        let json = r#"{"objects": [
            {"id": 10, "category": "namespace", "name": "pkg",
             "members": [{"name": "f", "target": 11}]},
            {"id": 11, "category": "callable", "name": "f", "module": "pkg", "qualname": "f",
             "doc": "Summary.", "signature": {"kind": "generator", "parameters": [
                {"name": "x", "kind": "POSITIONAL_OR_KEYWORD"}]}}
        ]}"#;
        let graph = ObjectGraph::from_json_str(json).unwrap();
        let f = graph.load("pkg").unwrap().attribute("f").unwrap();
        assert_eq!(f.object_id(), ObjectId(11));
        assert_eq!(f.doc(), Some("Summary."));
        assert_eq!(f.signature().unwrap().parameters[0].name, "x");
    }

    #[test]
    fn test_dangling_member_is_rejected() {
        let json = r#"{"objects": [
            {"id": 1, "category": "namespace", "name": "pkg",
             "members": [{"name": "gone", "target": 99}]}
        ]}"#;
        assert!(matches!(
            ObjectGraph::from_json_str(json),
            Err(GraphError::DanglingMember { target: 99, .. })
        ));
    }
}
