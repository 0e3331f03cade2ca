//! Fixtures shared by the indexer's tests and by downstream crates through
//! the `test-utils` feature.

use crate::docs::oracle::{Bindings, InferenceError, OracleProvider, Position, ResolutionOracle};
use crate::graph::{GraphBuilder, ObjectGraph};
use crate::object::{
    Category, Introspect, IntrospectError, MemberScope, Metadata, ObjectId, ObjectRef,
};
use crate::signature::{Parameter, ParameterKind, SignatureNode};
use std::sync::Arc;

pub const DEMO_CLASS_DOC: &str = "A demo class.

    Examples
    --------
    Build one:

    >>> import demo
    >>> demo.B.A().foo()
    'foo'
    ";

pub const DEMO_HELPER_DOC: &str = "Help out.

    See Also
    --------
    othermod.helper : Lives somewhere else.
    ";

/// The `demo` tree:
///
/// ```text
/// demo            namespace
/// demo.A          class with methods foo and bar
/// demo.B          namespace re-exporting demo.A as demo.B.A
/// demo.helper     function citing othermod.helper
/// ```
pub fn demo_graph() -> ObjectGraph {
    let mut builder = GraphBuilder::new();
    let demo = builder.namespace("demo");
    let a = builder.class("demo", "A");
    let foo = builder.function(
        "demo",
        "A.foo",
        SignatureNode::new(
            Default::default(),
            vec![Parameter::new("self", ParameterKind::PositionalOrKeyword)],
        ),
    );
    let bar = builder.function(
        "demo",
        "A.bar",
        SignatureNode::new(
            Default::default(),
            vec![Parameter::new("self", ParameterKind::PositionalOrKeyword)],
        ),
    );
    let b = builder.namespace("demo.B");
    let helper = builder.function("demo", "helper", helper_signature());

    builder
        .member(demo, "A", a)
        .member(demo, "B", b)
        .member(demo, "helper", helper)
        .member(a, "foo", foo)
        .member(a, "bar", bar)
        .member(b, "A", a)
        .doc(demo, "The demo namespace.")
        .doc(a, DEMO_CLASS_DOC)
        .doc(foo, "Return 'foo'.")
        .doc(helper, DEMO_HELPER_DOC);
    builder
        .build()
        .expect("demo graph is well formed")
}

/// `helper(x, /, y=1, *args, flag, **kwargs)`
pub fn helper_signature() -> SignatureNode {
    SignatureNode::new(
        Default::default(),
        vec![
            Parameter::new("x", ParameterKind::PositionalOnly),
            Parameter::new("y", ParameterKind::PositionalOrKeyword).with_default("1"),
            Parameter::new("args", ParameterKind::VarPositional),
            Parameter::new("flag", ParameterKind::KeywordOnly),
            Parameter::new("kwargs", ParameterKind::VarKeyword),
        ],
    )
}

/// A hand-made object for cases the graph cannot express, such as
/// unreadable metadata.
#[derive(Debug, Clone)]
pub struct StubObject {
    id: u64,
    category: Category,
    name: Option<String>,
    module: Option<String>,
    qualname: Option<String>,
    doc: Option<String>,
    members: Vec<(String, ObjectRef)>,
    failing: bool,
}

impl StubObject {
    fn new(id: u64, category: Category) -> Self {
        Self {
            id,
            category,
            name: None,
            module: None,
            qualname: None,
            doc: None,
            members: Vec::new(),
            failing: false,
        }
    }

    pub fn namespace(id: u64, name: &str) -> Self {
        let mut stub = Self::new(id, Category::Namespace);
        stub.name = Some(name.to_string());
        stub
    }

    pub fn type_(id: u64, module: &str, qualname: &str) -> Self {
        Self::declared(id, Category::Type, module, qualname)
    }

    pub fn callable(id: u64, module: &str, qualname: &str) -> Self {
        Self::declared(id, Category::Callable, module, qualname)
    }

    fn declared(id: u64, category: Category, module: &str, qualname: &str) -> Self {
        let mut stub = Self::new(id, category);
        stub.module = Some(module.to_string());
        stub.qualname = Some(qualname.to_string());
        stub
    }

    /// Makes every metadata read fail.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_member(mut self, name: &str, member: ObjectRef) -> Self {
        self.members.push((name.to_string(), member));
        self
    }

    pub fn with_doc(mut self, doc: &str) -> Self {
        self.doc = Some(doc.to_string());
        self
    }

    pub fn into_ref(self) -> ObjectRef {
        Arc::new(self)
    }
}

impl Introspect for StubObject {
    fn object_id(&self) -> ObjectId {
        ObjectId(self.id)
    }

    fn category(&self) -> Category {
        self.category
    }

    fn metadata(&self) -> Result<Metadata<'_>, IntrospectError> {
        if self.failing {
            return Err(IntrospectError::Unreadable {
                object: self.object_id(),
                reason: "stub configured to fail".to_string(),
            });
        }
        Ok(Metadata {
            name: self.name.as_deref(),
            module: self.module.as_deref(),
            qualname: self.qualname.as_deref(),
        })
    }

    fn members(&self, _scope: MemberScope) -> Vec<(String, ObjectRef)> {
        self.members.clone()
    }

    fn attribute(&self, name: &str) -> Option<ObjectRef> {
        self.members
            .iter()
            .find(|(member, _)| member == name)
            .map(|(_, object)| object.clone())
    }

    fn doc(&self) -> Option<&str> {
        self.doc.as_deref()
    }

    fn signature(&self) -> Option<SignatureNode> {
        None
    }
}

type Script = dyn Fn(&str) -> Result<Option<String>, InferenceError> + Send + Sync;

/// Oracles whose answer depends only on the text of the token under the
/// queried position: an identifier run, or the single character there.
/// Seeded oracles follow the generic script unless given their own.
#[derive(Clone)]
pub struct ScriptedOracles {
    script: Arc<Script>,
    seeded_script: Option<Arc<Script>>,
}

impl ScriptedOracles {
    pub fn new(
        script: impl Fn(&str) -> Result<Option<String>, InferenceError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            script: Arc::new(script),
            seeded_script: None,
        }
    }

    pub fn with_seeded(
        mut self,
        script: impl Fn(&str) -> Result<Option<String>, InferenceError> + Send + Sync + 'static,
    ) -> Self {
        self.seeded_script = Some(Arc::new(script));
        self
    }

    /// Fails the test if any oracle is ever queried.
    pub fn panicking() -> Self {
        Self::new(|text| panic!("oracle queried for {text:?}"))
    }

    /// Every query raises.
    pub fn failing() -> Self {
        Self::new(|_| Err(InferenceError::Timeout))
    }
}

impl OracleProvider for ScriptedOracles {
    fn seeded<'a>(
        &'a self,
        source: &'a str,
        _bindings: &Bindings,
    ) -> Box<dyn ResolutionOracle + 'a> {
        Box::new(ScriptedOracle {
            source,
            script: self.seeded_script.as_deref().unwrap_or(self.script.as_ref()),
        })
    }

    fn generic<'a>(&'a self, source: &'a str) -> Box<dyn ResolutionOracle + 'a> {
        Box::new(ScriptedOracle {
            source,
            script: self.script.as_ref(),
        })
    }
}

struct ScriptedOracle<'a> {
    source: &'a str,
    script: &'a Script,
}

impl ResolutionOracle for ScriptedOracle<'_> {
    fn resolve(&mut self, position: Position) -> Result<Option<String>, InferenceError> {
        let line = self
            .source
            .split('\n')
            .nth(position.line - 1)
            .unwrap_or_default();
        let rest = line.get(position.column..).unwrap_or_default();
        let identifier_end = rest
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(rest.len());
        let text = match identifier_end {
            0 => rest.get(..rest.chars().next().map_or(0, char::len_utf8)).unwrap_or_default(),
            end => &rest[..end],
        };
        (self.script)(text)
    }
}
