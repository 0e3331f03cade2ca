use serde::{Deserialize, Serialize};
use std::fmt::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub kind: ParameterKind,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            kind,
            default: None,
            annotation: None,
        }
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }

    fn render(&self) -> String {
        let mut out = match self.kind {
            ParameterKind::VarPositional => format!("*{}", self.name),
            ParameterKind::VarKeyword => format!("**{}", self.name),
            _ => self.name.clone(),
        };
        if let Some(annotation) = &self.annotation {
            let _ = write!(out, ": {annotation}");
        }
        if let Some(default) = &self.default {
            if self.annotation.is_some() {
                let _ = write!(out, " = {default}");
            } else {
                let _ = write!(out, "={default}");
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallableKind {
    #[default]
    Function,
    Coroutine,
    Generator,
    AsyncGenerator,
}

/// Structured call signature of a callable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SignatureNode {
    #[serde(default)]
    pub kind: CallableKind,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub return_annotation: Option<String>,
}

impl SignatureNode {
    pub fn new(kind: CallableKind, parameters: Vec<Parameter>) -> Self {
        Self {
            kind,
            parameters,
            return_annotation: None,
        }
    }

    /// Renders the parameter list in call syntax, e.g. `(a, /, b=1, *args, c, **kw)`.
    ///
    /// Markers are emitted where the parameter kinds change: `/` after the last
    /// positional-only parameter and a bare `*` before the first keyword-only
    /// parameter unless a var-positional parameter already separates them.
    pub fn render(&self) -> String {
        let mut parts = Vec::with_capacity(self.parameters.len() + 2);
        let mut seen_var_positional = false;
        let mut keyword_marker_done = false;

        for (index, parameter) in self.parameters.iter().enumerate() {
            match parameter.kind {
                ParameterKind::VarPositional => seen_var_positional = true,
                ParameterKind::KeywordOnly if !seen_var_positional && !keyword_marker_done => {
                    parts.push("*".to_string());
                    keyword_marker_done = true;
                }
                _ => {}
            }
            parts.push(parameter.render());

            let next_kind = self.parameters.get(index + 1).map(|p| p.kind);
            if parameter.kind == ParameterKind::PositionalOnly
                && next_kind != Some(ParameterKind::PositionalOnly)
            {
                parts.push("/".to_string());
            }
        }

        let mut rendered = format!("({})", parts.join(", "));
        if let Some(annotation) = &self.return_annotation {
            let _ = write!(rendered, " -> {annotation}");
        }
        rendered
    }

    /// Full signature line for a callable named `name`.
    pub fn render_named(&self, name: &str) -> String {
        format!("{name}{}", self.render())
    }
}
