use crate::docs::sections::SectionValue;
use crate::signature::SignatureNode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One lexical token of an example snippet together with the identity it
/// was resolved to, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotatedToken {
    /// Byte offset of the token in the snippet input.
    pub offset: usize,
    pub category: String,
    pub text: String,
    pub reference: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DocBlock {
    Text {
        text: String,
    },
    Code {
        tokens: Vec<AnnotatedToken>,
        output: String,
    },
}

/// Structured documentation of one symbol; serialised as the bundle artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRecord {
    pub signature: Option<String>,
    #[serde(default)]
    pub signature_node: Option<SignatureNode>,
    #[serde(default)]
    pub sections: BTreeMap<String, SectionValue>,
    #[serde(default)]
    pub examples: Vec<DocBlock>,
    #[serde(default)]
    pub refs: Vec<String>,
    /// Filled by a later reverse-reference pass; always empty here.
    #[serde(default)]
    pub backrefs: Vec<String>,
}

impl DocRecord {
    /// Every non-empty token reference across the code blocks, in block order.
    pub fn example_references(&self) -> impl Iterator<Item = &str> {
        self.examples
            .iter()
            .filter_map(|block| match block {
                DocBlock::Code { tokens, .. } => Some(tokens),
                DocBlock::Text { .. } => None,
            })
            .flatten()
            .filter_map(|token| token.reference.as_deref())
            .filter(|reference| !reference.is_empty())
    }
}
