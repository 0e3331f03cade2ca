//! Section parsing of raw documentation text.
//!
//! [`SectionParser`] turns documentation text into named sections. The
//! built-in [`NumpydocParser`] understands the numpydoc convention:
//!
//! ```text
//! frobnicate(x, y=2)
//!
//! One line summary.
//!
//! Parameters
//! ----------
//! x : int
//!     The input.
//!
//! See Also
//! --------
//! numpy.sum : Related reduction.
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub const SUMMARY: &str = "Summary";
pub const EXTENDED_SUMMARY: &str = "Extended Summary";
pub const EXAMPLES: &str = "Examples";
pub const SEE_ALSO: &str = "See Also";

const ITEM_SECTIONS: &[&str] = &[
    "Parameters",
    "Returns",
    "Yields",
    "Receives",
    "Raises",
    "Warns",
    "Other Parameters",
    "Attributes",
    "Methods",
];

/// Item sections whose entries may be a bare type without a name.
const TYPE_FIRST_SECTIONS: &[&str] = &["Returns", "Yields", "Receives", "Raises", "Warns"];

const TEXT_SECTIONS: &[&str] = &["Notes", "Warnings", "References", EXAMPLES];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("section '{0}' appears more than once")]
    DuplicateSection(String),

    #[error("unknown section '{0}'")]
    UnknownSection(String),

    #[error("unexpected indentation in section '{section}': {line:?}")]
    UnexpectedIndent { section: String, line: String },

    #[error("malformed See Also entry: {0:?}")]
    MalformedSeeAlso(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionItem {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub target: String,
    pub role: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeeAlsoEntry {
    pub targets: Vec<Citation>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionValue {
    Text(String),
    SeeAlso(Vec<SeeAlsoEntry>),
    Items(Vec<SectionItem>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedDoc {
    pub signature: Option<String>,
    pub sections: BTreeMap<String, SectionValue>,
}

impl ParsedDoc {
    pub fn examples(&self) -> Option<&str> {
        match self.sections.get(EXAMPLES) {
            Some(SectionValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn see_also(&self) -> &[SeeAlsoEntry] {
        match self.sections.get(SEE_ALSO) {
            Some(SectionValue::SeeAlso(entries)) => entries,
            _ => &[],
        }
    }
}

pub trait SectionParser: Send + Sync {
    fn parse(&self, text: &str) -> Result<ParsedDoc, ParseError>;
}

pub struct NumpydocParser {
    signature: Regex,
    see_also_line: Regex,
    citation: Regex,
}

impl Default for NumpydocParser {
    fn default() -> Self {
        Self::new()
    }
}

impl NumpydocParser {
    pub fn new() -> Self {
        let name = r"(?::\w+:`[^`]+`|`?[\w.~-]+`?)";
        Self {
            signature: Regex::new(r"^[\w.]+\(.*\)(?:\s*->\s*.+)?$").expect("valid regex"),
            see_also_line: Regex::new(&format!(
                r"^(?P<names>{name}(?:\s*,\s*{name})*)\s*,?\s*(?::\s*(?P<desc>.*))?$"
            ))
            .expect("valid regex"),
            citation: Regex::new(r"^(?::(?P<role>\w+):)?`?~?(?P<target>[\w.-]+)`?$")
                .expect("valid regex"),
        }
    }

    fn parse_see_also(&self, body: &[String]) -> Result<Vec<SeeAlsoEntry>, ParseError> {
        let mut entries: Vec<SeeAlsoEntry> = Vec::new();
        for line in body {
            if line.trim().is_empty() {
                continue;
            }
            if line.starts_with(char::is_whitespace) {
                let entry = entries
                    .last_mut()
                    .ok_or_else(|| ParseError::MalformedSeeAlso(line.clone()))?;
                if !entry.description.is_empty() {
                    entry.description.push('\n');
                }
                entry.description.push_str(line.trim());
                continue;
            }

            let captures = self
                .see_also_line
                .captures(line.trim_end())
                .ok_or_else(|| ParseError::MalformedSeeAlso(line.clone()))?;
            let mut targets = Vec::new();
            for piece in captures["names"].split(',') {
                let piece = piece.trim();
                if piece.is_empty() {
                    continue;
                }
                let citation = self
                    .citation
                    .captures(piece)
                    .ok_or_else(|| ParseError::MalformedSeeAlso(line.clone()))?;
                targets.push(Citation {
                    target: citation["target"].to_string(),
                    role: citation.name("role").map(|role| role.as_str().to_string()),
                });
            }
            entries.push(SeeAlsoEntry {
                targets,
                description: captures
                    .name("desc")
                    .map(|desc| desc.as_str().trim().to_string())
                    .unwrap_or_default(),
            });
        }
        Ok(entries)
    }
}

impl SectionParser for NumpydocParser {
    fn parse(&self, text: &str) -> Result<ParsedDoc, ParseError> {
        let lines = dedent_but_first(text);
        let mut doc = ParsedDoc::default();

        let mut start = next_non_blank(&lines, 0);
        if let Some(first) = lines.get(start) {
            if self.signature.is_match(first.trim()) {
                doc.signature = Some(first.trim().to_string());
                start = next_non_blank(&lines, start + 1);
            }
        }

        let headers: Vec<usize> = (start..lines.len().saturating_sub(1))
            .filter(|&i| is_header(&lines[i], &lines[i + 1]))
            .collect();

        let preamble_end = headers.first().copied().unwrap_or(lines.len());
        parse_preamble(&lines[start.min(preamble_end)..preamble_end], &mut doc);

        for (position, &header) in headers.iter().enumerate() {
            let end = headers.get(position + 1).copied().unwrap_or(lines.len());
            let raw_name = lines[header].trim();
            let name = canonical_section(raw_name)
                .ok_or_else(|| ParseError::UnknownSection(raw_name.to_string()))?;
            if doc.sections.contains_key(name) {
                return Err(ParseError::DuplicateSection(name.to_string()));
            }

            let body = trim_blank(&lines[(header + 2).min(end)..end]);
            let value = if name == SEE_ALSO {
                SectionValue::SeeAlso(self.parse_see_also(body)?)
            } else if ITEM_SECTIONS.contains(&name) {
                SectionValue::Items(parse_items(name, body)?)
            } else {
                SectionValue::Text(body.join("\n"))
            };
            doc.sections.insert(name.to_string(), value);
        }

        Ok(doc)
    }
}

fn canonical_section(name: &str) -> Option<&'static str> {
    ITEM_SECTIONS
        .iter()
        .chain(TEXT_SECTIONS)
        .chain(std::iter::once(&SEE_ALSO))
        .find(|known| known.eq_ignore_ascii_case(name))
        .copied()
}

/// numpydoc underlines are at least as long as the header they mark.
fn is_header(line: &str, underline: &str) -> bool {
    let header = line.trim();
    let underline = underline.trim();
    !header.is_empty()
        && underline.len() >= 3
        && underline.len() >= header.chars().count()
        && underline.chars().all(|c| c == '-')
}

fn parse_preamble(lines: &[String], doc: &mut ParsedDoc) {
    let lines = trim_blank(lines);
    if lines.is_empty() {
        return;
    }
    let summary_end = lines
        .iter()
        .position(|line| line.trim().is_empty())
        .unwrap_or(lines.len());
    doc.sections.insert(
        SUMMARY.to_string(),
        SectionValue::Text(lines[..summary_end].join("\n")),
    );

    let extended = trim_blank(&lines[summary_end..]);
    if !extended.is_empty() {
        doc.sections.insert(
            EXTENDED_SUMMARY.to_string(),
            SectionValue::Text(extended.join("\n")),
        );
    }
}

fn parse_items(section: &str, body: &[String]) -> Result<Vec<SectionItem>, ParseError> {
    let mut items: Vec<(SectionItem, Vec<String>)> = Vec::new();
    for line in body {
        if line.trim().is_empty() {
            if let Some((_, description)) = items.last_mut() {
                description.push(String::new());
            }
            continue;
        }
        if line.starts_with(char::is_whitespace) {
            let (_, description) =
                items
                    .last_mut()
                    .ok_or_else(|| ParseError::UnexpectedIndent {
                        section: section.to_string(),
                        line: line.clone(),
                    })?;
            description.push(line.clone());
            continue;
        }

        let item = match line.split_once(" : ") {
            Some((name, type_)) => SectionItem {
                name: name.trim().to_string(),
                type_: Some(type_.trim().to_string()),
                description: String::new(),
            },
            None if TYPE_FIRST_SECTIONS.contains(&section) => SectionItem {
                name: String::new(),
                type_: Some(line.trim().to_string()),
                description: String::new(),
            },
            None => SectionItem {
                name: line.trim().trim_end_matches(':').trim().to_string(),
                type_: None,
                description: String::new(),
            },
        };
        items.push((item, Vec::new()));
    }

    Ok(items
        .into_iter()
        .map(|(mut item, description)| {
            item.description = trim_blank(&dedent(&description)).join("\n");
            item
        })
        .collect())
}

/// Dedents the first line on its own and the remaining lines together, so a
/// summary written on the opening line does not hide the body indentation.
pub fn dedent_but_first(text: &str) -> Vec<String> {
    let mut lines = text.split('\n');
    let first = lines.next().unwrap_or_default().trim_start().to_string();
    let rest: Vec<String> = lines.map(str::to_string).collect();
    let mut dedented = vec![first];
    dedented.extend(dedent(&rest));
    dedented
}

/// Removes the indentation common to all non-blank lines. The indent is
/// counted in whitespace characters, not bytes, since it may mix ASCII and
/// Unicode whitespace.
pub fn dedent(lines: &[String]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|line| !line.trim().is_empty())
        .map(|line| leading_whitespace(line))
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|line| {
            if line.trim().is_empty() {
                String::new()
            } else {
                let start = line
                    .char_indices()
                    .nth(indent)
                    .map_or(line.len(), |(offset, _)| offset);
                line[start..].trim_end().to_string()
            }
        })
        .collect()
}

fn leading_whitespace(line: &str) -> usize {
    line.chars().take_while(|c| c.is_whitespace()).count()
}

fn next_non_blank(lines: &[String], from: usize) -> usize {
    (from..lines.len())
        .find(|&i| !lines[i].trim().is_empty())
        .unwrap_or(lines.len())
}

fn trim_blank(lines: &[String]) -> &[String] {
    let start = next_non_blank(lines, 0);
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |last| last + 1);
    &lines[start..end.max(start)]
}
