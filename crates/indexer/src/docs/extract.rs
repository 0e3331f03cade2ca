use crate::crawler::Symbol;
use crate::docs::annotate::ExampleAnnotator;
use crate::docs::oracle::Bindings;
use crate::docs::sections::{EXAMPLES, ParseError, SectionParser};
use crate::docs::types::{DocBlock, DocRecord};
use crate::object::Category;
use std::time::{Duration, Instant};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse documentation of '{identity}': {source}")]
pub struct DocParseError {
    pub identity: String,
    #[source]
    pub source: ParseError,
}

/// A freshly extracted record together with the time it took to build.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: DocRecord,
    pub parse_time: Duration,
    pub inference_time: Duration,
}

/// Example section pieces before annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExampleSegment {
    Text(String),
    Snippet { input: String, output: String },
}

pub struct DocExtractor<'a> {
    parser: &'a dyn SectionParser,
    annotator: ExampleAnnotator<'a>,
    bindings: &'a Bindings,
}

impl<'a> DocExtractor<'a> {
    pub fn new(
        parser: &'a dyn SectionParser,
        annotator: ExampleAnnotator<'a>,
        bindings: &'a Bindings,
    ) -> Self {
        Self {
            parser,
            annotator,
            bindings,
        }
    }

    /// Builds the record of `symbol` from `raw`. The returned `refs` are raw
    /// candidates: example references first, then See Also targets, neither
    /// deduplicated nor normalised.
    pub fn extract(
        &self,
        symbol: &Symbol,
        raw: &str,
        infer: bool,
    ) -> Result<Extraction, DocParseError> {
        let started = Instant::now();
        let mut parsed = self.parser.parse(raw).map_err(|source| DocParseError {
            identity: symbol.identity.clone(),
            source,
        })?;

        let signature_node = match symbol.category {
            Category::Callable => symbol.object.signature(),
            _ => None,
        };
        let signature = parsed.signature.take().or_else(|| {
            let name = symbol.identity.rsplit('.').next().unwrap_or(&symbol.identity);
            signature_node.as_ref().map(|node| node.render_named(name))
        });

        let see_also: Vec<String> = parsed
            .see_also()
            .iter()
            .flat_map(|entry| entry.targets.iter().map(|citation| citation.target.clone()))
            .collect();

        let mut inference_time = Duration::ZERO;
        let mut examples = Vec::new();
        if let Some(text) = parsed.examples() {
            for segment in segment_examples(text) {
                examples.push(match segment {
                    ExampleSegment::Text(text) => DocBlock::Text { text },
                    ExampleSegment::Snippet { input, output } => {
                        let annotating = Instant::now();
                        let tokens = self.annotator.annotate(&input, self.bindings, infer);
                        if infer {
                            inference_time += annotating.elapsed();
                        }
                        DocBlock::Code { tokens, output }
                    }
                });
            }
        }
        parsed.sections.remove(EXAMPLES);

        let mut record = DocRecord {
            signature,
            signature_node,
            sections: parsed.sections,
            examples,
            refs: Vec::new(),
            backrefs: Vec::new(),
        };
        record.refs = record
            .example_references()
            .map(str::to_string)
            .chain(see_also)
            .collect();

        Ok(Extraction {
            record,
            parse_time: started.elapsed().saturating_sub(inference_time),
            inference_time,
        })
    }
}

/// Splits an Examples section into prose and `>>>` snippets.
///
/// Paragraphs are separated by blank lines. Inside a paragraph a `>>>` line
/// starts a snippet, or continues it while no output has been seen; `...`
/// lines continue the input; any other line after a snippet is its output.
pub fn segment_examples(text: &str) -> Vec<ExampleSegment> {
    let mut segments = Vec::new();
    for paragraph in text.split('\n').collect::<Vec<_>>().split(|line| line.trim().is_empty()) {
        if paragraph.is_empty() {
            continue;
        }
        let mut prose: Vec<&str> = Vec::new();
        let mut snippet: Option<(Vec<&str>, Vec<&str>)> = None;

        for &line in paragraph {
            if let Some(input) = strip_prompt(line, ">>>") {
                if !prose.is_empty() {
                    segments.push(ExampleSegment::Text(prose.join("\n")));
                    prose.clear();
                }
                match &mut snippet {
                    Some((inputs, outputs)) if outputs.is_empty() => inputs.push(input),
                    _ => {
                        if let Some(done) = snippet.replace((vec![input], Vec::new())) {
                            segments.push(finish(done));
                        }
                    }
                }
                continue;
            }
            match &mut snippet {
                Some((inputs, outputs)) => match strip_prompt(line, "...") {
                    Some(input) if outputs.is_empty() => inputs.push(input),
                    _ => outputs.push(line),
                },
                None => prose.push(line),
            }
        }

        if let Some(done) = snippet {
            segments.push(finish(done));
        }
        if !prose.is_empty() {
            segments.push(ExampleSegment::Text(prose.join("\n")));
        }
    }
    segments
}

fn strip_prompt<'l>(line: &'l str, prompt: &str) -> Option<&'l str> {
    let rest = line.trim_start().strip_prefix(prompt)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix(' ')
    }
}

fn finish((inputs, outputs): (Vec<&str>, Vec<&str>)) -> ExampleSegment {
    ExampleSegment::Snippet {
        input: inputs.join("\n"),
        output: outputs.join("\n"),
    }
}
