use crate::docs::lexer::Lexer;
use crate::docs::oracle::{Bindings, OracleProvider, Position, ResolutionOracle};
use crate::docs::types::AnnotatedToken;
use crate::identity::IdentityResolver;
use tracing::trace;

/// Tokenizes example snippets and attaches best-effort references to each token.
pub struct ExampleAnnotator<'a> {
    lexer: &'a dyn Lexer,
    oracles: &'a dyn OracleProvider,
    resolver: &'a IdentityResolver,
}

impl<'a> ExampleAnnotator<'a> {
    pub fn new(
        lexer: &'a dyn Lexer,
        oracles: &'a dyn OracleProvider,
        resolver: &'a IdentityResolver,
    ) -> Self {
        Self {
            lexer,
            oracles,
            resolver,
        }
    }

    /// Annotates every token of `source`.
    ///
    /// With `infer` off no oracle is consulted and every reference is empty.
    /// Otherwise the oracle seeded with `bindings` is asked first and the
    /// generic one second; the first answer that is not an error wins. Oracle
    /// errors never escape: a token whose queries all fail gets no reference.
    pub fn annotate(&self, source: &str, bindings: &Bindings, infer: bool) -> Vec<AnnotatedToken> {
        let tokens = self.lexer.tokenize(source);
        if !infer {
            return tokens
                .into_iter()
                .map(|token| AnnotatedToken {
                    offset: token.offset,
                    category: token.category,
                    text: token.text,
                    reference: None,
                })
                .collect();
        }

        let mut oracles: Vec<Box<dyn ResolutionOracle + '_>> = Vec::with_capacity(2);
        if !bindings.is_empty() {
            oracles.push(self.oracles.seeded(source, bindings));
        }
        oracles.push(self.oracles.generic(source));

        tokens
            .into_iter()
            .map(|token| {
                let position = Position::from_offset(source, token.offset);
                let reference = query(&mut oracles, position)
                    .filter(|reference| !reference.is_empty())
                    .map(|reference| self.resolver.normalize(&reference));
                AnnotatedToken {
                    offset: token.offset,
                    category: token.category,
                    text: token.text,
                    reference,
                }
            })
            .collect()
    }
}

fn query(oracles: &mut [Box<dyn ResolutionOracle + '_>], position: Position) -> Option<String> {
    for oracle in oracles.iter_mut() {
        match oracle.resolve(position) {
            Ok(answer) => return answer,
            Err(e) => trace!("Inference failed at {}:{}: {e}", position.line, position.column),
        }
    }
    None
}
