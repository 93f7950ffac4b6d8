//! Parsing for protocol sources
//!
//! The parser is built with chumsky on top of the layout-processed token
//! stream and produces the raw item tree (see [`raw`]). It accepts any block
//! keyword and any mix of items: rejecting shapes that make no sense in a
//! protocol is the recognizer's job, where the diagnostics can be specific.

pub mod body;
pub mod combinators;
pub mod items;
pub mod raw;

pub use raw::{Marker, RawField, RawItem, RawName, RawParam, RawRoutine};

use chumsky::error::SimpleReason;
use chumsky::prelude::*;
use chumsky::Stream;

use super::ast::range::SourceLocation;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::lexing::{lex, SpannedToken, Token};
use combinators::ParserError;

/// Parse a source into raw items
pub fn parse(source: &str) -> Result<Vec<RawItem>, Diagnostic> {
    let tokens = lex(source)?;
    parse_tokens(tokens, source)
}

/// Parse an already lexed token stream; `source` is used for locations only
pub fn parse_tokens(tokens: Vec<SpannedToken>, source: &str) -> Result<Vec<RawItem>, Diagnostic> {
    let len = source.len();
    items::items()
        .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
        .map_err(|errors| {
            let locator = SourceLocation::new(source);
            // report the error that got furthest into the input
            let error = errors
                .into_iter()
                .max_by_key(|error| error.span().start)
                .map(|error| convert_error(&error, &locator));
            error.unwrap_or_else(|| {
                Diagnostic::new(
                    DiagnosticKind::SyntaxError,
                    "could not parse source",
                    locator.byte_range_to_ast_range(&(0..0)),
                )
            })
        })
}

fn convert_error(error: &ParserError, locator: &SourceLocation) -> Diagnostic {
    let range = locator.byte_range_to_ast_range(&error.span());

    let message = match error.reason() {
        SimpleReason::Custom(message) => message.clone(),
        SimpleReason::Unclosed { delimiter, .. } => format!("unclosed {}", delimiter),
        SimpleReason::Unexpected => {
            let found = error
                .found()
                .map(Token::to_string)
                .unwrap_or_else(|| "end of input".to_string());
            let mut expected: Vec<String> = error
                .expected()
                .map(|token| match token {
                    Some(token) => token.to_string(),
                    None => "end of input".to_string(),
                })
                .collect();
            expected.sort();
            expected.dedup();
            match (error.label(), expected.is_empty()) {
                (Some(label), _) => format!("unexpected {}, expected {}", found, label),
                (None, true) => format!("unexpected {}", found),
                (None, false) => format!("unexpected {}, expected {}", found, expected.join(" or ")),
            }
        }
    };

    Diagnostic::new(DiagnosticKind::SyntaxError, message, range)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reports_location() {
        let err = parse("protocol Shape:\n  proc area(self\n").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert_eq!(err.range.start.line, 1);
    }

    #[test]
    fn test_parse_empty_source() {
        assert_eq!(parse("").unwrap(), Vec::new());
    }

    #[test]
    fn test_parse_multiple_protocols() {
        let items = parse("protocol A:\n  proc a(self)\nprotocol B:\n  proc b(self)\n").unwrap();
        assert_eq!(items.len(), 2);
    }
}
