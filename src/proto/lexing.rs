//! Lexing for protocol sources
//!
//! Two steps, kept apart so each stays simple:
//! - `tokenize` runs the logos lexer and keeps byte spans
//! - `layout::apply_layout` turns line breaks into `Newline`/`Indent`/`Dedent`

pub mod layout;
pub mod tokens;

pub use layout::{apply_layout, LayoutError, SpannedToken};
pub use tokens::Token;

use super::ast::range::SourceLocation;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use logos::Logos;

/// Raw tokens with their spans; the first unknown character is an error.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, std::ops::Range<usize>> {
    let mut tokens = Vec::new();
    for (result, span) in Token::lexer(source).spanned() {
        match result {
            Ok(token) => tokens.push((token, span)),
            Err(()) => return Err(span),
        }
    }
    Ok(tokens)
}

/// Fully processed token stream ready for the parser
pub fn lex(source: &str) -> Result<Vec<SpannedToken>, Diagnostic> {
    let locator = SourceLocation::new(source);
    let raw = tokenize(source).map_err(|span| {
        Diagnostic::new(
            DiagnosticKind::SyntaxError,
            format!("unexpected character `{}`", &source[span.clone()]),
            locator.byte_range_to_ast_range(&span),
        )
    })?;

    let first_line = source.lines().next().unwrap_or("");
    let first_indent = tokens::indent_width(
        &first_line[..first_line.len() - first_line.trim_start_matches([' ', '\t']).len()],
    );

    tracing::trace!(tokens = raw.len(), "tokenized protocol source");

    apply_layout(raw, first_indent, source.len()).map_err(|err| {
        Diagnostic::new(
            DiagnosticKind::SyntaxError,
            err.to_string(),
            locator.byte_range_to_ast_range(&err.span),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        lex(source).unwrap().into_iter().map(|(t, _)| t).collect()
    }

    #[test]
    fn test_protocol_header_and_body() {
        let tokens = kinds("protocol Shape:\n  proc area(self)\n");
        assert_eq!(tokens[3], Token::Newline);
        assert_eq!(tokens[4], Token::Indent);
        assert_eq!(tokens.last(), Some(&Token::Dedent));
    }

    #[test]
    fn test_comment_only_lines_are_blank() {
        let tokens = kinds("a:\n  # nothing here\n  b\n");
        assert_eq!(
            tokens,
            vec![
                Token::Ident("a".into()),
                Token::Colon,
                Token::Newline,
                Token::Indent,
                Token::Ident("b".into()),
                Token::Newline,
                Token::Dedent,
            ]
        );
    }

    #[test]
    fn test_spans_survive_layout() {
        let tokens = lex("a:\n  bee\n").unwrap();
        let bee = tokens
            .iter()
            .find(|(t, _)| t.is_ident("bee"))
            .map(|(_, span)| span.clone());
        assert_eq!(bee, Some(5..8));
    }

    #[test]
    fn test_unexpected_character() {
        let err = lex("proc a(self) $").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert!(err.message.contains('$'));
    }

    #[test]
    fn test_bad_dedent_reports_location() {
        let err = lex("a:\n    b\n  c\n").unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::SyntaxError);
        assert_eq!(err.range.start.line, 2);
    }
}
