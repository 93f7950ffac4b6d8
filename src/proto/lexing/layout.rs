//! Indentation layout for the token stream
//!
//! Transforms raw `LineBreak(width)` tokens into semantic `Newline`, `Indent`
//! and `Dedent` tokens so that blocks can be parsed like brace-delimited ones.
//!
//! # Algorithm
//!
//! 1. Keep a stack of open indentation widths, starting at `[0]`
//! 2. Every non-blank line ends with a `Newline`; blank lines emit nothing
//! 3. When the first token of a line is seen, compare its width with the top:
//!    - greater: push it and emit one `Indent`
//!    - smaller: pop and emit a `Dedent` per level until the top matches;
//!      landing between two levels is an error
//! 4. At the end, close every level still open
//!
//! # Example
//!
//! Input: `protocol Shape:` / `  proc area(self)`
//! Output: `[protocol, Shape, :, Newline, Indent, proc, area, (, self, ), Newline, Dedent]`

use super::tokens::Token;
use std::cmp::Ordering;
use std::fmt;
use std::ops::Range;

pub type SpannedToken = (Token, Range<usize>);

/// A dedent that does not return to an enclosing indentation level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutError {
    pub found: usize,
    pub expected: Vec<usize>,
    pub span: Range<usize>,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let levels: Vec<String> = self.expected.iter().map(|w| w.to_string()).collect();
        write!(
            f,
            "indentation of {} columns does not match any enclosing block (open levels: {})",
            self.found,
            levels.join(", ")
        )
    }
}

impl std::error::Error for LayoutError {}

pub fn apply_layout(
    raw: Vec<SpannedToken>,
    first_indent: usize,
    source_len: usize,
) -> Result<Vec<SpannedToken>, LayoutError> {
    let mut result = Vec::with_capacity(raw.len());
    let mut levels = vec![0usize];
    let mut pending_indent = Some(first_indent);
    let mut line_open = false;

    for (token, span) in raw {
        if let Token::LineBreak(width) = token {
            if line_open {
                result.push((Token::Newline, span.start..span.start + 1));
                line_open = false;
            }
            // blank lines simply overwrite the pending width
            pending_indent = Some(width);
            continue;
        }

        if let Some(width) = pending_indent.take() {
            open_line(&mut result, &mut levels, width, span.start)?;
        }
        result.push((token, span));
        line_open = true;
    }

    if line_open {
        result.push((Token::Newline, source_len..source_len));
    }
    while levels.len() > 1 {
        levels.pop();
        result.push((Token::Dedent, source_len..source_len));
    }

    Ok(result)
}

fn open_line(
    result: &mut Vec<SpannedToken>,
    levels: &mut Vec<usize>,
    width: usize,
    at: usize,
) -> Result<(), LayoutError> {
    let top = levels.last().copied().unwrap_or(0);
    match width.cmp(&top) {
        Ordering::Greater => {
            levels.push(width);
            result.push((Token::Indent, at..at));
        }
        Ordering::Less => {
            while levels.len() > 1 && width < levels[levels.len() - 1] {
                levels.pop();
                result.push((Token::Dedent, at..at));
            }
            if levels.last().copied() != Some(width) {
                return Err(LayoutError {
                    found: width,
                    expected: levels.clone(),
                    span: at..at + 1,
                });
            }
        }
        Ordering::Equal => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Token {
        Token::Ident(name.to_string())
    }

    fn layout(raw: Vec<Token>) -> Result<Vec<Token>, LayoutError> {
        let spanned = raw.into_iter().map(|t| (t, 0..0)).collect();
        apply_layout(spanned, 0, 0).map(|tokens| tokens.into_iter().map(|(t, _)| t).collect())
    }

    #[test]
    fn test_flat_lines() {
        let tokens = layout(vec![ident("a"), Token::LineBreak(0), ident("b")]).unwrap();
        assert_eq!(
            tokens,
            vec![ident("a"), Token::Newline, ident("b"), Token::Newline]
        );
    }

    #[test]
    fn test_nested_block_closes_at_end() {
        let tokens = layout(vec![
            ident("a"),
            Token::LineBreak(2),
            ident("b"),
            Token::LineBreak(4),
            ident("c"),
        ])
        .unwrap();
        assert_eq!(
            tokens,
            vec![
                ident("a"),
                Token::Newline,
                Token::Indent,
                ident("b"),
                Token::Newline,
                Token::Indent,
                ident("c"),
                Token::Newline,
                Token::Dedent,
                Token::Dedent,
            ]
        );
    }

    #[test]
    fn test_blank_lines_do_not_affect_levels() {
        let tokens = layout(vec![
            ident("a"),
            Token::LineBreak(2),
            ident("b"),
            Token::LineBreak(0),
            Token::LineBreak(7),
            Token::LineBreak(2),
            ident("c"),
        ])
        .unwrap();
        assert_eq!(
            tokens,
            vec![
                ident("a"),
                Token::Newline,
                Token::Indent,
                ident("b"),
                Token::Newline,
                ident("c"),
                Token::Newline,
                Token::Dedent,
            ]
        );
    }

    #[test]
    fn test_multi_level_dedent() {
        let tokens = layout(vec![
            ident("a"),
            Token::LineBreak(2),
            ident("b"),
            Token::LineBreak(4),
            ident("c"),
            Token::LineBreak(0),
            ident("d"),
        ])
        .unwrap();
        assert_eq!(
            &tokens[7..],
            &[Token::Newline, Token::Dedent, Token::Dedent, ident("d"), Token::Newline]
        );
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = layout(vec![
            ident("a"),
            Token::LineBreak(4),
            ident("b"),
            Token::LineBreak(2),
            ident("c"),
        ])
        .unwrap_err();
        assert_eq!(err.found, 2);
        assert_eq!(err.expected, vec![0]);
    }
}
