//! Token definitions for protocol sources
//!
//! Tokens are produced by the logos derive. Inline whitespace and `#` comments
//! are skipped; a line break keeps the width of the indentation that follows
//! it so the layout pass can turn it into `Newline`/`Indent`/`Dedent`.
//! Keywords are plain identifiers: which block keyword is valid where is
//! decided by the recognizer, not the lexer.
use logos::Logos;
use std::fmt;

#[derive(Logos, Debug, PartialEq, Eq, Hash, Clone)]
#[logos(skip r"[ \t\r]+|#[^\n]*")]
pub enum Token {
    /// `\n` plus the indentation width of the next line
    #[regex(r"\n[ \t]*", |lex| indent_width(&lex.slice()[1..]))]
    LineBreak(usize),

    // Synthetic layout tokens, inserted by the layout pass
    Newline,
    Indent,
    Dedent,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),
    /// Numeric literal text, parsed by the parser
    #[regex(r"[0-9]+(\.[0-9]+)?", |lex| lex.slice().to_string())]
    Number(String),
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| unescape(lex.slice()))]
    Str(String),

    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("=")]
    Assign,
    #[token(".")]
    Dot,
    #[token("*")]
    Star,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<")]
    Lt,
    #[token("<=")]
    Le,
    #[token(">")]
    Gt,
    #[token(">=")]
    Ge,
}

/// Tabs count as four columns
pub fn indent_width(indent: &str) -> usize {
    indent
        .chars()
        .map(|ch| if ch == '\t' { 4 } else { 1 })
        .sum()
}

fn unescape(literal: &str) -> String {
    let inner = &literal[1..literal.len() - 1];
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

impl Token {
    pub fn is_ident(&self, word: &str) -> bool {
        matches!(self, Token::Ident(name) if name == word)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::LineBreak(_) | Token::Newline => write!(f, "end of line"),
            Token::Indent => write!(f, "indented block"),
            Token::Dedent => write!(f, "end of block"),
            Token::Ident(name) => write!(f, "`{}`", name),
            Token::Number(text) => write!(f, "`{}`", text),
            Token::Str(text) => write!(f, "{:?}", text),
            Token::LParen => write!(f, "`(`"),
            Token::RParen => write!(f, "`)`"),
            Token::Comma => write!(f, "`,`"),
            Token::Colon => write!(f, "`:`"),
            Token::Assign => write!(f, "`=`"),
            Token::Dot => write!(f, "`.`"),
            Token::Star => write!(f, "`*`"),
            Token::Plus => write!(f, "`+`"),
            Token::Minus => write!(f, "`-`"),
            Token::Slash => write!(f, "`/`"),
            Token::Percent => write!(f, "`%`"),
            Token::EqEq => write!(f, "`==`"),
            Token::NotEq => write!(f, "`!=`"),
            Token::Lt => write!(f, "`<`"),
            Token::Le => write!(f, "`<=`"),
            Token::Gt => write!(f, "`>`"),
            Token::Ge => write!(f, "`>=`"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        Token::lexer(source).filter_map(|result| result.ok()).collect()
    }

    #[test]
    fn test_signature_line() {
        assert_eq!(
            kinds("proc area*(self): number"),
            vec![
                Token::Ident("proc".into()),
                Token::Ident("area".into()),
                Token::Star,
                Token::LParen,
                Token::Ident("self".into()),
                Token::RParen,
                Token::Colon,
                Token::Ident("number".into()),
            ]
        );
    }

    #[test]
    fn test_line_break_carries_indent() {
        assert_eq!(
            kinds("a\n    b\n\tc"),
            vec![
                Token::Ident("a".into()),
                Token::LineBreak(4),
                Token::Ident("b".into()),
                Token::LineBreak(4),
                Token::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("x # trailing words: (\n"),
            vec![Token::Ident("x".into()), Token::LineBreak(0)]
        );
    }

    #[test]
    fn test_two_char_operators() {
        assert_eq!(
            kinds("a <= b == c"),
            vec![
                Token::Ident("a".into()),
                Token::Le,
                Token::Ident("b".into()),
                Token::EqEq,
                Token::Ident("c".into()),
            ]
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            kinds(r#"4 2.5 "a\"b""#),
            vec![
                Token::Number("4".into()),
                Token::Number("2.5".into()),
                Token::Str("a\"b".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_character_is_an_error() {
        let results: Vec<_> = Token::lexer("a $ b").collect();
        assert!(results.iter().any(|r| r.is_err()));
    }
}
