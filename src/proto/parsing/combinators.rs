//! Parser combinator helpers shared by the body and item parsers.

use chumsky::prelude::*;

use super::raw::{Marker, RawName, RawParam, Span};
use crate::proto::lexing::Token;

/// Type alias for parser error
pub type ParserError = Simple<Token>;

/// Words with a fixed meaning inside routine bodies
pub const RESERVED: &[&str] = &[
    "and", "or", "not", "true", "false", "nil", "if", "elif", "else", "return", "let", "var",
];

pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Match a specific token, ignoring its value
pub(crate) fn token(t: Token) -> impl Parser<Token, (), Error = ParserError> + Clone {
    just(t).ignored()
}

/// Match an identifier spelled exactly `word`
pub(crate) fn keyword(word: &'static str) -> impl Parser<Token, (), Error = ParserError> + Clone {
    just(Token::Ident(word.to_string())).ignored()
}

/// Any identifier, reserved or not (block keywords)
pub(crate) fn word() -> impl Parser<Token, String, Error = ParserError> + Clone {
    filter_map(|span: Span, tok| match tok {
        Token::Ident(name) => Ok(name),
        other => Err(Simple::expected_input_found(span, Vec::new(), Some(other))),
    })
    .labelled("keyword")
}

/// An identifier usable as a name
pub(crate) fn ident() -> impl Parser<Token, String, Error = ParserError> + Clone {
    filter_map(|span: Span, tok| match tok {
        Token::Ident(name) if !is_reserved(&name) => Ok(name),
        other => Err(Simple::expected_input_found(span, Vec::new(), Some(other))),
    })
    .labelled("identifier")
}

/// A name with an optional export marker on either side
pub(crate) fn name_ref() -> impl Parser<Token, RawName, Error = ParserError> + Clone {
    just(Token::Star)
        .or_not()
        .then(ident())
        .then(just(Token::Star).or_not())
        .try_map(|((prefix, text), suffix), span: Span| {
            let marker = match (prefix.is_some(), suffix.is_some()) {
                (false, false) => Marker::None,
                (true, false) => Marker::Prefix,
                (false, true) => Marker::Suffix,
                (true, true) => {
                    return Err(Simple::custom(
                        span,
                        format!("`{}` carries an export marker on both sides", text),
                    ))
                }
            };
            Ok(RawName { text, marker, span })
        })
}

/// `: Type`
pub(crate) fn type_annotation() -> impl Parser<Token, String, Error = ParserError> + Clone {
    token(Token::Colon).ignore_then(ident().labelled("type"))
}

/// `(name[: Type], ...)`
pub(crate) fn params() -> impl Parser<Token, Vec<RawParam>, Error = ParserError> + Clone {
    ident()
        .then(type_annotation().or_not())
        .map_with_span(|(name, ty), span| RawParam { name, ty, span })
        .separated_by(token(Token::Comma))
        .allow_trailing()
        .delimited_by(token(Token::LParen), token(Token::RParen))
}

/// `Newline Indent <inner>+ Dedent`
pub(crate) fn indented<T, P>(inner: P) -> impl Parser<Token, Vec<T>, Error = ParserError> + Clone
where
    P: Parser<Token, T, Error = ParserError> + Clone,
{
    token(Token::Newline)
        .ignore_then(token(Token::Indent))
        .ignore_then(inner.repeated().at_least(1))
        .then_ignore(token(Token::Dedent))
}
