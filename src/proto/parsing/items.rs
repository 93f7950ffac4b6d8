//! Declaration item parser
//!
//! Accepts four line shapes, tried in this order:
//! - routine: `proc|func|method name(params)[: T]` with an optional `= body`
//! - block: `keyword [name]:` followed by indented items
//! - section: `keyword name: T` (single-field block, e.g. `var side: number`)
//! - field: `name: T`

use chumsky::prelude::*;

use super::body::routine_body;
use super::combinators::{indented, name_ref, params, token, type_annotation, word, ParserError};
use super::raw::{RawField, RawItem, RawRoutine};
use crate::proto::lexing::Token;

const ROUTINE_KEYWORDS: &[&str] = &["proc", "func", "method"];

fn routine_keyword() -> impl Parser<Token, String, Error = ParserError> + Clone {
    word()
        .try_map(|keyword, span| {
            if ROUTINE_KEYWORDS.contains(&keyword.as_str()) {
                Ok(keyword)
            } else {
                Err(Simple::custom(span, format!("`{}` does not start a routine", keyword)))
            }
        })
        .labelled("routine keyword")
}

fn field_line() -> impl Parser<Token, RawField, Error = ParserError> + Clone {
    name_ref()
        .then(type_annotation())
        .then_ignore(token(Token::Newline))
        .map_with_span(|(name, ty), span| RawField { name, ty, span })
}

pub(crate) fn item() -> impl Parser<Token, RawItem, Error = ParserError> + Clone {
    recursive(|item| {
        let routine = routine_keyword()
            .then(name_ref())
            .then(params())
            .then(type_annotation().or_not())
            .then(
                routine_body()
                    .map(Some)
                    .or(token(Token::Newline).to(None)),
            )
            .map_with_span(|((((keyword, name), params), ret), body), span| {
                RawItem::Routine(RawRoutine {
                    keyword,
                    name,
                    params,
                    ret,
                    body,
                    span,
                })
            });

        let block = word()
            .then(name_ref().or_not())
            .then_ignore(token(Token::Colon))
            .then(indented(item))
            .map_with_span(|((keyword, name), items), span| RawItem::Block {
                keyword,
                name,
                items,
                span,
            });

        let section = word()
            .then(field_line())
            .map_with_span(|(keyword, field), span| RawItem::Section {
                keyword,
                field,
                span,
            });

        choice((routine, block, section, field_line().map(RawItem::Field)))
    })
}

/// A whole source: top-level items until end of input
pub(crate) fn items() -> impl Parser<Token, Vec<RawItem>, Error = ParserError> {
    item().repeated().then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::lexing::lex;
    use crate::proto::parsing::raw::Marker;
    use chumsky::Stream;

    fn parse_items(source: &str) -> Vec<RawItem> {
        let tokens = lex(source).unwrap();
        let len = source.len();
        items()
            .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
            .unwrap()
    }

    #[test]
    fn test_protocol_block_with_signature() {
        let items = parse_items("protocol *Shape:\n  proc area*(self): number\n");
        assert_eq!(items.len(), 1);
        match &items[0] {
            RawItem::Block {
                keyword,
                name: Some(name),
                items,
                ..
            } => {
                assert_eq!(keyword, "protocol");
                assert_eq!(name.text, "Shape");
                assert_eq!(name.marker, Marker::Prefix);
                match &items[0] {
                    RawItem::Routine(routine) => {
                        assert_eq!(routine.name.marker, Marker::Suffix);
                        assert_eq!(routine.params[0].ty, None);
                        assert_eq!(routine.ret.as_deref(), Some("number"));
                        assert!(routine.body.is_none());
                    }
                    other => panic!("expected routine, got {:?}", other),
                }
            }
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_sections_and_fields() {
        let items = parse_items("impl Square:\n  var side: number\n  let:\n    label*: string\n");
        let RawItem::Block { items, .. } = &items[0] else {
            panic!("expected block");
        };
        assert!(matches!(&items[0], RawItem::Section { keyword, field, .. }
            if keyword == "var" && field.name.text == "side"));
        assert!(matches!(&items[1], RawItem::Block { keyword, name: None, items, .. }
            if keyword == "let" && matches!(&items[0], RawItem::Field(f) if f.ty == "string")));
    }

    #[test]
    fn test_routine_with_block_body() {
        let items = parse_items("proc newSquare*(side: number): Square =\n  result = Square(side: side)\n");
        let RawItem::Routine(routine) = &items[0] else {
            panic!("expected routine");
        };
        assert_eq!(routine.params[0].ty.as_deref(), Some("number"));
        assert_eq!(routine.body.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn test_unknown_block_keyword_still_parses() {
        let items = parse_items("protocol P:\n  struct Q:\n    x: number\n");
        let RawItem::Block { items, .. } = &items[0] else {
            panic!("expected block");
        };
        assert!(matches!(&items[0], RawItem::Block { keyword, .. } if keyword == "struct"));
    }

    #[test]
    fn test_missing_colon_is_a_parse_error() {
        let source = "protocol Shape\n  proc area(self)\n";
        let tokens = lex(source).unwrap();
        let len = source.len();
        assert!(items()
            .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
            .is_err());
    }
}
