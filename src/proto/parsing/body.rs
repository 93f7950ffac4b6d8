//! Expression and statement parsers for routine bodies
//!
//! Precedence, loosest first: `or`, `and`, comparisons, `+ -`, `* / %`,
//! unary `- not`, then postfix field access / method calls.

use chumsky::prelude::*;

use super::combinators::{ident, indented, keyword, token, type_annotation, ParserError};
use super::raw::Span;
use crate::proto::ast::{BinOp, Expr, Place, Stmt, UnaryOp};
use crate::proto::lexing::Token;

/// A call argument, `name: value` when named
type Argument = (Option<String>, Expr);

fn call_or_construct(callee: String, args: Vec<Argument>, span: Span) -> Result<Expr, ParserError> {
    let named = args.iter().filter(|(name, _)| name.is_some()).count();
    if named == 0 {
        return Ok(Expr::Call {
            callee,
            args: args.into_iter().map(|(_, value)| value).collect(),
        });
    }
    if named != args.len() {
        return Err(Simple::custom(
            span,
            format!(
                "`{}(...)` mixes named and positional arguments; record construction names every field",
                callee
            ),
        ));
    }
    Ok(Expr::Construct {
        ty: callee,
        fields: args
            .into_iter()
            .filter_map(|(name, value)| name.map(|name| (name, value)))
            .collect(),
    })
}

pub(crate) fn expr() -> impl Parser<Token, Expr, Error = ParserError> + Clone {
    recursive(|expr| {
        let literal = filter_map(|span: Span, tok| match tok {
            Token::Number(text) => text
                .parse::<f64>()
                .map(Expr::Number)
                .map_err(|_| Simple::custom(span, format!("invalid number `{}`", text))),
            Token::Str(text) => Ok(Expr::Str(text)),
            Token::Ident(word) if word == "true" => Ok(Expr::Bool(true)),
            Token::Ident(word) if word == "false" => Ok(Expr::Bool(false)),
            Token::Ident(word) if word == "nil" => Ok(Expr::Nil),
            other => Err(Simple::expected_input_found(span, Vec::new(), Some(other))),
        })
        .labelled("literal");

        let argument = ident()
            .then_ignore(token(Token::Colon))
            .or_not()
            .then(expr.clone());
        let arguments = argument
            .separated_by(token(Token::Comma))
            .allow_trailing()
            .delimited_by(token(Token::LParen), token(Token::RParen));

        let named = ident()
            .then(arguments.or_not())
            .try_map(|(name, args), span: Span| match args {
                None => Ok(Expr::Var(name)),
                Some(args) => call_or_construct(name, args, span),
            });

        let atom = literal
            .or(named)
            .or(expr
                .clone()
                .delimited_by(token(Token::LParen), token(Token::RParen)))
            .boxed();

        let method_args = expr
            .clone()
            .separated_by(token(Token::Comma))
            .allow_trailing()
            .delimited_by(token(Token::LParen), token(Token::RParen));

        // `a.b` is a field, `a.f(x)` calls `f(a, x)`
        let access = atom
            .then(
                token(Token::Dot)
                    .ignore_then(ident())
                    .then(method_args.or_not())
                    .repeated(),
            )
            .foldl(|base, (name, args)| match args {
                Some(args) => Expr::Call {
                    callee: name,
                    args: std::iter::once(base).chain(args).collect(),
                },
                None => Expr::field(base, name),
            })
            .boxed();

        let unary = token(Token::Minus)
            .to(UnaryOp::Neg)
            .or(keyword("not").to(UnaryOp::Not))
            .repeated()
            .then(access)
            .foldr(|op, rhs| Expr::Unary(op, Box::new(rhs)))
            .boxed();

        let product = unary
            .clone()
            .then(
                choice((
                    token(Token::Star).to(BinOp::Mul),
                    token(Token::Slash).to(BinOp::Div),
                    token(Token::Percent).to(BinOp::Rem),
                ))
                .then(unary)
                .repeated(),
            )
            .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            .boxed();

        let sum = product
            .clone()
            .then(
                choice((
                    token(Token::Plus).to(BinOp::Add),
                    token(Token::Minus).to(BinOp::Sub),
                ))
                .then(product)
                .repeated(),
            )
            .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            .boxed();

        let comparison = sum
            .clone()
            .then(
                choice((
                    token(Token::EqEq).to(BinOp::Eq),
                    token(Token::NotEq).to(BinOp::NotEq),
                    token(Token::Le).to(BinOp::Le),
                    token(Token::Ge).to(BinOp::Ge),
                    token(Token::Lt).to(BinOp::Lt),
                    token(Token::Gt).to(BinOp::Gt),
                ))
                .then(sum)
                .repeated(),
            )
            .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            .boxed();

        let conjunction = comparison
            .clone()
            .then(keyword("and").to(BinOp::And).then(comparison).repeated())
            .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            .boxed();

        conjunction
            .clone()
            .then(keyword("or").to(BinOp::Or).then(conjunction).repeated())
            .foldl(|lhs, (op, rhs)| Expr::binary(op, lhs, rhs))
            .boxed()
    })
}

pub(crate) fn statement() -> impl Parser<Token, Stmt, Error = ParserError> + Clone {
    let expr = expr();

    recursive(move |stmt| {
        let end_line = token(Token::Newline);
        let block = indented(stmt);

        let binding = keyword("let")
            .or(keyword("var"))
            .ignore_then(ident())
            .then(type_annotation().or_not())
            .then(token(Token::Assign).ignore_then(expr.clone()).or_not())
            .then_ignore(end_line.clone())
            .map(|((name, ty), value)| Stmt::Let {
                name,
                ty,
                value: value.unwrap_or(Expr::Nil),
            });

        let ret = keyword("return")
            .ignore_then(expr.clone().or_not())
            .then_ignore(end_line.clone())
            .map(Stmt::Return);

        let branch = expr
            .clone()
            .then_ignore(token(Token::Colon))
            .then(block.clone());
        let conditional = keyword("if")
            .ignore_then(branch.clone())
            .then(keyword("elif").ignore_then(branch).repeated())
            .then(
                keyword("else")
                    .ignore_then(token(Token::Colon))
                    .ignore_then(block)
                    .or_not(),
            )
            .map(|((first, rest), otherwise)| {
                let mut branches = vec![first];
                branches.extend(rest);
                Stmt::If {
                    branches,
                    otherwise,
                }
            });

        let simple = expr
            .clone()
            .then(token(Token::Assign).ignore_then(expr.clone()).or_not())
            .then_ignore(end_line)
            .try_map(|(lhs, rhs), span: Span| match rhs {
                None => Ok(Stmt::Expr(lhs)),
                Some(value) => Place::try_from(lhs)
                    .map(|target| Stmt::Assign { target, value })
                    .map_err(|_| {
                        Simple::custom(span, "only variables and fields can be assigned")
                    }),
            });

        choice((binding, ret, conditional, simple))
    })
}

/// `= <indented statements>` or `= expr` on one line (shorthand for `return expr`)
pub(crate) fn routine_body() -> impl Parser<Token, Vec<Stmt>, Error = ParserError> + Clone {
    let block = indented(statement());
    let inline = expr()
        .then_ignore(token(Token::Newline))
        .map(|value| vec![Stmt::Return(Some(value))]);

    token(Token::Assign).ignore_then(block.or(inline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::lexing::lex;
    use chumsky::Stream;

    fn parse_with<T>(
        parser: impl Parser<Token, T, Error = ParserError>,
        source: &str,
    ) -> Result<T, Vec<ParserError>> {
        let tokens = lex(source).unwrap();
        let len = source.len();
        parser
            .then_ignore(end())
            .parse(Stream::from_iter(len..len + 1, tokens.into_iter()))
    }

    fn parse_expr(source: &str) -> Expr {
        let source = format!("{}\n", source);
        parse_with(expr().then_ignore(token(Token::Newline)), &source).unwrap()
    }

    #[test]
    fn test_product_binds_tighter_than_sum() {
        assert_eq!(
            parse_expr("1 + 2 * 3"),
            Expr::binary(
                BinOp::Add,
                Expr::Number(1.0),
                Expr::binary(BinOp::Mul, Expr::Number(2.0), Expr::Number(3.0))
            )
        );
    }

    #[test]
    fn test_field_access_chain() {
        assert_eq!(
            parse_expr("self.side * self.side"),
            Expr::binary(
                BinOp::Mul,
                Expr::field(Expr::var("self"), "side"),
                Expr::field(Expr::var("self"), "side")
            )
        );
    }

    #[test]
    fn test_method_call_sugar() {
        assert_eq!(
            parse_expr("shape.scale(2)"),
            Expr::Call {
                callee: "scale".into(),
                args: vec![Expr::var("shape"), Expr::Number(2.0)],
            }
        );
    }

    #[test]
    fn test_record_construction() {
        assert_eq!(
            parse_expr("Square(side: 4)"),
            Expr::Construct {
                ty: "Square".into(),
                fields: vec![("side".into(), Expr::Number(4.0))],
            }
        );
    }

    #[test]
    fn test_mixed_arguments_are_rejected() {
        let source = "Square(side: 4, 5)\n";
        assert!(parse_with(expr().then_ignore(token(Token::Newline)), source).is_err());
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(
            parse_expr("not a and b or c"),
            Expr::binary(
                BinOp::Or,
                Expr::binary(
                    BinOp::And,
                    Expr::Unary(UnaryOp::Not, Box::new(Expr::var("a"))),
                    Expr::var("b")
                ),
                Expr::var("c")
            )
        );
    }

    #[test]
    fn test_if_else_statement() {
        let source = "if x > 1:\n  return 1\nelse:\n  return 2\n";
        let stmt = parse_with(statement(), source).unwrap();
        match stmt {
            Stmt::If {
                branches,
                otherwise,
            } => {
                assert_eq!(branches.len(), 1);
                assert_eq!(
                    otherwise,
                    Some(vec![Stmt::Return(Some(Expr::Number(2.0)))])
                );
            }
            other => panic!("expected if statement, got {:?}", other),
        }
    }

    #[test]
    fn test_field_assignment() {
        let stmt = parse_with(statement(), "self.on = not self.on\n").unwrap();
        assert_eq!(
            stmt,
            Stmt::Assign {
                target: Place::Field(Box::new(Expr::var("self")), "on".into()),
                value: Expr::Unary(
                    UnaryOp::Not,
                    Box::new(Expr::field(Expr::var("self"), "on"))
                ),
            }
        );
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert!(parse_with(statement(), "1 = 2\n").is_err());
    }

    #[test]
    fn test_inline_body_is_a_return() {
        let body = parse_with(routine_body(), "= 16\n").unwrap();
        assert_eq!(body, vec![Stmt::Return(Some(Expr::Number(16.0)))]);
    }
}
