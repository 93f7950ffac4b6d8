//! Statement and expression trees for routine bodies
//!
//! Authors write a small imperative language inside overrides and
//! constructors. Code generation treats these bodies as opaque apart from two
//! rewrites (the self narrowing in overrides, slot wiring in constructors),
//! which is why a handful of variants below are never produced by the parser.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    /// `let name[: T] = value` (also spelled `var`)
    Let {
        name: String,
        ty: Option<String>,
        value: Expr,
    },
    Assign {
        target: Place,
        value: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    If {
        branches: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
    /// Generated: rebinds `binding` from the base type to `target`.
    ///
    /// With `checked` the runtime identity of the value must be `target` or a
    /// type derived from it; otherwise the value is taken as is.
    Narrow {
        binding: String,
        target: String,
        checked: bool,
    },
    /// Generated: fails with a null-dispatch error unless `receiver.slot` is wired.
    EnsureWired {
        receiver: String,
        slot: String,
        method: String,
    },
}

/// Assignable locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Place {
    Var(String),
    Field(Box<Expr>, String),
}

impl TryFrom<Expr> for Place {
    type Error = Expr;

    fn try_from(expr: Expr) -> Result<Self, Self::Error> {
        match expr {
            Expr::Var(name) => Ok(Place::Var(name)),
            Expr::Field(base, name) => Ok(Place::Field(base, name)),
            other => Err(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Var(String),
    Field(Box<Expr>, String),
    Call {
        callee: String,
        args: Vec<Expr>,
    },
    Construct {
        ty: String,
        fields: Vec<(String, Expr)>,
    },
    Unary(UnaryOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    /// Generated: a reference to a named function, stored into a slot.
    FnRef(String),
    /// Generated: calls whatever function `receiver.slot` holds.
    CallSlot {
        receiver: Box<Expr>,
        slot: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn field(base: Expr, name: impl Into<String>) -> Self {
        Expr::Field(Box::new(base), name.into())
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary(op, Box::new(lhs), Box::new(rhs))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Mul,
    Div,
    Rem,
    Add,
    Sub,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinOp {
    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 3,
            BinOp::Add | BinOp::Sub => 4,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 5,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::And => "and",
            BinOp::Or => "or",
        }
    }
}

impl fmt::Display for BinOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_place_from_expr() {
        assert_eq!(Place::try_from(Expr::var("x")), Ok(Place::Var("x".into())));
        assert_eq!(
            Place::try_from(Expr::field(Expr::var("self"), "side")),
            Ok(Place::Field(Box::new(Expr::var("self")), "side".into()))
        );
        assert!(Place::try_from(Expr::Number(1.0)).is_err());
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(BinOp::Mul.precedence() > BinOp::Add.precedence());
        assert!(BinOp::Add.precedence() > BinOp::Lt.precedence());
        assert!(BinOp::And.precedence() > BinOp::Or.precedence());
    }
}
