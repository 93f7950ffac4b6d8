//! Raw item tree produced by the parser
//!
//! This is the untyped declaration input the recognizer classifies. It keeps
//! exactly what was written (keywords, marker positions, byte spans) and makes
//! no judgement about which shapes are valid where.

use crate::proto::ast::Stmt;
use std::ops::Range;

pub type Span = Range<usize>;

/// Where an export marker was written relative to a name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    None,
    /// `*Name`
    Prefix,
    /// `name*`
    Suffix,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawName {
    pub text: String,
    pub marker: Marker,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawParam {
    pub name: String,
    pub ty: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    pub name: RawName,
    pub ty: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawRoutine {
    /// `proc`, `func` or `method`
    pub keyword: String,
    pub name: RawName,
    pub params: Vec<RawParam>,
    pub ret: Option<String>,
    pub body: Option<Vec<Stmt>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RawItem {
    /// `keyword [name]:` followed by an indented block
    Block {
        keyword: String,
        name: Option<RawName>,
        items: Vec<RawItem>,
        span: Span,
    },
    /// `keyword name: Type` on a single line, e.g. `var side: number`
    Section {
        keyword: String,
        field: RawField,
        span: Span,
    },
    Field(RawField),
    Routine(RawRoutine),
}

impl RawItem {
    pub fn span(&self) -> &Span {
        match self {
            RawItem::Block { span, .. } | RawItem::Section { span, .. } => span,
            RawItem::Field(field) => &field.span,
            RawItem::Routine(routine) => &routine.span,
        }
    }

    /// Short description used in diagnostics
    pub fn describe(&self) -> String {
        match self {
            RawItem::Block { keyword, .. } => format!("`{}` block", keyword),
            RawItem::Section { keyword, .. } => format!("`{}` section", keyword),
            RawItem::Field(field) => format!("field `{}`", field.name.text),
            RawItem::Routine(routine) => format!("routine `{}`", routine.name.text),
        }
    }
}
