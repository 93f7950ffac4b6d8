//! Front-end recognizer: raw item tree → grammar model
//!
//! The parser accepts any block keyword and any mix of items; this module
//! decides what each item means inside a protocol or impl body and rejects
//! the shapes that have no meaning there.
//!
//! A protocol body is swept once to collect method signatures, base fields
//! and impl headers. Impl bodies are recognized afterwards, so an override
//! can refer to a method declared further down the protocol.

use std::collections::HashSet;

use super::ast::range::SourceLocation;
use super::ast::{
    ConstructorDecl, FieldDecl, ImplDecl, MethodOverride, MethodSig, Param, ProtocolDecl, Range,
};
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::parsing::raw::Span;
use super::parsing::{Marker, RawField, RawItem, RawName, RawParam, RawRoutine};
use super::validation;

const FIELD_KEYWORDS: &[&str] = &["var", "let"];

/// Classifies raw items into protocol declarations.
pub struct Recognizer {
    locator: SourceLocation,
}

/// An impl header seen during the protocol sweep, body not yet recognized
struct PendingImpl {
    name: RawName,
    items: Vec<RawItem>,
    span: Span,
}

impl Recognizer {
    pub fn new(source: &str) -> Self {
        Self {
            locator: SourceLocation::new(source),
        }
    }

    fn range(&self, span: &Span) -> Range {
        self.locator.byte_range_to_ast_range(span)
    }

    fn malformed(&self, span: &Span, message: impl Into<String>) -> Diagnostic {
        Diagnostic::new(
            DiagnosticKind::MalformedDeclaration,
            message,
            self.range(span),
        )
    }

    /// Recognize a whole source: protocol blocks only, with unique names.
    pub fn recognize_file(&self, items: Vec<RawItem>) -> Result<Vec<ProtocolDecl>, Diagnostic> {
        let mut seen = HashSet::new();
        let mut protocols = Vec::with_capacity(items.len());
        for item in items {
            let protocol = self.recognize_protocol(item)?;
            if !seen.insert(protocol.name.clone()) {
                return Err(Diagnostic::new(
                    DiagnosticKind::DuplicateSymbol,
                    format!("protocol `{}` is declared more than once", protocol.name),
                    protocol.range,
                ));
            }
            protocols.push(protocol);
        }
        Ok(protocols)
    }

    /// Recognize one `protocol Name:` block.
    pub fn recognize_protocol(&self, item: RawItem) -> Result<ProtocolDecl, Diagnostic> {
        let (name, items, span) = match item {
            RawItem::Block {
                keyword,
                name,
                items,
                span,
            } if keyword == "protocol" => match name {
                Some(name) => (name, items, span),
                None => return Err(self.malformed(&span, "a protocol needs a name")),
            },
            other => {
                return Err(self.malformed(
                    other.span(),
                    format!(
                        "expected a `protocol Name:` block at the top level, found {}",
                        other.describe()
                    ),
                ))
            }
        };

        let exported = self.type_name_marker(&name, "protocol")?;
        let mut protocol = ProtocolDecl::new(name.text.as_str()).at(self.range(&span));
        protocol.exported = exported;

        let mut pending = Vec::new();
        for item in items {
            match item {
                RawItem::Routine(routine) => {
                    let sig = self.method_signature(routine)?;
                    protocol.methods.push(sig);
                }
                RawItem::Block {
                    keyword,
                    name: Some(name),
                    items,
                    span,
                } if keyword == "impl" => {
                    if protocol.methods.is_empty() {
                        return Err(validation::empty_method_set(
                            &name.text,
                            &protocol.name,
                            self.range(&span),
                        ));
                    }
                    pending.push(PendingImpl { name, items, span });
                }
                RawItem::Block {
                    keyword,
                    name: None,
                    span,
                    ..
                } if keyword == "impl" => {
                    return Err(self.malformed(&span, "an impl block needs a name"));
                }
                item @ (RawItem::Block { .. } | RawItem::Section { .. }) => {
                    let fields = self.field_section(item, "a protocol body", "`impl`, `var` or `let`")?;
                    protocol.fields.extend(fields);
                }
                RawItem::Field(field) => {
                    return Err(self.malformed(
                        &field.span,
                        format!(
                            "field `{}` must be declared inside a `var` or `let` section",
                            field.name.text
                        ),
                    ))
                }
            }
        }

        for imp in pending {
            let imp = self.recognize_impl(imp, &protocol)?;
            protocol.impls.push(imp);
        }

        tracing::trace!(
            protocol = %protocol.name,
            methods = protocol.methods.len(),
            impls = protocol.impls.len(),
            "recognized protocol"
        );
        Ok(protocol)
    }

    fn recognize_impl(
        &self,
        pending: PendingImpl,
        protocol: &ProtocolDecl,
    ) -> Result<ImplDecl, Diagnostic> {
        let exported = self.type_name_marker(&pending.name, "impl")?;
        let mut imp = ImplDecl::new(pending.name.text.as_str()).at(self.range(&pending.span));
        imp.exported = exported;
        imp.protocol = protocol.name.clone();

        for item in pending.items {
            match item {
                RawItem::Routine(routine) => self.impl_routine(routine, &mut imp, protocol)?,
                RawItem::Field(field) => {
                    return Err(self.malformed(
                        &field.span,
                        format!(
                            "field `{}` must be declared inside a `var` or `let` section",
                            field.name.text
                        ),
                    ))
                }
                other => {
                    let fields = self.field_section(other, "an impl body", "`var`, `let` or a routine")?;
                    imp.fields.extend(fields);
                }
            }
        }
        Ok(imp)
    }

    fn impl_routine(
        &self,
        routine: RawRoutine,
        imp: &mut ImplDecl,
        protocol: &ProtocolDecl,
    ) -> Result<(), Diagnostic> {
        let Some(body) = routine.body else {
            return Err(self.malformed(
                &routine.span,
                format!(
                    "routine `{}` in impl `{}` needs a body; signatures belong to the protocol",
                    routine.name.text, imp.name
                ),
            ));
        };
        if routine.name.marker == Marker::Prefix {
            return Err(self.malformed(
                &routine.name.span,
                format!(
                    "routine names take the export marker as a suffix: `{}*`",
                    routine.name.text
                ),
            ));
        }

        let range = self.range(&routine.span);
        let params = self.params(routine.params);
        let untyped_first = params.first().map(Param::is_untyped).unwrap_or(false);
        let is_method = protocol.method(&routine.name.text).is_some();
        let returns_impl = routine.ret.as_deref() == Some(imp.name.as_str());

        if untyped_first && (is_method || !returns_impl) {
            let mut ov = MethodOverride::new(routine.name.text, body)
                .with_params(params)
                .at(range);
            ov.ret = routine.ret;
            imp.overrides.push(ov);
            return Ok(());
        }

        match routine.ret {
            Some(ret) if ret == imp.name && !is_method => {
                if imp.constructor.is_some() {
                    return Err(Diagnostic::new(
                        DiagnosticKind::DuplicateConstructor,
                        format!(
                            "impl `{}` already has a constructor; `{}` would be a second one",
                            imp.name, routine.name.text
                        ),
                        range,
                    ));
                }
                let mut ctor = ConstructorDecl::new(routine.name.text, ret, body).at(range);
                ctor.exported = routine.name.marker == Marker::Suffix;
                ctor.params = params;
                imp.constructor = Some(ctor);
                Ok(())
            }
            _ if is_method => Err(Diagnostic::new(
                DiagnosticKind::MissingSelfParameter,
                format!(
                    "override `{}` in impl `{}` must start with an untyped self parameter",
                    routine.name.text, imp.name
                ),
                range,
            )),
            ret => Err(validation::constructor_type_mismatch(
                &routine.name.text,
                ret.as_deref().unwrap_or("nothing"),
                &imp.name,
                range,
            )),
        }
    }

    fn method_signature(&self, routine: RawRoutine) -> Result<MethodSig, Diagnostic> {
        if routine.body.is_some() {
            return Err(self.malformed(
                &routine.span,
                format!(
                    "method `{}` is a signature and cannot have a body; implementations belong in an impl",
                    routine.name.text
                ),
            ));
        }
        if routine.name.marker == Marker::Prefix {
            return Err(self.malformed(
                &routine.name.span,
                format!(
                    "method names take the export marker as a suffix: `{}*`",
                    routine.name.text
                ),
            ));
        }

        let mut sig = MethodSig::new(routine.name.text)
            .with_params(self.params(routine.params))
            .at(self.range(&routine.span));
        sig.exported = routine.name.marker == Marker::Suffix;
        sig.ret = routine.ret;
        validation::require_signature_self(&sig)?;
        Ok(sig)
    }

    /// `var`/`let` as a block of fields or a single-line section
    fn field_section(
        &self,
        item: RawItem,
        context: &str,
        allowed: &str,
    ) -> Result<Vec<FieldDecl>, Diagnostic> {
        match item {
            RawItem::Section {
                keyword,
                field,
                span,
            } => {
                if !FIELD_KEYWORDS.contains(&keyword.as_str()) {
                    return Err(validation::invalid_command(&keyword, context, allowed, self.range(&span)));
                }
                Ok(vec![self.field(field)?])
            }
            RawItem::Block {
                keyword,
                name,
                items,
                span,
            } => {
                if !FIELD_KEYWORDS.contains(&keyword.as_str()) {
                    return Err(validation::invalid_command(&keyword, context, allowed, self.range(&span)));
                }
                if let Some(name) = name {
                    return Err(self.malformed(
                        &name.span,
                        format!(
                            "a `{}` section lists `name: Type` lines; write `{} {}: Type` for a single field",
                            keyword, keyword, name.text
                        ),
                    ));
                }
                items
                    .into_iter()
                    .map(|item| match item {
                        RawItem::Field(field) => self.field(field),
                        other => Err(self.malformed(
                            other.span(),
                            format!(
                                "expected `name: Type` inside a `{}` section, found {}",
                                keyword,
                                other.describe()
                            ),
                        )),
                    })
                    .collect()
            }
            other => Err(self.malformed(
                other.span(),
                format!("unexpected {} in {}", other.describe(), context),
            )),
        }
    }

    fn field(&self, field: RawField) -> Result<FieldDecl, Diagnostic> {
        if field.name.marker == Marker::Prefix {
            return Err(self.malformed(
                &field.name.span,
                format!(
                    "field names take the export marker as a suffix: `{}*`",
                    field.name.text
                ),
            ));
        }
        let mut decl = FieldDecl::new(field.name.text, field.ty).at(self.range(&field.span));
        decl.exported = field.name.marker == Marker::Suffix;
        Ok(decl)
    }

    /// Protocol and impl names take the marker as a prefix.
    fn type_name_marker(&self, name: &RawName, what: &str) -> Result<bool, Diagnostic> {
        match name.marker {
            Marker::None => Ok(false),
            Marker::Prefix => Ok(true),
            Marker::Suffix => Err(self.malformed(
                &name.span,
                format!(
                    "{} names take the export marker as a prefix: `*{}`",
                    what, name.text
                ),
            )),
        }
    }

    fn params(&self, params: Vec<RawParam>) -> Vec<Param> {
        params
            .into_iter()
            .map(|param| Param {
                range: self.range(&param.span),
                name: param.name,
                ty: param.ty,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ast::{Expr, Stmt};
    use crate::proto::parsing::parse;

    fn recognize(source: &str) -> Result<Vec<ProtocolDecl>, Diagnostic> {
        let items = parse(source).unwrap();
        Recognizer::new(source).recognize_file(items)
    }

    fn kind_of(source: &str) -> DiagnosticKind {
        recognize(source).unwrap_err().kind
    }

    const SHAPE: &str = "\
protocol *Shape:
  proc area*(self): number

  impl *Square:
    var:
      side*: number
    proc area(self): number = self.side * self.side
    proc newSquare*(side: number): Square =
      result = Square(side: side)
";

    #[test]
    fn test_recognize_shape() {
        let protocols = recognize(SHAPE).unwrap();
        let shape = &protocols[0];
        assert!(shape.exported);
        assert_eq!(shape.methods.len(), 1);
        assert!(shape.methods[0].exported);

        let square = &shape.impls[0];
        assert!(square.exported);
        assert_eq!(square.protocol, "Shape");
        assert_eq!(square.fields[0].name, "side");
        assert!(square.fields[0].exported);
        assert_eq!(square.overrides[0].name, "area");
        assert_eq!(
            square.overrides[0].body,
            vec![Stmt::Return(Some(Expr::binary(
                crate::proto::ast::BinOp::Mul,
                Expr::field(Expr::var("self"), "side"),
                Expr::field(Expr::var("self"), "side"),
            )))]
        );
        let ctor = square.constructor.as_ref().unwrap();
        assert_eq!(ctor.name, "newSquare");
        assert!(ctor.exported);
        assert_eq!(ctor.params[0].ty.as_deref(), Some("number"));
    }

    #[test]
    fn test_impl_sees_methods_declared_later() {
        let source = "\
protocol P:
  proc a(self)
  impl X:
    proc b(self) = 1
  proc b(self): number
";
        let protocols = recognize(source).unwrap();
        assert_eq!(protocols[0].methods.len(), 2);
        assert_eq!(protocols[0].impls[0].overrides[0].name, "b");
    }

    #[test]
    fn test_impl_before_methods() {
        assert_eq!(
            kind_of("protocol P:\n  impl X:\n    var a: number\n  proc a(self)\n"),
            DiagnosticKind::EmptyMethodSet
        );
    }

    #[test]
    fn test_invalid_commands() {
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\n  struct Q:\n    x: number\n"),
            DiagnosticKind::InvalidCommand
        );
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\n  impl X:\n    const y: number\n"),
            DiagnosticKind::InvalidCommand
        );
    }

    #[test]
    fn test_protocol_fields() {
        let protocols = recognize("protocol P:\n  var name: string\n  proc a(self)\n").unwrap();
        assert_eq!(protocols[0].fields[0].name, "name");
    }

    #[test]
    fn test_malformed_shapes() {
        // signature with a body
        assert_eq!(
            kind_of("protocol P:\n  proc a(self) = 1\n"),
            DiagnosticKind::MalformedDeclaration
        );
        // bare field
        assert_eq!(
            kind_of("protocol P:\n  x: number\n"),
            DiagnosticKind::MalformedDeclaration
        );
        // routine without a body in an impl
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\n  impl X:\n    proc a(self)\n"),
            DiagnosticKind::MalformedDeclaration
        );
        // top level that is not a protocol
        assert_eq!(
            kind_of("impl X:\n  var a: number\n"),
            DiagnosticKind::MalformedDeclaration
        );
    }

    #[test]
    fn test_marker_positions_are_not_interchangeable() {
        assert_eq!(
            kind_of("protocol Shape*:\n  proc a(self)\n"),
            DiagnosticKind::MalformedDeclaration
        );
        assert_eq!(
            kind_of("protocol Shape:\n  proc *a(self)\n"),
            DiagnosticKind::MalformedDeclaration
        );
    }

    #[test]
    fn test_routine_classification() {
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\n  impl X:\n    proc a(s: X) = 1\n"),
            DiagnosticKind::MissingSelfParameter
        );
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\n  impl X:\n    proc make(): Y = 1\n"),
            DiagnosticKind::ConstructorTypeMismatch
        );
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\n  impl X:\n    proc m1(): X = X()\n    proc m2(): X = X()\n"),
            DiagnosticKind::DuplicateConstructor
        );
    }

    #[test]
    fn test_constructor_is_known_by_its_return_type() {
        let source = "\
protocol P:
  proc a(self): number
  impl X:
    var n: number
    proc a(self): number = self.n
    proc make(n): X = X(n: n)
";
        let protocols = recognize(source).unwrap();
        let imp = &protocols[0].impls[0];
        assert_eq!(imp.overrides.len(), 1);
        let ctor = imp.constructor.as_ref().unwrap();
        assert_eq!(ctor.name, "make");
        assert!(ctor.params[0].is_untyped());

        // a protocol method returning the impl type is still an override
        let source = "protocol P:\n  proc a(self): P\n  impl X:\n    proc a(self): X = self\n";
        let imp = &recognize(source).unwrap()[0].impls[0];
        assert_eq!(imp.overrides[0].name, "a");
        assert!(imp.constructor.is_none());
    }

    #[test]
    fn test_duplicate_protocols() {
        assert_eq!(
            kind_of("protocol P:\n  proc a(self)\nprotocol P:\n  proc b(self)\n"),
            DiagnosticKind::DuplicateSymbol
        );
    }

    #[test]
    fn test_diagnostic_points_at_item() {
        let err = recognize("protocol P:\n  proc a(self)\n  struct Q:\n    x: number\n").unwrap_err();
        assert_eq!(err.range.start.line, 2);
    }
}
