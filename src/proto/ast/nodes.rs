//! Declaration nodes: protocols, method signatures, impls and their members
//!
//! Builders (`new`, `with_*`, `at`) let hosts assemble a declaration without
//! going through the text front-end.

use super::body::Stmt;
use super::range::Range;
use serde::{Deserialize, Serialize};

/// A routine parameter. The self parameter is the first one and carries no type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
    pub range: Range,
}

impl Param {
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            range: Range::default(),
        }
    }

    pub fn typed(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty.into()),
            range: Range::default(),
        }
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn is_untyped(&self) -> bool {
        self.ty.is_none()
    }
}

/// Returns the self parameter when the list starts with an untyped one.
pub fn self_param(params: &[Param]) -> Option<&Param> {
    params.first().filter(|param| param.is_untyped())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolDecl {
    pub name: String,
    pub exported: bool,
    /// Fields every impl inherits through the base type
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodSig>,
    pub impls: Vec<ImplDecl>,
    pub range: Range,
}

impl ProtocolDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exported: false,
            fields: Vec::new(),
            methods: Vec::new(),
            impls: Vec::new(),
            range: Range::default(),
        }
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_method(mut self, method: MethodSig) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds an impl, pointing its protocol reference at this protocol.
    pub fn with_impl(mut self, mut imp: ImplDecl) -> Self {
        imp.protocol = self.name.clone();
        self.impls.push(imp);
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn method(&self, name: &str) -> Option<&MethodSig> {
        self.methods.iter().find(|method| method.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodSig {
    pub name: String,
    pub exported: bool,
    pub params: Vec<Param>,
    pub ret: Option<String>,
    pub range: Range,
}

impl MethodSig {
    /// A signature whose only parameter is an untyped `self`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exported: false,
            params: vec![Param::untyped("self")],
            ret: None,
            range: Range::default(),
        }
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(Param::typed(name, ty));
        self
    }

    pub fn returning(mut self, ty: impl Into<String>) -> Self {
        self.ret = Some(ty.into());
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn self_param(&self) -> Option<&Param> {
        self_param(&self.params)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImplDecl {
    pub name: String,
    pub exported: bool,
    /// Name of the owning protocol (lookup only)
    pub protocol: String,
    pub fields: Vec<FieldDecl>,
    pub overrides: Vec<MethodOverride>,
    pub constructor: Option<ConstructorDecl>,
    pub range: Range,
}

impl ImplDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exported: false,
            protocol: String::new(),
            fields: Vec::new(),
            overrides: Vec::new(),
            constructor: None,
            range: Range::default(),
        }
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn with_field(mut self, field: FieldDecl) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_override(mut self, method: MethodOverride) -> Self {
        self.overrides.push(method);
        self
    }

    pub fn with_constructor(mut self, ctor: ConstructorDecl) -> Self {
        self.constructor = Some(ctor);
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn override_for(&self, method: &str) -> Option<&MethodOverride> {
        self.overrides.iter().find(|ov| ov.name == method)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub exported: bool,
    pub ty: String,
    pub range: Range,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            exported: false,
            ty: ty.into(),
            range: Range::default(),
        }
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodOverride {
    /// Name of the overridden method signature
    pub name: String,
    pub params: Vec<Param>,
    pub ret: Option<String>,
    pub body: Vec<Stmt>,
    pub range: Range,
}

impl MethodOverride {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            params: vec![Param::untyped("self")],
            ret: None,
            body,
            range: Range::default(),
        }
    }

    pub fn with_params(mut self, params: Vec<Param>) -> Self {
        self.params = params;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(Param::typed(name, ty));
        self
    }

    pub fn returning(mut self, ty: impl Into<String>) -> Self {
        self.ret = Some(ty.into());
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }

    pub fn self_param(&self) -> Option<&Param> {
        self_param(&self.params)
    }
}

/// A free function returning the impl type; its body is rewritten to wire slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorDecl {
    pub name: String,
    pub exported: bool,
    pub params: Vec<Param>,
    pub ret: String,
    pub body: Vec<Stmt>,
    pub range: Range,
}

impl ConstructorDecl {
    pub fn new(name: impl Into<String>, ret: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            exported: false,
            params: Vec::new(),
            ret: ret.into(),
            body,
            range: Range::default(),
        }
    }

    pub fn exported(mut self) -> Self {
        self.exported = true;
        self
    }

    pub fn with_param(mut self, name: impl Into<String>, ty: impl Into<String>) -> Self {
        self.params.push(Param::typed(name, ty));
        self
    }

    pub fn at(mut self, range: Range) -> Self {
        self.range = range;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ast::Expr;

    #[test]
    fn test_method_sig_defaults_to_untyped_self() {
        let sig = MethodSig::new("area").returning("number");
        assert_eq!(sig.self_param().map(|p| p.name.as_str()), Some("self"));
        assert_eq!(sig.ret.as_deref(), Some("number"));
    }

    #[test]
    fn test_typed_first_param_is_not_self() {
        let sig = MethodSig::new("area").with_params(vec![Param::typed("s", "Shape")]);
        assert!(sig.self_param().is_none());
    }

    #[test]
    fn test_with_impl_sets_owner() {
        let proto = ProtocolDecl::new("Shape")
            .with_method(MethodSig::new("area"))
            .with_impl(ImplDecl::new("Square"));
        assert_eq!(proto.impls[0].protocol, "Shape");
    }

    #[test]
    fn test_override_lookup() {
        let imp = ImplDecl::new("Square").with_override(MethodOverride::new(
            "area",
            vec![Stmt::Return(Some(Expr::Number(1.0)))],
        ));
        assert!(imp.override_for("area").is_some());
        assert!(imp.override_for("perimeter").is_none());
    }
}
