//! Generated declarations
//!
//! The output of lowering one protocol: plain records (some fields of which
//! are function-pointer slots) and free functions. Hosts consume these either
//! structurally, as JSON, or as rendered text.

use serde::{Deserialize, Serialize};

use crate::proto::ast::{Param, Range, Stmt};
use crate::proto::diagnostics::{Diagnostic, DiagnosticKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedModule {
    /// Name of the protocol this module was lowered from
    pub protocol: String,
    pub decls: Vec<Decl>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    Record(RecordDecl),
    Function(FunctionDecl),
}

impl Decl {
    pub fn name(&self) -> &str {
        match self {
            Decl::Record(record) => &record.name,
            Decl::Function(function) => &function.name,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDecl {
    pub name: String,
    pub exported: bool,
    /// Record whose fields come first in this record's layout
    pub base: Option<String>,
    pub fields: Vec<RecordField>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordField {
    pub name: String,
    pub exported: bool,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Value(String),
    /// A dispatch slot: pointer to a function with this signature
    FnPtr {
        params: Vec<String>,
        ret: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    pub exported: bool,
    pub params: Vec<Param>,
    pub ret: Option<String>,
    pub body: Vec<Stmt>,
    pub role: FunctionRole,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum FunctionRole {
    /// Public entry point forwarding through a slot
    Dispatcher { method: String },
    /// Renamed override wired into a slot by its impl's constructor
    Override { method: String, impl_name: String },
    Constructor { impl_name: String },
}

impl GeneratedModule {
    pub fn new(protocol: impl Into<String>) -> Self {
        Self {
            protocol: protocol.into(),
            decls: Vec::new(),
        }
    }

    /// Append a declaration. Records and functions are separate namespaces;
    /// a name may appear once in each.
    pub fn push(&mut self, decl: Decl, range: &Range) -> Result<(), Diagnostic> {
        let clash = match &decl {
            Decl::Record(record) => self.record(&record.name).is_some(),
            Decl::Function(function) => self.function(&function.name).is_some(),
        };
        if clash {
            let what = match decl {
                Decl::Record(_) => "type",
                Decl::Function(_) => "function",
            };
            return Err(Diagnostic::new(
                DiagnosticKind::DuplicateSymbol,
                format!(
                    "protocol `{}` would emit {} `{}` twice",
                    self.protocol,
                    what,
                    decl.name()
                ),
                range.clone(),
            ));
        }
        tracing::trace!(protocol = %self.protocol, decl = decl.name(), "emitted declaration");
        self.decls.push(decl);
        Ok(())
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDecl> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Record(record) => Some(record),
            Decl::Function(_) => None,
        })
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.decls.iter().filter_map(|decl| match decl {
            Decl::Function(function) => Some(function),
            Decl::Record(_) => None,
        })
    }

    pub fn record(&self, name: &str) -> Option<&RecordDecl> {
        self.records().find(|record| record.name == name)
    }

    pub fn function(&self, name: &str) -> Option<&FunctionDecl> {
        self.functions().find(|function| function.name == name)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Nim-flavoured text form of the module
    pub fn render(&self) -> String {
        super::render::render_module(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str) -> Decl {
        Decl::Record(RecordDecl {
            name: name.to_string(),
            exported: false,
            base: None,
            fields: Vec::new(),
        })
    }

    fn function(name: &str) -> Decl {
        Decl::Function(FunctionDecl {
            name: name.to_string(),
            exported: false,
            params: Vec::new(),
            ret: None,
            body: Vec::new(),
            role: FunctionRole::Constructor {
                impl_name: "X".to_string(),
            },
        })
    }

    #[test]
    fn test_namespaces_are_separate() {
        let mut module = GeneratedModule::new("P");
        module.push(record("X"), &Range::default()).unwrap();
        module.push(function("X"), &Range::default()).unwrap();
        let err = module.push(record("X"), &Range::default()).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::DuplicateSymbol);
        assert!(err.message.contains("type `X`"));
    }

    #[test]
    fn test_json_round_trip() {
        let mut module = GeneratedModule::new("P");
        module.push(record("P"), &Range::default()).unwrap();
        module.push(function("make"), &Range::default()).unwrap();
        let json = module.to_json().unwrap();
        assert!(json.contains("\"kind\": \"record\""));
        assert_eq!(GeneratedModule::from_json(&json).unwrap(), module);
    }
}
