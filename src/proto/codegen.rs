//! Code generation: lowering a protocol into records and functions
//!
//! Lowering one protocol emits, in order:
//! - the base record (one slot per method, then the protocol's fields)
//! - one dispatcher per method
//! - for each impl: its derived record, its renamed overrides and its
//!   rewritten constructor
//!
//! The first diagnostic aborts the protocol and nothing emitted for it is
//! returned.

pub mod base;
pub mod decl;
pub mod derived;
pub mod render;

pub use decl::{Decl, FieldType, FunctionDecl, FunctionRole, GeneratedModule, RecordDecl, RecordField};

use std::collections::HashMap;

use super::ast::ProtocolDecl;
use super::config::GeneratorConfig;
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::symbols::SymbolTable;
use super::validation;
use derived::ImplLowering;

pub fn lower_protocol(
    protocol: &ProtocolDecl,
    config: &GeneratorConfig,
) -> Result<GeneratedModule, Diagnostic> {
    validation::require_method_vocabulary(protocol)?;
    require_distinct_type_names(protocol)?;

    let mangler = config.mangler();
    let table = SymbolTable::build(protocol, &mangler)?;
    validation::require_unique_fields(&table, &[], &protocol.fields)?;

    tracing::debug!(
        protocol = %protocol.name,
        methods = table.methods().len(),
        impls = protocol.impls.len(),
        "lowering protocol"
    );

    let mut module = GeneratedModule::new(protocol.name.as_str());
    base::emit_base(protocol, &table, &mut module)?;

    let lowering = ImplLowering {
        table: &table,
        mangler: &mangler,
        lowering: &config.lowering,
    };
    for imp in &protocol.impls {
        lowering.emit_impl(protocol, imp, &mut module)?;
    }
    Ok(module)
}

/// Impl names may not repeat or reuse the protocol's name.
fn require_distinct_type_names(protocol: &ProtocolDecl) -> Result<(), Diagnostic> {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    seen.insert(protocol.name.as_str(), "the protocol");
    for imp in &protocol.impls {
        if let Some(owner) = seen.get(imp.name.as_str()) {
            return Err(Diagnostic::new(
                DiagnosticKind::DuplicateSymbol,
                format!("impl `{}` reuses the name of {}", imp.name, owner),
                imp.range.clone(),
            ));
        }
        seen.insert(imp.name.as_str(), "another impl");
    }
    Ok(())
}
