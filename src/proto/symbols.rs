//! Per-protocol symbol table and name mangling
//!
//! A `SymbolTable` is built once for one protocol and read by every impl
//! lowering of that protocol. Nothing here is shared between protocols, so
//! independent protocols can be lowered on different threads.

use std::collections::HashMap;

use super::ast::{MethodSig, Param, ProtocolDecl};
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::validation;

/// Deterministic renaming of slots and override functions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mangler {
    slot_suffix: String,
}

impl Mangler {
    pub fn new(slot_suffix: impl Into<String>) -> Self {
        Self {
            slot_suffix: slot_suffix.into(),
        }
    }

    /// Function-pointer field holding `method` (`update` → `update_impl`)
    pub fn slot_name(&self, method: &str) -> String {
        format!("{}{}", method, self.slot_suffix)
    }

    /// Renamed override of `method` inside `impl_name` (`area`, `Square` → `area_Square`)
    ///
    /// Underscores inside either part are written as `_0`. Identifiers never
    /// start with a digit, so a lone `_` always marks the join and distinct
    /// (method, impl) pairs never share a name (`a_b` in `C` → `a_0b_C`,
    /// `a` in `b_C` → `a_b_0C`).
    pub fn override_name(&self, method: &str, impl_name: &str) -> String {
        format!("{}_{}", escape_part(method), escape_part(impl_name))
    }
}

fn escape_part(part: &str) -> String {
    part.replace('_', "_0")
}

impl Default for Mangler {
    fn default() -> Self {
        Self::new("_impl")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub name: String,
    pub exported: bool,
    pub slot: String,
    pub params: Vec<Param>,
    pub ret: Option<String>,
}

impl MethodEntry {
    /// Parameters after self
    pub fn rest_params(&self) -> &[Param] {
        self.params.get(1..).unwrap_or(&[])
    }
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    protocol: String,
    base_type: String,
    methods: Vec<MethodEntry>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    /// Register every method signature of `protocol`, in declaration order.
    ///
    /// Fails when a signature lacks its self parameter or when two methods
    /// would share a slot.
    pub fn build(protocol: &ProtocolDecl, mangler: &Mangler) -> Result<Self, Diagnostic> {
        let mut table = Self {
            protocol: protocol.name.clone(),
            base_type: protocol.name.clone(),
            methods: Vec::with_capacity(protocol.methods.len()),
            by_name: HashMap::new(),
        };
        let mut slots: HashMap<String, &MethodSig> = HashMap::new();

        for sig in &protocol.methods {
            validation::require_signature_self(sig)?;

            let slot = mangler.slot_name(&sig.name);
            if let Some(previous) = slots.get(&slot) {
                let message = if previous.name == sig.name {
                    format!(
                        "method `{}` is declared more than once in protocol `{}`",
                        sig.name, protocol.name
                    )
                } else {
                    format!(
                        "methods `{}` and `{}` both mangle to slot `{}`",
                        previous.name, sig.name, slot
                    )
                };
                return Err(Diagnostic::new(
                    DiagnosticKind::ManglingCollision,
                    message,
                    sig.range.clone(),
                ));
            }
            slots.insert(slot.clone(), sig);

            table.by_name.insert(sig.name.clone(), table.methods.len());
            table.methods.push(MethodEntry {
                name: sig.name.clone(),
                exported: sig.exported,
                slot,
                params: sig.params.clone(),
                ret: sig.ret.clone(),
            });
        }

        tracing::trace!(
            protocol = %table.protocol,
            methods = table.methods.len(),
            "built symbol table"
        );
        Ok(table)
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn base_type(&self) -> &str {
        &self.base_type
    }

    pub fn methods(&self) -> &[MethodEntry] {
        &self.methods
    }

    pub fn lookup(&self, method: &str) -> Option<&MethodEntry> {
        self.by_name.get(method).map(|&index| &self.methods[index])
    }

    /// Slot name → method name, for field collision checks
    pub fn slot_names(&self) -> impl Iterator<Item = (&str, &str)> {
        self.methods
            .iter()
            .map(|entry| (entry.slot.as_str(), entry.name.as_str()))
    }
}
