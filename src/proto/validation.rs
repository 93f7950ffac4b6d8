//! Structural rules shared by recognition and lowering
//!
//! The checks are local and cheap, so they run inline wherever the node is
//! at hand instead of in a separate pass. Lowering re-runs them because a
//! host may build the grammar model without going through the recognizer.

use std::collections::{HashMap, HashSet};

use super::ast::{
    ConstructorDecl, FieldDecl, ImplDecl, MethodOverride, MethodSig, ProtocolDecl, Range,
};
use super::diagnostics::{Diagnostic, DiagnosticKind};
use super::symbols::{MethodEntry, SymbolTable};

/// A method signature must start with an untyped self parameter.
pub fn require_signature_self(sig: &MethodSig) -> Result<(), Diagnostic> {
    match sig.params.first() {
        None => Err(Diagnostic::new(
            DiagnosticKind::MissingSelfParameter,
            format!("method `{}` needs a self parameter as its first parameter", sig.name),
            sig.range.clone(),
        )),
        Some(first) if !first.is_untyped() => Err(Diagnostic::new(
            DiagnosticKind::MissingSelfParameter,
            format!(
                "the self parameter `{}` of method `{}` must not declare a type, it is filled in by the generator",
                first.name, sig.name
            ),
            first.range.clone(),
        )),
        Some(_) => Ok(()),
    }
}

/// An override must start with a self parameter (its type is filled in).
pub fn require_override_self(ov: &MethodOverride, impl_name: &str) -> Result<(), Diagnostic> {
    if ov.self_param().is_some() {
        return Ok(());
    }
    Err(Diagnostic::new(
        DiagnosticKind::MissingSelfParameter,
        format!(
            "override `{}` in impl `{}` needs an untyped self parameter first",
            ov.name, impl_name
        ),
        ov.range.clone(),
    ))
}

/// Impls need at least one method to override.
pub fn require_method_vocabulary(protocol: &ProtocolDecl) -> Result<(), Diagnostic> {
    match protocol.impls.first() {
        Some(imp) if protocol.methods.is_empty() => Err(empty_method_set(
            &imp.name,
            &protocol.name,
            imp.range.clone(),
        )),
        _ => Ok(()),
    }
}

pub fn empty_method_set(impl_name: &str, protocol: &str, range: Range) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::EmptyMethodSet,
        format!(
            "impl `{}` appears before any method of protocol `{}` is declared",
            impl_name, protocol
        ),
        range,
    )
}

pub fn invalid_command(keyword: &str, context: &str, allowed: &str, range: Range) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::InvalidCommand,
        format!(
            "`{}` is not valid inside {}; expected {}",
            keyword, context, allowed
        ),
        range,
    )
}

/// The override must name a method registered for the protocol.
pub fn require_known_target<'t>(
    table: &'t SymbolTable,
    ov: &MethodOverride,
    impl_name: &str,
) -> Result<&'t MethodEntry, Diagnostic> {
    table.lookup(&ov.name).ok_or_else(|| {
        let known: Vec<&str> = table.methods().iter().map(|m| m.name.as_str()).collect();
        Diagnostic::new(
            DiagnosticKind::UnknownOverrideTarget,
            format!(
                "impl `{}` overrides `{}`, which protocol `{}` does not declare (known methods: {})",
                impl_name,
                ov.name,
                table.protocol(),
                known.join(", ")
            ),
            ov.range.clone(),
        )
    })
}

/// Parameters after self and the return type must agree with the signature.
pub fn require_matching_signature(
    entry: &MethodEntry,
    ov: &MethodOverride,
    impl_name: &str,
) -> Result<(), Diagnostic> {
    let expected: Vec<Option<&str>> = entry.rest_params().iter().map(|p| p.ty.as_deref()).collect();
    let found: Vec<Option<&str>> = ov.params.iter().skip(1).map(|p| p.ty.as_deref()).collect();

    let mismatch = if expected.len() != found.len() {
        Some(format!(
            "takes {} parameter(s) after self, but the signature declares {}",
            found.len(),
            expected.len()
        ))
    } else if expected != found {
        Some("declares different parameter types than the signature".to_string())
    } else if entry.ret != ov.ret {
        Some(format!(
            "returns {}, but the signature returns {}",
            ov.ret.as_deref().unwrap_or("nothing"),
            entry.ret.as_deref().unwrap_or("nothing")
        ))
    } else {
        None
    };

    match mismatch {
        None => Ok(()),
        Some(detail) => Err(Diagnostic::new(
            DiagnosticKind::SignatureMismatch,
            format!("override `{}` in impl `{}` {}", ov.name, impl_name, detail),
            ov.range.clone(),
        )),
    }
}

/// Each method may be overridden once per impl.
pub fn require_unique_overrides(imp: &ImplDecl) -> Result<(), Diagnostic> {
    let mut seen = HashSet::new();
    for ov in &imp.overrides {
        if !seen.insert(ov.name.as_str()) {
            return Err(Diagnostic::new(
                DiagnosticKind::DuplicateSymbol,
                format!("impl `{}` overrides `{}` more than once", imp.name, ov.name),
                ov.range.clone(),
            ));
        }
    }
    Ok(())
}

/// Field names must be unique across dispatch slots, inherited fields and own fields.
pub fn require_unique_fields(
    table: &SymbolTable,
    inherited: &[FieldDecl],
    own: &[FieldDecl],
) -> Result<(), Diagnostic> {
    let mut seen: HashMap<&str, String> = table
        .slot_names()
        .map(|(slot, method)| (slot, format!("the dispatch slot of method `{}`", method)))
        .collect();

    for (field, origin) in inherited
        .iter()
        .map(|f| (f, "inherited field"))
        .chain(own.iter().map(|f| (f, "field")))
    {
        if let Some(previous) = seen.get(field.name.as_str()) {
            return Err(Diagnostic::new(
                DiagnosticKind::DuplicateFieldName,
                format!(
                    "{} `{}` collides with {}",
                    origin, field.name, previous
                ),
                field.range.clone(),
            ));
        }
        seen.insert(field.name.as_str(), format!("{} `{}`", origin, field.name));
    }
    Ok(())
}

/// A constructor returns its own impl type.
pub fn require_constructor_type(imp: &ImplDecl, ctor: &ConstructorDecl) -> Result<(), Diagnostic> {
    if ctor.ret == imp.name {
        return Ok(());
    }
    Err(constructor_type_mismatch(&ctor.name, &ctor.ret, &imp.name, ctor.range.clone()))
}

pub fn constructor_type_mismatch(name: &str, ret: &str, impl_name: &str, range: Range) -> Diagnostic {
    Diagnostic::new(
        DiagnosticKind::ConstructorTypeMismatch,
        format!(
            "`{}` has no self parameter, so it must be a constructor of `{}`, but it returns `{}`",
            name, impl_name, ret
        ),
        range,
    )
}

/// Strict mode: every protocol method needs an override in every impl.
pub fn require_total_coverage(table: &SymbolTable, imp: &ImplDecl) -> Result<(), Diagnostic> {
    let missing: Vec<&str> = table
        .methods()
        .iter()
        .filter(|entry| imp.override_for(&entry.name).is_none())
        .map(|entry| entry.name.as_str())
        .collect();
    if missing.is_empty() {
        return Ok(());
    }
    Err(Diagnostic::new(
        DiagnosticKind::IncompleteCoverage,
        format!(
            "impl `{}` does not override: {}",
            imp.name,
            missing.join(", ")
        ),
        imp.range.clone(),
    ))
}
