//! Base record and dispatchers
//!
//! The base record carries one function-pointer slot per method, followed by
//! the protocol's own fields. Each method also gets a dispatcher under its
//! original name that checks the slot and forwards the call unchanged.

use crate::proto::ast::{Expr, Param, ProtocolDecl, Stmt};
use crate::proto::diagnostics::Diagnostic;
use crate::proto::symbols::{MethodEntry, SymbolTable};

use super::decl::{Decl, FieldType, FunctionDecl, FunctionRole, GeneratedModule, RecordDecl, RecordField};

/// Type written for parameters the author left untyped
pub const INFERRED_TYPE: &str = "auto";

pub fn emit_base(
    protocol: &ProtocolDecl,
    table: &SymbolTable,
    module: &mut GeneratedModule,
) -> Result<(), Diagnostic> {
    let slots = table.methods().iter().map(|entry| RecordField {
        name: entry.slot.clone(),
        exported: false,
        ty: slot_type(table, entry),
    });
    let fields = protocol.fields.iter().map(|field| RecordField {
        name: field.name.clone(),
        exported: field.exported,
        ty: FieldType::Value(field.ty.clone()),
    });

    let record = RecordDecl {
        name: table.base_type().to_string(),
        exported: protocol.exported,
        base: None,
        fields: slots.chain(fields).collect(),
    };
    module.push(Decl::Record(record), &protocol.range)?;

    for entry in table.methods() {
        let range = protocol
            .method(&entry.name)
            .map(|sig| sig.range.clone())
            .unwrap_or_else(|| protocol.range.clone());
        module.push(Decl::Function(dispatcher(table, entry)), &range)?;
    }
    Ok(())
}

/// `proc (self: Base, rest...): ret`
pub fn slot_type(table: &SymbolTable, entry: &MethodEntry) -> FieldType {
    let params = std::iter::once(table.base_type().to_string())
        .chain(entry.rest_params().iter().map(|param| {
            param
                .ty
                .clone()
                .unwrap_or_else(|| INFERRED_TYPE.to_string())
        }))
        .collect();
    FieldType::FnPtr {
        params,
        ret: entry.ret.clone(),
    }
}

/// The method's params with self typed as the base record
pub fn base_typed_params(table: &SymbolTable, params: &[Param]) -> Vec<Param> {
    params
        .iter()
        .enumerate()
        .map(|(index, param)| {
            let mut param = param.clone();
            if index == 0 {
                param.ty = Some(table.base_type().to_string());
            }
            param
        })
        .collect()
}

fn dispatcher(table: &SymbolTable, entry: &MethodEntry) -> FunctionDecl {
    let receiver = entry
        .params
        .first()
        .map(|param| param.name.clone())
        .unwrap_or_else(|| "self".to_string());

    let forward = Expr::CallSlot {
        receiver: Box::new(Expr::Var(receiver.clone())),
        slot: entry.slot.clone(),
        args: std::iter::once(Expr::Var(receiver.clone()))
            .chain(entry.rest_params().iter().map(|param| Expr::Var(param.name.clone())))
            .collect(),
    };
    let call = match entry.ret {
        Some(_) => Stmt::Return(Some(forward)),
        None => Stmt::Expr(forward),
    };

    FunctionDecl {
        name: entry.name.clone(),
        exported: entry.exported,
        params: base_typed_params(table, &entry.params),
        ret: entry.ret.clone(),
        body: vec![
            Stmt::EnsureWired {
                receiver,
                slot: entry.slot.clone(),
                method: entry.name.clone(),
            },
            call,
        ],
        role: FunctionRole::Dispatcher {
            method: entry.name.clone(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ast::{FieldDecl, MethodSig};
    use crate::proto::symbols::Mangler;

    fn lower(protocol: &ProtocolDecl) -> GeneratedModule {
        let table = SymbolTable::build(protocol, &Mangler::default()).unwrap();
        let mut module = GeneratedModule::new(protocol.name.as_str());
        emit_base(protocol, &table, &mut module).unwrap();
        module
    }

    #[test]
    fn test_slots_precede_protocol_fields() {
        let protocol = ProtocolDecl::new("Shape")
            .with_field(FieldDecl::new("label", "string"))
            .with_method(MethodSig::new("area").returning("number"))
            .with_method(MethodSig::new("scale").with_param("by", "number"));
        let module = lower(&protocol);
        let base = module.record("Shape").unwrap();
        let names: Vec<_> = base.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["area_impl", "scale_impl", "label"]);
        assert_eq!(
            base.fields[1].ty,
            FieldType::FnPtr {
                params: vec!["Shape".into(), "number".into()],
                ret: None,
            }
        );
    }

    #[test]
    fn test_dispatcher_forwards_through_slot() {
        let protocol = ProtocolDecl::new("Shape")
            .with_method(MethodSig::new("area").exported().returning("number"));
        let module = lower(&protocol);
        let area = module.function("area").unwrap();
        assert!(area.exported);
        assert_eq!(area.params[0].ty.as_deref(), Some("Shape"));
        assert_eq!(
            area.body,
            vec![
                Stmt::EnsureWired {
                    receiver: "self".into(),
                    slot: "area_impl".into(),
                    method: "area".into(),
                },
                Stmt::Return(Some(Expr::CallSlot {
                    receiver: Box::new(Expr::var("self")),
                    slot: "area_impl".into(),
                    args: vec![Expr::var("self")],
                })),
            ]
        );
    }

    #[test]
    fn test_dispatcher_without_result_is_a_statement() {
        let protocol = ProtocolDecl::new("Shape")
            .with_method(MethodSig::new("scale").with_param("by", "number"));
        let module = lower(&protocol);
        let scale = module.function("scale").unwrap();
        assert!(matches!(&scale.body[1], Stmt::Expr(Expr::CallSlot { args, .. }) if args.len() == 2));
    }
}
