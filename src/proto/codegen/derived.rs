//! Impl lowering: derived record, renamed overrides, rewritten constructor

use crate::proto::ast::{ConstructorDecl, Expr, ImplDecl, MethodOverride, Place, ProtocolDecl, Stmt};
use crate::proto::config::{Coverage, LoweringConfig, Narrowing};
use crate::proto::diagnostics::Diagnostic;
use crate::proto::symbols::{Mangler, SymbolTable};
use crate::proto::validation;

use super::base::base_typed_params;
use super::decl::{Decl, FieldType, FunctionDecl, FunctionRole, GeneratedModule, RecordDecl, RecordField};

/// Binding that holds the value under construction
pub const RESULT: &str = "result";

pub struct ImplLowering<'a> {
    pub table: &'a SymbolTable,
    pub mangler: &'a Mangler,
    pub lowering: &'a LoweringConfig,
}

impl ImplLowering<'_> {
    pub fn emit_impl(
        &self,
        protocol: &ProtocolDecl,
        imp: &ImplDecl,
        module: &mut GeneratedModule,
    ) -> Result<(), Diagnostic> {
        tracing::debug!(
            protocol = %protocol.name,
            impl_name = %imp.name,
            overrides = imp.overrides.len(),
            fields = imp.fields.len(),
            constructor = imp.constructor.is_some(),
            "lowering impl"
        );

        validation::require_unique_overrides(imp)?;
        validation::require_unique_fields(self.table, &protocol.fields, &imp.fields)?;
        for ov in &imp.overrides {
            validation::require_override_self(ov, &imp.name)?;
            let entry = validation::require_known_target(self.table, ov, &imp.name)?;
            validation::require_matching_signature(entry, ov, &imp.name)?;
        }
        if self.lowering.coverage == Coverage::Strict {
            validation::require_total_coverage(self.table, imp)?;
        }
        if let Some(ctor) = &imp.constructor {
            validation::require_constructor_type(imp, ctor)?;
        }

        let record = RecordDecl {
            name: imp.name.clone(),
            exported: imp.exported,
            base: Some(self.table.base_type().to_string()),
            fields: imp
                .fields
                .iter()
                .map(|field| RecordField {
                    name: field.name.clone(),
                    exported: field.exported,
                    ty: FieldType::Value(field.ty.clone()),
                })
                .collect(),
        };
        module.push(Decl::Record(record), &imp.range)?;

        for ov in &imp.overrides {
            module.push(Decl::Function(self.override_fn(imp, ov)), &ov.range)?;
        }
        if let Some(ctor) = &imp.constructor {
            module.push(Decl::Function(self.constructor_fn(imp, ctor)), &ctor.range)?;
        }
        Ok(())
    }

    fn override_fn(&self, imp: &ImplDecl, ov: &MethodOverride) -> FunctionDecl {
        let binding = ov
            .self_param()
            .map(|param| param.name.clone())
            .unwrap_or_else(|| "self".to_string());
        let narrow = Stmt::Narrow {
            binding,
            target: imp.name.clone(),
            checked: self.lowering.narrowing == Narrowing::Checked,
        };

        FunctionDecl {
            name: self.mangler.override_name(&ov.name, &imp.name),
            exported: false,
            params: base_typed_params(self.table, &ov.params),
            ret: ov.ret.clone(),
            body: std::iter::once(narrow).chain(ov.body.iter().cloned()).collect(),
            role: FunctionRole::Override {
                method: ov.name.clone(),
                impl_name: imp.name.clone(),
            },
        }
    }

    /// `result.<slot> = <override>` for every method this impl overrides,
    /// in method declaration order. Other slots stay nil.
    pub fn wiring(&self, imp: &ImplDecl) -> Vec<Stmt> {
        self.table
            .methods()
            .iter()
            .filter(|entry| imp.override_for(&entry.name).is_some())
            .map(|entry| Stmt::Assign {
                target: Place::Field(Box::new(Expr::var(RESULT)), entry.slot.clone()),
                value: Expr::FnRef(self.mangler.override_name(&entry.name, &imp.name)),
            })
            .collect()
    }

    fn constructor_fn(&self, imp: &ImplDecl, ctor: &ConstructorDecl) -> FunctionDecl {
        let wiring = self.wiring(imp);

        let mut body = vec![Stmt::Let {
            name: RESULT.to_string(),
            ty: Some(imp.name.clone()),
            value: Expr::Nil,
        }];
        body.extend(rewrite_returns(&ctor.body, &wiring));
        body.extend(wiring.iter().cloned());
        body.push(Stmt::Return(Some(Expr::var(RESULT))));

        FunctionDecl {
            name: ctor.name.clone(),
            exported: ctor.exported,
            params: ctor.params.clone(),
            ret: Some(imp.name.clone()),
            body,
            role: FunctionRole::Constructor {
                impl_name: imp.name.clone(),
            },
        }
    }
}

/// Every exit of a constructor goes through the wiring block.
fn rewrite_returns(body: &[Stmt], wiring: &[Stmt]) -> Vec<Stmt> {
    let mut out = Vec::with_capacity(body.len());
    for stmt in body {
        match stmt {
            Stmt::Return(value) => {
                if let Some(value) = value {
                    out.push(Stmt::Assign {
                        target: Place::Var(RESULT.to_string()),
                        value: value.clone(),
                    });
                }
                out.extend(wiring.iter().cloned());
                out.push(Stmt::Return(Some(Expr::var(RESULT))));
            }
            Stmt::If {
                branches,
                otherwise,
            } => out.push(Stmt::If {
                branches: branches
                    .iter()
                    .map(|(cond, block)| (cond.clone(), rewrite_returns(block, wiring)))
                    .collect(),
                otherwise: otherwise
                    .as_ref()
                    .map(|block| rewrite_returns(block, wiring)),
            }),
            other => out.push(other.clone()),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ast::{BinOp, FieldDecl, MethodSig};
    use crate::proto::config::GeneratorConfig;
    use crate::proto::diagnostics::DiagnosticKind;

    fn shape() -> ProtocolDecl {
        ProtocolDecl::new("Shape")
            .with_method(MethodSig::new("area").returning("number"))
            .with_method(MethodSig::new("name").returning("string"))
    }

    fn square() -> ImplDecl {
        ImplDecl::new("Square")
            .with_field(FieldDecl::new("side", "number"))
            .with_override(
                MethodOverride::new(
                    "area",
                    vec![Stmt::Return(Some(Expr::binary(
                        BinOp::Mul,
                        Expr::field(Expr::var("self"), "side"),
                        Expr::field(Expr::var("self"), "side"),
                    )))],
                )
                .returning("number"),
            )
            .with_constructor(
                ConstructorDecl::new(
                    "newSquare",
                    "Square",
                    vec![Stmt::Return(Some(Expr::Construct {
                        ty: "Square".into(),
                        fields: vec![("side".into(), Expr::var("side"))],
                    }))],
                )
                .with_param("side", "number"),
            )
    }

    fn lower(
        protocol: &ProtocolDecl,
        imp: &ImplDecl,
        config: &GeneratorConfig,
    ) -> Result<GeneratedModule, Diagnostic> {
        let mangler = config.mangler();
        let table = SymbolTable::build(protocol, &mangler).unwrap();
        let lowering = ImplLowering {
            table: &table,
            mangler: &mangler,
            lowering: &config.lowering,
        };
        let mut module = GeneratedModule::new(protocol.name.as_str());
        lowering.emit_impl(protocol, imp, &mut module)?;
        Ok(module)
    }

    #[test]
    fn test_override_is_renamed_and_narrowed() {
        let module = lower(&shape(), &square(), &GeneratorConfig::default()).unwrap();
        let area = module.function("area_Square").unwrap();
        assert_eq!(area.params[0].ty.as_deref(), Some("Shape"));
        assert_eq!(
            area.body[0],
            Stmt::Narrow {
                binding: "self".into(),
                target: "Square".into(),
                checked: true,
            }
        );
        assert_eq!(area.body.len(), 2);
    }

    #[test]
    fn test_constructor_wires_only_overridden_methods() {
        let module = lower(&shape(), &square(), &GeneratorConfig::default()).unwrap();
        let ctor = module.function("newSquare").unwrap();
        let wired: Vec<_> = ctor
            .body
            .iter()
            .filter_map(|stmt| match stmt {
                Stmt::Assign {
                    target: Place::Field(_, slot),
                    value: Expr::FnRef(target),
                } => Some((slot.as_str(), target.as_str())),
                _ => None,
            })
            .collect();
        // once for the rewritten return; the trailing block is unreachable
        assert_eq!(wired, vec![("area_impl", "area_Square"), ("area_impl", "area_Square")]);
        assert_eq!(ctor.body.last(), Some(&Stmt::Return(Some(Expr::var("result")))));
        assert!(matches!(&ctor.body[0], Stmt::Let { name, .. } if name == "result"));
    }

    #[test]
    fn test_returns_inside_branches_are_rewritten() {
        let wiring = vec![Stmt::Expr(Expr::var("wire"))];
        let body = vec![Stmt::If {
            branches: vec![(Expr::Bool(true), vec![Stmt::Return(Some(Expr::Number(1.0)))])],
            otherwise: Some(vec![Stmt::Return(None)]),
        }];
        let Stmt::If {
            branches,
            otherwise,
        } = &rewrite_returns(&body, &wiring)[0]
        else {
            panic!("expected if");
        };
        assert_eq!(branches[0].1.len(), 3);
        assert_eq!(otherwise.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_strict_coverage() {
        let config = GeneratorConfig::default().strict();
        let err = lower(&shape(), &square(), &config).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::IncompleteCoverage);
        assert!(err.message.contains("name"));
    }

    #[test]
    fn test_reinterpret_narrowing() {
        let mut config = GeneratorConfig::default();
        config.lowering.narrowing = Narrowing::Reinterpret;
        let module = lower(&shape(), &square(), &config).unwrap();
        assert!(matches!(
            module.function("area_Square").unwrap().body[0],
            Stmt::Narrow { checked: false, .. }
        ));
    }

    #[test]
    fn test_constructor_type_checked() {
        let mut imp = square();
        if let Some(ctor) = imp.constructor.as_mut() {
            ctor.ret = "Circle".into();
        }
        let err = lower(&shape(), &imp, &GeneratorConfig::default()).unwrap_err();
        assert_eq!(err.kind, DiagnosticKind::ConstructorTypeMismatch);
    }
}
