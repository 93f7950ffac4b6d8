//! Text rendering of generated modules
//!
//! Produces a stable Nim-flavoured listing. It is meant for reading and
//! snapshotting, not for feeding back into the front-end.

use std::fmt::Write;

use crate::proto::ast::{Expr, Param, Place, Stmt, UnaryOp};

use super::decl::{Decl, FieldType, FunctionDecl, GeneratedModule, RecordDecl};

const INDENT: &str = "  ";

pub fn render_module(module: &GeneratedModule) -> String {
    let mut out = String::new();
    for (index, decl) in module.decls.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        match decl {
            Decl::Record(record) => render_record(&mut out, record),
            Decl::Function(function) => render_function(&mut out, function),
        }
    }
    out
}

fn marker(exported: bool) -> &'static str {
    if exported {
        "*"
    } else {
        ""
    }
}

fn render_record(out: &mut String, record: &RecordDecl) {
    let _ = write!(out, "type {}{} = object", record.name, marker(record.exported));
    if let Some(base) = &record.base {
        let _ = write!(out, " of {}", base);
    }
    out.push('\n');
    for field in &record.fields {
        let ty = match &field.ty {
            FieldType::Value(ty) => ty.clone(),
            FieldType::FnPtr { params, ret } => {
                let mut sig = format!("proc ({})", params.join(", "));
                if let Some(ret) = ret {
                    let _ = write!(sig, ": {}", ret);
                }
                sig
            }
        };
        let _ = writeln!(out, "{}{}{}: {}", INDENT, field.name, marker(field.exported), ty);
    }
}

fn render_params(params: &[Param]) -> String {
    params
        .iter()
        .map(|param| match &param.ty {
            Some(ty) => format!("{}: {}", param.name, ty),
            None => param.name.clone(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render_function(out: &mut String, function: &FunctionDecl) {
    let _ = write!(
        out,
        "proc {}{}({})",
        function.name,
        marker(function.exported),
        render_params(&function.params)
    );
    if let Some(ret) = &function.ret {
        let _ = write!(out, ": {}", ret);
    }
    out.push_str(" =\n");
    render_block(out, &function.body, 1);
}

fn render_block(out: &mut String, body: &[Stmt], depth: usize) {
    if body.is_empty() {
        let _ = writeln!(out, "{}discard", INDENT.repeat(depth));
        return;
    }
    for stmt in body {
        render_stmt(out, stmt, depth);
    }
}

fn render_stmt(out: &mut String, stmt: &Stmt, depth: usize) {
    let pad = INDENT.repeat(depth);
    match stmt {
        Stmt::Let { name, ty, value } => {
            let _ = match ty {
                Some(ty) => writeln!(out, "{}var {}: {} = {}", pad, name, ty, render_expr(value)),
                None => writeln!(out, "{}var {} = {}", pad, name, render_expr(value)),
            };
        }
        Stmt::Assign { target, value } => {
            let target = match target {
                Place::Var(name) => name.clone(),
                Place::Field(base, name) => format!("{}.{}", render_operand(base), name),
            };
            let _ = writeln!(out, "{}{} = {}", pad, target, render_expr(value));
        }
        Stmt::Expr(expr) => {
            let _ = writeln!(out, "{}{}", pad, render_expr(expr));
        }
        Stmt::Return(None) => {
            let _ = writeln!(out, "{}return", pad);
        }
        Stmt::Return(Some(value)) => {
            let _ = writeln!(out, "{}return {}", pad, render_expr(value));
        }
        Stmt::If {
            branches,
            otherwise,
        } => {
            for (index, (cond, block)) in branches.iter().enumerate() {
                let keyword = if index == 0 { "if" } else { "elif" };
                let _ = writeln!(out, "{}{} {}:", pad, keyword, render_expr(cond));
                render_block(out, block, depth + 1);
            }
            if let Some(block) = otherwise {
                let _ = writeln!(out, "{}else:", pad);
                render_block(out, block, depth + 1);
            }
        }
        Stmt::Narrow {
            binding,
            target,
            checked,
        } => {
            let conversion = if *checked { "narrow" } else { "reinterpret" };
            let _ = writeln!(
                out,
                "{}let {} = {}[{}]({})",
                pad, binding, conversion, target, binding
            );
        }
        Stmt::EnsureWired { receiver, slot, .. } => {
            let _ = writeln!(out, "{}ensure_wired {}.{}", pad, receiver, slot);
        }
    }
}

fn render_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn render_args<'a>(args: impl IntoIterator<Item = &'a Expr>) -> String {
    args.into_iter()
        .map(render_expr)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render `expr` so it can be followed by `.field`
fn render_operand(expr: &Expr) -> String {
    match expr {
        Expr::Unary(..) | Expr::Binary(..) => format!("({})", render_expr(expr)),
        _ => render_expr(expr),
    }
}

pub fn render_expr(expr: &Expr) -> String {
    match expr {
        Expr::Nil => "nil".to_string(),
        Expr::Bool(value) => value.to_string(),
        Expr::Number(value) => render_number(*value),
        Expr::Str(value) => format!("{:?}", value),
        Expr::Var(name) | Expr::FnRef(name) => name.clone(),
        Expr::Field(base, name) => format!("{}.{}", render_operand(base), name),
        Expr::Call { callee, args } => format!("{}({})", callee, render_args(args)),
        Expr::Construct { ty, fields } => {
            let fields = fields
                .iter()
                .map(|(name, value)| format!("{}: {}", name, render_expr(value)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{}({})", ty, fields)
        }
        Expr::Unary(op, operand) => {
            let operand = render_operand(operand);
            match op {
                UnaryOp::Neg => format!("-{}", operand),
                UnaryOp::Not => format!("not {}", operand),
            }
        }
        Expr::Binary(op, lhs, rhs) => {
            let side = |child: &Expr, right: bool| match child {
                Expr::Binary(inner, ..)
                    if inner.precedence() < op.precedence()
                        || (right && inner.precedence() == op.precedence()) =>
                {
                    format!("({})", render_expr(child))
                }
                _ => render_expr(child),
            };
            format!("{} {} {}", side(lhs, false), op, side(rhs, true))
        }
        Expr::CallSlot {
            receiver,
            slot,
            args,
        } => format!("{}.{}({})", render_operand(receiver), slot, render_args(args)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::ast::BinOp;

    #[test]
    fn test_numbers_drop_integral_fraction() {
        assert_eq!(render_expr(&Expr::Number(16.0)), "16");
        assert_eq!(render_expr(&Expr::Number(2.5)), "2.5");
    }

    #[test]
    fn test_parentheses_follow_precedence() {
        let sum = Expr::binary(BinOp::Add, Expr::var("a"), Expr::var("b"));
        let product = Expr::binary(BinOp::Mul, sum.clone(), Expr::var("c"));
        assert_eq!(render_expr(&product), "(a + b) * c");

        let nested = Expr::binary(BinOp::Sub, Expr::var("a"), sum);
        assert_eq!(render_expr(&nested), "a - (a + b)");

        let left = Expr::binary(
            BinOp::Sub,
            Expr::binary(BinOp::Sub, Expr::var("a"), Expr::var("b")),
            Expr::var("c"),
        );
        assert_eq!(render_expr(&left), "a - b - c");
    }

    #[test]
    fn test_strings_are_quoted() {
        assert_eq!(render_expr(&Expr::Str("a\"b".into())), "\"a\\\"b\"");
    }
}
