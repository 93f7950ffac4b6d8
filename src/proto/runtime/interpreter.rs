//! Tree-walking interpreter over generated modules

use std::collections::HashMap;

use crate::proto::ast::{BinOp, Expr, Place, Stmt, UnaryOp};
use crate::proto::codegen::{FieldType, FunctionDecl, GeneratedModule, RecordDecl};
use crate::proto::config::RuntimeConfig;

use super::error::RuntimeError;
use super::value::{RecordValue, Value};

type Env = HashMap<String, Value>;

/// How a statement left its block
enum Flow {
    Next,
    Return(Value),
}

pub struct Interpreter {
    records: HashMap<String, RecordDecl>,
    functions: HashMap<String, FunctionDecl>,
    max_call_depth: usize,
}

impl Interpreter {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            records: HashMap::new(),
            functions: HashMap::new(),
            max_call_depth: config.max_call_depth,
        }
    }

    /// Make a module's records and functions available. Names must not repeat
    /// across loaded modules.
    pub fn load(&mut self, module: &GeneratedModule) -> Result<(), RuntimeError> {
        for record in module.records() {
            if self.records.contains_key(&record.name) {
                return Err(RuntimeError::DuplicateDefinition(record.name.clone()));
            }
            self.records.insert(record.name.clone(), record.clone());
        }
        for function in module.functions() {
            if self.functions.contains_key(&function.name) {
                return Err(RuntimeError::DuplicateDefinition(function.name.clone()));
            }
            self.functions.insert(function.name.clone(), function.clone());
        }
        tracing::debug!(
            protocol = %module.protocol,
            records = self.records.len(),
            functions = self.functions.len(),
            "loaded module"
        );
        Ok(())
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> Result<Value, RuntimeError> {
        self.invoke(name, args, 0)
    }

    /// A record of `type_name` with every field at its default
    pub fn instantiate(&self, type_name: &str) -> Result<Value, RuntimeError> {
        Ok(Value::record(RecordValue {
            type_name: type_name.to_string(),
            fields: self.layout(type_name)?,
        }))
    }

    /// A record with the given fields set and the rest defaulted
    pub fn construct(
        &self,
        type_name: &str,
        fields: Vec<(String, Value)>,
    ) -> Result<Value, RuntimeError> {
        let mut record = RecordValue {
            type_name: type_name.to_string(),
            fields: self.layout(type_name)?,
        };
        for (name, value) in fields {
            record.set(&name, value)?;
        }
        Ok(Value::record(record))
    }

    /// Base chain fields first, then the record's own
    fn layout(&self, type_name: &str) -> Result<Vec<(String, Value)>, RuntimeError> {
        let mut chain = Vec::new();
        let mut current = Some(type_name);
        while let Some(name) = current {
            let record = self
                .records
                .get(name)
                .ok_or_else(|| RuntimeError::UnknownType(name.to_string()))?;
            if chain.len() > self.records.len() {
                // cyclic base chain
                return Err(RuntimeError::UnknownType(type_name.to_string()));
            }
            chain.push(record);
            current = record.base.as_deref();
        }
        Ok(chain
            .iter()
            .rev()
            .flat_map(|record| record.fields.iter())
            .map(|field| (field.name.clone(), default_value(&field.ty)))
            .collect())
    }

    /// Whether `type_name` is `target` or derives from it
    fn is_a(&self, type_name: &str, target: &str) -> bool {
        let mut current = Some(type_name);
        let mut steps = 0;
        while let Some(name) = current {
            if name == target {
                return true;
            }
            steps += 1;
            if steps > self.records.len() {
                return false;
            }
            current = self.records.get(name).and_then(|record| record.base.as_deref());
        }
        false
    }

    fn invoke(&self, name: &str, args: Vec<Value>, depth: usize) -> Result<Value, RuntimeError> {
        if let Some(function) = self.functions.get(name) {
            return self.call_function(function, args, depth);
        }
        if self.records.contains_key(name) {
            if !args.is_empty() {
                return Err(RuntimeError::ArityMismatch {
                    function: name.to_string(),
                    expected: 0,
                    found: args.len(),
                });
            }
            return self.instantiate(name);
        }
        Err(RuntimeError::UnknownFunction(name.to_string()))
    }

    fn call_function(
        &self,
        function: &FunctionDecl,
        args: Vec<Value>,
        depth: usize,
    ) -> Result<Value, RuntimeError> {
        if depth >= self.max_call_depth {
            return Err(RuntimeError::CallDepthExceeded {
                limit: self.max_call_depth,
            });
        }
        if args.len() != function.params.len() {
            return Err(RuntimeError::ArityMismatch {
                function: function.name.clone(),
                expected: function.params.len(),
                found: args.len(),
            });
        }
        tracing::trace!(function = %function.name, depth, "call");

        let mut env: Env = function
            .params
            .iter()
            .map(|param| param.name.clone())
            .zip(args)
            .collect();
        match self.exec_block(&function.body, &mut env, depth)? {
            Flow::Return(value) => Ok(value),
            Flow::Next => Ok(Value::Nil),
        }
    }

    fn exec_block(&self, body: &[Stmt], env: &mut Env, depth: usize) -> Result<Flow, RuntimeError> {
        for stmt in body {
            if let Flow::Return(value) = self.exec(stmt, env, depth)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Next)
    }

    fn exec(&self, stmt: &Stmt, env: &mut Env, depth: usize) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Let { name, value, .. } => {
                let value = self.eval(value, env, depth)?;
                env.insert(name.clone(), value);
            }
            Stmt::Assign { target, value } => {
                let value = self.eval(value, env, depth)?;
                match target {
                    Place::Var(name) => match env.get_mut(name) {
                        Some(slot) => *slot = value,
                        None => return Err(RuntimeError::UndefinedVariable(name.clone())),
                    },
                    Place::Field(base, field) => {
                        let base = self.eval(base, env, depth)?;
                        let record = receiver(&base, field)?;
                        record.borrow_mut().set(field, value)?;
                    }
                }
            }
            Stmt::Expr(expr) => {
                self.eval(expr, env, depth)?;
            }
            Stmt::Return(value) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env, depth)?,
                    None => Value::Nil,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::If {
                branches,
                otherwise,
            } => {
                for (cond, block) in branches {
                    if truth(&self.eval(cond, env, depth)?, "if")? {
                        return self.exec_block(block, env, depth);
                    }
                }
                if let Some(block) = otherwise {
                    return self.exec_block(block, env, depth);
                }
            }
            Stmt::Narrow {
                binding,
                target,
                checked,
            } => {
                let value = lookup(env, binding)?;
                if *checked {
                    let matches = value
                        .as_record()
                        .map(|record| self.is_a(&record.borrow().type_name, target))
                        .unwrap_or(false);
                    if !matches {
                        return Err(RuntimeError::NarrowingFailed {
                            expected: target.clone(),
                            found: value.kind(),
                        });
                    }
                }
                env.insert(binding.clone(), value);
            }
            Stmt::EnsureWired {
                receiver: name,
                slot,
                method,
            } => {
                let value = lookup(env, name)?;
                let record = receiver(&value, method)?;
                let record = record.borrow();
                match record.get(slot) {
                    Some(Value::Nil) => {
                        return Err(RuntimeError::NullDispatchTarget {
                            method: method.clone(),
                            type_name: record.type_name.clone(),
                        })
                    }
                    Some(_) => {}
                    None => {
                        return Err(RuntimeError::UnknownField {
                            type_name: record.type_name.clone(),
                            field: slot.clone(),
                        })
                    }
                }
            }
        }
        Ok(Flow::Next)
    }

    fn eval(&self, expr: &Expr, env: &Env, depth: usize) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Nil => Ok(Value::Nil),
            Expr::Bool(value) => Ok(Value::Bool(*value)),
            Expr::Number(value) => Ok(Value::Number(*value)),
            Expr::Str(value) => Ok(Value::Str(value.clone())),
            Expr::Var(name) => lookup(env, name),
            Expr::Field(base, field) => {
                let base = self.eval(base, env, depth)?;
                let record = receiver(&base, field)?;
                let record = record.borrow();
                record
                    .get(field)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UnknownField {
                        type_name: record.type_name.clone(),
                        field: field.clone(),
                    })
            }
            Expr::Call { callee, args } => {
                let args = self.eval_all(args, env, depth)?;
                self.invoke(callee, args, depth + 1)
            }
            Expr::Construct { ty, fields } => {
                let fields = fields
                    .iter()
                    .map(|(name, value)| Ok((name.clone(), self.eval(value, env, depth)?)))
                    .collect::<Result<Vec<_>, RuntimeError>>()?;
                self.construct(ty, fields)
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, env, depth)?;
                match op {
                    UnaryOp::Neg => Ok(Value::Number(-number(&value, "-")?)),
                    UnaryOp::Not => Ok(Value::Bool(!truth(&value, "not")?)),
                }
            }
            Expr::Binary(op, lhs, rhs) => self.eval_binary(*op, lhs, rhs, env, depth),
            Expr::FnRef(name) => {
                if self.functions.contains_key(name) {
                    Ok(Value::Function(name.clone()))
                } else {
                    Err(RuntimeError::UnknownFunction(name.clone()))
                }
            }
            Expr::CallSlot {
                receiver: target,
                slot,
                args,
            } => {
                let target = self.eval(target, env, depth)?;
                let pointer = {
                    let record = receiver(&target, slot)?;
                    let record = record.borrow();
                    match record.get(slot) {
                        Some(Value::Function(name)) => name.clone(),
                        Some(Value::Nil) => {
                            return Err(RuntimeError::NullDispatchTarget {
                                method: slot.clone(),
                                type_name: record.type_name.clone(),
                            })
                        }
                        Some(other) => {
                            return Err(RuntimeError::TypeMismatch {
                                context: "slot call",
                                expected: "a function",
                                found: other.kind(),
                            })
                        }
                        None => {
                            return Err(RuntimeError::UnknownField {
                                type_name: record.type_name.clone(),
                                field: slot.clone(),
                            })
                        }
                    }
                };
                let args = self.eval_all(args, env, depth)?;
                self.invoke(&pointer, args, depth + 1)
            }
        }
    }

    fn eval_all(&self, exprs: &[Expr], env: &Env, depth: usize) -> Result<Vec<Value>, RuntimeError> {
        exprs.iter().map(|expr| self.eval(expr, env, depth)).collect()
    }

    fn eval_binary(
        &self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        env: &Env,
        depth: usize,
    ) -> Result<Value, RuntimeError> {
        let left = self.eval(lhs, env, depth)?;
        match op {
            BinOp::And => {
                if !truth(&left, "and")? {
                    return Ok(Value::Bool(false));
                }
                return Ok(Value::Bool(truth(&self.eval(rhs, env, depth)?, "and")?));
            }
            BinOp::Or => {
                if truth(&left, "or")? {
                    return Ok(Value::Bool(true));
                }
                return Ok(Value::Bool(truth(&self.eval(rhs, env, depth)?, "or")?));
            }
            _ => {}
        }

        let right = self.eval(rhs, env, depth)?;
        match op {
            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::NotEq => Ok(Value::Bool(left != right)),
            BinOp::Add => match (&left, &right) {
                (Value::Str(a), Value::Str(b)) => Ok(Value::Str(format!("{}{}", a, b))),
                _ => Ok(Value::Number(number(&left, "+")? + number(&right, "+")?)),
            },
            _ => {
                let a = number(&left, op.symbol())?;
                let b = number(&right, op.symbol())?;
                Ok(match op {
                    BinOp::Sub => Value::Number(a - b),
                    BinOp::Mul => Value::Number(a * b),
                    BinOp::Div => Value::Number(a / b),
                    BinOp::Rem => Value::Number(a % b),
                    BinOp::Lt => Value::Bool(a < b),
                    BinOp::Le => Value::Bool(a <= b),
                    BinOp::Gt => Value::Bool(a > b),
                    _ => Value::Bool(a >= b),
                })
            }
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(&RuntimeConfig {
            max_call_depth: 256,
        })
    }
}

fn default_value(ty: &FieldType) -> Value {
    match ty {
        FieldType::FnPtr { .. } => Value::Nil,
        FieldType::Value(ty) => match ty.as_str() {
            "number" => Value::Number(0.0),
            "string" => Value::Str(String::new()),
            "bool" => Value::Bool(false),
            _ => Value::Nil,
        },
    }
}

fn lookup(env: &Env, name: &str) -> Result<Value, RuntimeError> {
    env.get(name)
        .cloned()
        .ok_or_else(|| RuntimeError::UndefinedVariable(name.to_string()))
}

fn receiver<'v>(
    value: &'v Value,
    member: &str,
) -> Result<&'v super::value::RecordRef, RuntimeError> {
    match value {
        Value::Record(record) => Ok(record),
        Value::Nil => Err(RuntimeError::NilReceiver {
            member: member.to_string(),
        }),
        other => Err(RuntimeError::TypeMismatch {
            context: "member access",
            expected: "a record",
            found: other.kind(),
        }),
    }
}

fn number(value: &Value, context: &'static str) -> Result<f64, RuntimeError> {
    value.as_number().ok_or_else(|| RuntimeError::TypeMismatch {
        context,
        expected: "a number",
        found: value.kind(),
    })
}

fn truth(value: &Value, context: &'static str) -> Result<bool, RuntimeError> {
    value.as_bool().ok_or_else(|| RuntimeError::TypeMismatch {
        context,
        expected: "a bool",
        found: value.kind(),
    })
}
