//! Runtime values
//!
//! Records are shared references: assigning a record to another variable or
//! field aliases it, the way the host object model treats generated records.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::error::RuntimeError;

pub type RecordRef = Rc<RefCell<RecordValue>>;

#[derive(Debug, Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Number(f64),
    Str(String),
    Record(RecordRef),
    /// A reference to a loaded function, as stored in a dispatch slot
    Function(String),
}

/// An instance: its concrete type and its fields in layout order
#[derive(Debug, Clone, PartialEq)]
pub struct RecordValue {
    pub type_name: String,
    pub fields: Vec<(String, Value)>,
}

impl RecordValue {
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    pub fn set(&mut self, field: &str, value: Value) -> Result<(), RuntimeError> {
        match self.fields.iter_mut().find(|(name, _)| name == field) {
            Some((_, slot)) => {
                *slot = value;
                Ok(())
            }
            None => Err(RuntimeError::UnknownField {
                type_name: self.type_name.clone(),
                field: field.to_string(),
            }),
        }
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }
}

impl Value {
    pub fn record(value: RecordValue) -> Self {
        Value::Record(Rc::new(RefCell::new(value)))
    }

    /// Short description of the value's kind, used in error messages
    pub fn kind(&self) -> String {
        match self {
            Value::Nil => "nil".to_string(),
            Value::Bool(_) => "bool".to_string(),
            Value::Number(_) => "number".to_string(),
            Value::Str(_) => "string".to_string(),
            Value::Record(record) => record.borrow().type_name.clone(),
            Value::Function(name) => format!("function `{}`", name),
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&RecordRef> {
        match self {
            Value::Record(record) => Some(record),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a == b,
            // identity, not structure
            (Value::Record(a), Value::Record(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(value) => write!(f, "{}", value),
            Value::Number(value) => write!(f, "{}", value),
            Value::Str(value) => f.write_str(value),
            Value::Function(name) => write!(f, "<proc {}>", name),
            Value::Record(record) => {
                let record = record.borrow();
                write!(f, "{}(", record.type_name)?;
                for (index, (name, value)) in record.fields.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_compare_by_identity() {
        let a = Value::record(RecordValue {
            type_name: "Square".into(),
            fields: vec![("side".into(), Value::Number(4.0))],
        });
        let b = Value::record(RecordValue {
            type_name: "Square".into(),
            fields: vec![("side".into(), Value::Number(4.0))],
        });
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn test_set_unknown_field() {
        let mut record = RecordValue {
            type_name: "Square".into(),
            fields: Vec::new(),
        };
        assert!(matches!(
            record.set("side", Value::Nil),
            Err(RuntimeError::UnknownField { .. })
        ));
    }
}
