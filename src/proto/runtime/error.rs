//! Failures raised while executing generated code

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A dispatcher was called on a value whose constructor never wired the slot
    #[error("null dispatch target: `{method}` is not wired on a value of type `{type_name}`")]
    NullDispatchTarget { method: String, type_name: String },

    #[error("cannot narrow a value of type `{found}` to `{expected}`")]
    NarrowingFailed { expected: String, found: String },

    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    #[error("unknown type `{0}`")]
    UnknownType(String),

    #[error("type `{type_name}` has no field `{field}`")]
    UnknownField { type_name: String, field: String },

    #[error("undefined variable `{0}`")]
    UndefinedVariable(String),

    #[error("{context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: &'static str,
        expected: &'static str,
        found: String,
    },

    #[error("`{function}` takes {expected} argument(s), {found} given")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("cannot access `{member}` on nil")]
    NilReceiver { member: String },

    #[error("call depth exceeded the limit of {limit}")]
    CallDepthExceeded { limit: usize },

    #[error("`{0}` is defined by more than one loaded module")]
    DuplicateDefinition(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_dispatch_message_names_method_and_type() {
        let err = RuntimeError::NullDispatchTarget {
            method: "area".into(),
            type_name: "Circle".into(),
        };
        assert_eq!(
            err.to_string(),
            "null dispatch target: `area` is not wired on a value of type `Circle`"
        );
    }
}
