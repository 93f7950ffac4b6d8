//! Reference interpreter for generated modules
//!
//! Executes records and functions produced by code generation so dispatch
//! behavior can be observed without a host compiler. Records follow the
//! host object model: shared references whose layout is the base record's
//! fields followed by the derived record's own.

pub mod error;
pub mod interpreter;
pub mod value;

pub use error::RuntimeError;
pub use interpreter::Interpreter;
pub use value::{RecordRef, RecordValue, Value};
