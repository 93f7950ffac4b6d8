//! Grammar model for protocol declarations
//!
//! Pure data: the nodes built by the recognizer (or by a host directly) and
//! consumed by code generation. Nodes are owned by the `ProtocolDecl` that
//! contains them; an `ImplDecl` refers back to its protocol by name only.

pub mod body;
pub mod nodes;
pub mod range;

pub use body::{BinOp, Expr, Place, Stmt, UnaryOp};
pub use nodes::{
    ConstructorDecl, FieldDecl, ImplDecl, MethodOverride, MethodSig, Param, ProtocolDecl,
};
pub use range::{Position, Range, SourceLocation};
