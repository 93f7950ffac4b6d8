//! # protogen
//!
//! Lowers `protocol` / `impl` declarations into plain records carrying
//! function-pointer slots, renamed override functions, forwarding dispatchers
//! and constructors that wire the slots.
//!
//! Pipeline
//!
//! ```text
//! source ──lexing──▶ tokens ──layout──▶ Newline/Indent/Dedent stream
//!        ──parsing──▶ raw items ──recognizer──▶ ProtocolDecl
//!        ──symbols──▶ SymbolTable ──codegen──▶ GeneratedModule
//! ```
//!
//! Every stage reports failures as a [`Diagnostic`](proto::diagnostics::Diagnostic)
//! and the first one aborts the enclosing protocol. Hosts that already have a
//! structured declaration can skip the front-end and hand a
//! [`ProtocolDecl`](proto::ast::ProtocolDecl) straight to
//! [`Engine::lower_protocol`](proto::engine::Engine::lower_protocol).
//!
//! The [`runtime`](proto::runtime) module is a small reference interpreter for
//! generated modules. It is what the tests use to call dispatchers.

#![allow(rustdoc::invalid_html_tags)]

pub mod proto;

pub use proto::diagnostics::{Diagnostic, DiagnosticKind};
pub use proto::engine::Engine;
pub use proto::error::{Error, Result};
