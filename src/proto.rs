//! Main module for protocol lowering

pub mod ast;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod lexing;
pub mod parsing;
pub mod recognizer;
pub mod runtime;
pub mod symbols;
pub mod validation;
