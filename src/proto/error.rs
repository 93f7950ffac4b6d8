//! Crate-level error type

use super::diagnostics::Diagnostic;
use super::runtime::RuntimeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Diagnostic(#[from] Diagnostic),

    #[error("configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
