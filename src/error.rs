//! Error types for the acompute runtime
//!
//! Compile-time failures carry the structured [`CompileError`] taxonomy from
//! the kernel compiler; everything else (backend faults, bad handles, missing
//! registry entries) is reported through the crate-wide [`Error`] enum.

use std::fmt;

use crate::compiler::CompileError;

/// Result type for acompute operations
pub type Result<T> = std::result::Result<T, Error>;

/// acompute runtime errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Shader-dialect compilation failed
    Compile(CompileError),

    /// Backend-specific error (device fault, buffer update failure, etc.)
    BackendError(String),

    /// Invalid resource (unknown registry key, stale handle, etc.)
    InvalidResource(String),

    /// Initialization failed
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Compile(err) => write!(f, "Compile error: {}", err),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Compile(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CompileError> for Error {
    fn from(err: CompileError) -> Self {
        Error::Compile(err)
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
