/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for variable access and struct conversion.

use thiserror::Error;

use crate::variable::VariableKind;

/// Errors that can occur while addressing, mutating or building variables.
#[derive(Debug, Error)]
pub enum VariableError {
    /// Malformed path, index out of range, or a write through a scalar.
    #[error("Invalid path '{path}': {message}")]
    Path { path: String, message: String },

    /// A replacement value whose kind disagrees with the target's kind.
    #[error("Type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: VariableKind,
        found: VariableKind,
    },

    /// A self-describing or registered converter reported a failure.
    #[error(transparent)]
    Conversion(#[from] ConversionError),

    /// The value handed to the struct converter is not a record.
    #[error("Cannot convert {type_name} to variables: not a record type")]
    UnsupportedRoot { type_name: String },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML (de)serialization failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl VariableError {
    pub(crate) fn path(path: impl Into<String>, message: impl Into<String>) -> Self {
        VariableError::Path {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Failure reported by a [`Converter`](crate::Converter) or a
/// [`ToVariable`](crate::ToVariable) implementation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Conversion of {type_name} failed: {message}")]
pub struct ConversionError {
    pub type_name: String,
    pub message: String,
}

impl ConversionError {
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
        }
    }
}

/// Result type for variable operations.
pub type Result<T> = std::result::Result<T, VariableError>;
