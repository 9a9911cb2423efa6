// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tokentally workspace.

use std::path::PathBuf;

use thiserror::Error;

/// The primary error type returned by the cost engine, the trace logger and
/// the analysis tooling.
#[derive(Debug, Error)]
pub enum TokentallyError {
    /// Configuration that deserialized fine but cannot be used at runtime.
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller supplied a value the engine refuses to record.
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// A persisted artifact (call log, snapshot) could not be read or written.
    #[error("persistence error at {}: {source}", .path.display())]
    Persistence {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors (poisoned locks and the like).
    #[error("internal error: {0}")]
    Internal(String),
}

impl TokentallyError {
    /// Shorthand for an [`TokentallyError::InvalidInput`] with a message.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Wrap an I/O or serialization failure against `path`.
    pub fn persistence(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }

    /// Whether this error came from the durable artifacts rather than the caller.
    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence { .. })
    }
}
