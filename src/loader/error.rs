use thiserror::Error;

/// Failure of a module load attempt. `Display` is phrased for a user-facing dialog.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("invalid package path {path:?}")]
    InvalidPath { path: String },
    #[error("failed to import {path}: {reason}")]
    ImportError { path: String, reason: String },
    #[error("command {identifier}() failed: {reason}")]
    InvokeError { identifier: String, reason: String },
}

impl LoadError {
    pub(crate) fn import(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ImportError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invoke(identifier: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvokeError {
            identifier: identifier.into(),
            reason: reason.into(),
        }
    }
}
