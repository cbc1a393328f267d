// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Dispatch error taxonomy.
//!
//! Every failure the engine can report falls into one of these variants, and
//! each maps to exactly one status class. Denials are never folded into
//! internal errors.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use super::file_info::FileInfoError;
use super::path_sanitizer::PathSanitizerError;

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The identity lacks the required capability.
    #[error("Authorization denied: {0}")]
    AuthorizationDenied(String),

    /// The request shape matches no handling category.
    #[error("Request not supported")]
    ClassificationUnsupported,

    /// The program is allowed but cannot be resolved on this host.
    #[error("Program not available: {0}")]
    EnvironmentUnavailable(String),

    /// The program failed to launch, exited non-zero, or timed out.
    #[error("Command failed: {message}")]
    ExecutionFailure { message: String, output: String },

    /// The file-info collaborator could not resolve the target.
    #[error("{message}")]
    ResolutionFailure { status: StatusCode, message: String },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
            DispatchError::ClassificationUnsupported => StatusCode::NOT_IMPLEMENTED,
            DispatchError::EnvironmentUnavailable(_) => StatusCode::NOT_IMPLEMENTED,
            DispatchError::ExecutionFailure { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::ResolutionFailure { status, .. } => *status,
        }
    }

    pub fn is_denial(&self) -> bool {
        matches!(self, DispatchError::AuthorizationDenied(_))
    }
}

/// Programmatic rendering: a bare status, except execution failures which
/// carry the captured output (or the launch diagnostic) as plain text.
impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self {
            DispatchError::ExecutionFailure { message, output } => {
                let body = if output.is_empty() { message } else { output };
                (status, body).into_response()
            }
            _ => status.into_response(),
        }
    }
}

impl From<FileInfoError> for DispatchError {
    fn from(err: FileInfoError) -> Self {
        DispatchError::ResolutionFailure {
            status: err.status,
            message: err.message,
        }
    }
}

impl From<PathSanitizerError> for DispatchError {
    fn from(err: PathSanitizerError) -> Self {
        DispatchError::AuthorizationDenied(err.to_string())
    }
}
