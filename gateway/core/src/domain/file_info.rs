// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # File Info and Rendering Ports
//!
//! Traits for the collaborators the dispatcher hands view requests to once
//! they have been classified and authorized:
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`FileInfoResolver`] | stat the target of a view request |
//! | [`ViewRenderer`] | render a directory listing or file page |
//! | [`ErrorRenderer`] | render a browser-facing error page |
//!
//! Implementations live in `crate::infrastructure`.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::Response;
use std::path::PathBuf;
use thiserror::Error;

use super::identity::Identity;
use super::mount::Mount;

/// What the resolver learned about a request target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Last path segment, used for download file names.
    pub name: String,
    /// Location on disk, inside the mount's scope.
    pub path: PathBuf,
    pub is_directory: bool,
    pub size: u64,
}

/// Resolver failure carrying the status it wants surfaced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct FileInfoError {
    pub status: StatusCode,
    pub message: String,
}

impl FileInfoError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }
}

#[async_trait]
pub trait FileInfoResolver: Send + Sync {
    async fn get_info(
        &self,
        mount: &Mount,
        identity: &Identity,
        request_path: &str,
    ) -> Result<FileInfo, FileInfoError>;
}

/// Everything a view renderer may need besides the file info itself.
pub struct ViewContext<'a> {
    pub mount: &'a Mount,
    pub identity: &'a Identity,
    pub request_path: &'a str,
    /// Anti-forgery token to embed in any form that mutates state.
    pub token: &'a str,
}

#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render(&self, info: &FileInfo, context: ViewContext<'_>) -> Result<Response, FileInfoError>;
}

pub trait ErrorRenderer: Send + Sync {
    fn render_html(&self, status: StatusCode, message: &str) -> Response;
}
