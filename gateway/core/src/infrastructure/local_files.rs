// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Local Filesystem File Info Resolver
//!
//! Resolves view requests against the mount's `path_scope` on the local disk.
//! The request path is mapped into the scope with the same containment check
//! the command gateway uses, so a view can never stat outside its mount.

use async_trait::async_trait;
use axum::http::StatusCode;
use std::io::ErrorKind;

use crate::domain::file_info::{FileInfo, FileInfoError, FileInfoResolver};
use crate::domain::identity::Identity;
use crate::domain::mount::Mount;
use crate::domain::path_sanitizer::PathSanitizer;

#[derive(Default)]
pub struct LocalFileInfoResolver {
    sanitizer: PathSanitizer,
}

impl LocalFileInfoResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FileInfoResolver for LocalFileInfoResolver {
    async fn get_info(
        &self,
        mount: &Mount,
        _identity: &Identity,
        request_path: &str,
    ) -> Result<FileInfo, FileInfoError> {
        let path = self
            .sanitizer
            .confine(mount.relative_path(request_path), &mount.path_scope)
            .map_err(|e| FileInfoError::new(StatusCode::FORBIDDEN, e.to_string()))?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FileInfoError::not_found(format!("{} not found", request_path)),
            ErrorKind::PermissionDenied => {
                FileInfoError::new(StatusCode::FORBIDDEN, format!("{} is not readable", request_path))
            }
            _ => {
                tracing::error!(path = %path.display(), error = %e, "Failed to stat path");
                FileInfoError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        })?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "/".to_string());

        Ok(FileInfo {
            name,
            is_directory: metadata.is_dir(),
            size: metadata.len(),
            path,
        })
    }
}
