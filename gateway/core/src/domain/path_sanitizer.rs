// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Path Sanitizer Domain Service
//!
//! Maps web-facing request paths onto a mount's filesystem scope and refuses
//! anything that would leave it. Lexical only: `.` segments are dropped, `..`
//! segments pop the previous segment, and the result is checked against the
//! scope root afterwards.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Working-directory and file-path containment for mounts

use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Path sanitization errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathSanitizerError {
    #[error("Path traversal attempt detected: {0}")]
    PathTraversal(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Path outside mount scope: {0}")]
    OutsideBoundary(String),

    #[error("Path too long: {0}")]
    PathTooLong(String),
}

/// Path sanitizer domain service
///
/// # Security Guarantees
/// - Rejects paths containing NUL bytes
/// - Collapses `.` and `..` without touching the filesystem
/// - Guarantees the returned path starts with the scope root
pub struct PathSanitizer {
    /// Maximum allowed path length (default: 4096)
    max_path_len: usize,
}

impl PathSanitizer {
    pub fn new() -> Self {
        Self { max_path_len: 4096 }
    }

    pub fn with_max_length(max_path_len: usize) -> Self {
        Self { max_path_len }
    }

    /// Lexically normalize `path`.
    ///
    /// A `..` that would climb above the first segment of a relative path is
    /// reported as `PathTraversal`; on an absolute path it stops at the root,
    /// the same way `filepath.Clean`-style normalizers behave.
    pub fn normalize(&self, path: &str) -> Result<PathBuf, PathSanitizerError> {
        self.validate(path)?;

        let mut normalized = PathBuf::new();
        let mut depth = 0usize;
        for component in Path::new(path).components() {
            match component {
                Component::Prefix(_) | Component::RootDir => normalized.push(component),
                Component::CurDir => {}
                Component::Normal(part) => {
                    normalized.push(part);
                    depth += 1;
                }
                Component::ParentDir => {
                    if depth == 0 {
                        if normalized.has_root() {
                            continue;
                        }
                        return Err(PathSanitizerError::PathTraversal(path.to_string()));
                    }
                    normalized.pop();
                    depth -= 1;
                }
            }
        }

        Ok(normalized)
    }

    /// Join a request-relative path onto `scope_root` and prove the result
    /// stays inside the root.
    ///
    /// # Examples
    /// ```
    /// use dirgate_core::domain::path_sanitizer::PathSanitizer;
    /// use std::path::{Path, PathBuf};
    ///
    /// let sanitizer = PathSanitizer::new();
    ///
    /// let safe = sanitizer.confine("/repo/./src", Path::new("/srv/files")).unwrap();
    /// assert_eq!(safe, PathBuf::from("/srv/files/repo/src"));
    ///
    /// let bad = sanitizer.confine("/repo/../../etc", Path::new("/srv/files"));
    /// assert!(bad.is_err());
    /// ```
    pub fn confine(&self, relative: &str, scope_root: &Path) -> Result<PathBuf, PathSanitizerError> {
        let root = self.normalize(&scope_root.to_string_lossy())?;
        let joined = format!(
            "{}/{}",
            root.to_string_lossy().trim_end_matches('/'),
            relative.trim_start_matches('/')
        );

        let candidate = match self.normalize(&joined) {
            Ok(path) => path,
            Err(PathSanitizerError::PathTraversal(_)) => {
                return Err(PathSanitizerError::OutsideBoundary(relative.to_string()))
            }
            Err(e) => return Err(e),
        };

        if !candidate.starts_with(&root) {
            tracing::warn!(
                path = %relative,
                root = %root.display(),
                "Path outside mount scope detected"
            );
            return Err(PathSanitizerError::OutsideBoundary(relative.to_string()));
        }

        Ok(candidate)
    }

    /// Lightweight check for length and NUL bytes.
    pub fn validate(&self, path: &str) -> Result<(), PathSanitizerError> {
        if path.len() > self.max_path_len {
            return Err(PathSanitizerError::PathTooLong(path.to_string()));
        }

        if path.contains('\0') {
            tracing::warn!(
                path = %path.escape_default(),
                "Path contains null byte (potential security issue)"
            );
            return Err(PathSanitizerError::InvalidPath(
                "Path contains null byte".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for PathSanitizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_current_dir() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.normalize("/srv/./files/./a.txt").unwrap();
        assert_eq!(result, PathBuf::from("/srv/files/a.txt"));
    }

    #[test]
    fn test_normalize_collapses_parent_dir() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.normalize("/srv/files/repo/../docs").unwrap();
        assert_eq!(result, PathBuf::from("/srv/files/docs"));
    }

    #[test]
    fn test_normalize_parent_at_root_stays_at_root() {
        let sanitizer = PathSanitizer::new();
        assert_eq!(sanitizer.normalize("/../../etc").unwrap(), PathBuf::from("/etc"));
    }

    #[test]
    fn test_normalize_relative_escape_rejected() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.normalize("../../etc/passwd");
        assert!(matches!(result, Err(PathSanitizerError::PathTraversal(_))));
    }

    #[test]
    fn test_confine_inside_scope() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.confine("/repo", Path::new("/srv/files")).unwrap();
        assert_eq!(result, PathBuf::from("/srv/files/repo"));
    }

    #[test]
    fn test_confine_root_of_scope() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.confine("/", Path::new("/srv/files/")).unwrap();
        assert_eq!(result, PathBuf::from("/srv/files"));
    }

    #[test]
    fn test_confine_escape_rejected() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.confine("/repo/../../etc", Path::new("/srv/files"));
        assert!(matches!(result, Err(PathSanitizerError::OutsideBoundary(_))));
    }

    #[test]
    fn test_confine_sibling_prefix_rejected() {
        let sanitizer = PathSanitizer::new();
        let result = sanitizer.confine("/../files-private", Path::new("/srv/files"));
        assert!(matches!(result, Err(PathSanitizerError::OutsideBoundary(_))));
    }

    #[test]
    fn test_path_too_long() {
        let sanitizer = PathSanitizer::with_max_length(10);
        let result = sanitizer.normalize("/very/long/path/that/exceeds/limit");
        assert!(matches!(result, Err(PathSanitizerError::PathTooLong(_))));
    }

    #[test]
    fn test_validate_null_byte() {
        let sanitizer = PathSanitizer::new();
        assert!(sanitizer.validate("/srv/files/a.txt").is_ok());
        assert!(sanitizer.validate("/path\0/with/null").is_err());
    }
}
