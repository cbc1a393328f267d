// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mount Registry
//!
//! Ordered, read-only collection of mounts. Resolution walks the mounts in
//! declaration order and returns the first one whose base path owns the
//! request path. No match is not an error: the caller falls through to the
//! next handler.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Request path to mount routing

use std::sync::Arc;
use thiserror::Error;

use super::mount::Mount;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MountRegistryError {
    #[error("Duplicate mount base path: {0}")]
    DuplicateBasePath(String),
}

#[derive(Debug, Clone, Default)]
pub struct MountRegistry {
    mounts: Vec<Arc<Mount>>,
}

impl MountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mount. Base paths must be unique.
    pub fn register(&mut self, mount: Mount) -> Result<(), MountRegistryError> {
        if self.mounts.iter().any(|m| m.base_path == mount.base_path) {
            return Err(MountRegistryError::DuplicateBasePath(mount.base_path));
        }
        tracing::debug!(
            base_path = %mount.base_path,
            scope = %mount.path_scope.display(),
            "Registered mount"
        );
        self.mounts.push(Arc::new(mount));
        Ok(())
    }

    pub fn resolve(&self, request_path: &str) -> Option<Arc<Mount>> {
        self.mounts.iter().find(|m| m.owns(request_path)).cloned()
    }

    pub fn mounts(&self) -> &[Arc<Mount>] {
        &self.mounts
    }

    pub fn len(&self) -> usize {
        self.mounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }
}
