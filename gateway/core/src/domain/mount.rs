// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Mount Aggregate
//!
//! A [`Mount`] is one directory exposure: a URL base path, the filesystem
//! scope behind it, the sub-prefixes claimed by the file-transfer handler and
//! the asset bundle, and the identities allowed to use it.
//!
//! All prefix tests use path-segment semantics (see [`path_matches`]): a mount
//! at `/files` owns `/files` and `/files/x` but not `/filesxyz`.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Mount configuration, identity resolution and path mapping

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::identity::Identity;
use super::token::TokenStore;

/// Name given to the identity used when no per-user identity matches.
pub const DEFAULT_IDENTITY_NAME: &str = "default";

/// Default validity window of the anti-forgery token.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(60 * 60);

/// Default wall-clock limit for external commands.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Segment-aware prefix test: `prefix` matches `path` when they are equal or
/// `path` continues with a `/` right after `prefix`.
pub fn path_matches(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return path.starts_with('/');
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[derive(Debug)]
pub struct Mount {
    /// URL prefix this mount answers to.
    pub base_path: String,
    /// URL sub-prefix delegated verbatim to the file-transfer handler.
    pub file_transfer_prefix: String,
    /// URL sub-prefix served from the asset bundle.
    pub asset_prefix: String,
    /// Externally visible address prefix, prepended to redirect targets.
    pub address_prefix: String,
    /// Filesystem root this mount is confined to.
    pub path_scope: PathBuf,
    /// Identity for unauthenticated requests and unknown credential names.
    pub default_identity: Identity,
    pub identities: HashMap<String, Identity>,
    /// Require a valid `Token` header on mutating non-passthrough requests.
    pub csrf_protection: bool,
    pub command_timeout: Option<Duration>,
    token: TokenStore,
}

impl Mount {
    /// A mount with the conventional sub-prefixes (`<base>/webdav`,
    /// `<base>/_internal`) and a default identity with no capabilities.
    pub fn new(base_path: impl Into<String>, path_scope: impl Into<PathBuf>) -> Self {
        let base_path = normalize_base(&base_path.into());
        Self {
            file_transfer_prefix: join_url(&base_path, "/webdav"),
            asset_prefix: join_url(&base_path, "/_internal"),
            base_path,
            address_prefix: String::new(),
            path_scope: path_scope.into(),
            default_identity: Identity::new(DEFAULT_IDENTITY_NAME),
            identities: HashMap::new(),
            csrf_protection: true,
            command_timeout: Some(DEFAULT_COMMAND_TIMEOUT),
            token: TokenStore::new(DEFAULT_TOKEN_TTL),
        }
    }

    pub fn with_file_transfer_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.file_transfer_prefix = normalize_base(&prefix.into());
        self
    }

    pub fn with_asset_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.asset_prefix = normalize_base(&prefix.into());
        self
    }

    pub fn with_address_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.address_prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_default_identity(mut self, identity: Identity) -> Self {
        self.default_identity = identity;
        self
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identities.insert(identity.name.clone(), identity);
        self
    }

    pub fn with_csrf_protection(mut self, enabled: bool) -> Self {
        self.csrf_protection = enabled;
        self
    }

    pub fn with_command_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.command_timeout = timeout;
        self
    }

    pub fn with_token_ttl(mut self, ttl: Duration) -> Self {
        self.token = TokenStore::new(ttl);
        self
    }

    pub fn owns(&self, request_path: &str) -> bool {
        path_matches(request_path, &self.base_path)
    }

    /// Identity resolution.
    ///
    /// A non-empty credential naming a configured identity gets that identity;
    /// everything else, including a missing credential, falls back to
    /// [`Mount::default_identity`]. Unauthenticated requests are therefore
    /// never refused here, only constrained by what the default identity allows.
    pub fn resolve_identity(&self, credential: Option<&str>) -> &Identity {
        credential
            .filter(|name| !name.is_empty())
            .and_then(|name| self.identities.get(name))
            .unwrap_or(&self.default_identity)
    }

    /// `request_path` with the base path removed, always starting with `/`.
    pub fn relative_path<'a>(&self, request_path: &'a str) -> &'a str {
        let base = self.base_path.trim_end_matches('/');
        let rest = request_path.strip_prefix(base).unwrap_or(request_path);
        if rest.is_empty() {
            "/"
        } else {
            rest
        }
    }

    /// Rewrite a view path to the equivalent file-transfer path by replacing
    /// the first occurrence of the base path.
    pub fn to_file_transfer_path(&self, request_path: &str) -> String {
        let base = self.base_path.trim_end_matches('/');
        if base.is_empty() {
            return join_url(&self.file_transfer_prefix, request_path);
        }
        request_path.replacen(base, self.file_transfer_prefix.trim_end_matches('/'), 1)
    }

    pub fn token(&self) -> &TokenStore {
        &self.token
    }

    /// Current anti-forgery token, issuing a fresh one if none is live.
    pub fn ensure_token(&self) -> String {
        self.token.ensure()
    }
}

fn normalize_base(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

fn join_url(base: &str, suffix: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        suffix.trim_start_matches('/')
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matches_segments() {
        assert!(path_matches("/files", "/files"));
        assert!(path_matches("/files/", "/files"));
        assert!(path_matches("/files/a/b", "/files"));
        assert!(path_matches("/files/a", "/files/"));
        assert!(!path_matches("/filesxyz", "/files"));
        assert!(!path_matches("/other", "/files"));
        assert!(path_matches("/anything", "/"));
    }

    #[test]
    fn test_default_prefixes() {
        let mount = Mount::new("/fm/", "/srv");
        assert_eq!(mount.base_path, "/fm");
        assert_eq!(mount.file_transfer_prefix, "/fm/webdav");
        assert_eq!(mount.asset_prefix, "/fm/_internal");

        let root = Mount::new("/", "/srv");
        assert_eq!(root.file_transfer_prefix, "/webdav");
    }

    #[test]
    fn test_resolve_identity_falls_back_to_default() {
        let mount = Mount::new("/fm", "/srv")
            .with_identity(Identity::new("alice").with_edit(true));

        assert_eq!(mount.resolve_identity(Some("alice")).name, "alice");
        assert_eq!(mount.resolve_identity(Some("mallory")).name, DEFAULT_IDENTITY_NAME);
        assert_eq!(mount.resolve_identity(Some("")).name, DEFAULT_IDENTITY_NAME);
        assert_eq!(mount.resolve_identity(None).name, DEFAULT_IDENTITY_NAME);
    }

    #[test]
    fn test_relative_path() {
        let mount = Mount::new("/fm", "/srv");
        assert_eq!(mount.relative_path("/fm"), "/");
        assert_eq!(mount.relative_path("/fm/docs/a.txt"), "/docs/a.txt");

        let root = Mount::new("/", "/srv");
        assert_eq!(root.relative_path("/docs"), "/docs");
    }

    #[test]
    fn test_to_file_transfer_path() {
        let mount = Mount::new("/fm", "/srv");
        assert_eq!(mount.to_file_transfer_path("/fm/report.pdf"), "/fm/webdav/report.pdf");

        let root = Mount::new("/", "/srv");
        assert_eq!(root.to_file_transfer_path("/report.pdf"), "/webdav/report.pdf");
    }

    #[test]
    fn test_ensure_token_idempotent() {
        let mount = Mount::new("/fm", "/srv");
        assert_eq!(mount.ensure_token(), mount.ensure_token());
    }
}
