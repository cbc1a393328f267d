// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request Classifier
//!
//! Picks the handling category for a request that already belongs to a
//! mount. The order is fixed and the first match wins:
//!
//! 1. under the file-transfer prefix: passthrough, whatever the verb
//! 2. `GET` under the asset prefix: asset
//! 3. any other `GET`: view
//! 4. `POST` carrying a command: command
//! 5. anything else: unsupported
//!
//! Passthrough is tested first so the transfer handler sees its own verbs
//! (`PUT`, `DELETE`, `PROPFIND`, ...) before view or command logic can.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Request to handler category mapping

use axum::http::Method;
use std::fmt;

use super::mount::{path_matches, Mount};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Asset,
    FileTransferPassthrough,
    View,
    Command,
    Unsupported,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Classification::Asset => "asset",
            Classification::FileTransferPassthrough => "passthrough",
            Classification::View => "view",
            Classification::Command => "command",
            Classification::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}

/// Classify a request. `has_command` reports whether a non-empty command
/// field accompanied the request.
pub fn classify(mount: &Mount, request_path: &str, method: &Method, has_command: bool) -> Classification {
    if path_matches(request_path, &mount.file_transfer_prefix) {
        Classification::FileTransferPassthrough
    } else if method == Method::GET && path_matches(request_path, &mount.asset_prefix) {
        Classification::Asset
    } else if method == Method::GET {
        Classification::View
    } else if method == Method::POST && has_command {
        Classification::Command
    } else {
        Classification::Unsupported
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mount() -> Mount {
        Mount::new("/fm", "/srv")
    }

    fn method(verb: &str) -> Method {
        Method::from_bytes(verb.as_bytes()).unwrap()
    }

    #[test]
    fn test_passthrough_claims_every_verb() {
        let m = mount();
        for verb in ["GET", "PUT", "DELETE", "PROPFIND", "MKCOL", "POST"] {
            assert_eq!(
                classify(&m, "/fm/webdav/a.txt", &method(verb), true),
                Classification::FileTransferPassthrough,
                "{verb}"
            );
        }
        assert_eq!(
            classify(&m, "/fm/webdav", &Method::GET, false),
            Classification::FileTransferPassthrough
        );
    }

    #[test]
    fn test_asset_only_on_get() {
        let m = mount();
        assert_eq!(classify(&m, "/fm/_internal/app.js", &Method::GET, false), Classification::Asset);
        assert_eq!(
            classify(&m, "/fm/_internal/app.js", &Method::POST, false),
            Classification::Unsupported
        );
    }

    #[test]
    fn test_view_and_command() {
        let m = mount();
        assert_eq!(classify(&m, "/fm/docs", &Method::GET, false), Classification::View);
        assert_eq!(classify(&m, "/fm/docs", &Method::GET, true), Classification::View);
        assert_eq!(classify(&m, "/fm/repo", &Method::POST, true), Classification::Command);
        assert_eq!(classify(&m, "/fm/repo", &Method::POST, false), Classification::Unsupported);
    }

    #[test]
    fn test_other_verbs_unsupported_outside_passthrough() {
        let m = mount();
        for verb in ["PUT", "DELETE", "PATCH", "HEAD"] {
            assert_eq!(
                classify(&m, "/fm/docs/a.txt", &method(verb), true),
                Classification::Unsupported,
                "{verb}"
            );
        }
    }

    #[test]
    fn test_prefix_lookalikes_are_views() {
        let m = mount();
        assert_eq!(classify(&m, "/fm/webdavish", &Method::GET, false), Classification::View);
        assert_eq!(classify(&m, "/fm/_internals", &Method::GET, false), Classification::View);
    }
}
