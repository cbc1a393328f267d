// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Static File Delegate
//!
//! Read-only [`RequestDelegate`] backed by `tower_http::services::ServeDir`.
//! Serves the asset bundle directory, and stands in for a file-transfer
//! handler when no read-write protocol server is wired in: `GET`/`HEAD` are
//! served from disk, every other verb gets `405 Method Not Allowed`.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use std::path::PathBuf;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::domain::delegate::RequestDelegate;

#[derive(Clone)]
pub struct StaticFilesDelegate {
    /// URL prefix removed before the path is looked up under `root`.
    url_prefix: String,
    serve_dir: ServeDir,
}

impl StaticFilesDelegate {
    pub fn new(url_prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            serve_dir: ServeDir::new(root.into()),
        }
    }

    fn strip_prefix(&self, uri: &Uri) -> Option<Uri> {
        let rest = uri.path().strip_prefix(self.url_prefix.as_str())?;
        if !(rest.is_empty() || rest.starts_with('/')) {
            return None;
        }
        let path = if rest.is_empty() { "/" } else { rest };
        let target = match uri.query() {
            Some(q) => format!("{}?{}", path, q),
            None => path.to_string(),
        };
        target.parse().ok()
    }
}

#[async_trait]
impl RequestDelegate for StaticFilesDelegate {
    async fn handle(&self, mut request: Request<Body>) -> Response {
        let Some(uri) = self.strip_prefix(request.uri()) else {
            return StatusCode::NOT_FOUND.into_response();
        };
        *request.uri_mut() = uri;

        match self.serve_dir.clone().oneshot(request).await {
            Ok(response) => response.map(Body::new),
            Err(never) => match never {},
        }
    }
}
