// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request delegates.
//!
//! A [`RequestDelegate`] receives a request verbatim and owns the response.
//! The file-transfer handler, the asset server and the fall-through handler
//! for unmatched paths are all delegates.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};

#[async_trait]
pub trait RequestDelegate: Send + Sync {
    async fn handle(&self, request: Request<Body>) -> Response;
}

/// Answers every request with `404 Not Found`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundDelegate;

#[async_trait]
impl RequestDelegate for NotFoundDelegate {
    async fn handle(&self, _request: Request<Body>) -> Response {
        StatusCode::NOT_FOUND.into_response()
    }
}
