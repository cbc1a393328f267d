// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::response::Response;
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::dispatcher::Dispatcher;

/// Router that sends every request, whatever its method or path, through
/// the dispatcher.
pub fn app(dispatcher: Arc<Dispatcher>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(dispatcher)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(dispatcher): State<Arc<Dispatcher>>, request: Request) -> Response {
    let credential = basic_auth_username(request.headers());
    dispatcher.dispatch(credential.as_deref(), request).await
}

/// User name from an `Authorization: Basic` header. The password is not
/// consulted; verifying it is the job of whatever authenticates in front.
pub fn basic_auth_username(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let user = decoded.split_once(':').map(|(u, _)| u).unwrap_or(&decoded);
    Some(user.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_basic_auth_username() {
        let encoded = STANDARD.encode("alice:secret");
        assert_eq!(
            basic_auth_username(&headers(&format!("Basic {}", encoded))).as_deref(),
            Some("alice")
        );
    }

    #[test]
    fn test_non_basic_ignored() {
        assert_eq!(basic_auth_username(&headers("Bearer abc")), None);
        assert_eq!(basic_auth_username(&headers("Basic !!!")), None);
        assert_eq!(basic_auth_username(&HeaderMap::new()), None);
    }
}
