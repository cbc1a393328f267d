// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Dispatcher
//!
//! Per-request decision engine:
//!
//! ```text
//! registry.resolve ──► mount.resolve_identity ──► classify
//!        │                                          │
//!        └─ no mount: `next` delegate               ├─ Access rule check
//!                                                   ├─ Passthrough: verb capability ─► transfer delegate
//!                                                   ├─ Asset ─► asset delegate
//!                                                   ├─ View ─► file info ─► redirect | raw/download | render
//!                                                   ├─ Command: token check ─► command gateway
//!                                                   └─ Unsupported ─► 501
//! ```
//!
//! The request path is percent-decoded and normalized once, up front, and the
//! request URI is rewritten to that form; every later step and every delegate
//! sees the same path. Every capability decision is taken before the delegate
//! or process that would act on it is called. Browser-facing (`GET`) denials render an HTML
//! error page; everything else gets a bare status.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Request routing and authorization

use axum::body::Body;
use axum::extract::Query;
use axum::http::header::CONTENT_DISPOSITION;
use axum::http::uri::PathAndQuery;
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Redirect, Response};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::command_gateway::{CommandGateway, ProgramLocator, WhichLocator};
use crate::domain::capability::{CapabilityGate, Decision, Operation};
use crate::domain::classification::{classify, Classification};
use crate::domain::delegate::{NotFoundDelegate, RequestDelegate};
use crate::domain::errors::DispatchError;
use crate::domain::file_info::{ErrorRenderer, FileInfoResolver, ViewContext, ViewRenderer};
use crate::domain::identity::Identity;
use crate::domain::mount::{path_matches, Mount};
use crate::domain::mount_registry::MountRegistry;
use crate::domain::redirect::{needs_trailing_slash_redirect, trailing_slash_location};
use crate::domain::request_path::{canonicalize, encode};

/// Header carrying the raw command line.
pub const COMMAND_HEADER: &str = "Command";
/// Header carrying the anti-forgery token on mutating requests.
pub const TOKEN_HEADER: &str = "Token";

#[derive(Debug, Default, Deserialize)]
struct ViewQuery {
    raw: Option<String>,
    download: Option<String>,
}

impl ViewQuery {
    fn from_uri(uri: &Uri) -> Self {
        Query::<ViewQuery>::try_from_uri(uri)
            .map(|Query(q)| q)
            .unwrap_or_default()
    }

    fn raw(&self) -> bool {
        self.raw.as_deref() == Some("true")
    }

    fn download(&self) -> bool {
        self.download.as_deref() == Some("true")
    }
}

pub struct Dispatcher {
    registry: MountRegistry,
    gate: CapabilityGate,
    commands: CommandGateway,
    file_info: Arc<dyn FileInfoResolver>,
    views: Arc<dyn ViewRenderer>,
    errors: Arc<dyn ErrorRenderer>,
    assets: HashMap<String, Arc<dyn RequestDelegate>>,
    default_assets: Arc<dyn RequestDelegate>,
    transfer: HashMap<String, Arc<dyn RequestDelegate>>,
    default_transfer: Arc<dyn RequestDelegate>,
    next: Arc<dyn RequestDelegate>,
}

pub struct DispatcherBuilder {
    registry: MountRegistry,
    locator: Arc<dyn ProgramLocator>,
    file_info: Arc<dyn FileInfoResolver>,
    views: Arc<dyn ViewRenderer>,
    errors: Arc<dyn ErrorRenderer>,
    assets: HashMap<String, Arc<dyn RequestDelegate>>,
    default_assets: Arc<dyn RequestDelegate>,
    transfer: HashMap<String, Arc<dyn RequestDelegate>>,
    default_transfer: Arc<dyn RequestDelegate>,
    next: Arc<dyn RequestDelegate>,
}

impl DispatcherBuilder {
    /// File-transfer handler for the mount at `base_path`.
    pub fn transfer_handler(mut self, base_path: &str, delegate: Arc<dyn RequestDelegate>) -> Self {
        self.transfer.insert(mount_key(base_path), delegate);
        self
    }

    /// File-transfer handler for mounts without a dedicated one.
    pub fn default_transfer_handler(mut self, delegate: Arc<dyn RequestDelegate>) -> Self {
        self.default_transfer = delegate;
        self
    }

    /// Asset server for the mount at `base_path`.
    pub fn asset_handler(mut self, base_path: &str, delegate: Arc<dyn RequestDelegate>) -> Self {
        self.assets.insert(mount_key(base_path), delegate);
        self
    }

    /// Asset server for mounts without a dedicated one.
    pub fn assets(mut self, delegate: Arc<dyn RequestDelegate>) -> Self {
        self.default_assets = delegate;
        self
    }

    /// Handler for requests that match no mount.
    pub fn next(mut self, delegate: Arc<dyn RequestDelegate>) -> Self {
        self.next = delegate;
        self
    }

    pub fn program_locator(mut self, locator: Arc<dyn ProgramLocator>) -> Self {
        self.locator = locator;
        self
    }

    pub fn build(self) -> Dispatcher {
        Dispatcher {
            registry: self.registry,
            gate: CapabilityGate::new(),
            commands: CommandGateway::new(self.locator),
            file_info: self.file_info,
            views: self.views,
            errors: self.errors,
            assets: self.assets,
            default_assets: self.default_assets,
            transfer: self.transfer,
            default_transfer: self.default_transfer,
            next: self.next,
        }
    }
}

impl Dispatcher {
    /// Start building a dispatcher. Delegates default to `404 Not Found` and
    /// programs are located on `PATH`.
    pub fn builder(
        registry: MountRegistry,
        file_info: Arc<dyn FileInfoResolver>,
        views: Arc<dyn ViewRenderer>,
        errors: Arc<dyn ErrorRenderer>,
    ) -> DispatcherBuilder {
        DispatcherBuilder {
            registry,
            locator: Arc::new(WhichLocator),
            file_info,
            views,
            errors,
            assets: HashMap::new(),
            default_assets: Arc::new(NotFoundDelegate),
            transfer: HashMap::new(),
            default_transfer: Arc::new(NotFoundDelegate),
            next: Arc::new(NotFoundDelegate),
        }
    }

    pub fn registry(&self) -> &MountRegistry {
        &self.registry
    }

    /// Handle one request. `credential` is the basic-auth user name, if any.
    pub async fn dispatch(&self, credential: Option<&str>, mut request: Request<Body>) -> Response {
        let browser = request.method() == Method::GET;
        let path = match canonicalize(request.uri().path()) {
            Ok(path) => path,
            Err(e) => {
                warn!(path = %request.uri().path(), error = %e, "Rejected request path");
                return self.fail(bad_request(e.to_string()), browser);
            }
        };
        match with_path(request.uri(), &path) {
            Ok(uri) => *request.uri_mut() = uri,
            Err(err) => return self.fail(err, browser),
        }

        let Some(mount) = self.registry.resolve(&path) else {
            debug!(path = %path, "No mount owns request, falling through");
            return self.next.handle(request).await;
        };

        let identity = mount.resolve_identity(credential);
        let method = request.method().clone();
        let command = header_str(request.headers(), COMMAND_HEADER)
            .filter(|c| !c.is_empty())
            .map(str::to_string);
        let classification = classify(&mount, &path, &method, command.is_some());

        debug!(
            mount = %mount.base_path,
            identity = %identity.name,
            method = %method,
            path = %path,
            classification = %classification,
            "Classified request"
        );

        let rule_path = rule_path(&mount, &path, classification);
        if let Decision::Deny(reason) = self.gate.check(identity, &Operation::Access(rule_path)) {
            return self.fail(DispatchError::AuthorizationDenied(reason), browser);
        }

        match classification {
            Classification::FileTransferPassthrough => {
                self.passthrough(&mount, identity, &method, request).await
            }
            Classification::Asset => {
                self.assets
                    .get(&mount.base_path)
                    .unwrap_or(&self.default_assets)
                    .handle(request)
                    .await
            }
            Classification::View => self.view(&mount, identity, &path, request).await,
            Classification::Command => {
                if mount.csrf_protection
                    && !mount.token().verify(header_str(request.headers(), TOKEN_HEADER))
                {
                    warn!(mount = %mount.base_path, identity = %identity.name, "Missing or invalid anti-forgery token");
                    return StatusCode::FORBIDDEN.into_response();
                }
                let command = command.unwrap_or_default();
                match self.commands.execute(&mount, identity, &command, &path).await {
                    Ok(output) => Json(output).into_response(),
                    Err(err) => self.fail(err, false),
                }
            }
            Classification::Unsupported => self.fail(DispatchError::ClassificationUnsupported, false),
        }
    }

    async fn passthrough(
        &self,
        mount: &Mount,
        identity: &Identity,
        method: &Method,
        request: Request<Body>,
    ) -> Response {
        if let Some(operation) = Operation::for_transfer_method(method) {
            if let Decision::Deny(reason) = self.gate.check(identity, &operation) {
                return self.fail(DispatchError::AuthorizationDenied(reason), false);
            }
        }
        self.transfer_handler(mount).handle(request).await
    }

    async fn view(
        &self,
        mount: &Mount,
        identity: &Identity,
        path: &str,
        mut request: Request<Body>,
    ) -> Response {
        let info = match self.file_info.get_info(mount, identity, path).await {
            Ok(info) => info,
            Err(err) => return self.fail(err.into(), true),
        };

        if needs_trailing_slash_redirect(info.is_directory, path) {
            let location = encode(&trailing_slash_location(&mount.address_prefix, path));
            return Redirect::temporary(&location).into_response();
        }

        let token = mount.ensure_token();

        if !info.is_directory {
            let query = ViewQuery::from_uri(request.uri());
            if query.raw() || query.download() {
                match with_path(request.uri(), &mount.to_file_transfer_path(path)) {
                    Ok(uri) => *request.uri_mut() = uri,
                    Err(err) => return self.fail(err, true),
                }

                let mut response = self.transfer_handler(mount).handle(request).await;
                if query.download() {
                    match HeaderValue::from_str(&format!("attachment; filename={}", info.name)) {
                        Ok(value) => {
                            response.headers_mut().insert(CONTENT_DISPOSITION, value);
                        }
                        Err(_) => warn!(name = %info.name, "File name not usable in Content-Disposition"),
                    }
                }
                return response;
            }
        }

        let context = ViewContext {
            mount,
            identity,
            request_path: path,
            token: &token,
        };
        match self.views.render(&info, context).await {
            Ok(response) => response,
            Err(err) => self.fail(err.into(), true),
        }
    }

    fn transfer_handler(&self, mount: &Mount) -> &Arc<dyn RequestDelegate> {
        self.transfer
            .get(&mount.base_path)
            .unwrap_or(&self.default_transfer)
    }

    fn fail(&self, err: DispatchError, browser: bool) -> Response {
        if err.is_denial() {
            warn!(error = %err, "Request denied");
        }
        if browser {
            self.errors.render_html(err.status_code(), &err.to_string())
        } else {
            err.into_response()
        }
    }
}

fn bad_request(message: String) -> DispatchError {
    DispatchError::ResolutionFailure {
        status: StatusCode::BAD_REQUEST,
        message,
    }
}

/// `uri` with its path replaced by the encoded form of a canonical `path`;
/// the query string is kept.
fn with_path(uri: &Uri, path: &str) -> Result<Uri, DispatchError> {
    let target = match uri.query() {
        Some(q) => format!("{}?{}", encode(path), q),
        None => encode(path),
    };
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(
        target
            .parse::<PathAndQuery>()
            .map_err(|e| bad_request(e.to_string()))?,
    );
    Uri::from_parts(parts).map_err(|e| bad_request(e.to_string()))
}

fn mount_key(base_path: &str) -> String {
    let key = base_path.trim_end_matches('/');
    if key.is_empty() { "/" } else { key }.to_string()
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Path identity rules are evaluated against: relative to the file-transfer
/// prefix for passthrough requests, to the base path otherwise.
fn rule_path<'a>(mount: &Mount, path: &'a str, classification: Classification) -> &'a str {
    if classification == Classification::FileTransferPassthrough
        && path_matches(path, &mount.file_transfer_prefix)
    {
        let rest = path
            .strip_prefix(mount.file_transfer_prefix.trim_end_matches('/'))
            .unwrap_or(path);
        return if rest.is_empty() { "/" } else { rest };
    }
    mount.relative_path(path)
}
