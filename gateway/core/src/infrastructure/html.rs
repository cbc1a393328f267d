// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Minimal HTML renderers.
//!
//! [`HtmlErrorRenderer`] turns a status and message into an error page.
//! [`SimpleViewRenderer`] produces a plain directory listing or file page with
//! the mount's anti-forgery token in a `<meta>` tag for scripts that issue
//! mutating requests.

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use std::fmt::Write;

use crate::domain::file_info::{ErrorRenderer, FileInfo, FileInfoError, ViewContext, ViewRenderer};
use crate::domain::request_path::encode_segment;

fn escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlErrorRenderer;

impl ErrorRenderer for HtmlErrorRenderer {
    fn render_html(&self, status: StatusCode, message: &str) -> Response {
        let title = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Error")
        );
        let page = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{title}</title></head>\
             <body><h1>{title}</h1><p>{message}</p></body></html>\n",
            title = escape(&title),
            message = escape(message),
        );
        (status, Html(page)).into_response()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleViewRenderer;

#[async_trait]
impl ViewRenderer for SimpleViewRenderer {
    async fn render(&self, info: &FileInfo, context: ViewContext<'_>) -> Result<Response, FileInfoError> {
        let mut body = String::new();

        if info.is_directory {
            let mut names = Vec::new();
            let mut entries = tokio::fs::read_dir(&info.path)
                .await
                .map_err(|e| FileInfoError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| FileInfoError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
            {
                let name = entry.file_name().to_string_lossy().into_owned();
                let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
                names.push((name, is_dir));
            }
            names.sort();

            body.push_str("<ul>");
            for (name, is_dir) in names {
                let suffix = if is_dir { "/" } else { "" };
                let _ = write!(
                    body,
                    "<li><a href=\"{href}{suffix}\">{label}{suffix}</a></li>",
                    href = escape(&encode_segment(&name)),
                    label = escape(&name),
                );
            }
            body.push_str("</ul>");
        } else {
            let _ = write!(
                body,
                "<p>{name} ({size} bytes)</p>\
                 <p><a href=\"{href}?raw=true\">raw</a> | <a href=\"{href}?download=true\">download</a></p>",
                name = escape(&info.name),
                href = escape(&encode_segment(&info.name)),
                size = info.size,
            );
        }

        let page = format!(
            "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\">\
             <meta name=\"csrf-token\" content=\"{token}\">\
             <meta name=\"user\" content=\"{user}\">\
             <title>{title}</title></head><body><h1>{title}</h1>{body}</body></html>\n",
            token = escape(context.token),
            user = escape(&context.identity.name),
            title = escape(context.request_path),
        );
        Ok(Html(page).into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::Identity;
    use crate::domain::mount::Mount;

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_error_page_escapes_message() {
        let response = HtmlErrorRenderer.render_html(StatusCode::NOT_FOUND, "<script>");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let text = body_text(response).await;
        assert!(text.contains("404 Not Found"));
        assert!(text.contains("&lt;script&gt;"));
    }

    #[tokio::test]
    async fn test_listing_embeds_token() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), b"").unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();

        let mount = Mount::new("/fm", dir.path());
        let identity = Identity::new("alice");
        let info = FileInfo {
            name: "fm".to_string(),
            path: dir.path().to_path_buf(),
            is_directory: true,
            size: 0,
        };
        let context = ViewContext {
            mount: &mount,
            identity: &identity,
            request_path: "/fm/",
            token: "tok123",
        };

        let text = body_text(SimpleViewRenderer.render(&info, context).await.unwrap()).await;
        assert!(text.contains("content=\"tok123\""));
        let a = text.find("href=\"a/\"").unwrap();
        let b = text.find("href=\"b.txt\"").unwrap();
        assert!(a < b);
    }

    #[tokio::test]
    async fn test_listing_links_are_encoded() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("my notes#1.txt"), b"").unwrap();

        let mount = Mount::new("/fm", dir.path());
        let identity = Identity::new("default");
        let info = FileInfo {
            name: "fm".to_string(),
            path: dir.path().to_path_buf(),
            is_directory: true,
            size: 0,
        };
        let context = ViewContext {
            mount: &mount,
            identity: &identity,
            request_path: "/fm/",
            token: "",
        };

        let text = body_text(SimpleViewRenderer.render(&info, context).await.unwrap()).await;
        assert!(text.contains("href=\"my%20notes%231.txt\""));
        assert!(text.contains(">my notes#1.txt</a>"));
    }
}
