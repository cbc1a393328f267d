// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Directory URL normalization.

/// True iff the resource is a directory and the path lacks a trailing `/`.
pub fn needs_trailing_slash_redirect(is_directory: bool, request_path: &str) -> bool {
    is_directory && !request_path.ends_with('/')
}

/// Redirect target for a directory request, keeping the externally visible
/// address prefix in front of the request path.
pub fn trailing_slash_location(address_prefix: &str, request_path: &str) -> String {
    format!("{}{}/", address_prefix.trim_end_matches('/'), request_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_law() {
        assert!(needs_trailing_slash_redirect(true, "/docs"));
        assert!(!needs_trailing_slash_redirect(true, "/docs/"));
        assert!(!needs_trailing_slash_redirect(false, "/docs"));
        assert!(!needs_trailing_slash_redirect(false, "/docs/"));
    }

    #[test]
    fn test_location_keeps_address_prefix() {
        assert_eq!(trailing_slash_location("", "/fm/docs"), "/fm/docs/");
        assert_eq!(trailing_slash_location("/site/", "/fm/docs"), "/site/fm/docs/");
    }
}
