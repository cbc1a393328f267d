// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Request path canonicalization.
//!
//! The dispatcher decides on exactly one form of the URL path: percent-decoded,
//! `.`/`..` collapsed, duplicate slashes removed, trailing slash kept. Mount
//! resolution, classification, identity rules, file lookup and command working
//! directories all see that form, and delegates receive it re-encoded.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};

use super::path_sanitizer::{PathSanitizer, PathSanitizerError};

/// Bytes escaped when a decoded path goes back into a URI. `/` is kept.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Escape set for a single path segment, e.g. a file name in a link.
const SEGMENT: &AsciiSet = &PATH.add(b'/');

/// Decode and normalize a raw URI path.
///
/// # Errors
/// `InvalidPath` when the decoded bytes are not UTF-8 or contain NUL.
pub fn canonicalize(raw: &str) -> Result<String, PathSanitizerError> {
    let decoded = percent_decode_str(raw)
        .decode_utf8()
        .map_err(|_| PathSanitizerError::InvalidPath("path is not valid UTF-8".to_string()))?;

    let rooted = if decoded.starts_with('/') {
        decoded.into_owned()
    } else {
        format!("/{}", decoded)
    };

    let normalized = PathSanitizer::new().normalize(&rooted)?;
    let mut path = normalized.to_string_lossy().into_owned();
    if path.is_empty() {
        path.push('/');
    }
    if rooted.ends_with('/') && !path.ends_with('/') {
        path.push('/');
    }
    Ok(path)
}

/// Percent-encode a canonical path for use in a URI or `Location` header.
pub fn encode(path: &str) -> String {
    utf8_percent_encode(path, PATH).to_string()
}

/// Percent-encode one path segment.
pub fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, SEGMENT).to_string()
}
