// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Anti-Forgery Token Store
//!
//! Each mount owns one [`TokenStore`]. Views call [`TokenStore::ensure`]
//! before rendering forms; mutating requests present the token back in the
//! `Token` header and are checked with [`TokenStore::verify`].
//!
//! Generation and replacement happen under a single lock, so concurrent
//! first-time callers all observe the same token.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use rand_core::{OsRng, RngCore};
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone)]
struct IssuedToken {
    value: String,
    issued_at: Instant,
}

#[derive(Debug)]
pub struct TokenStore {
    current: Mutex<Option<IssuedToken>>,
    ttl: Duration,
}

impl TokenStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            current: Mutex::new(None),
            ttl,
        }
    }

    /// Return the live token, generating a fresh one if none exists or the
    /// current one is older than the validity window.
    pub fn ensure(&self) -> String {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some(token) if token.issued_at.elapsed() < self.ttl => token.value.clone(),
            _ => {
                let token = IssuedToken {
                    value: generate(),
                    issued_at: Instant::now(),
                };
                tracing::debug!("Issued new anti-forgery token");
                let value = token.value.clone();
                *current = Some(token);
                value
            }
        }
    }

    /// Constant-time comparison against the live token. An expired or
    /// never-issued token never verifies.
    pub fn verify(&self, presented: Option<&str>) -> bool {
        let Some(presented) = presented else {
            return false;
        };
        let current = self.current.lock();
        match current.as_ref() {
            Some(token) if token.issued_at.elapsed() < self.ttl => {
                token.value.as_bytes().ct_eq(presented.as_bytes()).into()
            }
            _ => false,
        }
    }

    /// Current token without generating one.
    pub fn peek(&self) -> Option<String> {
        self.current.lock().as_ref().map(|t| t.value.clone())
    }
}

fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    STANDARD.encode(bytes)
}
