// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain layer: mounts, identities and the pure decisions taken about a
//! request before any side effect happens.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Routing, authorization and classification rules

pub mod capability;
pub mod classification;
pub mod delegate;
pub mod errors;
pub mod file_info;
pub mod gateway_config;
pub mod identity;
pub mod mount;
pub mod mount_registry;
pub mod path_sanitizer;
pub mod redirect;
pub mod request_path;
pub mod token;
