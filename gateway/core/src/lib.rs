// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # dirgate core
//!
//! Dispatch and authorization engine for a gateway that exposes directory
//! trees over HTTP. For each request it resolves the mount and identity,
//! classifies the request, checks capabilities and then hands off to the
//! file-transfer handler, the asset server, the view renderer or the command
//! gateway.
//!
//! # Architecture
//!
//! | Layer | Contents |
//! |-------|----------|
//! | [`domain`] | mounts, identities, capability gate, classifier |
//! | [`application`] | dispatcher, command gateway |
//! | [`infrastructure`] | filesystem-backed collaborators |
//! | [`presentation`] | axum router |

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;

pub use domain::*;
