// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Presentation Layer (`dirgate-core`)
//!
//! HTTP surface that hands every request to the
//! [`crate::application::Dispatcher`]. **No decisions live here**: this layer
//! only extracts the basic-auth user name and wires tracing.

pub mod api;
