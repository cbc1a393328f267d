// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod html;
pub mod local_files;
pub mod static_files;

pub use html::{HtmlErrorRenderer, SimpleViewRenderer};
pub use local_files::LocalFileInfoResolver;
pub use static_files::StaticFilesDelegate;
