// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Identity Value Objects
//!
//! An [`Identity`] is the permission profile every decision of the dispatch
//! engine is taken against. Identities are built once from configuration and
//! are never mutated while requests are being served.
//!
//! ## Path Rules
//!
//! [`AccessRule`]s restrict which mount-relative paths an identity may touch.
//! Rules are evaluated from the last one declared to the first; the first rule
//! whose matcher hits decides. A path no rule matches is allowed.

use regex::Regex;
use std::collections::BTreeSet;

use super::mount::path_matches;

/// How an [`AccessRule`] selects paths.
#[derive(Debug, Clone)]
pub enum PathMatcher {
    /// Literal prefix of the mount-relative path, matched on whole segments.
    Prefix(String),
    /// Regular expression searched anywhere in the mount-relative path.
    Pattern(Regex),
}

impl PathMatcher {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathMatcher::Prefix(prefix) => path_matches(path, prefix),
            PathMatcher::Pattern(regex) => regex.is_match(path),
        }
    }
}

/// A single allow/deny rule.
#[derive(Debug, Clone)]
pub struct AccessRule {
    pub matcher: PathMatcher,
    pub allow: bool,
}

impl AccessRule {
    pub fn allow_prefix(prefix: impl Into<String>) -> Self {
        Self { matcher: PathMatcher::Prefix(prefix.into()), allow: true }
    }

    pub fn deny_prefix(prefix: impl Into<String>) -> Self {
        Self { matcher: PathMatcher::Prefix(prefix.into()), allow: false }
    }

    pub fn pattern(regex: Regex, allow: bool) -> Self {
        Self { matcher: PathMatcher::Pattern(regex), allow }
    }
}

/// Permission profile attached to a mount.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    /// Name the identity was configured under (`"default"` for the mount-wide one).
    pub name: String,
    /// Update, move, delete and partial-update of existing resources.
    pub allow_edit: bool,
    /// Creation of new resources and collections.
    pub allow_new: bool,
    /// Master switch for external commands.
    pub allow_command_execution: bool,
    /// Program names this identity may run when `allow_command_execution` is set.
    pub allowed_commands: BTreeSet<String>,
    pub rules: Vec<AccessRule>,
}

impl Identity {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn with_edit(mut self, allow: bool) -> Self {
        self.allow_edit = allow;
        self
    }

    pub fn with_new(mut self, allow: bool) -> Self {
        self.allow_new = allow;
        self
    }

    /// Enable command execution restricted to `commands`.
    pub fn with_commands<I, S>(mut self, commands: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow_command_execution = true;
        self.allowed_commands = commands.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rule(mut self, rule: AccessRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Whether `path` (relative to the mount base path) is reachable.
    pub fn path_allowed(&self, path: &str) -> bool {
        self.rules
            .iter()
            .rev()
            .find(|rule| rule.matcher.matches(path))
            .map(|rule| rule.allow)
            .unwrap_or(true)
    }

    pub fn may_run(&self, program: &str) -> bool {
        self.allow_command_execution && self.allowed_commands.contains(program)
    }
}
