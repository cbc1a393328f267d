// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Capability Gate
//!
//! Pure allow/deny decisions for an [`Identity`] and an [`Operation`]. Callers
//! consult the gate before any filesystem or subprocess side effect and turn a
//! [`Decision::Deny`] into a forbidden response.
//!
//! | Operation | Required |
//! |-----------|----------|
//! | [`Operation::Access`] | no identity rule denies the path |
//! | [`Operation::Modify`] | `allow_edit` |
//! | [`Operation::Create`] | `allow_new` |
//! | [`Operation::Execute`] | `allow_command_execution` and program listed |

use axum::http::Method;

use super::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation<'a> {
    /// Reach a mount-relative path at all.
    Access(&'a str),
    /// Update, move, delete or partially update an existing resource.
    Modify,
    /// Create a new resource or collection.
    Create,
    /// Run the named external program.
    Execute(&'a str),
}

impl Operation<'_> {
    /// Capability required by a file-transfer verb, if any.
    pub fn for_transfer_method(method: &Method) -> Option<Operation<'static>> {
        match method.as_str() {
            "PROPPATCH" | "MOVE" | "PATCH" | "PUT" | "DELETE" => Some(Operation::Modify),
            "MKCOL" | "COPY" => Some(Operation::Create),
            _ => None,
        }
    }
}

/// Gate decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(String),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct CapabilityGate;

impl CapabilityGate {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, identity: &Identity, operation: &Operation<'_>) -> Decision {
        let allowed = match operation {
            Operation::Access(path) => identity.path_allowed(path),
            Operation::Modify => identity.allow_edit,
            Operation::Create => identity.allow_new,
            Operation::Execute(program) => identity.may_run(program),
        };

        if allowed {
            return Decision::Allow;
        }

        let reason = match operation {
            Operation::Access(path) => format!("access to {} is not allowed", path),
            Operation::Modify => "editing existing resources is not allowed".to_string(),
            Operation::Create => "creating resources is not allowed".to_string(),
            Operation::Execute(program) if !identity.allow_command_execution => {
                format!("command execution is disabled (requested '{}')", program)
            }
            Operation::Execute(program) => format!("command '{}' is not allowed", program),
        };
        tracing::warn!(identity = %identity.name, reason = %reason, "Capability denied");
        Decision::Deny(reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::identity::AccessRule;

    #[test]
    fn test_modify_and_create_flags() {
        let gate = CapabilityGate::new();
        let reader = Identity::new("reader");
        let editor = Identity::new("editor").with_edit(true);
        let creator = Identity::new("creator").with_new(true);

        assert!(!gate.check(&reader, &Operation::Modify).is_allowed());
        assert!(!gate.check(&reader, &Operation::Create).is_allowed());
        assert!(gate.check(&editor, &Operation::Modify).is_allowed());
        assert!(!gate.check(&editor, &Operation::Create).is_allowed());
        assert!(gate.check(&creator, &Operation::Create).is_allowed());
    }

    #[test]
    fn test_execute_requires_listing() {
        let gate = CapabilityGate::new();
        let git_only = Identity::new("dev").with_commands(["git"]);
        let nothing = Identity::new("dev").with_commands(Vec::<String>::new());

        assert_eq!(gate.check(&git_only, &Operation::Execute("git")), Decision::Allow);
        assert!(!gate.check(&git_only, &Operation::Execute("rm")).is_allowed());
        assert!(!gate.check(&git_only, &Operation::Execute("")).is_allowed());
        assert!(!gate.check(&nothing, &Operation::Execute("git")).is_allowed());
        assert!(!gate.check(&Identity::new("anon"), &Operation::Execute("git")).is_allowed());
    }

    #[test]
    fn test_access_rules() {
        let gate = CapabilityGate::new();
        let identity = Identity::new("guest").with_rule(AccessRule::deny_prefix("/secret"));

        assert!(gate.check(&identity, &Operation::Access("/public/a")).is_allowed());
        assert!(matches!(
            gate.check(&identity, &Operation::Access("/secret/a")),
            Decision::Deny(_)
        ));
    }

    #[test]
    fn test_transfer_method_mapping() {
        for verb in ["PROPPATCH", "MOVE", "PATCH", "PUT", "DELETE"] {
            let method = Method::from_bytes(verb.as_bytes()).unwrap();
            assert_eq!(Operation::for_transfer_method(&method), Some(Operation::Modify), "{verb}");
        }
        for verb in ["MKCOL", "COPY"] {
            let method = Method::from_bytes(verb.as_bytes()).unwrap();
            assert_eq!(Operation::for_transfer_method(&method), Some(Operation::Create), "{verb}");
        }
        for verb in ["GET", "HEAD", "OPTIONS", "PROPFIND", "LOCK", "UNLOCK"] {
            let method = Method::from_bytes(verb.as_bytes()).unwrap();
            assert_eq!(Operation::for_transfer_method(&method), None, "{verb}");
        }
    }
}
