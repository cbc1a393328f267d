// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Command Gateway Application Service
//!
//! Validates and runs an allow-listed external program inside a mount.
//!
//! ## Pipeline
//! 1. Split the raw command line on whitespace into program and arguments
//! 2. Capability gate: `Execute(program)` for the resolved identity
//! 3. Locate the program on this host (`which`)
//! 4. Map the request path into the mount's scope and refuse escapes
//! 5. Run it once, capturing stdout and stderr interleaved through one pipe
//!
//! A denial at any of steps 1-4 happens before a process is spawned.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** External command execution scoped to a mount directory

use parking_lot::Mutex;
use serde::Serialize;
use std::io::{ErrorKind, PipeReader, Read};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::domain::capability::{CapabilityGate, Decision, Operation};
use crate::domain::errors::DispatchError;
use crate::domain::identity::Identity;
use crate::domain::mount::Mount;
use crate::domain::path_sanitizer::PathSanitizer;

/// Resolves a program name to an executable on this host.
pub trait ProgramLocator: Send + Sync {
    fn locate(&self, program: &str) -> Option<PathBuf>;
}

/// `PATH` lookup through the `which` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhichLocator;

impl ProgramLocator for WhichLocator {
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }
}

/// One execution request, owned by the handling request and dropped with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    pub program: String,
    pub arguments: Vec<String>,
    pub working_directory: PathBuf,
}

/// Successful command result as serialized in the response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutput {
    pub data: String,
}

/// Split on whitespace. `None` for a blank command line.
pub fn tokenize(raw: &str) -> Option<(String, Vec<String>)> {
    let mut parts = raw.split_whitespace();
    let program = parts.next()?.to_string();
    Some((program, parts.map(str::to_string).collect()))
}

pub struct CommandGateway {
    gate: CapabilityGate,
    locator: Arc<dyn ProgramLocator>,
    sanitizer: PathSanitizer,
}

impl CommandGateway {
    pub fn new(locator: Arc<dyn ProgramLocator>) -> Self {
        Self {
            gate: CapabilityGate::new(),
            locator,
            sanitizer: PathSanitizer::new(),
        }
    }

    /// Validate the request and build the invocation without running it.
    ///
    /// # Errors
    /// - `AuthorizationDenied` for a blank command line, an unlisted program,
    ///   or a working directory outside the mount's scope
    /// - `EnvironmentUnavailable` when the program cannot be located
    pub fn prepare(
        &self,
        mount: &Mount,
        identity: &Identity,
        raw_command_line: &str,
        request_path: &str,
    ) -> Result<(CommandInvocation, PathBuf), DispatchError> {
        let (program, arguments) = tokenize(raw_command_line)
            .ok_or_else(|| DispatchError::AuthorizationDenied("empty command".to_string()))?;

        if let Decision::Deny(reason) = self.gate.check(identity, &Operation::Execute(&program)) {
            return Err(DispatchError::AuthorizationDenied(reason));
        }

        let executable = self.locator.locate(&program).ok_or_else(|| {
            warn!(program = %program, "Allowed program is not installed");
            DispatchError::EnvironmentUnavailable(program.clone())
        })?;

        let working_directory = self
            .sanitizer
            .confine(mount.relative_path(request_path), &mount.path_scope)?;

        Ok((
            CommandInvocation {
                program,
                arguments,
                working_directory,
            },
            executable,
        ))
    }

    pub async fn execute(
        &self,
        mount: &Mount,
        identity: &Identity,
        raw_command_line: &str,
        request_path: &str,
    ) -> Result<CommandOutput, DispatchError> {
        let (invocation, executable) = self.prepare(mount, identity, raw_command_line, request_path)?;

        info!(
            mount = %mount.base_path,
            identity = %identity.name,
            program = %invocation.program,
            cwd = %invocation.working_directory.display(),
            "Executing command"
        );

        run(&invocation, &executable, mount.command_timeout).await
    }
}

/// Grace period for draining the output pipe once the process is gone.
const OUTPUT_DRAIN: Duration = Duration::from_secs(2);

fn launch_failure(program: &str, e: std::io::Error) -> DispatchError {
    error!(program = %program, error = %e, "Command failed to launch");
    DispatchError::ExecutionFailure {
        message: format!("failed to launch {}: {}", program, e),
        output: String::new(),
    }
}

/// Copy everything written to the pipe into `sink` until every writer closes.
fn collect(mut reader: PipeReader, sink: &Mutex<Vec<u8>>) {
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => sink.lock().extend_from_slice(&chunk[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break,
        }
    }
}

fn snapshot(captured: &Mutex<Vec<u8>>) -> String {
    String::from_utf8_lossy(&captured.lock()).into_owned()
}

async fn run(
    invocation: &CommandInvocation,
    executable: &Path,
    timeout: Option<Duration>,
) -> Result<CommandOutput, DispatchError> {
    let program = invocation.program.as_str();

    // stdout and stderr share one pipe so the output keeps the order it was written in.
    let (reader, writer) = std::io::pipe().map_err(|e| launch_failure(program, e))?;
    let stderr = writer.try_clone().map_err(|e| launch_failure(program, e))?;

    let mut cmd = tokio::process::Command::new(executable);
    cmd.args(&invocation.arguments)
        .current_dir(&invocation.working_directory)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(stderr)
        .kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| launch_failure(program, e))?;
    // Close the parent's copies of the write end.
    drop(cmd);

    let captured = Arc::new(Mutex::new(Vec::new()));
    let mut collector = tokio::task::spawn_blocking({
        let captured = captured.clone();
        move || collect(reader, &captured)
    });

    let outcome = match timeout {
        Some(limit) => tokio::time::timeout(limit, child.wait()).await.ok(),
        None => Some(child.wait().await),
    };

    let Some(status) = outcome else {
        let _ = child.start_kill();
        let _ = child.wait().await;
        let _ = tokio::time::timeout(OUTPUT_DRAIN, &mut collector).await;
        let limit = timeout.unwrap_or_default();
        error!(program = %program, "Command timed out after {:?}", limit);
        return Err(DispatchError::ExecutionFailure {
            message: format!("timed out after {:?}", limit),
            output: snapshot(&captured),
        });
    };

    let status = status.map_err(|e| launch_failure(program, e))?;
    if tokio::time::timeout(OUTPUT_DRAIN, &mut collector).await.is_err() {
        warn!(program = %program, "Output pipe still open after exit, returning what was read");
    }
    let combined = snapshot(&captured);

    if !status.success() {
        error!(program = %program, status = %status, "Command exited with failure");
        return Err(DispatchError::ExecutionFailure {
            message: format!("{} exited with {}", program, status),
            output: combined,
        });
    }

    Ok(CommandOutput { data: combined })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedLocator(Option<&'static str>);

    impl ProgramLocator for FixedLocator {
        fn locate(&self, _program: &str) -> Option<PathBuf> {
            self.0.map(PathBuf::from)
        }
    }

    fn gateway(found: Option<&'static str>) -> CommandGateway {
        CommandGateway::new(Arc::new(FixedLocator(found)))
    }

    fn mount() -> Mount {
        Mount::new("/fm", "/srv/files")
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("git  log --oneline"),
            Some(("git".to_string(), vec!["log".to_string(), "--oneline".to_string()]))
        );
        assert_eq!(tokenize("   "), None);
        assert_eq!(tokenize(""), None);
    }

    #[test]
    fn test_blank_command_is_denied() {
        let identity = Identity::new("dev").with_commands(["git"]);
        let err = gateway(Some("/usr/bin/git"))
            .prepare(&mount(), &identity, "  ", "/fm/repo")
            .unwrap_err();
        assert!(err.is_denial());
    }

    #[test]
    fn test_unlisted_program_denied_even_if_installed() {
        let identity = Identity::new("dev").with_commands(["git"]);
        let err = gateway(Some("/bin/rm"))
            .prepare(&mount(), &identity, "rm -rf /", "/fm/repo")
            .unwrap_err();
        assert!(err.is_denial());
    }

    #[test]
    fn test_unlisted_program_denied_when_missing() {
        let identity = Identity::new("dev").with_commands(["git"]);
        let err = gateway(None)
            .prepare(&mount(), &identity, "hg status", "/fm/repo")
            .unwrap_err();
        assert!(err.is_denial());
    }

    #[test]
    fn test_missing_program_is_environment_unavailable() {
        let identity = Identity::new("dev").with_commands(["git"]);
        let err = gateway(None)
            .prepare(&mount(), &identity, "git status", "/fm/repo")
            .unwrap_err();
        assert!(matches!(err, DispatchError::EnvironmentUnavailable(ref p) if p == "git"));
    }

    #[test]
    fn test_working_directory_mapping() {
        let identity = Identity::new("dev").with_commands(["git"]);
        let (invocation, executable) = gateway(Some("/usr/bin/git"))
            .prepare(&mount(), &identity, "git status --short", "/fm/repo/./src/../docs")
            .unwrap();

        assert_eq!(executable, Path::new("/usr/bin/git"));
        assert_eq!(invocation.program, "git");
        assert_eq!(invocation.arguments, vec!["status", "--short"]);
        assert_eq!(invocation.working_directory, Path::new("/srv/files/repo/docs"));
    }

    #[test]
    fn test_working_directory_escape_denied() {
        let identity = Identity::new("dev").with_commands(["git"]);
        let err = gateway(Some("/usr/bin/git"))
            .prepare(&mount(), &identity, "git status", "/fm/../../etc")
            .unwrap_err();
        assert!(err.is_denial());
    }

    fn shell(script: &str, cwd: &Path) -> Option<(CommandInvocation, PathBuf)> {
        let sh = which::which("sh").ok()?;
        let invocation = CommandInvocation {
            program: "sh".to_string(),
            arguments: vec!["-c".to_string(), script.to_string()],
            working_directory: cwd.to_path_buf(),
        };
        Some((invocation, sh))
    }

    #[tokio::test]
    async fn test_output_keeps_write_order_across_streams() {
        let dir = tempfile::tempdir().unwrap();
        let Some((invocation, sh)) = shell("echo out; echo err 1>&2; echo out2", dir.path()) else {
            return;
        };

        let output = run(&invocation, &sh, Some(Duration::from_secs(10))).await.unwrap();
        assert_eq!(output.data, "out\nerr\nout2\n");
    }

    #[tokio::test]
    async fn test_failure_output_includes_stderr_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let Some((invocation, sh)) = shell("echo first; echo broken 1>&2; exit 3", dir.path()) else {
            return;
        };

        match run(&invocation, &sh, None).await.unwrap_err() {
            DispatchError::ExecutionFailure { output, .. } => assert_eq!(output, "first\nbroken\n"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_keeps_output_written_before_kill() {
        let dir = tempfile::tempdir().unwrap();
        let Some((invocation, sh)) = shell("echo started; exec sleep 10", dir.path()) else {
            return;
        };

        let started = std::time::Instant::now();
        let err = run(&invocation, &sh, Some(Duration::from_millis(500))).await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(5));
        match err {
            DispatchError::ExecutionFailure { message, output } => {
                assert!(message.starts_with("timed out"));
                assert_eq!(output, "started\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
