//! External command execution.

use async_trait::async_trait;
use ct_types::{ControlError, ControlResult};
use std::path::Path;
use tokio::process::Command;
use tracing::debug;

/// EINVAL, which `ceph` returns for settings it accepts but reports on.
const EINVAL: i32 = 22;

/// Runs one external command to completion and returns its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &Path, args: &[String]) -> ControlResult<String>;
}

/// Runs commands as child processes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRunner {
    /// Non-zero exit statuses treated as success.
    tolerated_statuses: Vec<i32>,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            tolerated_statuses: vec![EINVAL],
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tolerated_statuses(mut self, statuses: Vec<i32>) -> Self {
        self.tolerated_statuses = statuses;
        self
    }

    fn is_tolerated(&self, status: Option<i32>) -> bool {
        status.is_some_and(|code| self.tolerated_statuses.contains(&code))
    }
}

pub(crate) fn describe(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &Path, args: &[String]) -> ControlResult<String> {
        let command = describe(program, args);
        debug!(command = %command, "executing");

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|e| ControlError::Spawn {
                command: command.clone(),
                message: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        if output.status.success() || self.is_tolerated(output.status.code()) {
            return Ok(stdout);
        }

        Err(ControlError::CommandFailed {
            command,
            status: output.status.code().unwrap_or(-1),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_joins_program_and_args() {
        let line = describe(
            Path::new("/usr/bin/ceph"),
            &["config".to_string(), "get".to_string(), "osd.0".to_string()],
        );
        assert_eq!(line, "/usr/bin/ceph config get osd.0");
    }

    #[test]
    fn einval_is_tolerated_by_default() {
        let runner = ProcessRunner::new();
        assert!(runner.is_tolerated(Some(22)));
        assert!(!runner.is_tolerated(Some(1)));
        assert!(!runner.is_tolerated(None));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let runner = ProcessRunner::new();
        let out = runner
            .run(Path::new("/bin/sh"), &["-c".to_string(), "echo ok".to_string()])
            .await
            .unwrap();
        assert_eq!(out.trim(), "ok");
    }

    #[test]
    fn tolerated_statuses_can_be_replaced() {
        let runner = ProcessRunner::new().with_tolerated_statuses(vec![3]);
        assert!(runner.is_tolerated(Some(3)));
        assert!(!runner.is_tolerated(Some(22)));

        let strict = ProcessRunner::new().with_tolerated_statuses(Vec::new());
        assert!(!strict.is_tolerated(Some(22)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn tolerated_status_counts_as_success() {
        let runner = ProcessRunner::new();
        let out = runner
            .run(
                Path::new("/bin/sh"),
                &["-c".to_string(), "echo partial; exit 22".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(out.trim(), "partial");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn other_failures_carry_status_and_stderr() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(
                Path::new("/bin/sh"),
                &["-c".to_string(), "echo boom >&2; exit 3".to_string()],
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            ControlError::CommandFailed {
                command: "/bin/sh -c echo boom >&2; exit 3".to_string(),
                status: 3,
                stderr: "boom".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let runner = ProcessRunner::new();
        let err = runner
            .run(Path::new("/nonexistent/ceph"), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::Spawn { .. }));
    }
}
