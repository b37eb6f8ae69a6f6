//! Orchestration-tool seam.
//!
//! [`ComposeTool`] is the capability the reconciler needs from the container
//! orchestrator; [`DockerCompose`] shells out to `docker-compose` (or
//! `docker compose`) with `-f <manifest>` ahead of every subcommand.

use std::path::Path;
use std::process::{Command, Output, Stdio};

use serde::Serialize;

use crate::error::ComposeError;

/// Service counts reported by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServiceCounts {
    pub running: usize,
    pub total: usize,
}

/// Operations the reconciler performs against the orchestrator.
pub trait ComposeTool {
    /// Check the manifest; a failure carries the tool's diagnostics.
    fn validate(&self, manifest: &Path) -> Result<(), ComposeError>;

    fn stop(&self, manifest: &Path) -> Result<(), ComposeError>;

    fn pull(&self, manifest: &Path) -> Result<(), ComposeError>;

    /// Start all services detached and remove orphans.
    fn start(&self, manifest: &Path) -> Result<(), ComposeError>;

    fn status(&self, manifest: &Path) -> Result<ServiceCounts, ComposeError>;

    /// Command line shown to operators in hints.
    fn display_name(&self) -> String {
        "docker-compose".to_string()
    }
}

/// [`ComposeTool`] backed by a compose CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerCompose {
    program: String,
    leading_args: Vec<String>,
}

impl Default for DockerCompose {
    fn default() -> Self {
        Self {
            program: "docker-compose".to_string(),
            leading_args: Vec::new(),
        }
    }
}

impl DockerCompose {
    /// Parse a whitespace-separated command line such as `"docker compose"`.
    ///
    /// Falls back to `docker-compose` when `command_line` is blank.
    pub fn from_command_line(command_line: &str) -> Self {
        let mut words = command_line.split_whitespace().map(str::to_string);
        match words.next() {
            Some(program) => Self {
                program,
                leading_args: words.collect(),
            },
            None => Self::default(),
        }
    }

    fn command(&self, manifest: &Path, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args).arg("-f").arg(manifest).args(args);
        cmd
    }

    fn describe(&self, manifest: &Path, args: &[&str]) -> String {
        let mut parts = vec![self.program.clone()];
        parts.extend(self.leading_args.iter().cloned());
        parts.push("-f".to_string());
        parts.push(manifest.display().to_string());
        parts.extend(args.iter().map(|a| a.to_string()));
        parts.join(" ")
    }

    /// Run with captured output; stdout is returned on success.
    fn captured(&self, manifest: &Path, args: &[&str]) -> Result<String, ComposeError> {
        let command = self.describe(manifest, args);
        tracing::debug!("running {command}");
        let output = self
            .command(manifest, args)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ComposeError::Spawn {
                command: command.clone(),
                source,
            })?;
        if output.status.success() {
            return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
        }
        Err(ComposeError::Failed {
            command,
            status: output.status.to_string(),
            output: combined(&output),
        })
    }

    /// Run with the terminal attached so progress is visible.
    fn streamed(&self, manifest: &Path, args: &[&str]) -> Result<(), ComposeError> {
        let command = self.describe(manifest, args);
        tracing::debug!("running {command}");
        let status = self
            .command(manifest, args)
            .stdin(Stdio::null())
            .status()
            .map_err(|source| ComposeError::Spawn {
                command: command.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ComposeError::Failed {
                command,
                status: status.to_string(),
                output: String::new(),
            })
        }
    }
}

fn combined(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    text
}

fn count_lines(text: &str) -> usize {
    text.lines().filter(|l| !l.trim().is_empty()).count()
}

impl ComposeTool for DockerCompose {
    fn validate(&self, manifest: &Path) -> Result<(), ComposeError> {
        self.captured(manifest, &["config", "--quiet"]).map(|_| ())
    }

    fn stop(&self, manifest: &Path) -> Result<(), ComposeError> {
        self.streamed(manifest, &["down"])
    }

    fn pull(&self, manifest: &Path) -> Result<(), ComposeError> {
        self.streamed(manifest, &["pull"])
    }

    fn start(&self, manifest: &Path) -> Result<(), ComposeError> {
        self.streamed(manifest, &["up", "-d", "--remove-orphans"])
    }

    fn status(&self, manifest: &Path) -> Result<ServiceCounts, ComposeError> {
        let running = self.captured(
            manifest,
            &["ps", "--services", "--filter", "status=running"],
        )?;
        let all = self.captured(manifest, &["ps", "--services"])?;
        Ok(ServiceCounts {
            running: count_lines(&running),
            total: count_lines(&all),
        })
    }

    fn display_name(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.leading_args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_is_split_on_whitespace() {
        let tool = DockerCompose::from_command_line("  docker   compose ");
        assert_eq!(tool.program, "docker");
        assert_eq!(tool.leading_args, vec!["compose"]);
        assert_eq!(tool.display_name(), "docker compose");
    }

    #[test]
    fn blank_command_line_uses_default() {
        assert_eq!(DockerCompose::from_command_line(""), DockerCompose::default());
    }

    #[test]
    fn manifest_flag_precedes_subcommand() {
        let tool = DockerCompose::from_command_line("docker compose");
        let line = tool.describe(Path::new("fleet.yml"), &["up", "-d"]);
        assert_eq!(line, "docker compose -f fleet.yml up -d");
    }

    #[test]
    fn blank_lines_are_not_services() {
        assert_eq!(count_lines("a\n\nb\n  \n"), 2);
        assert_eq!(count_lines(""), 0);
    }

    #[test]
    fn missing_program_is_a_spawn_error() {
        let tool = DockerCompose::from_command_line("fleet-no-such-compose-binary");
        let err = tool.validate(Path::new("docker-compose.yml")).unwrap_err();
        assert!(matches!(err, ComposeError::Spawn { .. }), "got {err:?}");
    }
}
