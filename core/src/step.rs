use crate::secrets::Secrets;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus};

/// Pipeline phase a step belongs to, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Fetch,
    Setup,
    Bench,
    Publish,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Fetch => write!(f, "fetch"),
            Phase::Setup => write!(f, "setup"),
            Phase::Bench => write!(f, "bench"),
            Phase::Publish => write!(f, "publish"),
        }
    }
}

/// A configured shell command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Step {
    pub name: String,
    pub run: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Names of entries in the `[secrets]` table to export.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<String>,
}

impl Step {
    pub fn new(name: impl Into<String>, run: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            run: run.into(),
            working_dir: None,
            env: BTreeMap::new(),
            secrets: Vec::new(),
        }
    }
}

/// A step ready to spawn: absolute working directory and the full set of
/// extra environment variables, secrets included.
#[derive(Clone, PartialEq, Eq)]
pub struct PreparedCommand {
    pub name: String,
    pub command: String,
    pub working_dir: PathBuf,
    pub env: Vec<(String, String)>,
    pub stdin: Option<String>,
}

impl fmt::Debug for PreparedCommand {
    // env carries secret values
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: Vec<&str> = self.env.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("PreparedCommand")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("working_dir", &self.working_dir)
            .field("env_keys", &keys)
            .field("stdin", &self.stdin.as_ref().map(|s| s.len()))
            .finish()
    }
}

impl PreparedCommand {
    pub fn prepare(step: &Step, base_dir: &Path, secrets: &Secrets) -> Self {
        let working_dir = match &step.working_dir {
            Some(dir) if dir.is_absolute() => dir.clone(),
            Some(dir) => base_dir.join(dir),
            None => base_dir.to_path_buf(),
        };
        let mut env: Vec<(String, String)> = step.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        env.extend(secrets.env_pairs(&step.secrets));
        Self {
            name: step.name.clone(),
            command: step.run.clone(),
            working_dir,
            env,
            stdin: None,
        }
    }
}

/// How a spawned command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl From<ExitStatus> for StepStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {}", code),
            None => write!(f, "termination by signal"),
        }
    }
}

/// Executes prepared commands. The orchestrator only talks to this seam.
pub trait CommandRunner {
    fn run(&self, command: &PreparedCommand) -> Result<StepStatus>;
}

/// Runs commands through the platform shell, inheriting stdout and stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl CommandRunner for ShellRunner {
    fn run(&self, command: &PreparedCommand) -> Result<StepStatus> {
        let mut cmd = shell_command(&command.command);
        cmd.current_dir(&command.working_dir);
        cmd.envs(command.env.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        let status = match &command.stdin {
            None => cmd
                .status()
                .with_context(|| format!("failed to spawn '{}'", command.name))?,
            Some(input) => {
                use std::io::Write;
                cmd.stdin(std::process::Stdio::piped());
                let mut child = cmd
                    .spawn()
                    .with_context(|| format!("failed to spawn '{}'", command.name))?;
                // Dropping stdin closes the pipe before waiting. A child that
                // exits without reading it is judged by its exit status alone.
                let written = match child.stdin.take() {
                    Some(mut stdin) => match stdin.write_all(input.as_bytes()) {
                        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {
                            tracing::debug!(step = %command.name, "command closed stdin before reading it all");
                            Ok(())
                        }
                        other => other,
                    },
                    None => Ok(()),
                };
                let status = child
                    .wait()
                    .with_context(|| format!("wait for '{}'", command.name))?;
                written.with_context(|| format!("write stdin of '{}'", command.name))?;
                status
            }
        };
        Ok(status.into())
    }
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(line);
    cmd
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(line);
    cmd
}

/// Error raised when a step exits unsuccessfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub phase: Phase,
    pub step: String,
    pub status: StepStatus,
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} step '{}' failed with {}", self.phase, self.step, self.status)
    }
}

impl std::error::Error for StepFailure {}

/// Runs `steps` in order and stops at the first failure.
pub fn run_phase(
    runner: &dyn CommandRunner,
    phase: Phase,
    steps: &[Step],
    base_dir: &Path,
    secrets: &Secrets,
) -> Result<()> {
    for step in steps {
        let prepared = PreparedCommand::prepare(step, base_dir, secrets);
        tracing::info!(%phase, step = %step.name, dir = %prepared.working_dir.display(), "running step");
        let status = runner
            .run(&prepared)
            .with_context(|| format!("{} step '{}'", phase, step.name))?;
        if !status.success {
            return Err(StepFailure {
                phase,
                step: step.name.clone(),
                status,
            }
            .into());
        }
    }
    Ok(())
}
