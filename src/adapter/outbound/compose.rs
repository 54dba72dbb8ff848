//! Compose CLI gateway.
//!
//! Shells out to `docker compose` (v2) or `docker-compose` (v1) in the
//! install directory. Stderr is echoed live and its tail kept for error
//! reports. Ctrl-C kills the child and reaps it before returning.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::signal;
use tracing::{debug, warn};

use crate::application::render::MANIFEST_FILE;
use crate::error::{OrchestrationError, Result};
use crate::port::outbound::orchestrator::{LogOptions, Orchestrator, ServiceStatus};

/// Lines of stderr kept for error messages.
const STDERR_TAIL_LINES: usize = 20;

/// How to invoke compose on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommand {
    pub program: String,
    /// Arguments placed before every subcommand (`compose` for v2).
    pub prefix: Vec<String>,
}

impl ComposeCommand {
    /// `docker compose`.
    #[must_use]
    pub fn plugin() -> Self {
        Self {
            program: "docker".into(),
            prefix: vec!["compose".into()],
        }
    }

    /// Standalone `docker-compose`.
    #[must_use]
    pub fn standalone() -> Self {
        Self {
            program: "docker-compose".into(),
            prefix: Vec::new(),
        }
    }

    /// Prefer the plugin, fall back to the standalone binary.
    pub async fn detect() -> Option<Self> {
        for candidate in [Self::plugin(), Self::standalone()] {
            let ok = Command::new(&candidate.program)
                .args(&candidate.prefix)
                .arg("version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .kill_on_drop(true)
                .status()
                .await
                .map(|s| s.success())
                .unwrap_or(false);
            if ok {
                debug!(program = %candidate.program, "Compose command detected");
                return Some(candidate);
            }
        }
        None
    }

    fn display(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.prefix.iter().map(String::as_str))
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// [`Orchestrator`] backed by the compose CLI.
#[derive(Debug, Clone)]
pub struct ComposeGateway {
    install_dir: PathBuf,
    command: ComposeCommand,
}

impl ComposeGateway {
    #[must_use]
    pub fn new(install_dir: impl Into<PathBuf>, command: ComposeCommand) -> Self {
        Self {
            install_dir: install_dir.into(),
            command,
        }
    }

    /// Detect the compose command and bind it to `install_dir`.
    pub async fn detect(install_dir: impl Into<PathBuf>) -> Result<Self> {
        let command = ComposeCommand::detect().await.ok_or_else(|| {
            OrchestrationError::RuntimeUnavailable(
                "neither `docker compose` nor `docker-compose` is installed".into(),
            )
        })?;
        Ok(Self::new(install_dir, command))
    }

    #[must_use]
    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    fn build(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.prefix)
            .arg("-f")
            .arg(self.install_dir.join(MANIFEST_FILE))
            .args(args)
            .current_dir(&self.install_dir)
            .kill_on_drop(true);
        cmd
    }

    /// Run with stdout inherited. Fails on non-zero exit or interrupt.
    async fn run(&self, args: &[&str]) -> Result<()> {
        let mut cmd = self.build(args);
        cmd.stdout(Stdio::inherit()).stderr(Stdio::piped());
        self.execute(cmd, args, false).await.map(|_| ())
    }

    /// Run and return stdout.
    async fn capture(&self, args: &[&str]) -> Result<String> {
        let mut cmd = self.build(args);
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
        self.execute(cmd, args, true).await
    }

    async fn execute(&self, mut cmd: Command, args: &[&str], capture: bool) -> Result<String> {
        let command_line = self.command.display(args);
        debug!(command = %command_line, "Running compose");

        let mut child = cmd.spawn().map_err(|source| OrchestrationError::Spawn {
            command: command_line.clone(),
            source,
        })?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(collect_tail(stderr, !capture)));
        let stdout_task = child
            .stdout
            .take()
            .map(|stdout| tokio::spawn(read_all(stdout)));

        let status = tokio::select! {
            status = child.wait() => status.map_err(|source| OrchestrationError::Spawn {
                command: command_line.clone(),
                source,
            })?,
            _ = signal::ctrl_c() => {
                warn!(command = %command_line, "Interrupted, stopping subprocess");
                let _ = child.kill().await;
                let _ = child.wait().await;
                return Err(OrchestrationError::Interrupted { command: command_line }.into());
            }
        };

        let tail = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };
        let stdout = match stdout_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(OrchestrationError::CommandFailed {
                command: command_line,
                status: status.to_string(),
                stderr_tail: tail,
            }
            .into());
        }
        Ok(stdout)
    }
}

/// Read lines, optionally echoing them to our stderr, and keep the last few.
async fn collect_tail<R: AsyncRead + Unpin>(reader: R, echo: bool) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut tail = VecDeque::with_capacity(STDERR_TAIL_LINES);
    while let Ok(Some(line)) = lines.next_line().await {
        if echo {
            eprintln!("{line}");
        }
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}

async fn read_all<R: AsyncRead + Unpin>(reader: R) -> String {
    let mut lines = BufReader::new(reader).lines();
    let mut out = String::new();
    while let Ok(Some(line)) = lines.next_line().await {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "Service", default)]
    service: String,
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "State", default)]
    state: String,
    #[serde(rename = "Health", default)]
    health: String,
}

impl From<PsEntry> for ServiceStatus {
    fn from(entry: PsEntry) -> Self {
        let name = if entry.service.is_empty() {
            entry.name
        } else {
            entry.service
        };
        Self {
            name,
            state: entry.state,
            health: Some(entry.health).filter(|h| !h.is_empty()),
        }
    }
}

/// Parse `ps --format json`: a JSON array on older releases, one object per
/// line on newer ones.
pub fn parse_ps(output: &str) -> Result<Vec<ServiceStatus>> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<PsEntry> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed)?
    } else {
        trimmed
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?
    };
    Ok(entries.into_iter().map(ServiceStatus::from).collect())
}

#[async_trait]
impl Orchestrator for ComposeGateway {
    async fn is_runtime_available(&self) -> bool {
        Command::new("docker")
            .arg("info")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn up(&self) -> Result<()> {
        self.run(&["up", "-d", "--remove-orphans"]).await
    }

    async fn down(&self) -> Result<()> {
        self.run(&["down"]).await
    }

    async fn restart(&self, service: &str) -> Result<()> {
        self.run(&["restart", service]).await
    }

    async fn logs(&self, service: &str, options: LogOptions) -> Result<()> {
        let tail = options.tail.map(|n| format!("--tail={n}"));
        let mut args = vec!["logs"];
        if options.follow {
            args.push("-f");
        }
        if let Some(tail) = tail.as_deref() {
            args.push(tail);
        }
        args.push(service);
        self.run(&args).await
    }

    async fn pull(&self) -> Result<()> {
        self.run(&["pull"]).await
    }

    async fn status(&self) -> Result<Vec<ServiceStatus>> {
        let stdout = self.capture(&["ps", "--all", "--format", "json"]).await?;
        parse_ps(&stdout)
    }
}
