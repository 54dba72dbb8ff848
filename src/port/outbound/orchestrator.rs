//! Container runtime port.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// Options for `logs`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Keep streaming until interrupted.
    pub follow: bool,
    /// Number of trailing lines; `None` for all.
    pub tail: Option<u32>,
}

/// One row of `status` output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub state: String,
    /// Health as reported by the runtime's probe, if it has one.
    pub health: Option<String>,
}

impl ServiceStatus {
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Thin wrapper around the container runtime.
///
/// Every method surfaces a non-zero exit as an orchestration error carrying
/// the tail of stderr. Long-running calls propagate Ctrl-C to the child.
#[async_trait]
pub trait Orchestrator: Send + Sync {
    /// Whether the runtime and its compose plugin answer.
    async fn is_runtime_available(&self) -> bool;

    /// Create and start every service in the manifest.
    async fn up(&self) -> Result<()>;

    /// Stop and remove the stack's containers.
    async fn down(&self) -> Result<()>;

    /// Restart one service.
    async fn restart(&self, service: &str) -> Result<()>;

    /// Stream a service's logs to the terminal.
    async fn logs(&self, service: &str, options: LogOptions) -> Result<()>;

    /// Pull the images referenced by the manifest.
    async fn pull(&self) -> Result<()>;

    /// Current container states.
    async fn status(&self) -> Result<Vec<ServiceStatus>>;
}
