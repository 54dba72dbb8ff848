//! Lifecycle commands for an installed stack: up, down, restart, logs and
//! status.

use serde_json::json;
use tabled::{Table, Tabled};

use super::command::{LogsArgs, ServiceArgs, StackArgs};
use super::{output, stack};
use crate::error::{Error, OrchestrationError, Result};
use crate::port::outbound::orchestrator::{LogOptions, Orchestrator, ServiceStatus};

#[derive(Tabled)]
struct StatusRow {
    #[tabled(rename = "Service")]
    name: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Health")]
    health: String,
}

impl From<&ServiceStatus> for StatusRow {
    fn from(status: &ServiceStatus) -> Self {
        let state = if status.is_running() {
            output::positive(&status.state)
        } else {
            output::negative(&status.state)
        };
        Self {
            name: status.name.clone(),
            state,
            health: status.health.clone().unwrap_or_else(|| "-".into()),
        }
    }
}

pub async fn up(args: &StackArgs) -> Result<()> {
    let dir = stack::existing_install(args)?;
    let gateway = stack::gateway(&dir).await?;
    output::action("Starting", &dir.display().to_string());
    gateway.up().await?;
    output::success("Stack started");
    output::hint("check containers with `stackforge status`");
    Ok(())
}

pub async fn down(args: &StackArgs) -> Result<()> {
    let dir = stack::existing_install(args)?;
    let gateway = stack::gateway(&dir).await?;
    output::action("Stopping", &dir.display().to_string());
    gateway.down().await?;
    output::success("Stack stopped");
    Ok(())
}

pub async fn restart(args: &ServiceArgs) -> Result<()> {
    let dir = stack::existing_install(&args.stack)?;
    let gateway = stack::gateway(&dir).await?;
    output::action("Restarting", args.service.id());
    gateway.restart(args.service.id()).await?;
    output::action_done("Restarted", args.service.id());
    Ok(())
}

/// Stream logs. Ctrl-C during `--follow` ends the stream normally.
pub async fn logs(args: &LogsArgs) -> Result<()> {
    let dir = stack::existing_install(&args.stack)?;
    let gateway = stack::gateway(&dir).await?;
    let options = LogOptions {
        follow: args.follow,
        tail: args.tail,
    };
    match gateway.logs(args.service.id(), options).await {
        Err(Error::Orchestration(OrchestrationError::Interrupted { .. })) if args.follow => Ok(()),
        other => other,
    }
}

pub async fn status(args: &StackArgs) -> Result<()> {
    let dir = stack::existing_install(args)?;
    let gateway = stack::gateway(&dir).await?;
    let statuses = gateway.status().await?;

    if output::is_json() {
        output::json_output(json!({
            "command": "status",
            "dir": dir.display().to_string(),
            "services": statuses,
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Services");
    if statuses.is_empty() {
        output::note("No containers. Start the stack with `stackforge up`.");
        return Ok(());
    }
    let rows: Vec<StatusRow> = statuses.iter().map(StatusRow::from).collect();
    output::lines(&Table::new(rows).to_string());

    let running = statuses.iter().filter(|s| s.is_running()).count();
    if running < statuses.len() {
        output::warning(&format!("{running} of {} containers running", statuses.len()));
    }
    Ok(())
}
