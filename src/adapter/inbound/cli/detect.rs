//! `stackforge detect`: show what the host offers.

use serde_json::json;

use super::command::ConfigPathArg;
use super::{output, stack};
use crate::adapter::outbound::host::HostProbe;
use crate::domain::hardware::{GpuVendor, HardwareFacts};
use crate::error::Result;
use crate::port::outbound::probe::HardwareProbe;

/// Format megabytes as gigabytes with one decimal.
#[must_use]
pub fn format_mb(mb: u64) -> String {
    if mb >= 1024 {
        format!("{:.1} GB", mb as f64 / 1024.0)
    } else {
        format!("{mb} MB")
    }
}

#[must_use]
pub fn gpu_label(facts: &HardwareFacts) -> &'static str {
    match facts.gpu().vendor {
        GpuVendor::Nvidia => "NVIDIA",
        GpuVendor::Other => "present (non-NVIDIA)",
        GpuVendor::None => "none",
    }
}

/// Print host facts as fields.
pub fn show(facts: &HardwareFacts) {
    output::field("CPU cores", facts.cpu_cores());
    if facts.memory_known() {
        output::field("Memory", format_mb(facts.total_memory_mb()));
    } else {
        output::field(
            "Memory",
            output::muted(format!("unknown (planning for {})", format_mb(facts.total_memory_mb()))),
        );
    }
    output::field(
        "Free disk",
        facts
            .free_disk_mb()
            .map_or_else(|| output::muted("unknown"), format_mb),
    );
    output::field("GPU", gpu_label(facts));
    output::field("OS", facts.os());
}

pub fn execute(args: &ConfigPathArg) -> Result<()> {
    let config = stack::load_or_default(&args.config)?;
    let overrides = config.hardware();
    let facts = overrides.apply(HostProbe::default().detect());

    if output::is_json() {
        output::json_output(json!({
            "command": "detect",
            "hardware": facts,
            "overridden": overrides != Default::default(),
        }));
        return Ok(());
    }

    output::header(env!("CARGO_PKG_VERSION"));
    output::section("Hardware");
    show(&facts);
    if overrides != Default::default() {
        output::note(&format!(
            "Values from {} replace detected ones.",
            args.config.display()
        ));
    }
    Ok(())
}
