//! Shared helpers for command handlers.

use tabled::Tabled;

use envsim_core::{DeviceKind, DeviceSummary, SyncReport};

use crate::error::CliError;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "Kind")]
    pub kind: String,
    #[tabled(rename = "ID")]
    pub id: u32,
    #[tabled(rename = "State")]
    pub state: String,
}

impl From<&DeviceSummary> for DeviceRow {
    fn from(d: &DeviceSummary) -> Self {
        Self {
            kind: d.kind.to_string(),
            id: d.id,
            state: d.state.into(),
        }
    }
}

/// Plain-mode line for a device: `fan 1 On`.
pub fn device_line(d: &DeviceSummary) -> String {
    format!("{} {} {}", d.kind.to_string().to_lowercase(), d.id, d.state)
}

/// Summaries of one kind, in id order.
pub fn summaries_of(all: Vec<DeviceSummary>, kind: DeviceKind) -> Vec<DeviceSummary> {
    all.into_iter().filter(|d| d.kind == kind).collect()
}

/// Warn about devices whose state could not be fetched at startup.
pub fn report_sync(report: &SyncReport, quiet: bool) {
    for failure in &report.failures {
        tracing::warn!(
            kind = %failure.device.kind,
            id = failure.device.id,
            reason = %failure.reason,
            "device state not synchronized"
        );
    }
    if !quiet && !report.failures.is_empty() {
        eprintln!(
            "warning: {} device(s) could not be read from the simulation; showing default state for them",
            report.failures.len()
        );
    }
}

/// Prompt for confirmation, auto-approving if `--yes` was passed.
pub fn confirm(message: &str, action: &str, yes_flag: bool) -> Result<bool, CliError> {
    if yes_flag {
        return Ok(true);
    }
    if !std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return Err(CliError::NonInteractiveRequiresYes {
            action: action.into(),
        });
    }
    let confirmed = dialoguer::Confirm::new()
        .with_prompt(message)
        .default(false)
        .interact()
        .map_err(crate::error::prompt_err)?;
    Ok(confirmed)
}
