//! `reset`: reset the simulation, then resynchronize and show devices.

use envsim_core::Gateway;

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::Session;
use super::util::{self, DeviceRow};

pub async fn handle<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    if !util::confirm("Reset every device in the simulation?", "reset", global.yes)? {
        return Ok(());
    }
    reset(session, global).await
}

/// Reset without asking; shared with the interactive menu.
pub async fn reset<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let report = session.registry.reset_and_resync().await?;
    util::report_sync(&report, global.quiet);
    if !global.quiet {
        eprintln!("Simulation has been reset.");
    }

    let devices = session.registry.summaries();
    let out = output::render_list(&global.output, &devices, |d| DeviceRow::from(d), util::device_line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}
