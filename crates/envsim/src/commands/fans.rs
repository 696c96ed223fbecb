//! Fan command handlers.

use envsim_core::{DeviceKind, DeviceState, FanState, Gateway};

use crate::cli::{FansArgs, FansCommand, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Session;
use super::util::{self, DeviceRow};

pub async fn handle<G: Gateway>(
    session: &mut Session<G>,
    args: FansArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        FansCommand::List => list(session, global),

        FansCommand::Set { id, state } => {
            let now = session.registry.set_fan(id, state.is_on()).await?;
            announce(id, now, global)
        }

        FansCommand::SetAll { state } => {
            session.registry.set_all_fans(state.is_on()).await?;
            list(session, global)
        }
    }
}

fn list<G: Gateway>(session: &Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let fans = util::summaries_of(session.registry.summaries(), DeviceKind::Fan);
    let out = output::render_list(&global.output, &fans, |d| DeviceRow::from(d), util::device_line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// `Fan 1 has been turned On.` for humans, the bare state otherwise.
pub fn announce(id: u32, state: FanState, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = announcement(id, state, &global.output, color)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn announcement(
    id: u32,
    state: FanState,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    output::render_single(
        format,
        &serde_json::json!({ "kind": DeviceKind::Fan, "id": id, "state": state.name() }),
        |_| {
            format!(
                "Fan {id} has been turned {}.",
                output::paint_state(state.name(), state.is_on(), color)
            )
        },
        |_| state.name().to_string(),
    )
}
