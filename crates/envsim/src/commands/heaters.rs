//! Heater command handlers.

use envsim_core::{DeviceKind, DeviceState, Gateway, HeaterLevel};

use crate::cli::{GlobalOpts, HeatersArgs, HeatersCommand, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Session;
use super::util::{self, DeviceRow};

pub async fn handle<G: Gateway>(
    session: &mut Session<G>,
    args: HeatersArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        HeatersCommand::List => list(session, global),

        HeatersCommand::Set { id, level } => {
            let now = session.registry.set_heater_level(id, level).await?;
            announce(id, now, global)
        }

        HeatersCommand::SetAll { level } => {
            session.registry.set_all_heaters(level).await?;
            list(session, global)
        }
    }
}

fn list<G: Gateway>(session: &Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let heaters = util::summaries_of(session.registry.summaries(), DeviceKind::Heater);
    let out = output::render_list(&global.output, &heaters, |d| DeviceRow::from(d), util::device_line)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// `Heater 1 level set to High (Level 3).` for humans, the level otherwise.
pub fn announce(id: u32, level: HeaterLevel, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = announcement(id, level, &global.output, color)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn announcement(
    id: u32,
    level: HeaterLevel,
    format: &OutputFormat,
    color: bool,
) -> Result<String, CliError> {
    output::render_single(
        format,
        &serde_json::json!({
            "kind": DeviceKind::Heater,
            "id": id,
            "level": level.value(),
            "state": level.name(),
        }),
        |_| {
            format!(
                "Heater {id} level set to {}.",
                output::paint_state(level.name(), level != HeaterLevel::Off, color)
            )
        },
        |_| level.value().to_string(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announcement_per_format() {
        let table = announcement(1, HeaterLevel::High, &OutputFormat::Table, false).expect("table");
        let plain = announcement(1, HeaterLevel::High, &OutputFormat::Plain, false).expect("plain");
        let yaml = announcement(3, HeaterLevel::Off, &OutputFormat::Yaml, false).expect("yaml");

        assert_eq!(table, "Heater 1 level set to High (Level 3).");
        assert_eq!(plain, "3");
        assert!(yaml.contains("level: 0"), "{yaml}");
        assert!(yaml.contains("kind: heater"), "{yaml}");
    }
}
