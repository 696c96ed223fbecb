//! Sensor command handlers.

use serde::Serialize;
use tabled::Tabled;

use envsim_core::{Gateway, SensorReading, read_all_sensors, sample_average};

use crate::cli::{GlobalOpts, SensorsArgs, SensorsCommand};
use crate::error::CliError;
use crate::output;

use super::Session;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
pub struct SensorRow {
    #[tabled(rename = "Sensor")]
    id: u32,
    #[tabled(rename = "Temperature")]
    temperature: String,
    #[tabled(rename = "Error")]
    error: String,
}

impl From<&SensorReading> for SensorRow {
    fn from(r: &SensorReading) -> Self {
        Self {
            id: r.id,
            temperature: r.temperature.map(output::temperature).unwrap_or_else(|| "-".into()),
            error: r.error.clone().unwrap_or_default(),
        }
    }
}

pub fn reading_line(r: &SensorReading) -> String {
    match r.temperature {
        Some(t) => format!("{} {t:.1}", r.id),
        None => format!("{} -", r.id),
    }
}

#[derive(Serialize)]
struct Average {
    sensors: u32,
    average: f64,
}

pub async fn handle<G: Gateway>(
    session: &mut Session<G>,
    args: SensorsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        SensorsCommand::List => {
            let readings = read_all_sensors(session.registry.gateway(), session.sensors).await;
            let out = output::render_list(&global.output, &readings, |r| SensorRow::from(r), reading_line)?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SensorsCommand::Read { id } => {
            let reading = read_one(session, id).await?;
            let out = output::render_single(
                &global.output,
                &reading,
                |r| {
                    format!(
                        "Sensor {} Temperature: {}",
                        r.id,
                        r.temperature.map(output::temperature).unwrap_or_default()
                    )
                },
                |r| r.temperature.map(|t| format!("{t:.1}")).unwrap_or_default(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        SensorsCommand::Average => {
            let average = sample_average(session.registry.gateway(), session.sensors).await?;
            let data = Average {
                sensors: session.sensors,
                average,
            };
            let out = output::render_single(
                &global.output,
                &data,
                |a| format!("Average of {} sensors: {}", a.sensors, output::temperature(a.average)),
                |a| format!("{:.1}", a.average),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}

/// Read sensor `id`, rejecting numbers outside the configured range.
pub async fn read_one<G: Gateway>(session: &Session<G>, id: u32) -> Result<SensorReading, CliError> {
    if id == 0 || id > session.sensors {
        return Err(CliError::NotFound {
            kind: "Sensor".into(),
            id,
            list_command: "sensors list".into(),
        });
    }
    let temperature = session.registry.gateway().read_sensor(id).await?;
    Ok(SensorReading {
        id,
        temperature: Some(temperature),
        error: None,
    })
}
