//! `status`: every fan, heater, and sensor at once.

use serde::Serialize;

use envsim_core::{DeviceSummary, Gateway, SensorReading, read_all_sensors};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Session;
use super::sensors::{SensorRow, reading_line};
use super::util::{self, DeviceRow};

#[derive(Serialize)]
pub struct Status {
    pub devices: Vec<DeviceSummary>,
    pub sensors: Vec<SensorReading>,
    /// Mean of the sensors that answered, if any did.
    pub average: Option<f64>,
}

pub async fn collect<G: Gateway>(session: &Session<G>) -> Status {
    let sensors = read_all_sensors(session.registry.gateway(), session.sensors).await;
    let values: Vec<f64> = sensors.iter().filter_map(|r| r.temperature).collect();
    #[allow(clippy::cast_precision_loss)]
    let average = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);
    Status {
        devices: session.registry.summaries(),
        sensors,
        average,
    }
}

pub async fn handle<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let status = collect(session).await;
    let out = render(&status, &global.output)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub fn render(status: &Status, format: &OutputFormat) -> Result<String, CliError> {
    output::render_single(
        format,
        status,
        |s| {
            let devices: Vec<DeviceRow> = s.devices.iter().map(DeviceRow::from).collect();
            let sensors: Vec<SensorRow> = s.sensors.iter().map(SensorRow::from).collect();
            let average = s
                .average
                .map_or_else(|| "-".into(), output::temperature);
            format!(
                "{}\n{}\nAverage temperature: {average}",
                output::render_table(&devices),
                output::render_table(&sensors)
            )
        },
        |s| {
            s.devices
                .iter()
                .map(util::device_line)
                .chain(s.sensors.iter().map(|r| format!("sensor {}", reading_line(r))))
                .collect::<Vec<_>>()
                .join("\n")
        },
    )
}
