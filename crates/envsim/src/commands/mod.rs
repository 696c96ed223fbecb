//! Command dispatch: bridges CLI args -> registry operations -> output.

pub mod config_cmd;
pub mod control;
pub mod fans;
pub mod heaters;
pub mod menu;
pub mod reset;
pub mod sensors;
pub mod status;
pub mod util;

use std::time::Duration;

use envsim_core::{DeviceRegistry, Gateway};

use crate::cli::{Command, GlobalOpts};
use crate::config::Resolved;
use crate::error::CliError;

/// A connected, synchronized registry plus the settings device commands
/// need.
pub struct Session<G> {
    pub registry: DeviceRegistry<G>,
    pub sensors: u32,
    pub tick: Duration,
}

impl<G: Gateway> Session<G> {
    pub fn new(gateway: G, resolved: &Resolved) -> Self {
        let devices = &resolved.environment.devices;
        Self {
            registry: DeviceRegistry::from_counts(gateway, devices),
            sensors: devices.sensors,
            tick: resolved.tick,
        }
    }
}

/// Dispatch a simulation-bound command to the appropriate handler.
pub async fn dispatch<G: Gateway>(
    cmd: Command,
    session: &mut Session<G>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Fans(args) => fans::handle(session, args, global).await,
        Command::Heaters(args) => heaters::handle(session, args, global).await,
        Command::Sensors(args) => sensors::handle(session, args, global).await,
        Command::Status => status::handle(session, global).await,
        Command::Control(args) => control::handle(session, args, global).await,
        Command::Reset => reset::handle(session, global).await,
        Command::Menu => menu::run(session, global).await,
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "config and completions are handled before connecting".into(),
        )),
    }
}
