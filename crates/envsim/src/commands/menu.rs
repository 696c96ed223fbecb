//! Interactive console menu.
//!
//! Offers the same operations as the subcommands, one prompt at a time.
//! Errors from an operation are printed and the menu continues.

use std::io::IsTerminal;

use dialoguer::{Confirm, Input, Select};

use envsim_core::Gateway;
use envsim_core::control::DEFAULT_FINAL_TARGET;

use crate::cli::GlobalOpts;
use crate::error::{CliError, prompt_err};
use crate::output;

use super::{Session, control, fans, heaters, reset, sensors, status};

const ITEMS: [&str; 7] = [
    "Control fan",
    "Control heater",
    "Read temperature",
    "Display state of all devices",
    "Control simulation",
    "Reset simulation",
    "Exit",
];

pub async fn run<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    if !std::io::stdin().is_terminal() {
        return Err(CliError::Validation {
            field: "menu".into(),
            reason: "the interactive menu needs a terminal; use the subcommands instead".into(),
        });
    }

    loop {
        let choice = Select::new()
            .with_prompt("Simulation control")
            .items(&ITEMS[..])
            .default(0)
            .interact_opt()
            .map_err(prompt_err)?;

        let result = match choice {
            Some(0) => control_fan(session, global).await,
            Some(1) => control_heater(session, global).await,
            Some(2) => read_temperature(session, global).await,
            Some(3) => show_status(session, global).await,
            Some(4) => control_simulation(session, global).await,
            Some(5) => reset_simulation(session, global).await,
            _ => return Ok(()),
        };

        if let Err(err) = result {
            eprintln!("{:?}", miette::Report::new(err));
        }
        eprintln!();
    }
}

async fn control_fan<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let fans = session.registry.describe_fans();
    if fans.is_empty() {
        eprintln!("No fans configured.");
        return Ok(());
    }
    let ids: Vec<u32> = fans.keys().copied().collect();
    let labels: Vec<&String> = fans.values().collect();

    let picked = Select::new()
        .with_prompt("Fan")
        .items(&labels[..])
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let on = Confirm::new()
        .with_prompt("Turn it on?")
        .default(true)
        .interact()
        .map_err(prompt_err)?;

    let id = ids[picked];
    let state = session.registry.set_fan(id, on).await?;
    fans::announce(id, state, global)
}

async fn control_heater<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let heaters = session.registry.describe_heaters();
    if heaters.is_empty() {
        eprintln!("No heaters configured.");
        return Ok(());
    }
    let ids: Vec<u32> = heaters.keys().copied().collect();
    let labels: Vec<&String> = heaters.values().collect();

    let picked = Select::new()
        .with_prompt("Heater")
        .items(&labels[..])
        .default(0)
        .interact()
        .map_err(prompt_err)?;
    let level: i64 = Input::new()
        .with_prompt("Level (0-5)")
        .validate_with(|v: &i64| -> Result<(), &str> {
            if (0..=5).contains(v) {
                Ok(())
            } else {
                Err("enter a value between 0 and 5")
            }
        })
        .interact_text()
        .map_err(prompt_err)?;

    let id = ids[picked];
    let now = session.registry.set_heater_level(id, level).await?;
    heaters::announce(id, now, global)
}

async fn read_temperature<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let id: u32 = Input::new()
        .with_prompt(format!("Sensor (1-{})", session.sensors))
        .interact_text()
        .map_err(prompt_err)?;

    let reading = sensors::read_one(session, id).await?;
    if let Some(t) = reading.temperature {
        output::print_output(
            &format!("Sensor {id} Temperature: {}", output::temperature(t)),
            global.quiet,
        );
    }
    Ok(())
}

async fn show_status<G: Gateway>(session: &mut Session<G>, global: &GlobalOpts) -> Result<(), CliError> {
    let status = status::collect(session).await;
    let out = status::render(&status, &global.output)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

async fn control_simulation<G: Gateway>(
    session: &mut Session<G>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let final_target: f64 = Input::new()
        .with_prompt("Final target temperature")
        .default(DEFAULT_FINAL_TARGET)
        .interact_text()
        .map_err(prompt_err)?;

    let plan = envsim_core::ControlPlan::standard(final_target);
    let tick = session.tick;
    control::run(session, &plan, tick, global).await
}

async fn reset_simulation<G: Gateway>(
    session: &mut Session<G>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let confirmed = Confirm::new()
        .with_prompt("Reset every device in the simulation?")
        .default(false)
        .interact()
        .map_err(prompt_err)?;
    if confirmed {
        reset::reset(session, global).await?;
    }
    Ok(())
}
