//! `control`: run the phased temperature control loop until it completes
//! or Ctrl-C cancels it at the next tick boundary.

use std::time::Duration;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use envsim_core::{ControlEvent, ControlOutcome, ControlPlan, Gateway, Phase, TemperatureController};

use crate::cli::{ControlArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::Session;

pub async fn handle<G: Gateway>(
    session: &mut Session<G>,
    args: ControlArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let plan = plan_from_args(&args);
    let tick = args.tick_ms.map_or(session.tick, Duration::from_millis);
    run(session, &plan, tick, global).await
}

pub fn plan_from_args(args: &ControlArgs) -> ControlPlan {
    let plan = ControlPlan::standard(args.final_target);
    match args.final_hold_ticks {
        Some(ticks) => plan.with_final_hold(ticks),
        None => plan,
    }
}

/// Run `plan`, printing progress, with Ctrl-C wired to cancellation.
pub async fn run<G: Gateway>(
    session: &mut Session<G>,
    plan: &ControlPlan,
    tick: Duration,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    let signal = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received; stopping at the next tick");
            on_ctrl_c.cancel();
        }
    });

    if !global.quiet {
        eprintln!(
            "Starting temperature control ({} phases, {} ms ticks). Press Ctrl-C to stop.",
            plan.phases.len(),
            tick.as_millis()
        );
    }

    let sensors = session.sensors;
    let mut controller = TemperatureController::new(&mut session.registry, sensors)
        .with_tick(tick)
        .with_cancellation(cancel);
    let printer = tokio::spawn(print_events(
        controller.subscribe(),
        global.output.clone(),
        global.quiet,
    ));

    let result = controller.run(plan).await;
    drop(controller);
    signal.abort();
    join_printer(printer).await;

    let outcome = result?;
    let out = output::render_single(
        &global.output,
        &outcome,
        |o| match o {
            ControlOutcome::Completed { temperature } => {
                format!("Control finished at {}.", output::temperature(*temperature))
            }
            ControlOutcome::Cancelled { temperature } => {
                format!("Control stopped at {}.", output::temperature(*temperature))
            }
        },
        |o| format!("{:.1}", o.temperature()),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Wait for the progress printer to drain. Returns `false` (and logs)
/// when it panicked or was cancelled.
async fn join_printer(printer: JoinHandle<()>) -> bool {
    match printer.await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "progress printer did not finish cleanly");
            false
        }
    }
}

/// Human-readable progress on stderr, or one JSON object per line on
/// stdout for structured output formats.
async fn print_events(
    mut events: broadcast::Receiver<ControlEvent>,
    format: OutputFormat,
    quiet: bool,
) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "progress printer lagged");
                continue;
            }
            Err(RecvError::Closed) => break,
        };
        if quiet {
            continue;
        }
        match format {
            OutputFormat::Json | OutputFormat::JsonCompact | OutputFormat::Yaml => {
                if let Ok(line) = output::render_json(&event, true) {
                    output::print_output(&line, false);
                }
            }
            OutputFormat::Table | OutputFormat::Plain => eprintln!("{}", describe(&event)),
        }
    }
}

fn describe(event: &ControlEvent) -> String {
    match event {
        ControlEvent::PhaseStarted {
            index,
            phase,
            temperature,
            at,
        } => {
            let what = match phase {
                Phase::Ramp { target, ticks } => {
                    format!("ramp to {} over up to {ticks} ticks", output::temperature(*target))
                }
                Phase::Hold {
                    target,
                    ticks: Some(ticks),
                } => format!("hold at {} for {ticks} ticks", output::temperature(*target)),
                Phase::Hold { target, ticks: None } => {
                    format!("hold at {} until stopped", output::temperature(*target))
                }
            };
            format!(
                "[{}] phase {}: {what} (now {})",
                at.format("%H:%M:%S"),
                index + 1,
                output::temperature(*temperature)
            )
        }
        ControlEvent::Tick {
            index,
            tick,
            action,
            temperature,
            at,
        } => format!(
            "[{}] phase {} tick {tick}: {action:?} -> {}",
            at.format("%H:%M:%S"),
            index + 1,
            output::temperature(*temperature)
        ),
        ControlEvent::PhaseFinished { index, result, at } => format!(
            "[{}] phase {} {} after {} ticks at {}",
            at.format("%H:%M:%S"),
            index + 1,
            if result.cancelled { "stopped" } else { "finished" },
            result.ticks,
            output::temperature(result.temperature)
        ),
    }
}
