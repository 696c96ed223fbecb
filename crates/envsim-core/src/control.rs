// ── Closed-loop temperature control ──
//
// A plan is an ordered list of ramp and hold phases. Every tick samples
// the mean sensor temperature, commands all heaters then all fans, and
// waits one tick length. The cancellation token is checked at each tick
// boundary and during the wait.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::device::HeaterLevel;
use crate::error::CoreError;
use crate::gateway::Gateway;
use crate::registry::DeviceRegistry;
use crate::sensors::sample_average;

/// A ramp stops once the mean temperature is within this many degrees.
pub const TARGET_TOLERANCE: f64 = 0.1;

/// Heater level while ramping up.
pub const RAMP_HEAT_LEVEL: HeaterLevel = HeaterLevel::High;

/// Heater level while holding below target.
pub const HOLD_HEAT_LEVEL: HeaterLevel = HeaterLevel::Low;

/// Target of the final hold when none is configured.
pub const DEFAULT_FINAL_TARGET: f64 = 18.0;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

const EVENT_CAPACITY: usize = 64;

// ── Plan ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Phase {
    /// Drive toward `target` for at most `ticks`, stopping early once
    /// within [`TARGET_TOLERANCE`].
    Ramp { target: f64, ticks: u32 },
    /// Hold at `target` for exactly `ticks`; `None` holds until cancelled.
    Hold { target: f64, ticks: Option<u32> },
}

impl Phase {
    pub fn target(&self) -> f64 {
        match self {
            Self::Ramp { target, .. } | Self::Hold { target, .. } => *target,
        }
    }
}

/// Ordered phases, optionally restarted from the first once the last
/// one finishes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlPlan {
    pub phases: Vec<Phase>,
    pub repeat: bool,
}

impl ControlPlan {
    /// Ramp to 20° (30 ticks), ramp to 16° (10), hold 16° (10), ramp to
    /// `final_target` (20), then hold `final_target` until cancelled.
    ///
    /// The final hold never ends, so the first four phases run once.
    pub fn standard(final_target: f64) -> Self {
        Self {
            phases: vec![
                Phase::Ramp {
                    target: 20.0,
                    ticks: 30,
                },
                Phase::Ramp {
                    target: 16.0,
                    ticks: 10,
                },
                Phase::Hold {
                    target: 16.0,
                    ticks: Some(10),
                },
                Phase::Ramp {
                    target: final_target,
                    ticks: 20,
                },
                Phase::Hold {
                    target: final_target,
                    ticks: None,
                },
            ],
            repeat: false,
        }
    }

    /// Bound the final hold to `ticks` and restart the plan after it.
    pub fn with_final_hold(mut self, ticks: u32) -> Self {
        if let Some(Phase::Hold { ticks: last, .. }) = self.phases.last_mut() {
            *last = Some(ticks);
        }
        self.repeat = true;
        self
    }
}

impl Default for ControlPlan {
    fn default() -> Self {
        Self::standard(DEFAULT_FINAL_TARGET)
    }
}

// ── Actions, events, outcomes ────────────────────────────────────────

/// What one tick commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "level", rename_all = "snake_case")]
pub enum Action {
    /// All heaters to the level, all fans off.
    Heat(HeaterLevel),
    /// All heaters off, all fans on.
    Cool,
    /// No command.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ControlEvent {
    PhaseStarted {
        index: usize,
        phase: Phase,
        temperature: f64,
        at: DateTime<Utc>,
    },
    Tick {
        index: usize,
        tick: u32,
        action: Action,
        temperature: f64,
        at: DateTime<Utc>,
    },
    PhaseFinished {
        index: usize,
        result: PhaseResult,
        at: DateTime<Utc>,
    },
}

/// How a single phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PhaseResult {
    /// Last sampled mean temperature.
    pub temperature: f64,
    /// Ticks actually waited.
    pub ticks: u32,
    pub cancelled: bool,
}

/// How a whole plan run ended.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ControlOutcome {
    Completed { temperature: f64 },
    Cancelled { temperature: f64 },
}

impl ControlOutcome {
    pub fn temperature(&self) -> f64 {
        match self {
            Self::Completed { temperature } | Self::Cancelled { temperature } => *temperature,
        }
    }
}

// ── Controller ───────────────────────────────────────────────────────

/// Drives a [`DeviceRegistry`] through ramp and hold phases.
pub struct TemperatureController<'a, G> {
    registry: &'a mut DeviceRegistry<G>,
    sensor_count: u32,
    tick: Duration,
    cancel: CancellationToken,
    events: broadcast::Sender<ControlEvent>,
}

impl<'a, G: Gateway> TemperatureController<'a, G> {
    pub fn new(registry: &'a mut DeviceRegistry<G>, sensor_count: u32) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            registry,
            sensor_count,
            tick: DEFAULT_TICK,
            cancel: CancellationToken::new(),
            events,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Receive progress events. Slow receivers may see `Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Mean temperature across all sensors, sampled now.
    pub async fn sample(&self) -> Result<f64, CoreError> {
        sample_average(self.registry.gateway(), self.sensor_count).await
    }

    /// Run every phase of `plan` starting from a fresh sample.
    ///
    /// Errors end the run immediately; devices keep whatever state they
    /// reached.
    pub async fn run(&mut self, plan: &ControlPlan) -> Result<ControlOutcome, CoreError> {
        let mut current = self.sample().await?;
        let mut cycle = 0_u32;

        loop {
            cycle += 1;
            info!(cycle, phases = plan.phases.len(), temperature = current, "starting control plan");

            for (index, phase) in plan.phases.iter().enumerate() {
                let result = self.run_phase(index, phase, current).await?;
                current = result.temperature;
                if result.cancelled {
                    info!(temperature = current, "control cancelled");
                    return Ok(ControlOutcome::Cancelled {
                        temperature: current,
                    });
                }
            }

            if !plan.repeat || plan.phases.is_empty() {
                return Ok(ControlOutcome::Completed {
                    temperature: current,
                });
            }
        }
    }

    async fn run_phase(
        &mut self,
        index: usize,
        phase: &Phase,
        current: f64,
    ) -> Result<PhaseResult, CoreError> {
        info!(index, ?phase, temperature = current, "phase started");
        self.emit(ControlEvent::PhaseStarted {
            index,
            phase: *phase,
            temperature: current,
            at: Utc::now(),
        });

        let result = match *phase {
            Phase::Ramp { target, ticks } => self.ramp(index, current, target, ticks).await?,
            Phase::Hold { target, ticks } => self.hold(index, current, target, ticks).await?,
        };

        info!(
            index,
            temperature = result.temperature,
            ticks = result.ticks,
            cancelled = result.cancelled,
            "phase finished"
        );
        self.emit(ControlEvent::PhaseFinished {
            index,
            result,
            at: Utc::now(),
        });
        Ok(result)
    }

    /// Drive toward `target` for up to `ticks`, starting from `current`.
    ///
    /// Returns the last sampled temperature; running out of ticks before
    /// reaching the target is not an error.
    pub async fn ramp_to(
        &mut self,
        current: f64,
        target: f64,
        ticks: u32,
    ) -> Result<PhaseResult, CoreError> {
        self.ramp(0, current, target, ticks).await
    }

    /// Hold at `target` for exactly `ticks` (`None`: until cancelled),
    /// starting from `current`. There is no early exit.
    pub async fn hold_at(
        &mut self,
        current: f64,
        target: f64,
        ticks: Option<u32>,
    ) -> Result<PhaseResult, CoreError> {
        self.hold(0, current, target, ticks).await
    }

    async fn ramp(
        &mut self,
        index: usize,
        mut current: f64,
        target: f64,
        ticks: u32,
    ) -> Result<PhaseResult, CoreError> {
        let mut done = 0;
        while done < ticks {
            if (current - target).abs() <= TARGET_TOLERANCE {
                debug!(index, target, temperature = current, "target reached");
                break;
            }
            let action = if current < target {
                Action::Heat(RAMP_HEAT_LEVEL)
            } else {
                Action::Cool
            };
            match self.tick(index, done + 1, action).await? {
                Some(t) => current = t,
                None => return Ok(cancelled(current, done)),
            }
            done += 1;
        }
        Ok(PhaseResult {
            temperature: current,
            ticks: done,
            cancelled: false,
        })
    }

    async fn hold(
        &mut self,
        index: usize,
        mut current: f64,
        target: f64,
        ticks: Option<u32>,
    ) -> Result<PhaseResult, CoreError> {
        let mut done = 0;
        while ticks.is_none_or(|n| done < n) {
            let action = match current.partial_cmp(&target) {
                Some(std::cmp::Ordering::Less) => Action::Heat(HOLD_HEAT_LEVEL),
                Some(std::cmp::Ordering::Greater) => Action::Cool,
                _ => Action::Idle,
            };
            match self.tick(index, done + 1, action).await? {
                Some(t) => current = t,
                None => return Ok(cancelled(current, done)),
            }
            done = done.saturating_add(1);
        }
        Ok(PhaseResult {
            temperature: current,
            ticks: done,
            cancelled: false,
        })
    }

    /// One tick: command, wait, re-sample. `None` once cancelled.
    async fn tick(&mut self, index: usize, tick: u32, action: Action) -> Result<Option<f64>, CoreError> {
        if self.cancel.is_cancelled() {
            return Ok(None);
        }
        self.apply(action).await?;

        tokio::select! {
            () = self.cancel.cancelled() => return Ok(None),
            () = tokio::time::sleep(self.tick) => {}
        }

        let temperature = self.sample().await?;
        debug!(index, tick, ?action, temperature, "tick");
        self.emit(ControlEvent::Tick {
            index,
            tick,
            action,
            temperature,
            at: Utc::now(),
        });
        Ok(Some(temperature))
    }

    /// Heaters first, then fans.
    async fn apply(&mut self, action: Action) -> Result<(), CoreError> {
        match action {
            Action::Heat(level) => {
                self.registry.set_all_heaters_to(level).await?;
                self.registry.set_all_fans(false).await
            }
            Action::Cool => {
                self.registry.set_all_heaters_to(HeaterLevel::Off).await?;
                self.registry.set_all_fans(true).await
            }
            Action::Idle => Ok(()),
        }
    }

    fn emit(&self, event: ControlEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn cancelled(temperature: f64, ticks: u32) -> PhaseResult {
    PhaseResult {
        temperature,
        ticks,
        cancelled: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, RecordingGateway};
    use pretty_assertions::assert_eq;
    use tokio::time::Instant;

    fn registry(gateway: RecordingGateway) -> DeviceRegistry<RecordingGateway> {
        DeviceRegistry::new(gateway, 1, 1)
    }

    #[tokio::test(start_paused = true)]
    async fn ramp_stops_once_within_tolerance() {
        let mut registry = registry(RecordingGateway::new().with_readings(&[16.0, 18.0, 20.0]));
        let mut controller = TemperatureController::new(&mut registry, 1);
        let start = Instant::now();

        let result = controller.ramp_to(15.0, 20.0, 5).await.expect("ramp");

        assert_eq!(
            result,
            PhaseResult {
                temperature: 20.0,
                ticks: 3,
                cancelled: false
            }
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        // Fan already off, so only the heater is written each tick.
        assert_eq!(
            registry.gateway().writes(),
            vec![Call::SetHeater(1, HeaterLevel::High); 3]
        );
        assert!(!registry.fan_is_on(1).expect("known"));
    }

    #[tokio::test(start_paused = true)]
    async fn ramp_reaches_target_on_last_allowed_tick() {
        let mut registry = registry(RecordingGateway::new().with_readings(&[16.0, 18.0, 20.0]));
        let mut controller = TemperatureController::new(&mut registry, 1);
        let start = Instant::now();

        let result = controller.ramp_to(15.0, 20.0, 3).await.expect("ramp");

        assert_eq!(
            result,
            PhaseResult {
                temperature: 20.0,
                ticks: 3,
                cancelled: false
            }
        );
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(
            registry.gateway().writes(),
            vec![Call::SetHeater(1, HeaterLevel::High); 3]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ramp_out_of_ticks_returns_last_sample() {
        let mut registry = registry(RecordingGateway::new().with_readings(&[24.0, 23.0]));
        let mut controller = TemperatureController::new(&mut registry, 1);

        let result = controller.ramp_to(25.0, 20.0, 2).await.expect("ramp");

        assert_eq!(result.temperature, 23.0);
        assert_eq!(result.ticks, 2);
        assert_eq!(
            registry.gateway().writes(),
            vec![
                Call::SetHeater(1, HeaterLevel::Off),
                Call::SetFan(1, true),
                Call::SetHeater(1, HeaterLevel::Off),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn ramp_already_at_target_waits_no_ticks() {
        let mut registry = registry(RecordingGateway::new());
        let mut controller = TemperatureController::new(&mut registry, 1);
        let start = Instant::now();

        let result = controller.ramp_to(19.95, 20.0, 10).await.expect("ramp");

        assert_eq!(result.ticks, 0);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(registry.gateway().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hold_at_target_commands_nothing_but_waits() {
        let mut registry = registry(RecordingGateway::new().with_sensor(1, 18.0));
        let mut controller = TemperatureController::new(&mut registry, 1);
        let start = Instant::now();

        let result = controller.hold_at(18.0, 18.0, Some(4)).await.expect("hold");

        assert_eq!(result.temperature, 18.0);
        assert_eq!(result.ticks, 4);
        assert_eq!(start.elapsed(), Duration::from_secs(4));
        assert!(registry.gateway().writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn hold_below_target_heats_gently() {
        let mut registry = registry(RecordingGateway::new().with_readings(&[15.0, 16.0]));
        let mut controller = TemperatureController::new(&mut registry, 1);

        let result = controller.hold_at(15.0, 16.0, Some(2)).await.expect("hold");

        assert_eq!(result.temperature, 16.0);
        assert_eq!(
            registry.gateway().writes(),
            vec![
                Call::SetHeater(1, HeaterLevel::Low),
                Call::SetHeater(1, HeaterLevel::Low),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_start_runs_no_ticks() {
        let mut registry = registry(RecordingGateway::new().with_sensor(1, 17.0));
        let token = CancellationToken::new();
        token.cancel();
        let mut controller = TemperatureController::new(&mut registry, 1).with_cancellation(token);

        let outcome = controller.run(&ControlPlan::default()).await.expect("run");

        assert_eq!(outcome, ControlOutcome::Cancelled { temperature: 17.0 });
        assert!(registry.gateway().writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn indefinite_hold_ends_on_cancellation() {
        let mut registry = registry(RecordingGateway::new().with_sensor(1, 18.0));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5_500)).await;
            canceller.cancel();
        });
        let mut controller = TemperatureController::new(&mut registry, 1).with_cancellation(token);
        let start = Instant::now();

        let result = controller.hold_at(18.0, 18.0, None).await.expect("hold");

        assert!(result.cancelled);
        assert_eq!(result.ticks, 5);
        assert_eq!(start.elapsed(), Duration::from_millis(5_500));
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_plan_completes_and_publishes_events() {
        let plan = ControlPlan {
            phases: vec![
                Phase::Ramp {
                    target: 20.0,
                    ticks: 3,
                },
                Phase::Hold {
                    target: 20.0,
                    ticks: Some(2),
                },
            ],
            repeat: false,
        };
        let mut registry = registry(RecordingGateway::new().with_sensor(1, 20.0));
        let mut controller = TemperatureController::new(&mut registry, 1)
            .with_tick(Duration::from_millis(100));
        let mut events = controller.subscribe();

        let outcome = controller.run(&plan).await.expect("run");

        assert_eq!(outcome, ControlOutcome::Completed { temperature: 20.0 });
        let mut kinds = Vec::new();
        while let Ok(event) = events.try_recv() {
            kinds.push(match event {
                ControlEvent::PhaseStarted { index, .. } => format!("start {index}"),
                ControlEvent::Tick { index, tick, .. } => format!("tick {index}.{tick}"),
                ControlEvent::PhaseFinished { index, .. } => format!("finish {index}"),
            });
        }
        assert_eq!(
            kinds,
            vec!["start 0", "finish 0", "start 1", "tick 1.1", "tick 1.2", "finish 1"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn cycle_mode_restarts_until_cancelled() {
        let plan = ControlPlan {
            phases: vec![Phase::Hold {
                target: 21.0,
                ticks: Some(1),
            }],
            repeat: true,
        };
        let mut registry = registry(RecordingGateway::new().with_sensor(1, 20.0));
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3_500)).await;
            canceller.cancel();
        });
        let mut controller = TemperatureController::new(&mut registry, 1).with_cancellation(token);

        let outcome = controller.run(&plan).await.expect("run");

        assert!(matches!(outcome, ControlOutcome::Cancelled { .. }));
        assert_eq!(
            registry.gateway().writes(),
            vec![Call::SetHeater(1, HeaterLevel::Low); 4]
        );
        assert_eq!(registry.heater_level(1).expect("known"), HeaterLevel::Low);
        assert!(!registry.fan_is_on(1).expect("known"));
    }

    #[tokio::test(start_paused = true)]
    async fn sensor_failure_aborts_the_run() {
        let mut registry = registry(RecordingGateway::new());
        let mut controller = TemperatureController::new(&mut registry, 1);

        let err = controller.run(&ControlPlan::default()).await.expect_err("no sensor");

        assert!(matches!(err, CoreError::SensorFailed { sensor_id: 1, .. }));
    }

    #[test]
    fn standard_plan_shape() {
        let plan = ControlPlan::standard(19.5);

        assert_eq!(plan.phases.len(), 5);
        assert_eq!(plan.phases[3].target(), 19.5);
        assert_eq!(
            plan.phases[4],
            Phase::Hold {
                target: 19.5,
                ticks: None
            }
        );
        assert!(!plan.repeat);

        let cycling = plan.with_final_hold(30);
        assert!(cycling.repeat);
        assert_eq!(
            cycling.phases[4],
            Phase::Hold {
                target: 19.5,
                ticks: Some(30)
            }
        );
    }
}
