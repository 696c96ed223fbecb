// ── Device state machines ──
//
// One tagged enum per device kind. Each state has exactly one outgoing
// edge (`step`), computed purely; the remote side effect is returned as
// an `Effect` and only applied by `Device::transition`, which adopts the
// next state once the gateway acknowledges.
//
//   Fan:     Off ──▶ On ──▶ Off
//   Heater:  Off(0) ──▶ Low(1) ──▶ … ──▶ Max(5) ──▶ Off(0)

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, IntoStaticStr};
use tracing::debug;

use crate::error::CoreError;
use crate::gateway::Gateway;

/// Controllable device kinds. Identifiers are unique per kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    Fan,
    Heater,
}

/// A remote write a transition asks the gateway to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    SetFan(bool),
    SetHeater(HeaterLevel),
}

impl Effect {
    /// Perform this effect against device `id`.
    pub async fn apply<G: Gateway>(self, gateway: &G, id: u32) -> Result<(), CoreError> {
        match self {
            Self::SetFan(on) => gateway.set_fan(id, on).await,
            Self::SetHeater(level) => gateway.set_heater(id, level).await,
        }
    }
}

/// Behaviour shared by every device state machine.
pub trait DeviceState: Copy + Eq + Default + fmt::Debug + Send + Sync {
    const KIND: DeviceKind;

    /// Human-readable state name, e.g. `On` or `High (Level 3)`.
    fn name(self) -> &'static str;

    /// The single outgoing edge: successor state plus the effect to request.
    fn step(self) -> (Self, Effect);
}

// ── Fan ──────────────────────────────────────────────────────────────

/// Binary fan state.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, Display, IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
pub enum FanState {
    On,
    #[default]
    Off,
}

impl FanState {
    pub fn from_on(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    /// Plan a move to `target`: nothing when already there, otherwise
    /// exactly one toggle.
    pub fn plan_toward(self, target: FanState) -> Option<(FanState, Effect)> {
        (self != target).then(|| self.step())
    }
}

impl DeviceState for FanState {
    const KIND: DeviceKind = DeviceKind::Fan;

    fn name(self) -> &'static str {
        self.into()
    }

    fn step(self) -> (Self, Effect) {
        let next = match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        };
        (next, Effect::SetFan(next.is_on()))
    }
}

// ── Heater ───────────────────────────────────────────────────────────

/// Six linearly ordered heater levels, serialized on the wire as `0..=5`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    IntoStaticStr,
    EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum HeaterLevel {
    #[default]
    #[strum(serialize = "Off (Level 0)")]
    Off,
    #[strum(serialize = "Low (Level 1)")]
    Low,
    #[strum(serialize = "Medium (Level 2)")]
    Medium,
    #[strum(serialize = "High (Level 3)")]
    High,
    #[strum(serialize = "Very High (Level 4)")]
    VeryHigh,
    #[strum(serialize = "Maximum (Level 5)")]
    Max,
}

impl HeaterLevel {
    /// Wire value, `0..=5`.
    pub fn value(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::VeryHigh => 4,
            Self::Max => 5,
        }
    }

    /// Interpret a level reported by the simulation. Anything outside
    /// `0..=5` reads as `Off` rather than failing.
    pub fn from_wire(raw: i64) -> Self {
        Self::try_from(raw).unwrap_or_default()
    }

    /// Plan a move straight to `target`: always one remote call, no
    /// intermediate levels.
    pub fn plan_toward(self, target: HeaterLevel) -> (HeaterLevel, Effect) {
        (target, Effect::SetHeater(target))
    }
}

impl TryFrom<i64> for HeaterLevel {
    type Error = CoreError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Off),
            1 => Ok(Self::Low),
            2 => Ok(Self::Medium),
            3 => Ok(Self::High),
            4 => Ok(Self::VeryHigh),
            5 => Ok(Self::Max),
            other => Err(CoreError::heater_level_out_of_range(other)),
        }
    }
}

impl DeviceState for HeaterLevel {
    const KIND: DeviceKind = DeviceKind::Heater;

    fn name(self) -> &'static str {
        self.into()
    }

    fn step(self) -> (Self, Effect) {
        let next = Self::from_wire((i64::from(self.value()) + 1) % 6);
        (next, Effect::SetHeater(next))
    }
}

// ── Device context ───────────────────────────────────────────────────

/// Binds a device identifier to its current state.
///
/// Callers outside the registry see only the id, the state name, and
/// `transition`; the state itself is changed through gateway-confirmed
/// moves or registry resynchronization.
#[derive(Debug, Clone)]
pub struct Device<S> {
    id: u32,
    state: S,
}

impl<S: DeviceState> Device<S> {
    pub fn new(id: u32, initial: S) -> Self {
        Self { id, state: initial }
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn state_name(&self) -> &'static str {
        self.state.name()
    }

    /// Advance one step. The gateway is called once; the new state is
    /// adopted only after it acknowledges.
    pub async fn transition<G: Gateway>(&mut self, gateway: &G) -> Result<S, CoreError> {
        let (next, effect) = self.state.step();
        self.apply(gateway, next, effect).await?;
        Ok(next)
    }

    /// `"Fan 1: On"` style description.
    pub fn describe(&self) -> String {
        format!("{} {}: {}", S::KIND, self.id, self.state.name())
    }

    pub(crate) fn state(&self) -> S {
        self.state
    }

    /// Overwrite the state without any side effect (resynchronization).
    pub(crate) fn set_state(&mut self, state: S) {
        self.state = state;
    }

    /// Request `effect` and adopt `next` on acknowledgement.
    pub(crate) async fn apply<G: Gateway>(
        &mut self,
        gateway: &G,
        next: S,
        effect: Effect,
    ) -> Result<(), CoreError> {
        debug!(kind = %S::KIND, id = self.id, from = ?self.state, to = ?next, "transition");
        effect.apply(gateway, self.id).await?;
        self.state = next;
        Ok(())
    }
}
