// ── Device registry ──
//
// Owns every fan and heater device context, keyed and iterated by id.
// Local state changes only through gateway-acknowledged moves or an
// explicit resynchronization against the simulation.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::DeviceCounts;
use crate::device::{Device, DeviceKind, DeviceState, FanState, HeaterLevel};
use crate::error::CoreError;
use crate::gateway::Gateway;

/// Identifies one device across both kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DeviceRef {
    pub kind: DeviceKind,
    pub id: u32,
}

/// A device whose authoritative state could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub device: DeviceRef,
    pub reason: String,
}

/// Outcome of [`DeviceRegistry::initialize_from_gateway`].
///
/// Devices listed in `failures` kept their previous local state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub synced: Vec<DeviceRef>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Flat, serializable view of one device for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceSummary {
    pub kind: DeviceKind,
    pub id: u32,
    pub state: &'static str,
    pub description: String,
}

impl DeviceSummary {
    fn of<S: DeviceState>(device: &Device<S>) -> Self {
        Self {
            kind: S::KIND,
            id: device.id(),
            state: device.state_name(),
            description: device.describe(),
        }
    }
}

/// All controllable devices of one simulation, plus the gateway used to
/// drive them.
pub struct DeviceRegistry<G> {
    gateway: G,
    fans: BTreeMap<u32, Device<FanState>>,
    heaters: BTreeMap<u32, Device<HeaterLevel>>,
}

impl<G: Gateway> DeviceRegistry<G> {
    /// Register fans `1..=fans` (off) and heaters `1..=heaters` (level 0).
    pub fn new(gateway: G, fans: u32, heaters: u32) -> Self {
        Self {
            gateway,
            fans: (1..=fans)
                .map(|id| (id, Device::new(id, FanState::Off)))
                .collect(),
            heaters: (1..=heaters)
                .map(|id| (id, Device::new(id, HeaterLevel::Off)))
                .collect(),
        }
    }

    pub fn from_counts(gateway: G, counts: &DeviceCounts) -> Self {
        Self::new(gateway, counts.fans, counts.heaters)
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn fan_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.fans.keys().copied()
    }

    pub fn heater_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.heaters.keys().copied()
    }

    // ── Resynchronization ────────────────────────────────────────────

    /// Overwrite every local state with the simulation's reported state.
    ///
    /// No transition runs and nothing is written remotely. A device whose
    /// fetch fails keeps its current state and is listed in the report.
    pub async fn initialize_from_gateway(&mut self) -> SyncReport {
        let mut report = SyncReport::default();

        for (id, fan) in &mut self.fans {
            let device = DeviceRef {
                kind: DeviceKind::Fan,
                id: *id,
            };
            match self.gateway.fan_state(*id).await {
                Ok(state) => {
                    fan.set_state(state);
                    report.synced.push(device);
                }
                Err(e) => {
                    warn!(id, error = %e, "could not fetch fan state; keeping local state");
                    report.failures.push(SyncFailure {
                        device,
                        reason: e.to_string(),
                    });
                }
            }
        }

        for (id, heater) in &mut self.heaters {
            let device = DeviceRef {
                kind: DeviceKind::Heater,
                id: *id,
            };
            match self.gateway.heater_level(*id).await {
                Ok(level) => {
                    heater.set_state(level);
                    report.synced.push(device);
                }
                Err(e) => {
                    warn!(id, error = %e, "could not fetch heater level; keeping local state");
                    report.failures.push(SyncFailure {
                        device,
                        reason: e.to_string(),
                    });
                }
            }
        }

        debug!(
            synced = report.synced.len(),
            failed = report.failures.len(),
            "registry resynchronized"
        );
        report
    }

    /// Reset the simulation, return every device to its default state,
    /// then resynchronize.
    pub async fn reset_and_resync(&mut self) -> Result<SyncReport, CoreError> {
        self.gateway.reset().await?;
        info!("simulation reset");
        for fan in self.fans.values_mut() {
            fan.set_state(FanState::default());
        }
        for heater in self.heaters.values_mut() {
            heater.set_state(HeaterLevel::default());
        }
        Ok(self.initialize_from_gateway().await)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn fan_is_on(&self, id: u32) -> Result<bool, CoreError> {
        Ok(self.fan(id)?.state().is_on())
    }

    pub fn heater_level(&self, id: u32) -> Result<HeaterLevel, CoreError> {
        Ok(self.heater(id)?.state())
    }

    /// `id -> "Fan id: state"`, ordered by id.
    pub fn describe_fans(&self) -> BTreeMap<u32, String> {
        self.fans
            .iter()
            .map(|(id, fan)| (*id, fan.describe()))
            .collect()
    }

    /// `id -> "Heater id: state"`, ordered by id.
    pub fn describe_heaters(&self) -> BTreeMap<u32, String> {
        self.heaters
            .iter()
            .map(|(id, heater)| (*id, heater.describe()))
            .collect()
    }

    /// Fans then heaters, each in id order.
    pub fn summaries(&self) -> Vec<DeviceSummary> {
        self.fans
            .values()
            .map(DeviceSummary::of)
            .chain(self.heaters.values().map(DeviceSummary::of))
            .collect()
    }

    // ── Single-device operations ─────────────────────────────────────

    /// Drive fan `id` to the requested state: no gateway call when it is
    /// already there, otherwise exactly one.
    pub async fn set_fan(&mut self, id: u32, on: bool) -> Result<FanState, CoreError> {
        let fan = self
            .fans
            .get_mut(&id)
            .ok_or(CoreError::UnknownDevice {
                kind: DeviceKind::Fan,
                id,
            })?;
        if let Some((next, effect)) = fan.state().plan_toward(FanState::from_on(on)) {
            fan.apply(&self.gateway, next, effect).await?;
        }
        Ok(fan.state())
    }

    /// Set heater `id` from a raw level. Out-of-range levels are rejected
    /// before anything is sent.
    pub async fn set_heater_level(&mut self, id: u32, level: i64) -> Result<HeaterLevel, CoreError> {
        let level = HeaterLevel::try_from(level)?;
        self.set_heater(id, level).await
    }

    /// Set heater `id` to `level` in one gateway call.
    pub async fn set_heater(&mut self, id: u32, level: HeaterLevel) -> Result<HeaterLevel, CoreError> {
        let heater = self
            .heaters
            .get_mut(&id)
            .ok_or(CoreError::UnknownDevice {
                kind: DeviceKind::Heater,
                id,
            })?;
        let (next, effect) = heater.state().plan_toward(level);
        heater.apply(&self.gateway, next, effect).await?;
        Ok(next)
    }

    /// Advance fan `id` one step (toggle).
    pub async fn advance_fan(&mut self, id: u32) -> Result<FanState, CoreError> {
        let fan = self.fans.get_mut(&id).ok_or(CoreError::UnknownDevice {
            kind: DeviceKind::Fan,
            id,
        })?;
        fan.transition(&self.gateway).await
    }

    /// Advance heater `id` one level, wrapping from `Max` to `Off`.
    pub async fn advance_heater(&mut self, id: u32) -> Result<HeaterLevel, CoreError> {
        let heater = self
            .heaters
            .get_mut(&id)
            .ok_or(CoreError::UnknownDevice {
                kind: DeviceKind::Heater,
                id,
            })?;
        heater.transition(&self.gateway).await
    }

    // ── Bulk operations ──────────────────────────────────────────────

    /// Apply [`set_fan`](Self::set_fan) to every fan in id order.
    ///
    /// Stops at the first failure. Fans listed in the error's `applied`
    /// already hold the requested state; later fans were not attempted.
    pub async fn set_all_fans(&mut self, on: bool) -> Result<(), CoreError> {
        let ids: Vec<u32> = self.fans.keys().copied().collect();
        let mut applied = Vec::with_capacity(ids.len());
        for id in ids {
            if let Err(source) = self.set_fan(id, on).await {
                return Err(CoreError::BulkFailed {
                    kind: DeviceKind::Fan,
                    device_id: id,
                    applied,
                    source: Box::new(source),
                });
            }
            applied.push(id);
        }
        Ok(())
    }

    /// Validate `level`, then set every heater to it in id order.
    pub async fn set_all_heaters(&mut self, level: i64) -> Result<(), CoreError> {
        let level = HeaterLevel::try_from(level)?;
        self.set_all_heaters_to(level).await
    }

    /// Typed form of [`set_all_heaters`](Self::set_all_heaters); same
    /// stop-at-first-failure behaviour as [`set_all_fans`](Self::set_all_fans).
    pub async fn set_all_heaters_to(&mut self, level: HeaterLevel) -> Result<(), CoreError> {
        let ids: Vec<u32> = self.heaters.keys().copied().collect();
        let mut applied = Vec::with_capacity(ids.len());
        for id in ids {
            if let Err(source) = self.set_heater(id, level).await {
                return Err(CoreError::BulkFailed {
                    kind: DeviceKind::Heater,
                    device_id: id,
                    applied,
                    source: Box::new(source),
                });
            }
            applied.push(id);
        }
        Ok(())
    }

    // ── Lookup ───────────────────────────────────────────────────────

    fn fan(&self, id: u32) -> Result<&Device<FanState>, CoreError> {
        self.fans.get(&id).ok_or(CoreError::UnknownDevice {
            kind: DeviceKind::Fan,
            id,
        })
    }

    fn heater(&self, id: u32) -> Result<&Device<HeaterLevel>, CoreError> {
        self.heaters.get(&id).ok_or(CoreError::UnknownDevice {
            kind: DeviceKind::Heater,
            id,
        })
    }
}
