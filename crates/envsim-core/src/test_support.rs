// In-memory gateway double for unit tests.
//
// Records every call in order, serves scripted or fixed sensor values,
// and fails writes for devices marked as failing.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use crate::device::{DeviceKind, FanState, HeaterLevel};
use crate::error::CoreError;
use crate::gateway::Gateway;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    ReadSensor(u32),
    FanState(u32),
    HeaterLevel(u32),
    SetFan(u32, bool),
    SetHeater(u32, HeaterLevel),
    Reset,
}

#[derive(Default)]
pub(crate) struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    /// Popped one per sensor read; takes priority over `fixed_sensors`.
    scripted_readings: Mutex<VecDeque<f64>>,
    fixed_sensors: HashMap<u32, f64>,
    remote_fans: HashMap<u32, bool>,
    remote_heaters: HashMap<u32, i64>,
    failing_sets: HashSet<(DeviceKind, u32)>,
}

fn refused(what: &str) -> CoreError {
    CoreError::Gateway {
        message: format!("{what} refused"),
        status: Some(500),
    }
}

impl RecordingGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_sensor(mut self, id: u32, value: f64) -> Self {
        self.fixed_sensors.insert(id, value);
        self
    }

    pub(crate) fn with_readings(self, readings: &[f64]) -> Self {
        self.scripted_readings
            .lock()
            .expect("lock")
            .extend(readings.iter().copied());
        self
    }

    pub(crate) fn with_remote_fan(mut self, id: u32, on: bool) -> Self {
        self.remote_fans.insert(id, on);
        self
    }

    pub(crate) fn with_remote_heater(mut self, id: u32, raw_level: i64) -> Self {
        self.remote_heaters.insert(id, raw_level);
        self
    }

    pub(crate) fn failing_set(mut self, kind: DeviceKind, id: u32) -> Self {
        self.failing_sets.insert((kind, id));
        self
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("lock").clone()
    }

    /// Only the actuator writes, in order.
    pub(crate) fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::SetFan(..) | Call::SetHeater(..)))
            .collect()
    }

    pub(crate) fn clear_calls(&self) {
        self.calls.lock().expect("lock").clear();
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("lock").push(call);
    }
}

impl Gateway for RecordingGateway {
    async fn read_sensor(&self, id: u32) -> Result<f64, CoreError> {
        self.record(Call::ReadSensor(id));
        if let Some(value) = self.scripted_readings.lock().expect("lock").pop_front() {
            return Ok(value);
        }
        self.fixed_sensors
            .get(&id)
            .copied()
            .ok_or_else(|| refused("sensor read"))
    }

    async fn fan_state(&self, id: u32) -> Result<FanState, CoreError> {
        self.record(Call::FanState(id));
        self.remote_fans
            .get(&id)
            .map(|on| FanState::from_on(*on))
            .ok_or_else(|| refused("fan state"))
    }

    async fn heater_level(&self, id: u32) -> Result<HeaterLevel, CoreError> {
        self.record(Call::HeaterLevel(id));
        self.remote_heaters
            .get(&id)
            .map(|raw| HeaterLevel::from_wire(*raw))
            .ok_or_else(|| refused("heater level"))
    }

    async fn set_fan(&self, id: u32, on: bool) -> Result<(), CoreError> {
        self.record(Call::SetFan(id, on));
        if self.failing_sets.contains(&(DeviceKind::Fan, id)) {
            return Err(refused("fan write"));
        }
        Ok(())
    }

    async fn set_heater(&self, id: u32, level: HeaterLevel) -> Result<(), CoreError> {
        self.record(Call::SetHeater(id, level));
        if self.failing_sets.contains(&(DeviceKind::Heater, id)) {
            return Err(refused("heater write"));
        }
        Ok(())
    }

    async fn reset(&self) -> Result<(), CoreError> {
        self.record(Call::Reset);
        Ok(())
    }
}
