// ── Temperature sensors ──
//
// Sensors are read-only and stateless on our side; ids run `1..=count`.

use serde::Serialize;
use tracing::debug;

use crate::error::CoreError;
use crate::gateway::Gateway;

/// One sensor's result for display: either a temperature or the reason
/// it could not be read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorReading {
    pub id: u32,
    pub temperature: Option<f64>,
    pub error: Option<String>,
}

/// Mean temperature across sensors `1..=sensor_count`, read in id order.
///
/// A single failed read fails the whole sample; the remaining sensors
/// are not read.
pub async fn sample_average<G: Gateway>(gateway: &G, sensor_count: u32) -> Result<f64, CoreError> {
    if sensor_count == 0 {
        return Err(CoreError::InvalidParameter {
            field: "sensor count".into(),
            reason: "at least one sensor is required to sample temperature".into(),
        });
    }

    let mut sum = 0.0;
    for id in 1..=sensor_count {
        sum += gateway
            .read_sensor(id)
            .await
            .map_err(|e| CoreError::SensorFailed {
                sensor_id: id,
                source: Box::new(e),
            })?;
    }
    let average = sum / f64::from(sensor_count);
    debug!(sensors = sensor_count, average, "sampled temperature");
    Ok(average)
}

/// Read every sensor, keeping per-sensor failures instead of stopping.
pub async fn read_all_sensors<G: Gateway>(gateway: &G, sensor_count: u32) -> Vec<SensorReading> {
    let mut readings = Vec::with_capacity(sensor_count as usize);
    for id in 1..=sensor_count {
        let reading = match gateway.read_sensor(id).await {
            Ok(t) => SensorReading {
                id,
                temperature: Some(t),
                error: None,
            },
            Err(e) => SensorReading {
                id,
                temperature: None,
                error: Some(e.to_string()),
            },
        };
        readings.push(reading);
    }
    readings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Call, RecordingGateway};

    #[tokio::test]
    async fn average_of_three_sensors_is_exact() {
        let gateway = RecordingGateway::new()
            .with_sensor(1, 18.0)
            .with_sensor(2, 20.0)
            .with_sensor(3, 19.0);

        let avg = sample_average(&gateway, 3).await.expect("sample");

        assert!((avg - 19.0).abs() < f64::EPSILON);
        assert_eq!(
            gateway.calls(),
            vec![Call::ReadSensor(1), Call::ReadSensor(2), Call::ReadSensor(3)]
        );
    }

    #[tokio::test]
    async fn one_failed_sensor_fails_the_sample() {
        let gateway = RecordingGateway::new()
            .with_sensor(1, 18.0)
            .with_sensor(3, 19.0);

        let err = sample_average(&gateway, 3).await.expect_err("sensor 2 missing");

        assert!(matches!(err, CoreError::SensorFailed { sensor_id: 2, .. }));
        assert_eq!(gateway.calls(), vec![Call::ReadSensor(1), Call::ReadSensor(2)]);
    }

    #[tokio::test]
    async fn sampling_zero_sensors_is_rejected() {
        let gateway = RecordingGateway::new();

        let err = sample_average(&gateway, 0).await.expect_err("no sensors");

        assert!(matches!(err, CoreError::InvalidParameter { .. }));
        assert!(gateway.calls().is_empty());
    }

    #[tokio::test]
    async fn read_all_keeps_going_past_failures() {
        let gateway = RecordingGateway::new()
            .with_sensor(1, 21.5)
            .with_sensor(3, 22.0);

        let readings = read_all_sensors(&gateway, 3).await;

        assert_eq!(readings.len(), 3);
        assert_eq!(readings[0].temperature, Some(21.5));
        assert!(readings[1].temperature.is_none());
        assert!(readings[1].error.is_some());
        assert_eq!(readings[2].temperature, Some(22.0));
    }
}
