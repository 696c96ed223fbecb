// ── Gateway port ──
//
// Every remote read and write the core performs goes through `Gateway`.
// The registry and control loop are generic over it, so tests can swap
// the HTTP client for an in-memory double.

use std::future::Future;

use envsim_api::transport::{TlsMode, TransportConfig};
use envsim_api::GatewayClient;
use secrecy::ExposeSecret;
use tracing::debug;

use crate::config::{GatewayConfig, TlsVerification};
use crate::device::{FanState, HeaterLevel};
use crate::error::CoreError;

/// Request/response access to the simulation's sensors and actuators.
///
/// Each call is one round trip; nothing is retried here.
pub trait Gateway: Send + Sync {
    /// Temperature reported by sensor `id`.
    fn read_sensor(&self, id: u32) -> impl Future<Output = Result<f64, CoreError>> + Send;

    /// Authoritative state of fan `id`.
    fn fan_state(&self, id: u32) -> impl Future<Output = Result<FanState, CoreError>> + Send;

    /// Authoritative level of heater `id`; unknown wire values read as `Off`.
    fn heater_level(&self, id: u32)
    -> impl Future<Output = Result<HeaterLevel, CoreError>> + Send;

    /// Switch fan `id` on or off.
    fn set_fan(&self, id: u32, on: bool) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Set heater `id` directly to `level`.
    fn set_heater(
        &self,
        id: u32,
        level: HeaterLevel,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;

    /// Reset all remote device state.
    fn reset(&self) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl Gateway for GatewayClient {
    async fn read_sensor(&self, id: u32) -> Result<f64, CoreError> {
        Ok(GatewayClient::read_sensor(self, id).await?)
    }

    async fn fan_state(&self, id: u32) -> Result<FanState, CoreError> {
        let status = GatewayClient::fan_state(self, id).await?;
        Ok(FanState::from_on(status.is_on))
    }

    async fn heater_level(&self, id: u32) -> Result<HeaterLevel, CoreError> {
        let raw = GatewayClient::heater_level(self, id).await?;
        Ok(HeaterLevel::from_wire(raw))
    }

    async fn set_fan(&self, id: u32, on: bool) -> Result<(), CoreError> {
        Ok(self.set_fan_state(id, on).await?)
    }

    async fn set_heater(&self, id: u32, level: HeaterLevel) -> Result<(), CoreError> {
        Ok(self.set_heater_level(id, level.value()).await?)
    }

    async fn reset(&self) -> Result<(), CoreError> {
        Ok(GatewayClient::reset(self).await?)
    }
}

/// Build an authenticated [`GatewayClient`] from runtime configuration.
///
/// No request is sent; the first call reveals whether the simulation is
/// reachable.
pub fn connect(config: &GatewayConfig) -> Result<GatewayClient, CoreError> {
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    };
    if config.api_key.expose_secret().is_empty() {
        return Err(CoreError::Config {
            message: "API key is empty".into(),
        });
    }
    debug!(url = %config.url, "building gateway client");
    Ok(GatewayClient::from_api_key(
        config.url.as_str(),
        &config.api_key,
        &transport,
    )?)
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
