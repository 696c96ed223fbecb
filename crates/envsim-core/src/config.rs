// ── Runtime connection configuration ──
//
// These types describe *how* to reach the simulation and which devices
// exist there. They carry credential data but never touch disk.
// The CLI builds an `EnvironmentConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use url::Url;

/// Gateway location used when neither a profile nor a flag names one.
pub const DEFAULT_GATEWAY_URL: &str = "http://127.0.0.1:5077/";

/// Device count per kind when not configured.
pub const DEFAULT_DEVICE_COUNT: u32 = 3;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs).
    DangerAcceptInvalid,
}

/// Where the simulation lives and how to authenticate against it.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Base URL, e.g. `http://127.0.0.1:5077/`.
    pub url: Url,
    /// Static credential attached to every request.
    pub api_key: SecretString,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// How many devices of each kind the simulation exposes.
///
/// Identifiers are assigned `1..=n` per kind; fans and heaters are
/// independent namespaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCounts {
    pub sensors: u32,
    pub fans: u32,
    pub heaters: u32,
}

impl Default for DeviceCounts {
    fn default() -> Self {
        Self {
            sensors: DEFAULT_DEVICE_COUNT,
            fans: DEFAULT_DEVICE_COUNT,
            heaters: DEFAULT_DEVICE_COUNT,
        }
    }
}

/// Everything needed to drive one simulation for the process lifetime.
#[derive(Debug, Clone)]
pub struct EnvironmentConfig {
    pub gateway: GatewayConfig,
    pub devices: DeviceCounts,
}
