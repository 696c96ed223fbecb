// ── Core error types ──
//
// User-facing errors from envsim-core. Consumers never see raw HTTP
// status codes or body parse failures; the `From<envsim_api::Error>`
// impl translates transport-layer errors into domain variants.

use thiserror::Error;

use crate::device::DeviceKind;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot connect to the simulation at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Simulation request timed out")]
    Timeout,

    // ── Device errors ────────────────────────────────────────────────
    #[error("{kind} {id} is not registered")]
    UnknownDevice { kind: DeviceKind, id: u32 },

    #[error("Invalid {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    // ── Gateway errors ───────────────────────────────────────────────
    #[error("Gateway rejected the request: {message}")]
    Gateway {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    #[error("Reading sensor {sensor_id} failed: {source}")]
    SensorFailed {
        sensor_id: u32,
        #[source]
        source: Box<CoreError>,
    },

    /// A bulk operation stopped at `device_id`. Devices in `applied`
    /// already hold the new state; later devices were not attempted.
    #[error("Setting all {kind}s stopped at {kind} {device_id}: {source}")]
    BulkFailed {
        kind: DeviceKind,
        device_id: u32,
        applied: Vec<u32>,
        #[source]
        source: Box<CoreError>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn heater_level_out_of_range(level: i64) -> Self {
        Self::InvalidParameter {
            field: "heater level".into(),
            reason: format!("must be between 0 and 5, got {level}"),
        }
    }

    /// The innermost error, looking through sensor and bulk wrappers.
    pub fn root_cause(&self) -> &CoreError {
        match self {
            Self::SensorFailed { source, .. } | Self::BulkFailed { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<envsim_api::Error> for CoreError {
    fn from(err: envsim_api::Error) -> Self {
        match err {
            envsim_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "API key rejected by the simulation".into(),
            },
            envsim_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Gateway {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            envsim_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            envsim_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            envsim_api::Error::Gateway { status, message } => CoreError::Gateway {
                message,
                status: Some(status),
            },
            envsim_api::Error::Deserialization { message, body: _ } => CoreError::Gateway {
                message: format!("unexpected response body: {message}"),
                status: None,
            },
        }
    }
}
