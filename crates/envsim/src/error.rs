//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a process exit code.

use miette::Diagnostic;
use thiserror::Error;

use envsim_config::ConfigError;
use envsim_core::{CoreError, DeviceKind};

/// Process exit codes; success is 0.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the simulation at {url}")]
    #[diagnostic(
        code(envsim::connection_failed),
        help(
            "Check that the simulation is running and reachable.\n\
             Reason: {reason}\n\
             Override the address with --gateway <URL>."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Simulation request timed out")]
    #[diagnostic(
        code(envsim::timeout),
        help("Increase the timeout with --timeout or check the simulation's responsiveness.")
    )]
    Timeout,

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed")]
    #[diagnostic(
        code(envsim::auth_failed),
        help(
            "The simulation rejected the API key.\n\
             Run: envsim config set-key --profile {profile}"
        )
    )]
    AuthFailed { profile: String },

    #[error("No API key configured for profile '{profile}'")]
    #[diagnostic(
        code(envsim::no_credentials),
        help(
            "Configure one with: envsim config init\n\
             Or pass --api-key / set ENVSIM_API_KEY."
        )
    )]
    NoCredentials { profile: String },

    // ── Devices ──────────────────────────────────────────────────────
    #[error("{kind} {id} not found")]
    #[diagnostic(
        code(envsim::not_found),
        help("Run: envsim {list_command} to see available devices")
    )]
    NotFound {
        kind: String,
        id: u32,
        list_command: String,
    },

    #[error("Setting all {kind}s stopped at {kind} {device_id}")]
    #[diagnostic(
        code(envsim::partial_failure),
        help("Already applied: {applied}. Later devices were not changed.")
    )]
    PartialFailure {
        kind: DeviceKind,
        device_id: u32,
        applied: String,
        #[source]
        #[diagnostic_source]
        source: Box<CliError>,
    },

    #[error("Reading sensor {sensor_id} failed")]
    #[diagnostic(code(envsim::sensor_failed))]
    SensorFailed {
        sensor_id: u32,
        #[source]
        #[diagnostic_source]
        source: Box<CliError>,
    },

    // ── Gateway ──────────────────────────────────────────────────────
    #[error("Simulation error{}: {message}", .status.map(|s| format!(" ({s})")).unwrap_or_default())]
    #[diagnostic(code(envsim::gateway))]
    Gateway {
        message: String,
        status: Option<u16>,
    },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(envsim::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(envsim::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: envsim config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(envsim::config))]
    Config { message: String },

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Operation '{action}' requires confirmation")]
    #[diagnostic(
        code(envsim::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    #[error("Internal error: {0}")]
    #[diagnostic(code(envsim::internal))]
    Internal(String),

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            Self::PartialFailure { source, .. } | Self::SensorFailed { source, .. } => {
                source.exit_code()
            }
            _ => exit_code::GENERAL,
        }
    }
}

// Required by `#[diagnostic_source]` on the boxed `source` fields above.
impl std::borrow::Borrow<dyn Diagnostic> for Box<CliError> {
    fn borrow(&self) -> &(dyn Diagnostic + 'static) {
        self.as_ref()
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },

            CoreError::AuthenticationFailed { message: _ } => CliError::AuthFailed {
                profile: "current".into(),
            },

            CoreError::Timeout => CliError::Timeout,

            CoreError::UnknownDevice { kind, id } => CliError::NotFound {
                kind: kind.to_string(),
                id,
                list_command: match kind {
                    DeviceKind::Fan => "fans list".into(),
                    DeviceKind::Heater => "heaters list".into(),
                },
            },

            CoreError::InvalidParameter { field, reason } => CliError::Validation { field, reason },

            CoreError::Gateway { message, status } => CliError::Gateway { message, status },

            CoreError::SensorFailed { sensor_id, source } => CliError::SensorFailed {
                sensor_id,
                source: Box::new(CliError::from(*source)),
            },

            CoreError::BulkFailed {
                kind,
                device_id,
                applied,
                source,
            } => CliError::PartialFailure {
                kind,
                device_id,
                applied: if applied.is_empty() {
                    "none".into()
                } else {
                    applied
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", ")
                },
                source: Box::new(CliError::from(*source)),
            },

            CoreError::Config { message } => CliError::Config { message },

            CoreError::Internal(message) => CliError::Internal(message),
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::UnknownProfile { name } => CliError::ProfileNotFound {
                name,
                available: "(none)".into(),
            },
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

/// Map a dialoguer / interactive I/O failure into CliError.
pub fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}
