//! Configuration for the `envsim` CLI.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `envsim_core::EnvironmentConfig`. The CLI layers
//! its global flags on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use envsim_core::config::{DEFAULT_DEVICE_COUNT, DEFAULT_GATEWAY_URL};
use envsim_core::{DeviceCounts, EnvironmentConfig, GatewayConfig, TlsVerification};

/// Keyring service under which API keys are stored.
pub const KEYRING_SERVICE: &str = "envsim";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no API key configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named simulation profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Look up `name`, or the default profile when `name` is `None`.
    pub fn profile(&self, name: Option<&str>) -> Result<(&str, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or("default");
        self.profiles
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| ConfigError::UnknownProfile { name: name.into() })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Control loop tick length in milliseconds.
    #[serde(default = "default_tick_ms")]
    pub tick_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            tick_ms: default_tick_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_tick_ms() -> u64 {
    1_000
}

/// A named simulation profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Simulation base URL.
    #[serde(default = "default_gateway")]
    pub gateway: String,

    /// API key (plaintext; prefer keyring or env var).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Environment variable name containing the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default = "default_count")]
    pub sensors: u32,

    #[serde(default = "default_count")]
    pub fans: u32,

    #[serde(default = "default_count")]
    pub heaters: u32,

    /// Path to custom CA certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<PathBuf>,

    /// Accept invalid TLS certificates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,

    /// Override the default request timeout (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            gateway: default_gateway(),
            api_key: None,
            api_key_env: None,
            sensors: DEFAULT_DEVICE_COUNT,
            fans: DEFAULT_DEVICE_COUNT,
            heaters: DEFAULT_DEVICE_COUNT,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

impl Profile {
    pub fn device_counts(&self) -> DeviceCounts {
        DeviceCounts {
            sensors: self.sensors,
            fans: self.fans,
            heaters: self.heaters,
        }
    }
}

fn default_gateway() -> String {
    DEFAULT_GATEWAY_URL.into()
}
fn default_count() -> u32 {
    DEFAULT_DEVICE_COUNT
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "envsim", "envsim").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("envsim");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config: defaults, then the config file, then
/// `ENVSIM_*` environment variables (`__` separates nested keys, e.g.
/// `ENVSIM_DEFAULTS__TICK_MS=250`).
pub fn load_config() -> Result<Config, ConfigError> {
    let figment = base_figment(&config_path()).merge(Env::prefixed("ENVSIM_").split("__"));
    Ok(figment.extract()?)
}

/// Load defaults merged with the TOML file at `path` only.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    Ok(base_figment(path).extract()?)
}

fn base_figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution (without CLI flags) ───────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/api-key"))
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Store an API key for `profile_name` in the OS keyring.
pub fn store_api_key(profile_name: &str, key: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?
        .set_password(key)
        .map_err(|e| ConfigError::Keyring(e.to_string()))
}

/// Resolve an API key: `api_key_env` variable, then keyring, then the
/// plaintext `api_key`.
pub fn resolve_api_key(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    resolve_api_key_with(
        profile,
        profile_name,
        |name| std::env::var(name).ok(),
        |profile_name| keyring_entry(profile_name).ok()?.get_password().ok(),
    )
}

fn resolve_api_key_with(
    profile: &Profile,
    profile_name: &str,
    env: impl Fn(&str) -> Option<String>,
    keyring: impl Fn(&str) -> Option<String>,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's api_key_env → env var lookup
    if let Some(val) = profile.api_key_env.as_deref().and_then(&env) {
        return Ok(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring(profile_name) {
        return Ok(SecretString::from(secret));
    }

    // 3. Plaintext in config
    if let Some(ref key) = profile.api_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Build an `EnvironmentConfig` from a profile, without CLI overrides.
pub fn profile_to_environment_config(
    profile: &Profile,
    profile_name: &str,
    default_timeout: u64,
) -> Result<EnvironmentConfig, ConfigError> {
    let api_key = resolve_api_key(profile, profile_name)?;
    build_environment_config(profile, api_key, default_timeout)
}

fn build_environment_config(
    profile: &Profile,
    api_key: SecretString,
    default_timeout: u64,
) -> Result<EnvironmentConfig, ConfigError> {
    let url = parse_gateway_url(&profile.gateway)?;

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let timeout = Duration::from_secs(profile.timeout.unwrap_or(default_timeout));

    Ok(EnvironmentConfig {
        gateway: GatewayConfig {
            url,
            api_key,
            tls,
            timeout,
        },
        devices: profile.device_counts(),
    })
}

/// Parse a gateway URL, requiring an http(s) scheme.
pub fn parse_gateway_url(raw: &str) -> Result<url::Url, ConfigError> {
    let url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "gateway".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "gateway".into(),
            reason: format!("expected an http or https URL, got {raw}"),
        });
    }
    Ok(url)
}
