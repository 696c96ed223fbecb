//! CLI configuration: a thin wrapper around `envsim_config` shared types.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--gateway, --api-key, --insecure, --timeout).

use std::time::Duration;

use secrecy::SecretString;

use envsim_core::{EnvironmentConfig, GatewayConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

// ── Re-exports from shared crate ────────────────────────────────────

pub use envsim_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Everything a device command needs, resolved once at startup.
pub struct Resolved {
    pub profile_name: String,
    pub environment: EnvironmentConfig,
    /// Default control loop tick from the config file.
    pub tick: Duration,
}

// ── CLI-specific helpers ────────────────────────────────────────────

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Comma-separated profile names, or `(none)`.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config
            .profiles
            .keys()
            .cloned()
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Build the runtime configuration from the config file, the active
/// profile, and CLI overrides.
///
/// Without a matching profile the built-in defaults apply, unless the
/// profile was named explicitly with `--profile`.
pub fn resolve(global: &GlobalOpts) -> Result<Resolved, CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => Profile::default(),
    };

    let environment = resolve_profile(&profile, &profile_name, global, cfg.defaults.timeout)?;

    Ok(Resolved {
        profile_name,
        environment,
        tick: Duration::from_millis(cfg.defaults.tick_ms.max(1)),
    })
}

/// Translate a `Profile` + global flags into an `EnvironmentConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
    default_timeout: u64,
) -> Result<EnvironmentConfig, CliError> {
    // 1. Gateway URL (flag > env > profile)
    let url_str = global.gateway.as_deref().unwrap_or(&profile.gateway);
    let url = envsim_config::parse_gateway_url(url_str)?;

    // 2. API key (flag > profile chain)
    let api_key = match global.api_key {
        Some(ref key) => SecretString::from(key.clone()),
        None => envsim_config::resolve_api_key(profile, profile_name)?,
    };

    // 3. TLS verification
    let tls = if global.insecure || profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    // 4. Timeout (flag > profile > defaults)
    let timeout = Duration::from_secs(
        global
            .timeout
            .or(profile.timeout)
            .unwrap_or(default_timeout),
    );

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
