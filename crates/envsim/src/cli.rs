//! Clap derive structures for the `envsim` CLI.
//!
//! Defines the command tree, global flags, and shared value types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// envsim -- drive the environment simulation's fans, heaters, and sensors
#[derive(Debug, Parser)]
#[command(
    name = "envsim",
    version,
    about = "Control the environment simulation from the command line",
    long_about = "Reads temperature sensors, switches fans, sets heater levels, and runs\n\
        the phased temperature control loop against a remote environment simulation.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Simulation profile to use
    #[arg(long, short = 'p', env = "ENVSIM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Simulation base URL (overrides profile)
    #[arg(long, short = 'g', env = "ENVSIM_GATEWAY", global = true)]
    pub gateway: Option<String>,

    /// API key sent with every request
    #[arg(long, env = "ENVSIM_API_KEY", global = true, hide_env = true)]
    pub api_key: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "ENVSIM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "ENVSIM_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile and config defaults)
    #[arg(long, env = "ENVSIM_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Fan switch position as typed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show and switch fans
    #[command(alias = "fan", alias = "f")]
    Fans(FansArgs),

    /// Show and set heater levels
    #[command(alias = "heater", alias = "h")]
    Heaters(HeatersArgs),

    /// Read temperature sensors
    #[command(alias = "sensor", alias = "s")]
    Sensors(SensorsArgs),

    /// Show every fan, heater, and sensor
    #[command(alias = "st")]
    Status,

    /// Run the phased temperature control loop (Ctrl-C stops it)
    #[command(alias = "run")]
    Control(ControlArgs),

    /// Reset the simulation and show the resulting device states
    Reset,

    /// Interactive menu
    Menu,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  FANS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct FansArgs {
    #[command(subcommand)]
    pub command: FansCommand,
}

#[derive(Debug, Subcommand)]
pub enum FansCommand {
    /// List fans and their states
    #[command(alias = "ls")]
    List,

    /// Switch one fan on or off
    Set {
        /// Fan number
        id: u32,

        /// Desired state
        #[arg(value_enum)]
        state: Switch,
    },

    /// Switch every fan on or off, in id order
    SetAll {
        /// Desired state
        #[arg(value_enum)]
        state: Switch,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  HEATERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct HeatersArgs {
    #[command(subcommand)]
    pub command: HeatersCommand,
}

#[derive(Debug, Subcommand)]
pub enum HeatersCommand {
    /// List heaters and their levels
    #[command(alias = "ls")]
    List,

    /// Set one heater to a level (0-5)
    Set {
        /// Heater number
        id: u32,

        /// Level, 0 (off) to 5 (maximum)
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },

    /// Set every heater to a level (0-5), in id order
    SetAll {
        /// Level, 0 (off) to 5 (maximum)
        #[arg(allow_negative_numbers = true)]
        level: i64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SENSORS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SensorsArgs {
    #[command(subcommand)]
    pub command: SensorsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SensorsCommand {
    /// Read every sensor
    #[command(alias = "ls")]
    List,

    /// Read one sensor
    Read {
        /// Sensor number
        id: u32,
    },

    /// Mean temperature across all sensors
    #[command(alias = "avg")]
    Average,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONTROL
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ControlArgs {
    /// Target of the last ramp and the final hold (degrees)
    #[arg(long, default_value_t = envsim_core::control::DEFAULT_FINAL_TARGET, allow_negative_numbers = true)]
    pub final_target: f64,

    /// Bound the final hold to N ticks and restart the plan after it
    #[arg(long, value_name = "N")]
    pub final_hold_ticks: Option<u32>,

    /// Tick length in milliseconds (defaults to the config's tick_ms)
    #[arg(long, value_name = "MS", value_parser = clap::value_parser!(u64).range(1..))]
    pub tick_ms: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current resolved configuration
    Show,

    /// Print the config file location
    Path,

    /// Set a value on the active profile
    Set {
        /// Profile key (gateway, api_key_env, sensors, fans, heaters, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Store an API key in the system keyring
    SetKey {
        /// Profile name (defaults to the active profile)
        name: Option<String>,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
