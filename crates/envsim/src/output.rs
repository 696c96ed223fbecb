//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one value per line.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Color a device state name: active states green, idle states dimmed.
pub fn paint_state(state: &str, active: bool, color: bool) -> String {
    match (color, active) {
        (false, _) => state.to_string(),
        (true, true) => state.green().bold().to_string(),
        (true, false) => state.dimmed().to_string(),
    }
}

/// Format a temperature in degrees Celsius with one decimal.
pub fn temperature(value: f64) -> String {
    format!("{value:.1}°C")
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `plain_fn` on each item to emit one line per item
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(render_table(&rows))
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(data.iter().map(&plain_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item views don't use
/// the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    plain_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => Ok(plain_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

pub(crate) fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn serialization_err(e: impl std::fmt::Display) -> CliError {
    CliError::Internal(format!("failed to serialize output: {e}"))
}

pub(crate) fn render_json<T: serde::Serialize + ?Sized>(
    data: &T,
    compact: bool,
) -> Result<String, CliError> {
    if compact {
        serde_json::to_string(data).map_err(serialization_err)
    } else {
        serde_json::to_string_pretty(data).map_err(serialization_err)
    }
}

/// YAML output.
pub(crate) fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> Result<String, CliError> {
    serde_yaml::to_string(data).map_err(serialization_err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(serde::Serialize)]
    struct Item {
        id: u32,
        state: &'static str,
    }

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: u32,
        #[tabled(rename = "State")]
        state: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item { id: 1, state: "On" },
            Item { id: 2, state: "Off" },
        ]
    }

    fn row(i: &Item) -> Row {
        Row {
            id: i.id,
            state: i.state.into(),
        }
    }

    #[test]
    fn table_contains_headers_and_values() {
        let out = render_list(&OutputFormat::Table, &items(), row, |i| i.id.to_string()).expect("table");
        assert!(out.contains("ID"));
        assert!(out.contains("State"));
        assert!(out.contains("Off"));
    }

    #[test]
    fn compact_json_is_one_line() {
        let out = render_list(&OutputFormat::JsonCompact, &items(), row, |i| i.id.to_string())
            .expect("json");
        assert_eq!(out, r#"[{"id":1,"state":"On"},{"id":2,"state":"Off"}]"#);
    }

    #[test]
    fn plain_emits_one_line_per_item() {
        let out = render_list(&OutputFormat::Plain, &items(), row, |i| format!("{} {}", i.id, i.state))
            .expect("plain");
        assert_eq!(out, "1 On\n2 Off");
    }

    #[test]
    fn uncolored_state_is_unchanged() {
        assert_eq!(paint_state("On", true, false), "On");
        assert_eq!(temperature(19.04), "19.0°C");
    }
}
