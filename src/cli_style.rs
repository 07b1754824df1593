/*!
 * Terminal styling for the collate binary: summary and partition tables,
 * human-readable sizes and durations, error and warning lines.
 */

use crate::partition::{NamingRule, PartitionTable};
use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::{style, StyledObject};
use std::fmt::Display;
use std::time::Duration;

/// Text styles used by the summary and error output
pub struct Theme;

impl Theme {
    pub fn success<D: Display>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D: Display>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D: Display>(text: D) -> StyledObject<D> {
        style(text).red().bold()
    }

    /// Secondary detail, dimmed
    pub fn muted<D: Display>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    pub fn bold<D: Display>(text: D) -> StyledObject<D> {
        style(text).bold()
    }
}

/// Status glyphs
pub struct Icons;

impl Icons {
    pub const SUCCESS: &'static str = "✓";
    pub const ERROR: &'static str = "✗";
    pub const WARNING: &'static str = "⚠";
    pub const ARROW_RIGHT: &'static str = "→";
}

fn table_with(preset: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(preset)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Borderless two-column table of run counters
pub fn stats_table(items: &[(&str, String)]) -> Table {
    let mut table = table_with(presets::UTF8_NO_BORDERS);
    for (label, value) in items {
        table.add_row(vec![
            Cell::new(label).fg(Color::Cyan),
            Cell::new(value).add_attribute(Attribute::Bold),
        ]);
    }
    table
}

/// Table listing every partition with its field, filter, and naming
pub fn partition_table(table: &PartitionTable) -> Table {
    let mut out = table_with(presets::UTF8_FULL);
    out.set_header(
        ["Partition", "Field", "Filter", "Output"]
            .into_iter()
            .map(|h| Cell::new(h).fg(Color::Cyan).add_attribute(Attribute::Bold)),
    );

    for descriptor in table.iter() {
        let filter = descriptor
            .filter
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        let output = match &descriptor.naming {
            NamingRule::Fixed { stem } => stem.clone(),
            NamingRule::Numbered { stem } => format!("{}<N>", stem),
            NamingRule::Siblings { names } => names.join(" | "),
        };
        out.add_row(vec![
            Cell::new(&descriptor.name).add_attribute(Attribute::Bold),
            Cell::new(descriptor.field),
            Cell::new(filter),
            Cell::new(output),
        ]);
    }

    out
}

/// Byte count with a binary unit, e.g. `1.5 KiB`
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KiB", "MiB", "GiB", "TiB", "PiB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

/// Run time as milliseconds, seconds, or minutes and seconds
pub fn format_duration(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    if secs == 0 {
        format!("{}ms", elapsed.as_millis())
    } else if secs < 60 {
        format!("{:.2}s", elapsed.as_secs_f64())
    } else {
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

/// Report a fatal error on stderr, with an optional hint line
pub fn print_error(message: &str, hint: Option<&str>) {
    eprintln!("{} {}", Theme::error(Icons::ERROR), message);
    if let Some(hint) = hint {
        eprintln!("  {} {}", Theme::muted(Icons::ARROW_RIGHT), Theme::muted(hint));
    }
}

/// Report a non-fatal problem on stderr
pub fn print_warning(message: &str) {
    eprintln!("{} {}", Theme::warning(Icons::WARNING), Theme::warning(message));
}
