/*!
 * Terminal output for the `mixer` binary
 *
 * Reports go to stdout as tables; status lines carry an icon and a color.
 */

use comfy_table::{presets, Attribute, Cell, Color, ContentArrangement, Table};
use console::style;
use mixer_core_manifest::{introduced_in, supports, Feature};

use crate::mix::BuildSummary;
use crate::pack::Pack;

/// Kind of a one-line status message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Info,
    Warning,
    Error,
}

impl Status {
    pub fn icon(self) -> &'static str {
        match self {
            Status::Success => "✓",
            Status::Info => "ℹ",
            Status::Warning => "⚠",
            Status::Error => "✗",
        }
    }

    /// `icon text`, colored for the status
    pub fn line(self, text: &str) -> String {
        let plain = format!("{} {}", self.icon(), text);
        let styled = match self {
            Status::Success => style(plain).green(),
            Status::Info => style(plain).cyan(),
            Status::Warning => style(plain).yellow(),
            Status::Error => style(plain).red().bold(),
        };
        styled.to_string()
    }
}

/// Bold title followed by a dim rule
pub fn section_header(title: &str) {
    let rule = "─".repeat(48usize.saturating_sub(title.chars().count()).max(8));
    println!("\n{} {}", style(title).cyan().bold(), style(rule).dim());
}

fn table(preset: &str) -> Table {
    let mut table = Table::new();
    table
        .load_preset(preset)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn with_header(columns: &[&str]) -> Table {
    let mut table = table(presets::UTF8_FULL);
    table.set_header(
        columns
            .iter()
            .map(|c| Cell::new(c).fg(Color::Cyan).add_attribute(Attribute::Bold)),
    );
    table
}

/// Borderless two-column key/value table
pub fn key_value_table(rows: &[(&str, String)]) -> Table {
    let mut table = table(presets::NOTHING);
    for (key, value) in rows {
        table.add_row(vec![
            Cell::new(key).fg(Color::DarkGrey),
            Cell::new(value).add_attribute(Attribute::Bold),
        ]);
    }
    table
}

/// Which manifest features `format` may write
pub fn feature_table(format: u32) -> Table {
    let mut table = with_header(&["Feature", "Format", "Since"]);

    for feature in Feature::ALL {
        let allowed = if supports(format, feature) {
            Cell::new("yes").fg(Color::Green)
        } else {
            Cell::new("no").fg(Color::Red)
        };
        // Overflow safety is lost at exactly one format, not gained at one.
        let since = match feature {
            Feature::ContentSizeOverflowSafe => {
                format!("all but {}", introduced_in(feature) - 1)
            }
            _ => introduced_in(feature).to_string(),
        };
        table.add_row(vec![Cell::new(feature.as_str()), allowed, Cell::new(since)]);
    }

    table
}

fn names(list: &[String]) -> String {
    if list.is_empty() {
        "-".to_string()
    } else {
        list.join(", ")
    }
}

/// Outcome of a version build
pub fn build_table(summary: &BuildSummary) -> Table {
    key_value_table(&[
        ("version", summary.version.to_string()),
        ("previous", summary.previous.to_string()),
        ("format", summary.format.to_string()),
        ("rebuilt", names(&summary.changed)),
        ("unchanged", names(&summary.unchanged)),
        ("iterative", names(&summary.iterative)),
        ("deltas", names(&summary.deltas)),
    ])
}

/// One row per pack
pub fn pack_table(packs: &[Pack]) -> Table {
    let mut table = with_header(&["Pack", "Version", "Items", "Deltas"]);
    for pack in packs {
        table.add_row(vec![
            Cell::new(pack.file_name()),
            Cell::new(pack.to),
            Cell::new(pack.items.len()),
            Cell::new(pack.deltas().count()),
        ]);
    }
    table
}

/// Byte count with a binary unit, two decimals above bytes
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["KB", "MB", "GB", "TB", "PB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Error line plus an optional hint, on stderr
pub fn print_error(message: &str, hint: Option<&str>) {
    eprintln!("{}", Status::Error.line(message));
    if let Some(hint) = hint {
        eprintln!("  {}", style(format!("→ {}", hint)).dim());
    }
}

pub fn print_warning(message: &str) {
    eprintln!("{}", Status::Warning.line(message));
}

pub fn print_success(message: &str) {
    println!("{}", Status::Success.line(message));
}

pub fn print_info(message: &str) {
    println!("{}", Status::Info.line(message));
}
