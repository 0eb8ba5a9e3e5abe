//! # Skill Sync
//!
//! Keeps the baseline stats section of a markdown skill document in step with the latest
//! baseline run. The section lives between two HTML comment markers so the rest of the
//! document is never touched.
//!
//! ## Public API
//!
//! - `SkillSummary`: One strategy's headline numbers.
//! - `render_section` / `patch_document`: Pure string transforms.
//! - `format_decimal` / `format_optional`: Number formatting shared with the CLI tables.
//! - `sync_file`: Reads a baseline JSON file and rewrites the skill file when it changed.

pub mod error;

pub use error::SyncError;

use analytics::PerformanceReport;
use comfy_table::{presets::ASCII_MARKDOWN, Table};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

pub const START_MARKER: &str = "<!-- BASELINE_STATS:START -->";
pub const END_MARKER: &str = "<!-- BASELINE_STATS:END -->";

/// Headline numbers of one baseline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillSummary {
    pub name: String,
    pub strategy: String,
    #[serde(default)]
    pub params: Value,
    pub trades: usize,
    pub win_rate_pct: Option<Decimal>,
    pub net_profit: Decimal,
    pub return_pct: Decimal,
    pub max_drawdown_pct: Decimal,
    pub profit_factor: Option<Decimal>,
    #[serde(default)]
    pub hive_penalty: Decimal,
}

impl SkillSummary {
    pub fn from_report(
        name: impl Into<String>,
        strategy: impl Into<String>,
        params: Value,
        report: &PerformanceReport,
        hive_penalty: Decimal,
    ) -> Self {
        Self {
            name: name.into(),
            strategy: strategy.into(),
            params,
            trades: report.total_trades,
            win_rate_pct: report.win_rate_pct,
            net_profit: report.total_net_profit,
            return_pct: report.total_return_pct,
            max_drawdown_pct: report.max_drawdown_pct,
            profit_factor: report.profit_factor,
            hive_penalty,
        }
    }
}

/// Two decimal places, trailing zeros dropped.
pub fn format_decimal(value: Decimal) -> String {
    value.round_dp(2).normalize().to_string()
}

/// `format_decimal`, or `-` for a metric that is undefined.
pub fn format_optional(value: Option<Decimal>) -> String {
    value.map(format_decimal).unwrap_or_else(|| "-".to_string())
}

fn fmt_params(params: &Value) -> String {
    match params {
        Value::Null => "-".to_string(),
        Value::Object(map) if map.is_empty() => "-".to_string(),
        Value::Object(map) => map
            .iter()
            .map(|(k, v)| match v {
                Value::String(s) => format!("{k}={s}"),
                other => format!("{k}={other}"),
            })
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}

/// Renders the marked stats section (markers included, no trailing newline).
pub fn render_section(summaries: &[SkillSummary]) -> String {
    let mut out = String::new();
    out.push_str(START_MARKER);
    out.push_str("\n## Baseline stats\n\n");

    if summaries.is_empty() {
        out.push_str("No baseline runs recorded.\n");
    } else {
        let mut table = Table::new();
        table.load_preset(ASCII_MARKDOWN).set_header(vec![
            "Name",
            "Strategy",
            "Params",
            "Trades",
            "Win rate %",
            "Net profit",
            "Return %",
            "Max DD %",
            "Profit factor",
            "Hive penalty",
        ]);
        for s in summaries {
            table.add_row(vec![
                s.name.clone(),
                s.strategy.clone(),
                fmt_params(&s.params),
                s.trades.to_string(),
                format_optional(s.win_rate_pct),
                format_decimal(s.net_profit),
                format_decimal(s.return_pct),
                format_decimal(s.max_drawdown_pct),
                format_optional(s.profit_factor),
                format_decimal(s.hive_penalty),
            ]);
        }
        out.push_str(&table.to_string());
        out.push_str("\n\n");

        // First wins ties, so the line is stable across identical runs.
        if let Some(best) = summaries
            .iter()
            .reduce(|best, s| if s.return_pct > best.return_pct { s } else { best })
        {
            out.push_str(&format!(
                "Best by return: **{}** ({}) at {}%\n",
                best.name,
                best.strategy,
                format_decimal(best.return_pct)
            ));
        }
    }

    out.push_str(END_MARKER);
    out
}

/// Replaces the marked section of `doc` with `section`, or appends it after a blank line
/// when the document has no markers yet.
pub fn patch_document(doc: &str, section: &str) -> Result<String, SyncError> {
    match doc.find(START_MARKER) {
        Some(start) => {
            let end = doc[start..]
                .find(END_MARKER)
                .map(|offset| start + offset + END_MARKER.len())
                .ok_or(SyncError::UnterminatedSection)?;
            Ok(format!("{}{}{}", &doc[..start], section, &doc[end..]))
        }
        None if doc.contains(END_MARKER) => Err(SyncError::OrphanedEndMarker),
        None => {
            let body = doc.trim_end();
            if body.is_empty() {
                Ok(format!("{section}\n"))
            } else {
                Ok(format!("{body}\n\n{section}\n"))
            }
        }
    }
}

/// Rewrites `skill_md` with stats from `baseline_json` (a JSON array of `SkillSummary`).
/// A missing skill file is created. Returns whether the file changed.
pub fn sync_file(baseline_json: impl AsRef<Path>, skill_md: impl AsRef<Path>) -> Result<bool, SyncError> {
    let baseline_json = baseline_json.as_ref();
    let skill_md = skill_md.as_ref();

    let summaries: Vec<SkillSummary> = serde_json::from_str(&std::fs::read_to_string(baseline_json)?)?;

    let current = match std::fs::read_to_string(skill_md) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e.into()),
    };

    let patched = patch_document(&current, &render_section(&summaries))?;
    if patched == current {
        tracing::info!(path = %skill_md.display(), "Skill file already up to date");
        return Ok(false);
    }

    std::fs::write(skill_md, &patched)?;
    tracing::info!(path = %skill_md.display(), runs = summaries.len(), "Skill file updated");
    Ok(true)
}
