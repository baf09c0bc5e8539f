//! Downloadable exports of a finished `AnalysisResult`.
//!
//! Exports read only the result's own fields: kind, narrative, and table.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use crate::analysis::parser::{AnalysisResult, MatchLevel};

pub const REPORT_TITLE: &str = "AI-Fit Score & Competency Report";

const CSV_HEADER: [&str; 4] = [
    "Skill/Keyword",
    "Present in Resume",
    "Competency Rating",
    "Suggestion to Improve",
];

/// Markdown report: narrative first, then the competency matrix if any.
pub fn markdown_report(result: &AnalysisResult, generated_at: DateTime<Utc>) -> String {
    let mut out = format!(
        "# {REPORT_TITLE}\n\n_{}, generated {}_\n\n## Analysis & Review\n\n{}\n",
        result.kind.title(),
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        result.narrative.trim()
    );

    if result.table.is_empty() {
        return out;
    }

    let with_level = result.table.iter().any(|row| row.match_level.is_some());

    out.push_str("\n## Competency Matrix\n\n");
    if with_level {
        out.push_str("| Skill/Keyword | In Resume? | Match | Rating | Suggestion |\n");
        out.push_str("|---|:---:|:---:|:---:|---|\n");
    } else {
        out.push_str("| Skill/Keyword | In Resume? | Rating | Suggestion |\n");
        out.push_str("|---|:---:|:---:|---|\n");
    }

    for row in &result.table {
        let present = if row.present_in_resume { "✅" } else { "❌" };
        let level = if with_level {
            format!(" {} |", row.match_level.map(level_label).unwrap_or("-"))
        } else {
            String::new()
        };
        out.push_str(&format!(
            "| {} | {} |{} {}/10 | {} |\n",
            cell(&row.skill),
            present,
            level,
            row.rating,
            cell(&row.suggestion)
        ));
    }
    out
}

/// The competency table as CSV with the canonical header.
pub fn competency_csv(result: &AnalysisResult) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;
    for row in &result.table {
        let rating = row.rating.to_string();
        writer
            .write_record([
                row.skill.as_str(),
                if row.present_in_resume { "✅" } else { "❌" },
                rating.as_str(),
                row.suggestion.as_str(),
            ])
            .context("Failed to write CSV row")?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV: {}", e.error()))?;
    String::from_utf8(bytes).context("CSV output was not UTF-8")
}

fn level_label(level: MatchLevel) -> &'static str {
    match level {
        MatchLevel::High => "High",
        MatchLevel::Medium => "Medium",
        MatchLevel::Low => "Low",
        MatchLevel::Missing => "Missing",
    }
}

/// Keeps a value inside one Markdown table cell.
fn cell(value: &str) -> String {
    value.replace('|', "\\|").replace(['\r', '\n'], " ")
}
