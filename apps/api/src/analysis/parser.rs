//! Response Parser — turns a backend reply into a typed `AnalysisResult`.
//!
//! Narrative kinds are passed through verbatim. The competency mapping reply
//! is a CSV table, the separator, then Markdown prose. The reply is untrusted:
//! anything that does not fit the contract fails the whole parse instead of
//! being guessed at or silently dropped.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::analysis::kind::AnalysisKind;

/// Splits the tabular section from the narrative. Only the first occurrence counts.
pub const SECTION_SEPARATOR: &str = "---";

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchLevel {
    High,
    Medium,
    Low,
    Missing,
}

/// One line of the skill-by-skill comparison table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompetencyRow {
    pub skill: String,
    pub required_in_jd: bool,
    pub present_in_resume: bool,
    pub match_level: Option<MatchLevel>,
    pub rating: u8,
    pub suggestion: String,
}

/// The only value handed to presentation and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub kind: AnalysisKind,
    pub narrative: String,
    /// Empty unless `kind` is `CompetencyMapping`. Order mirrors the
    /// backend's keyword-importance ranking.
    pub table: Vec<CompetencyRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("reply has no '---' between table and narrative")]
    MissingSeparator,

    #[error("table header is malformed ({columns} columns), expected a 4- or 6-column header row")]
    MalformedHeader { columns: usize },

    #[error("table row {row} is malformed: {detail}")]
    MalformedRow { row: usize, detail: String },

    #[error("table row {row} has rating {rating}, expected 1-10")]
    RatingOutOfRange { row: usize, rating: i64 },
}

/// Parses `raw` according to the reply shape of `kind`.
pub fn parse(kind: AnalysisKind, raw: &str) -> Result<AnalysisResult, ParseError> {
    if !kind.has_table() {
        return Ok(AnalysisResult {
            kind,
            narrative: raw.to_string(),
            table: Vec::new(),
        });
    }

    let (table_section, narrative) = raw
        .split_once(SECTION_SEPARATOR)
        .ok_or(ParseError::MissingSeparator)?;

    Ok(AnalysisResult {
        kind,
        narrative: narrative.trim().to_string(),
        table: parse_table(table_section)?,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Table parsing
// ────────────────────────────────────────────────────────────────────────────

/// Column layout, selected by the header's width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TableLayout {
    /// Skill/Keyword, Present in Resume, Competency Rating, Suggestion to Improve
    Canonical,
    /// Skill/Keyword, Required in JD, Present in Resume, Match Level,
    /// Competency Rating, Suggestion to Improve
    Extended,
}

impl TableLayout {
    fn from_width(columns: usize) -> Result<Self, ParseError> {
        match columns {
            4 => Ok(TableLayout::Canonical),
            6 => Ok(TableLayout::Extended),
            _ => Err(ParseError::MalformedHeader { columns }),
        }
    }

    fn width(self) -> usize {
        match self {
            TableLayout::Canonical => 4,
            TableLayout::Extended => 6,
        }
    }

    /// Column positions of the yes/no flags and the rating.
    fn flag_and_rating_columns(self) -> (&'static [usize], usize) {
        match self {
            TableLayout::Canonical => (&[1], 2),
            TableLayout::Extended => (&[1, 2], 4),
        }
    }

    /// A header that reads like a data row means the model left the header
    /// line out; accepting it would drop the top-ranked keyword.
    fn check_header(self, header: &csv::StringRecord) -> Result<(), ParseError> {
        let field = |i: usize| header.get(i).unwrap_or_default();
        let (flags, rating) = self.flag_and_rating_columns();

        let reads_as_data = field(rating).parse::<i64>().is_ok()
            || flags.iter().any(|&i| is_flag_symbol(field(i)));
        if reads_as_data {
            return Err(ParseError::MalformedHeader {
                columns: header.len(),
            });
        }
        Ok(())
    }

    fn row(self, row: usize, record: &csv::StringRecord) -> Result<CompetencyRow, ParseError> {
        if record.len() != self.width() {
            return Err(malformed(
                row,
                format!("{} fields, expected {}", record.len(), self.width()),
            ));
        }
        let field = |i: usize| record.get(i).unwrap_or_default();

        let skill = field(0);
        if skill.is_empty() {
            return Err(malformed(row, "empty skill".to_string()));
        }

        let (required_in_jd, present, match_level, rating, suggestion) = match self {
            TableLayout::Canonical => (true, field(1), None, field(2), field(3)),
            TableLayout::Extended => (
                parse_flag(row, field(1))?,
                field(2),
                Some(parse_match_level(row, field(3))?),
                field(4),
                field(5),
            ),
        };

        Ok(CompetencyRow {
            skill: skill.to_string(),
            required_in_jd,
            present_in_resume: parse_flag(row, present)?,
            match_level,
            rating: parse_rating(row, rating)?,
            suggestion: suggestion.to_string(),
        })
    }
}

fn parse_table(section: &str) -> Result<Vec<CompetencyRow>, ParseError> {
    let body = section
        .lines()
        .filter(|line| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with("```")
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());
    let mut records = reader.records();

    let layout = match records.next() {
        None => return Ok(Vec::new()),
        Some(header) => {
            let header = header.map_err(|_| ParseError::MalformedHeader { columns: 0 })?;
            let layout = TableLayout::from_width(header.len())?;
            layout.check_header(&header)?;
            layout
        }
    };

    let rows = records
        .enumerate()
        .map(|(row, record)| {
            let record = record.map_err(|e| malformed(row, e.to_string()))?;
            layout.row(row, &record)
        })
        .collect::<Result<Vec<_>, _>>()?;

    // The csv reader closes a quote left open at end of input; an odd quote
    // count means the separator cut a quoted field in half.
    if body.matches('"').count() % 2 != 0 {
        return Err(malformed(
            rows.len().saturating_sub(1),
            "unterminated quoted field".to_string(),
        ));
    }
    Ok(rows)
}

fn malformed(row: usize, detail: String) -> ParseError {
    ParseError::MalformedRow { row, detail }
}

fn parse_flag(row: usize, value: &str) -> Result<bool, ParseError> {
    let normalized = value.trim_matches('\u{fe0f}').trim().to_lowercase();
    match normalized.as_str() {
        "✅" | "✔" | "✓" | "yes" | "y" | "true" | "present" => Ok(true),
        "❌" | "✖" | "✗" | "no" | "n" | "false" | "missing" | "absent" => Ok(false),
        _ => Err(malformed(row, format!("unrecognised yes/no value '{value}'"))),
    }
}

fn is_flag_symbol(value: &str) -> bool {
    matches!(
        value.trim_matches('\u{fe0f}').trim(),
        "✅" | "✔" | "✓" | "❌" | "✖" | "✗"
    )
}

fn parse_match_level(row: usize, value: &str) -> Result<MatchLevel, ParseError> {
    match value.to_lowercase().as_str() {
        "high" => Ok(MatchLevel::High),
        "medium" => Ok(MatchLevel::Medium),
        "low" => Ok(MatchLevel::Low),
        "missing" => Ok(MatchLevel::Missing),
        _ => Err(malformed(row, format!("unrecognised match level '{value}'"))),
    }
}

fn parse_rating(row: usize, value: &str) -> Result<u8, ParseError> {
    let rating: i64 = value
        .parse()
        .map_err(|_| malformed(row, format!("non-numeric rating '{value}'")))?;
    if !(i64::from(MIN_RATING)..=i64::from(MAX_RATING)).contains(&rating) {
        return Err(ParseError::RatingOutOfRange { row, rating });
    }
    Ok(rating as u8)
}
