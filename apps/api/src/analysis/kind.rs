use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Selects which prompt a run sends and which reply shape it expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    SimilarityScore,
    MissingKeywords,
    ImprovementSuggestions,
    CompetencyMapping,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 4] = [
        AnalysisKind::SimilarityScore,
        AnalysisKind::MissingKeywords,
        AnalysisKind::ImprovementSuggestions,
        AnalysisKind::CompetencyMapping,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisKind::SimilarityScore => "similarity_score",
            AnalysisKind::MissingKeywords => "missing_keywords",
            AnalysisKind::ImprovementSuggestions => "improvement_suggestions",
            AnalysisKind::CompetencyMapping => "competency_mapping",
        }
    }

    /// Human-readable heading used by exports.
    pub fn title(self) -> &'static str {
        match self {
            AnalysisKind::SimilarityScore => "Similarity Score & Analysis",
            AnalysisKind::MissingKeywords => "Missing Keywords",
            AnalysisKind::ImprovementSuggestions => "Resume Improvement Suggestions",
            AnalysisKind::CompetencyMapping => "Competency Mapping",
        }
    }

    /// Upper bound on one backend call. The full competency mapping asks for
    /// far more output than the narrative kinds and gets the longer bound.
    pub fn timeout(self) -> Duration {
        match self {
            AnalysisKind::CompetencyMapping => Duration::from_secs(120),
            _ => Duration::from_secs(60),
        }
    }

    /// Whether the reply carries a competency table ahead of the narrative.
    pub fn has_table(self) -> bool {
        matches!(self, AnalysisKind::CompetencyMapping)
    }
}

impl fmt::Display for AnalysisKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown analysis kind '{0}'")]
pub struct UnknownKind(pub String);

impl FromStr for AnalysisKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AnalysisKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownKind(wanted.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trips_through_from_str() {
        for kind in AnalysisKind::ALL {
            assert_eq!(kind.as_str().parse::<AnalysisKind>(), Ok(kind));
        }
    }

    #[test]
    fn test_kind_from_str_is_case_insensitive_and_trimmed() {
        assert_eq!(
            " Competency_Mapping ".parse::<AnalysisKind>(),
            Ok(AnalysisKind::CompetencyMapping)
        );
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert_eq!(
            "nash_equilibrium".parse::<AnalysisKind>(),
            Err(UnknownKind("nash_equilibrium".to_string()))
        );
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for kind in AnalysisKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.as_str()));
        }
    }

    #[test]
    fn test_timeouts_are_positive_and_competency_is_longest() {
        for kind in AnalysisKind::ALL {
            let secs = kind.timeout().as_secs();
            assert!((30..=180).contains(&secs));
            assert!(secs <= AnalysisKind::CompetencyMapping.timeout().as_secs());
        }
    }

    #[test]
    fn test_only_competency_mapping_has_table() {
        let with_table: Vec<_> = AnalysisKind::ALL.into_iter().filter(|k| k.has_table()).collect();
        assert_eq!(with_table, vec![AnalysisKind::CompetencyMapping]);
    }
}
