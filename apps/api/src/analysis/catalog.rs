//! Prompt Catalog — maps each analysis kind to its static template and fills it.

use crate::analysis::kind::AnalysisKind;
use crate::analysis::prompts::{
    COMPETENCY_MAPPING_TEMPLATE, IMPROVEMENT_TEMPLATE, MISSING_KEYWORDS_TEMPLATE,
    SIMILARITY_TEMPLATE,
};

const JD_SLOT: &str = "{jd_text}";
const RESUME_SLOT: &str = "{resume_text}";

/// An immutable prompt template with a `{jd_text}` and a `{resume_text}` slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate(&'static str);

impl PromptTemplate {
    pub fn text(&self) -> &'static str {
        self.0
    }

    /// Fills both slots in a single left-to-right pass. Substituted text is
    /// never rescanned, so braces or slot names inside the inputs are copied
    /// through literally.
    pub fn fill(&self, jd: &str, resume: &str) -> String {
        let mut rest = self.text();
        let mut out = String::with_capacity(rest.len() + jd.len() + resume.len());

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];
            if let Some(after) = tail.strip_prefix(JD_SLOT) {
                out.push_str(jd);
                rest = after;
            } else if let Some(after) = tail.strip_prefix(RESUME_SLOT) {
                out.push_str(resume);
                rest = after;
            } else {
                out.push('{');
                rest = &tail[1..];
            }
        }
        out.push_str(rest);
        out
    }
}

/// Looks up the template for a kind.
pub fn template(kind: AnalysisKind) -> PromptTemplate {
    match kind {
        AnalysisKind::SimilarityScore => PromptTemplate(SIMILARITY_TEMPLATE),
        AnalysisKind::MissingKeywords => PromptTemplate(MISSING_KEYWORDS_TEMPLATE),
        AnalysisKind::ImprovementSuggestions => PromptTemplate(IMPROVEMENT_TEMPLATE),
        AnalysisKind::CompetencyMapping => PromptTemplate(COMPETENCY_MAPPING_TEMPLATE),
    }
}

/// Renders the prompt for `kind`.
///
/// Callers should pass non-empty `jd` and `resume`. Empty inputs are not an
/// error here; they produce a degenerate prompt and the backend judges it.
pub fn render(kind: AnalysisKind, jd: &str, resume: &str) -> String {
    template(kind).fill(jd, resume)
}
