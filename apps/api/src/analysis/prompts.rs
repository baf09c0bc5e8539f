// Prompt templates for every analysis kind.
// Each template carries `{jd_text}` and `{resume_text}` exactly once; the
// catalog fills both in a single pass before anything reaches the backend.

/// Percentage match score with reasoning.
pub const SIMILARITY_TEMPLATE: &str = r#"You are an expert ATS. Compare the resume against the job description and calculate a percentage match score.
Explain the reasoning for the score, highlighting areas of strong alignment and areas for improvement.

Resume:
{resume_text}

Job Description:
{jd_text}"#;

/// Top missing JD keywords with incorporation hints.
pub const MISSING_KEYWORDS_TEMPLATE: &str = r#"You are an expert ATS. Analyze the resume and the job description.
Identify and list the top 10 most critical keywords and skills from the job description that are missing in the resume.
For each missing keyword, provide a brief suggestion on how to incorporate it naturally into the resume.

Resume:
{resume_text}

Job Description:
{jd_text}"#;

/// Bullet-pointed rewrite suggestions.
pub const IMPROVEMENT_TEMPLATE: &str = r#"You are an expert career coach. Review the resume in the context of the job description.
Provide a detailed, bullet-pointed list of suggestions to improve the resume.
Focus on action verbs, quantifiable achievements, and tailoring the content to the job description.
Provide specific examples of improved bullet points.

Resume:
{resume_text}

Job Description:
{jd_text}"#;

/// Competency matrix as CSV, then `---` on its own line, then the narrative.
/// The reply layout here is the contract the response parser enforces.
pub const COMPETENCY_MAPPING_TEMPLATE: &str = r#"You are an expert ATS and career strategist. Perform a complete competency mapping of a resume against a given job description.

Tasks:
1. Extract the 10-15 most critical skills and competency keywords from the job description, ordered from most to least important.
2. For each keyword, compare it against the resume and rate the candidate's competency from 1 to 10.
3. Give an overall resume match score as a percentage (out of 100).
4. List the top 5 most relevant JD keywords.
5. Write a plain-language review summarizing strengths, gaps, and what to improve.

OUTPUT FORMAT (follow exactly):
- Start with a CSV table, no markdown and no code fences, with this exact header line:
Skill/Keyword,Present in Resume,Competency Rating,Suggestion to Improve
- One row per keyword, in order of importance.
- "Present in Resume" is ✅ or ❌.
- "Competency Rating" is a whole number from 1 to 10.
- Wrap any field that contains a comma in double quotes.
- After the last row, write a line containing only:
---
- After that line, write the match score, top keywords, and review in Markdown.

Job Description:
{jd_text}

Resume:
{resume_text}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::parser::SECTION_SEPARATOR;

    const ALL: [&str; 4] = [
        SIMILARITY_TEMPLATE,
        MISSING_KEYWORDS_TEMPLATE,
        IMPROVEMENT_TEMPLATE,
        COMPETENCY_MAPPING_TEMPLATE,
    ];

    #[test]
    fn test_every_template_has_each_placeholder_once() {
        for template in ALL {
            assert_eq!(template.matches("{jd_text}").count(), 1);
            assert_eq!(template.matches("{resume_text}").count(), 1);
        }
    }

    #[test]
    fn test_competency_template_asks_for_separator_line() {
        assert!(COMPETENCY_MAPPING_TEMPLATE.contains(&format!("\n{SECTION_SEPARATOR}\n")));
    }

    #[test]
    fn test_competency_template_states_header_contract() {
        assert!(COMPETENCY_MAPPING_TEMPLATE
            .contains("Skill/Keyword,Present in Resume,Competency Rating,Suggestion to Improve"));
    }
}
