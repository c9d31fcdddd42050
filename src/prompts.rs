//! Instruction template for CV review.
//!
//! The template is fixed; only the extracted text varies between calls.
//! Callers can replace the instructions through
//! [`crate::config::AnalysisConfig::system_prompt`].

/// Default review instructions.
pub const CV_REVIEW_PROMPT: &str = r#"You are an experienced recruiter and career coach. Review the CV below and give specific, actionable feedback.

Cover each of these areas under its own Markdown heading:

1. STRUCTURE & FORMATTING
   - Section order, length, readability, consistency of dates and layout

2. CONTENT QUALITY
   - Clarity of the professional summary and role descriptions
   - Vague or generic statements that should be made concrete

3. KEYWORDS & ATS COMPATIBILITY
   - Whether an applicant tracking system would parse this CV correctly
   - Industry keywords that are missing or underused

4. ACHIEVEMENTS
   - Whether accomplishments are quantified (numbers, percentages, outcomes)
   - Bullet points that describe duties instead of results

5. SKILLS
   - Relevance and organisation of technical and soft skills
   - Gaps relative to the roles the candidate appears to target

6. OVERALL IMPACT
   - A score from 1 to 10 with a one-paragraph justification

7. COMMON ISSUES
   - Typos, grammar, inconsistent tense, personal details that should be removed

End with a prioritised list of the three most important improvements.
Answer in the language the CV is written in."#;

/// Embed `cv_text` into the review instructions.
///
/// `instructions` replaces [`CV_REVIEW_PROMPT`] when set.
pub fn build_analysis_prompt(cv_text: &str, instructions: Option<&str>) -> String {
    let instructions = instructions.unwrap_or(CV_REVIEW_PROMPT);
    format!(
        "{}\n\nCV TEXT:\n\"\"\"\n{}\n\"\"\"",
        instructions, cv_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_covers_every_review_area() {
        for area in [
            "STRUCTURE",
            "CONTENT QUALITY",
            "ATS",
            "ACHIEVEMENTS",
            "SKILLS",
            "OVERALL IMPACT",
            "COMMON ISSUES",
        ] {
            assert!(CV_REVIEW_PROMPT.contains(area), "missing {area}");
        }
    }

    #[test]
    fn prompt_embeds_text_verbatim() {
        let p = build_analysis_prompt("Jane Doe — Rust engineer", None);
        assert!(p.starts_with(CV_REVIEW_PROMPT));
        assert!(p.contains("\"\"\"\nJane Doe — Rust engineer\n\"\"\""));
    }

    #[test]
    fn prompt_override_replaces_instructions() {
        let p = build_analysis_prompt("text", Some("Summarise."));
        assert!(p.starts_with("Summarise."));
        assert!(!p.contains("ATS"));
    }
}
