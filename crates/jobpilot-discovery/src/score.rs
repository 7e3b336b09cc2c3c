//! Match scoring seam.
//!
//! The aggregator only orders by the value it is given; how a score is
//! computed belongs to the surrounding application.

/// Scores how well a job description matches a candidate's resume text.
///
/// Implementations are injected into the aggregator and treated as opaque.
pub trait MatchScorer: Send + Sync {
    /// Return a score in `[0.0, 1.0]`; higher is a better match.
    fn score(&self, resume_text: &str, job_description: &str) -> f64;
}

/// Baseline scorer: fraction of resume terms that appear in the description.
///
/// Good enough for ordering when no smarter collaborator is wired in.
#[derive(Debug, Default)]
pub struct KeywordOverlapScorer;

impl MatchScorer for KeywordOverlapScorer {
    fn score(&self, resume_text: &str, job_description: &str) -> f64 {
        let description = job_description.to_lowercase();
        let terms: Vec<String> = resume_text
            .to_lowercase()
            .split_whitespace()
            .filter(|t| t.len() > 2)
            .map(str::to_string)
            .collect();

        if terms.is_empty() {
            return 0.0;
        }

        let hits = terms.iter().filter(|t| description.contains(*t)).count();
        hits as f64 / terms.len() as f64
    }
}
