//! Confidence scoring (spec §4.7): a pure function assigning a scalar in
//! [0,1] to a generated answer, used for UI display and as the procedural
//! learning signal.

/// Hedge phrases used to detect certainty/uncertainty markers; a closed,
/// configured list in the same spirit as the teacher's `allowed_extensions`
/// closed sets.
pub const CERTAINTY_PHRASES: &[&str] = &["clearly", "definitely", "certainly", "without doubt", "confirmed"];
pub const UNCERTAINTY_PHRASES: &[&str] = &["might", "may", "possibly", "unclear", "not sure", "unsure", "i think", "perhaps"];

const BASE: f64 = 0.5;

/// Inputs to the confidence formula (spec §4.7).
#[derive(Debug, Clone, Default)]
pub struct ConfidenceInputs<'a> {
    pub answer: &'a str,
    pub source_count: usize,
    pub top_source_score: f64,
    /// Externally supplied critic score in [0,1]; `None` uses the 0.5 default.
    pub retrieval_quality: Option<f64>,
}

/// `confidence = base + sources + source_quality + length + retrieval_quality + certainty`,
/// clamped to [0,1] (spec §4.7).
pub fn score(inputs: &ConfidenceInputs) -> f64 {
    let sources = (inputs.source_count as f64 / 5.0).min(1.0) * 0.2;
    let source_quality = inputs.top_source_score.clamp(0.0, 1.0) * 0.2;

    let len = inputs.answer.chars().count();
    let length = if (50..=2000).contains(&len) { 0.15 } else { 0.10 };

    let retrieval_quality = inputs.retrieval_quality.unwrap_or(0.5) * 0.2;

    let certainty = certainty_term(inputs.answer);

    let total = BASE + sources + source_quality + length + retrieval_quality + certainty;
    total.clamp(0.0, 1.0)
}

fn certainty_term(answer: &str) -> f64 {
    let lower = answer.to_lowercase();
    let c_count = CERTAINTY_PHRASES.iter().filter(|p| lower.contains(**p)).count() as f64;
    let u_count = UNCERTAINTY_PHRASES.iter().filter(|p| lower.contains(**p)).count() as f64;
    let total = c_count + u_count;
    if total == 0.0 {
        return 0.0;
    }
    let c_norm = c_count / total;
    let u_norm = u_count / total;
    (0.2 * c_norm - 0.2 * u_norm).clamp(-0.2, 0.2)
}
