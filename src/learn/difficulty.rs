//! Difficulty selection from a learner's rolling average.

use super::types::{Difficulty, QuizResponse};

pub const MEDIUM_THRESHOLD: f64 = 40.0;
pub const HARD_THRESHOLD: f64 = 80.0;

/// `average_score / requested_size * 100`. The average is in raw points, so a
/// quiz of a different size than the ones already taken shifts the percentage.
pub fn score_percentage(average_score: f64, requested_size: i32) -> f64 {
    average_score * 100.0 / f64::from(requested_size)
}

impl Difficulty {
    /// Half-open tiers: exactly 40 is medium, exactly 80 is hard.
    pub fn for_percentage(percentage: f64) -> Self {
        if percentage >= HARD_THRESHOLD {
            Self::Hard
        } else if percentage >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Easy
        }
    }
}

/// Arithmetic mean of the response scores, 0 for no responses.
pub fn average_score(responses: &[QuizResponse]) -> f64 {
    if responses.is_empty() {
        return 0.0;
    }
    let total: i64 = responses.iter().map(|r| i64::from(r.score)).sum();
    total as f64 / responses.len() as f64
}

/// Completed share of the configured module total, in percent. Not clamped.
pub fn completion_percentage(completed: usize, total_modules: u32) -> f64 {
    completed as f64 * 100.0 / f64::from(total_modules)
}
