use serde::{Deserialize, Serialize};

/// Category-specific thresholds applied by the completion evaluator.
///
/// The essay bounds are parameters rather than constants because the same
/// evaluator backs more than one essay flow (the motivation step reviews
/// 500-1000 words; the shorter public-facing statement flow runs 300-500).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionConfig {
    pub min_subject_grades: usize,
    pub min_referees: usize,
    pub min_reference_length: usize,
    pub essay_min_words: usize,
    pub essay_max_words: usize,
}

impl CompletionConfig {
    /// Thresholds for the admissions motivation essay flow.
    pub fn admissions() -> Self {
        Self {
            min_subject_grades: 6,
            min_referees: 2,
            min_reference_length: 6,
            essay_min_words: 500,
            essay_max_words: 1000,
        }
    }

    /// Thresholds for the shorter personal-statement flow.
    pub fn personal_statement() -> Self {
        Self {
            essay_min_words: 300,
            essay_max_words: 500,
            ..Self::admissions()
        }
    }
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self::admissions()
    }
}
