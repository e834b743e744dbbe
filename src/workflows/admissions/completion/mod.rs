mod config;
mod rules;

pub use config::CompletionConfig;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{DraftRecord, FormStep};

/// Stateless evaluator turning a draft snapshot into a completion report.
///
/// Pure by construction: it reads the draft, never the store, and has no side
/// effects, so the committer can use it as a gate and the draft service can
/// recompute it on every save with identical results.
pub struct CompletionEvaluator {
    config: CompletionConfig,
}

impl CompletionEvaluator {
    pub fn new(config: CompletionConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, draft: &DraftRecord) -> CompletionReport {
        let mut steps = BTreeMap::new();
        let mut outstanding = Vec::new();
        let mut satisfied = 0usize;
        let mut total = 0usize;

        for step in draft.category.steps() {
            let checks = rules::step_requirements(draft, *step, &self.config);
            let step_ok = checks.iter().all(|check| check.satisfied);
            total += checks.len();
            satisfied += checks.iter().filter(|check| check.satisfied).count();
            outstanding.extend(
                checks
                    .into_iter()
                    .filter_map(|check| check.detail)
                    .map(|detail| OutstandingRequirement {
                        step: *step,
                        detail,
                    }),
            );
            steps.insert(*step, step_ok);
        }

        // Integer floor keeps 100 reachable only when every requirement holds.
        let percentage = if total == 0 {
            0
        } else {
            (satisfied * 100 / total) as u8
        };

        CompletionReport {
            percentage,
            steps,
            outstanding,
        }
    }
}

/// Per-step validity plus the overall percentage for one draft snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionReport {
    pub percentage: u8,
    pub steps: BTreeMap<FormStep, bool>,
    pub outstanding: Vec<OutstandingRequirement>,
}

impl CompletionReport {
    pub fn is_complete(&self) -> bool {
        self.percentage == 100
    }
}

/// A requirement still blocking completion, surfaced to the applicant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutstandingRequirement {
    pub step: FormStep,
    pub detail: String,
}
