use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{StudyBlock, Subject, WeekSchedule};

/// Below this completion rate the next period asks for a lighter workload
pub const STRUGGLING_THRESHOLD: u32 = 50;

/// Completion statistics over one schedule. Derived, never stored as truth.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionAnalysis {
    pub completion_rate: u32,
    pub completed_count: usize,
    pub skipped_count: usize,
    pub total_count: usize,
    pub strong_subjects: BTreeMap<Subject, usize>,
    pub weak_subjects: BTreeMap<Subject, usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workload {
    Reduce,
    MaintainOrIncrease,
}

impl CompletionAnalysis {
    pub fn workload(&self) -> Workload {
        if self.completion_rate < STRUGGLING_THRESHOLD {
            Workload::Reduce
        } else {
            Workload::MaintainOrIncrease
        }
    }
}

/// Tally completed and skipped blocks across the whole week
pub fn analyze(schedule: &WeekSchedule) -> CompletionAnalysis {
    analyze_blocks(schedule.blocks())
}

pub fn analyze_blocks<'a, I>(blocks: I) -> CompletionAnalysis
where
    I: IntoIterator<Item = &'a StudyBlock>,
{
    let mut analysis = CompletionAnalysis::default();

    for block in blocks {
        analysis.total_count += 1;
        let tally = if block.completed {
            analysis.completed_count += 1;
            &mut analysis.strong_subjects
        } else {
            analysis.skipped_count += 1;
            &mut analysis.weak_subjects
        };
        *tally.entry(block.subject).or_insert(0) += 1;
    }

    analysis.completion_rate = if analysis.total_count > 0 {
        (100.0 * analysis.completed_count as f64 / analysis.total_count as f64).round() as u32
    } else {
        0
    };

    tracing::debug!(
        completion_rate = analysis.completion_rate,
        completed = analysis.completed_count,
        skipped = analysis.skipped_count,
        "Analyzed completion"
    );

    analysis
}
