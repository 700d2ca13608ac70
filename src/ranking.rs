use crate::metrics::definition;
use crate::models::{EmployeeRecord, MetricSelector, RankingEntry};
use crate::scoring::{absolute_change, success_score};
use std::cmp::Ordering;

pub const DEFAULT_RANKING_LIMIT: usize = 10;

/// Progress value for one record under a selector, `None` when the record
/// cannot take part in that leaderboard.
pub fn progress_value(record: &EmployeeRecord, selector: MetricSelector) -> Option<f64> {
    match selector {
        MetricSelector::Overall => Some(success_score(record)),
        MetricSelector::Metric(key) => absolute_change(record.metric(key), definition(key)),
    }
}

/// Read-only leaderboard, best first.
///
/// Records whose progress is exactly zero are dropped as well, which also
/// hides genuinely eligible records that net out to no change.
pub fn rank_by_metric(records: &[EmployeeRecord], selector: MetricSelector, limit: usize) -> Vec<RankingEntry> {
    let mut scored = records
        .iter()
        .filter_map(|record| progress_value(record, selector).map(|value| (record, value)))
        .filter(|(_, value)| *value != 0.0)
        .collect::<Vec<_>>();

    // `sort_by` is stable, so ties keep roster order.
    scored.sort_by(|(_, left), (_, right)| descending(*left, *right));

    scored
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(index, (record, progress_value))| RankingEntry {
            rank: index + 1,
            record: record.clone(),
            progress_value,
        })
        .collect()
}

/// Whole roster ordered by success score, best first. Nothing is excluded.
pub fn sort_by_overall_score(records: &[EmployeeRecord]) -> Vec<EmployeeRecord> {
    let mut scored = records
        .iter()
        .map(|record| (success_score(record), record.clone()))
        .collect::<Vec<_>>();
    scored.sort_by(|(left, _), (right, _)| descending(*left, *right));
    scored.into_iter().map(|(_, record)| record).collect()
}

fn descending(left: f64, right: f64) -> Ordering {
    right.partial_cmp(&left).unwrap_or(Ordering::Equal)
}
