//! Progress arithmetic over measurement pairs.
//!
//! Every value produced here is oriented so that a positive number means the
//! employee improved, whichever direction counts as better for the metric.
//! A metric only takes part when both months carry a strictly positive
//! reading; anything else is ineligible and is left out rather than counted
//! as zero.

use crate::metrics::{definition, MetricDefinition, METRICS};
use crate::models::{Calculation, EmployeeRecord, MetricKey, MetricValue};
use serde::{Deserialize, Serialize};

/// Differences at or below this magnitude are shown as "no change".
const DISPLAY_EPSILON: f64 = 0.01;

pub fn is_eligible(value: &MetricValue) -> bool {
    value.month1 > 0.0 && value.month2 > 0.0
}

/// Percent change relative to the baseline month, or `None` when ineligible.
pub fn metric_change(value: &MetricValue, def: &MetricDefinition) -> Option<f64> {
    if !is_eligible(value) {
        return None;
    }
    let pct = if def.is_lower_better {
        (value.month1 - value.month2) / value.month1 * 100.0
    } else {
        (value.month2 - value.month1) / value.month1 * 100.0
    };
    Some(pct)
}

/// Signed absolute change in the metric's own unit, or `None` when ineligible.
pub fn absolute_change(value: &MetricValue, def: &MetricDefinition) -> Option<f64> {
    if !is_eligible(value) {
        return None;
    }
    let diff = value.month1 - value.month2;
    Some(if def.is_lower_better { diff } else { -diff })
}

/// Unweighted mean of the eligible percent changes; `0.0` when none qualify.
pub fn success_score(record: &EmployeeRecord) -> f64 {
    let (total, count) = METRICS
        .iter()
        .filter_map(|def| metric_change(record.metric(def.key), def))
        .fold((0.0, 0usize), |(total, count), pct| (total + pct, count + 1));

    if count > 0 {
        total / count as f64
    } else {
        0.0
    }
}

/// Mean of the recorded months. Any non-zero reading counts as recorded,
/// negative ones included.
pub fn average_metric(value: &MetricValue) -> f64 {
    match (value.month1 != 0.0, value.month2 != 0.0) {
        (true, true) => (value.month1 + value.month2) / 2.0,
        (true, false) => value.month1,
        (false, true) => value.month2,
        (false, false) => 0.0,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Trend {
    Down,
    Up,
    Flat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricComparison {
    pub key: MetricKey,
    pub month1: f64,
    pub month2: f64,
    /// Raw `month1 - month2`, not re-oriented.
    pub diff: f64,
    pub improved: bool,
    pub trend: Trend,
    pub diff_text: String,
    pub percent_change: Option<f64>,
    pub average: Option<f64>,
}

pub fn compare_metric(value: &MetricValue, def: &MetricDefinition) -> MetricComparison {
    let diff = value.month1 - value.month2;
    // A missing month shows as no change rather than a jump to or from zero.
    let recorded = value.month1 != 0.0 && value.month2 != 0.0;
    let changed = recorded && diff.abs() > DISPLAY_EPSILON;
    let improved = changed && if def.is_lower_better { diff > 0.0 } else { diff < 0.0 };
    let trend = if !changed {
        Trend::Flat
    } else if diff > 0.0 {
        Trend::Down
    } else {
        Trend::Up
    };
    let diff_text = if !changed {
        "0.0".to_string()
    } else if diff > 0.0 {
        format!("-{:.1}", diff.abs())
    } else {
        format!("+{:.1}", diff.abs())
    };
    let average = match def.calculation {
        Calculation::Average => Some(average_metric(value)),
        Calculation::Diff => None,
    };

    MetricComparison {
        key: def.key,
        month1: value.month1,
        month2: value.month2,
        diff,
        improved,
        trend,
        diff_text,
        percent_change: metric_change(value, def),
        average,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeReport {
    pub record: EmployeeRecord,
    pub success_score: f64,
    pub comparisons: Vec<MetricComparison>,
}

pub fn employee_report(record: &EmployeeRecord) -> EmployeeReport {
    let comparisons = MetricKey::ALL
        .into_iter()
        .map(|key| compare_metric(record.metric(key), definition(key)))
        .collect();

    EmployeeReport {
        record: record.clone(),
        success_score: success_score(record),
        comparisons,
    }
}
