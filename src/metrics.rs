use crate::models::{Calculation, MetricKey};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricDefinition {
    pub key: MetricKey,
    pub label: &'static str,
    pub unit: &'static str,
    pub is_lower_better: bool,
    pub calculation: Calculation,
}

pub const METRICS: [MetricDefinition; 6] = [
    MetricDefinition {
        key: MetricKey::Weight,
        label: "Weight",
        unit: "kg",
        is_lower_better: true,
        calculation: Calculation::Diff,
    },
    MetricDefinition {
        key: MetricKey::Bmi,
        label: "BMI",
        unit: "",
        is_lower_better: true,
        calculation: Calculation::Diff,
    },
    MetricDefinition {
        key: MetricKey::Fat,
        label: "Body fat",
        unit: "%",
        is_lower_better: true,
        calculation: Calculation::Diff,
    },
    MetricDefinition {
        key: MetricKey::SFat,
        label: "Subcutaneous fat",
        unit: "%",
        is_lower_better: true,
        calculation: Calculation::Diff,
    },
    MetricDefinition {
        key: MetricKey::Muscle,
        label: "Muscle",
        unit: "%",
        is_lower_better: false,
        calculation: Calculation::Diff,
    },
    MetricDefinition {
        key: MetricKey::VFat,
        label: "Visceral fat",
        unit: "level",
        is_lower_better: true,
        calculation: Calculation::Diff,
    },
];

pub fn definition(key: MetricKey) -> &'static MetricDefinition {
    match key {
        MetricKey::Weight => &METRICS[0],
        MetricKey::Bmi => &METRICS[1],
        MetricKey::Fat => &METRICS[2],
        MetricKey::SFat => &METRICS[3],
        MetricKey::Muscle => &METRICS[4],
        MetricKey::VFat => &METRICS[5],
    }
}
