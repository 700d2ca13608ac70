use crate::ranking::DEFAULT_RANKING_LIMIT;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const MONTHS: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

// Month names as written by Thai-language exports, in catalog order.
const THAI_MONTHS: [&str; 12] = [
    "มกราคม",
    "กุมภาพันธ์",
    "มีนาคม",
    "เมษายน",
    "พฤษภาคม",
    "มิถุนายน",
    "กรกฎาคม",
    "สิงหาคม",
    "กันยายน",
    "ตุลาคม",
    "พฤศจิกายน",
    "ธันวาคม",
];

/// Maps an English (any case) or Thai month name onto its `MONTHS` entry.
pub fn canonical_month(raw: &str) -> Option<&'static str> {
    let raw = raw.trim();
    MONTHS
        .iter()
        .zip(THAI_MONTHS.iter())
        .find(|(english, thai)| english.eq_ignore_ascii_case(raw) || **thai == raw)
        .map(|(english, _)| *english)
}

/// Buddhist-era years the dashboard offers in its year picker.
pub const SUPPORTED_YEARS: [&str; 8] = ["2568", "2569", "2570", "2571", "2572", "2573", "2574", "2575"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKey {
    #[serde(rename = "weight")]
    Weight,
    #[serde(rename = "bmi")]
    Bmi,
    #[serde(rename = "fat")]
    Fat,
    #[serde(rename = "sFat")]
    SFat,
    #[serde(rename = "muscle")]
    Muscle,
    #[serde(rename = "vFat")]
    VFat,
}

impl MetricKey {
    pub const ALL: [MetricKey; 6] = [
        Self::Weight,
        Self::Bmi,
        Self::Fat,
        Self::SFat,
        Self::Muscle,
        Self::VFat,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weight => "weight",
            Self::Bmi => "bmi",
            Self::Fat => "fat",
            Self::SFat => "sFat",
            Self::Muscle => "muscle",
            Self::VFat => "vFat",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.as_str() == raw)
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Calculation {
    #[default]
    Diff,
    Average,
}

/// A measurement pair. `0` in either slot means "not recorded".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricValue {
    #[serde(default)]
    pub month1: f64,
    #[serde(default)]
    pub month2: f64,
}

impl MetricValue {
    pub fn new(month1: f64, month2: f64) -> Self {
        Self { month1, month2 }
    }

    pub fn get(&self, field: MonthField) -> f64 {
        match field {
            MonthField::Month1 => self.month1,
            MonthField::Month2 => self.month2,
        }
    }

    pub fn set(&mut self, field: MonthField, value: f64) {
        match field {
            MonthField::Month1 => self.month1 = value,
            MonthField::Month2 => self.month2 = value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeRecord {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub weight: MetricValue,
    #[serde(default)]
    pub bmi: MetricValue,
    #[serde(default)]
    pub fat: MetricValue,
    #[serde(default)]
    pub s_fat: MetricValue,
    #[serde(default)]
    pub muscle: MetricValue,
    #[serde(default)]
    pub v_fat: MetricValue,
}

impl EmployeeRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, company: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            company: company.into(),
            weight: MetricValue::default(),
            bmi: MetricValue::default(),
            fat: MetricValue::default(),
            s_fat: MetricValue::default(),
            muscle: MetricValue::default(),
            v_fat: MetricValue::default(),
        }
    }

    pub fn metric(&self, key: MetricKey) -> &MetricValue {
        match key {
            MetricKey::Weight => &self.weight,
            MetricKey::Bmi => &self.bmi,
            MetricKey::Fat => &self.fat,
            MetricKey::SFat => &self.s_fat,
            MetricKey::Muscle => &self.muscle,
            MetricKey::VFat => &self.v_fat,
        }
    }

    pub fn metric_mut(&mut self, key: MetricKey) -> &mut MetricValue {
        match key {
            MetricKey::Weight => &mut self.weight,
            MetricKey::Bmi => &mut self.bmi,
            MetricKey::Fat => &mut self.fat,
            MetricKey::SFat => &mut self.s_fat,
            MetricKey::Muscle => &mut self.muscle,
            MetricKey::VFat => &mut self.v_fat,
        }
    }

    pub fn with_metric(mut self, key: MetricKey, month1: f64, month2: f64) -> Self {
        *self.metric_mut(key) = MetricValue::new(month1, month2);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProfileField {
    Name,
    Company,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MonthField {
    Month1,
    Month2,
}

/// Which leaderboard to compute: the aggregate success score or one metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum MetricSelector {
    Overall,
    Metric(MetricKey),
}

impl MetricSelector {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Overall => "overall",
            Self::Metric(key) => key.as_str(),
        }
    }
}

impl TryFrom<String> for MetricSelector {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "overall" {
            return Ok(Self::Overall);
        }
        MetricKey::parse(&value)
            .map(Self::Metric)
            .ok_or_else(|| format!("unknown metric selector '{}'", value))
    }
}

impl From<MetricSelector> for String {
    fn from(value: MetricSelector) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for MetricSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingEntry {
    pub rank: usize,
    pub record: EmployeeRecord,
    pub progress_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPage {
    pub records: Vec<EmployeeRecord>,
    pub page: usize,
    pub total_pages: usize,
    pub total_records: usize,
    pub start_index: usize,
}

/// Backup document shape shared by export and import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDocument {
    pub year: String,
    pub month_from: String,
    pub month_to: String,
    pub employees: Vec<EmployeeRecord>,
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutcome {
    pub year: String,
    pub imported: usize,
    pub month_from: Option<String>,
    pub month_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFieldPayload {
    pub year: String,
    pub id: String,
    pub field: ProfileField,
    pub value: String,
}

/// `value` is the raw text typed into the cell; it is parsed leniently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricPayload {
    pub year: String,
    pub id: String,
    pub key: MetricKey,
    pub field: MonthField,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterPageRequest {
    pub year: String,
    #[serde(default)]
    pub search: String,
    #[serde(default = "first_page")]
    pub page: usize,
}

fn first_page() -> usize {
    1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevealTimings {
    pub shuffle_tick_ms: u64,
    pub shuffle_ticks: u32,
    pub decoy_rows: usize,
    pub pause_before_reveal_ms: u64,
    pub pause_after_third_ms: u64,
    pub pause_after_second_ms: u64,
    pub standard_celebration_ms: u64,
    pub grand_celebration_ms: u64,
}

impl Default for RevealTimings {
    fn default() -> Self {
        Self {
            shuffle_tick_ms: 100,
            shuffle_ticks: 35,
            decoy_rows: 6,
            pause_before_reveal_ms: 1_500,
            pause_after_third_ms: 2_000,
            pause_after_second_ms: 2_500,
            standard_celebration_ms: 2_000,
            grand_celebration_ms: 6_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub selected_year: String,
    pub month_from: String,
    pub month_to: String,
    pub ranking_limit: usize,
    pub page_size: usize,
    pub reveal: RevealTimings,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            selected_year: "2568".to_string(),
            month_from: "September".to_string(),
            month_to: "December".to_string(),
            ranking_limit: DEFAULT_RANKING_LIMIT,
            page_size: 20,
            reveal: RevealTimings::default(),
        }
    }
}
