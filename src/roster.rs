use crate::errors::{AppError, AppResult};
use crate::models::{EmployeeRecord, MetricKey, MonthField, ProfileField, RosterPage};
use crate::ranking::sort_by_overall_score;
use crate::seed::{initial_roster, SEED_YEAR};
use chrono::Utc;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub const ROSTER_STORAGE_KEY: &str = "health_analysis_data_v2";
pub const LOCK_STORAGE_KEY: &str = "health_analysis_locked";
pub const DEFAULT_COMPANY: &str = "Chaophraya Tourist Boat Co., Ltd.";

/// Durable string storage the roster is saved into after every committed
/// mutation.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> AppResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> AppResult<()>;
}

/// Year-keyed rosters plus the write lock. This is the only place roster
/// data is mutated.
pub struct RosterStore {
    kv: Arc<dyn KeyValueStore>,
    years: BTreeMap<String, Vec<EmployeeRecord>>,
    locked: bool,
    last_issued_id: i64,
}

impl RosterStore {
    pub fn load(kv: Arc<dyn KeyValueStore>) -> Self {
        let years = match kv.get(ROSTER_STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<BTreeMap<String, Vec<EmployeeRecord>>>(&raw) {
                Ok(years) => years,
                Err(error) => {
                    tracing::error!(error = %error, "stored roster is unreadable; falling back to seed data");
                    seeded_years()
                }
            },
            Ok(None) => seeded_years(),
            Err(error) => {
                tracing::warn!(error = %error, "failed to read stored roster; falling back to seed data");
                seeded_years()
            }
        };

        let locked = match kv.get(LOCK_STORAGE_KEY) {
            Ok(Some(raw)) => raw == "true",
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(error = %error, "failed to read lock flag; starting locked");
                true
            }
        };

        tracing::info!(years = years.len(), locked, "roster store loaded");
        Self {
            kv,
            years,
            locked,
            last_issued_id: 0,
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn years(&self) -> Vec<String> {
        self.years.keys().cloned().collect()
    }

    pub fn roster(&self, year: &str) -> Vec<EmployeeRecord> {
        self.years.get(year).cloned().unwrap_or_default()
    }

    pub fn find(&self, year: &str, id: &str) -> Option<EmployeeRecord> {
        self.years
            .get(year)
            .and_then(|records| records.iter().find(|record| record.id == id))
            .cloned()
    }

    /// Case-insensitive match on name or company; an empty term matches all.
    pub fn search(&self, year: &str, term: &str) -> Vec<EmployeeRecord> {
        let needle = term.to_lowercase();
        self.years
            .get(year)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| {
                        record.name.to_lowercase().contains(&needle)
                            || record.company.to_lowercase().contains(&needle)
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn page(&self, year: &str, term: &str, page: usize, page_size: usize) -> RosterPage {
        let matches = self.search(year, term);
        let page_size = page_size.max(1);
        let total_records = matches.len();
        let total_pages = total_records.div_ceil(page_size);
        let page = page.clamp(1, total_pages.max(1));
        let start_index = (page - 1) * page_size;
        let records = matches.into_iter().skip(start_index).take(page_size).collect();

        RosterPage {
            records,
            page,
            total_pages,
            total_records,
            start_index,
        }
    }

    pub fn add_employee(&mut self, year: &str) -> Vec<EmployeeRecord> {
        if self.reject_when_locked(year, "add_employee") {
            return self.roster(year);
        }
        let id = self.next_id(year);
        self.mutate(year, "add_employee", |records| {
            let name = format!("New Employee {}", records.len() + 1);
            records.insert(0, EmployeeRecord::new(id, name, DEFAULT_COMPANY));
            true
        })
    }

    pub fn delete_employee(&mut self, year: &str, id: &str) -> Vec<EmployeeRecord> {
        self.mutate(year, "delete_employee", |records| {
            let before = records.len();
            records.retain(|record| record.id != id);
            records.len() != before
        })
    }

    pub fn update_field(&mut self, year: &str, id: &str, field: ProfileField, value: &str) -> Vec<EmployeeRecord> {
        self.mutate(year, "update_field", |records| {
            let Some(record) = records.iter_mut().find(|record| record.id == id) else {
                return false;
            };
            match field {
                ProfileField::Name => record.name = value.to_string(),
                ProfileField::Company => record.company = value.to_string(),
            }
            true
        })
    }

    pub fn update_metric_value(
        &mut self,
        year: &str,
        id: &str,
        key: MetricKey,
        field: MonthField,
        raw_value: &str,
    ) -> Vec<EmployeeRecord> {
        let value = parse_measurement(raw_value);
        self.mutate(year, "update_metric_value", |records| {
            let Some(record) = records.iter_mut().find(|record| record.id == id) else {
                return false;
            };
            record.metric_mut(key).set(field, value);
            true
        })
    }

    pub fn sort_by_progress(&mut self, year: &str) -> Vec<EmployeeRecord> {
        self.mutate(year, "sort_by_progress", |records| {
            let sorted = sort_by_overall_score(records);
            if sorted == *records {
                return false;
            }
            *records = sorted;
            true
        })
    }

    /// Wholesale replacement used by import. Unlike the field-level
    /// mutators, a lock violation here is reported to the caller.
    pub fn replace_roster(&mut self, year: &str, records: Vec<EmployeeRecord>) -> AppResult<Vec<EmployeeRecord>> {
        if self.locked {
            return Err(AppError::Locked(
                "Unlock the dashboard before importing data".to_string(),
            ));
        }
        ensure_unique_ids(&records)?;

        let count = records.len();
        self.years.insert(year.to_string(), records);
        self.persist_roster();
        tracing::info!(year = %year, count, "roster replaced");
        Ok(self.roster(year))
    }

    pub fn set_lock(&mut self, locked: bool) -> bool {
        self.locked = locked;
        self.persist_lock();
        tracing::info!(locked, "lock flag changed");
        self.locked
    }

    fn reject_when_locked(&self, year: &str, action: &'static str) -> bool {
        if self.locked {
            tracing::debug!(year = %year, action, "roster is locked; mutation ignored");
        }
        self.locked
    }

    /// Applies `apply` to a copy of the year's roster and commits it only
    /// when the closure reports a change.
    fn mutate<F>(&mut self, year: &str, action: &'static str, apply: F) -> Vec<EmployeeRecord>
    where
        F: FnOnce(&mut Vec<EmployeeRecord>) -> bool,
    {
        if self.reject_when_locked(year, action) {
            return self.roster(year);
        }

        let mut next = self.roster(year);
        if apply(&mut next) {
            self.years.insert(year.to_string(), next);
            self.persist_roster();
            tracing::info!(year = %year, action, "roster updated");
        } else {
            tracing::debug!(year = %year, action, "no matching record; roster unchanged");
        }
        self.roster(year)
    }

    fn next_id(&mut self, year: &str) -> String {
        let existing = self
            .years
            .get(year)
            .map(|records| records.iter().map(|record| record.id.clone()).collect::<HashSet<_>>())
            .unwrap_or_default();

        let mut candidate = Utc::now().timestamp_millis().max(self.last_issued_id + 1);
        while existing.contains(&candidate.to_string()) {
            candidate += 1;
        }
        self.last_issued_id = candidate;
        candidate.to_string()
    }

    fn persist_roster(&self) {
        let raw = match serde_json::to_string(&self.years) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::warn!(error = %error, "failed to encode roster for storage");
                return;
            }
        };
        if let Err(error) = self.kv.set(ROSTER_STORAGE_KEY, &raw) {
            tracing::warn!(error = %error, "failed to persist roster");
        }
    }

    fn persist_lock(&self) {
        let raw = if self.locked { "true" } else { "false" };
        if let Err(error) = self.kv.set(LOCK_STORAGE_KEY, raw) {
            tracing::warn!(error = %error, "failed to persist lock flag");
        }
    }
}

fn seeded_years() -> BTreeMap<String, Vec<EmployeeRecord>> {
    let mut years = BTreeMap::new();
    years.insert(SEED_YEAR.to_string(), sort_by_overall_score(&initial_roster()));
    years
}

pub fn ensure_unique_ids(records: &[EmployeeRecord]) -> AppResult<()> {
    let mut seen = HashSet::new();
    for record in records {
        if !seen.insert(record.id.as_str()) {
            return Err(AppError::Validation(format!(
                "duplicate employee id '{}'",
                record.id
            )));
        }
    }
    Ok(())
}

/// Lenient number parsing for typed-in measurements: leading whitespace is
/// skipped and the longest numeric prefix wins. Anything unparseable or
/// non-finite becomes `0.0`, i.e. "not recorded".
pub fn parse_measurement(raw: &str) -> f64 {
    let trimmed = raw.trim_start();
    let prefix = &trimmed[..numeric_prefix_len(trimmed.as_bytes())];
    prefix
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

// `[sign] digits [. digits] [(e|E) [sign] digits]` with at least one mantissa
// digit; an exponent without digits is left out of the prefix.
fn numeric_prefix_len(bytes: &[u8]) -> usize {
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = leading_digits(&bytes[end..]);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = leading_digits(&bytes[end + 1..]);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return 0;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exponent = end + 1;
        if matches!(bytes.get(exponent), Some(b'+' | b'-')) {
            exponent += 1;
        }
        let exp_digits = leading_digits(&bytes[exponent..]);
        if exp_digits > 0 {
            end = exponent + exp_digits;
        }
    }
    end
}

fn leading_digits(bytes: &[u8]) -> usize {
    bytes.iter().take_while(|byte| byte.is_ascii_digit()).count()
}
