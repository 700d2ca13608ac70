use crate::backup::{build_export, parse_import};
use crate::db::Database;
use crate::errors::{AppError, AppResult};
use crate::models::{
    canonical_month, DashboardSettings, EmployeeRecord, HealthDocument, ImportOutcome, MetricKey, MetricSelector, MonthField,
    ProfileField, RankingEntry, RosterPage,
};
use crate::ranking::rank_by_metric;
use crate::reveal::{RevealEvent, RevealSequencer, RevealSnapshot};
use crate::roster::RosterStore;
use crate::scoring::{employee_report, success_score, EmployeeReport};
use chrono::Utc;
use serde_json::json;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Root context: owns the roster store, its database and the reveal
/// sequencer. Hosts hold one of these and go through it for everything.
pub struct DashboardCore {
    db: Arc<Database>,
    store: Mutex<RosterStore>,
    reveal: RevealSequencer,
}

impl DashboardCore {
    pub fn new(app_data_dir: PathBuf) -> AppResult<Arc<Self>> {
        let db_path = app_data_dir.join("state.sqlite");
        let db = Arc::new(Database::new(&db_path)?);
        tracing::info!(path = %db.path().display(), "dashboard database opened");
        Ok(Self::with_database(db))
    }

    pub fn with_database(db: Arc<Database>) -> Arc<Self> {
        let store = RosterStore::load(db.clone());
        Arc::new(Self {
            db,
            store: Mutex::new(store),
            reveal: RevealSequencer::new(),
        })
    }

    pub fn settings(&self) -> AppResult<DashboardSettings> {
        self.db.get_settings()
    }

    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<DashboardSettings> {
        let settings = self.db.update_settings(update)?;
        tracing::info!(year = %settings.selected_year, from = %settings.month_from, to = %settings.month_to, "settings updated");
        Ok(settings)
    }

    pub fn is_locked(&self) -> AppResult<bool> {
        Ok(self.store()?.is_locked())
    }

    pub fn set_lock(&self, locked: bool) -> AppResult<bool> {
        Ok(self.store()?.set_lock(locked))
    }

    pub fn years(&self) -> AppResult<Vec<String>> {
        Ok(self.store()?.years())
    }

    pub fn roster(&self, year: &str) -> AppResult<Vec<EmployeeRecord>> {
        Ok(self.store()?.roster(year))
    }

    pub fn roster_page(&self, year: &str, search: &str, page: usize) -> AppResult<RosterPage> {
        let page_size = self.settings()?.page_size;
        Ok(self.store()?.page(year, search, page, page_size))
    }

    pub fn ranking(&self, year: &str, selector: MetricSelector) -> AppResult<Vec<RankingEntry>> {
        let limit = self.settings()?.ranking_limit;
        let records = self.roster(year)?;
        Ok(rank_by_metric(&records, selector, limit))
    }

    pub fn success_score(&self, year: &str, id: &str) -> AppResult<f64> {
        Ok(success_score(&self.record(year, id)?))
    }

    pub fn employee_report(&self, year: &str, id: &str) -> AppResult<EmployeeReport> {
        Ok(employee_report(&self.record(year, id)?))
    }

    pub fn add_employee(&self, year: &str) -> AppResult<Vec<EmployeeRecord>> {
        Ok(self.store()?.add_employee(year))
    }

    pub fn delete_employee(&self, year: &str, id: &str) -> AppResult<Vec<EmployeeRecord>> {
        Ok(self.store()?.delete_employee(year, id))
    }

    pub fn update_field(&self, year: &str, id: &str, field: ProfileField, value: &str) -> AppResult<Vec<EmployeeRecord>> {
        Ok(self.store()?.update_field(year, id, field, value))
    }

    pub fn update_metric_value(
        &self,
        year: &str,
        id: &str,
        key: MetricKey,
        field: MonthField,
        raw_value: &str,
    ) -> AppResult<Vec<EmployeeRecord>> {
        Ok(self.store()?.update_metric_value(year, id, key, field, raw_value))
    }

    pub fn sort_by_progress(&self, year: &str) -> AppResult<Vec<EmployeeRecord>> {
        Ok(self.store()?.sort_by_progress(year))
    }

    /// Validates a backup document and, if it is acceptable, replaces the
    /// roster of the year it names (or the selected year). The selection
    /// follows the imported year and months.
    pub fn import_backup(&self, raw: &str) -> AppResult<ImportOutcome> {
        if self.is_locked()? {
            return Err(AppError::Locked(
                "Unlock the dashboard before importing data".to_string(),
            ));
        }
        let payload = parse_import(raw)?;
        let year = match payload.year.clone() {
            Some(year) => year,
            None => self.settings()?.selected_year,
        };
        let imported = payload.employees.len();
        self.store()?.replace_roster(&year, payload.employees)?;

        self.apply_selection(json!({ "selectedYear": year }));
        for (field, month) in [("monthFrom", &payload.month_from), ("monthTo", &payload.month_to)] {
            let Some(month) = month else {
                continue;
            };
            match canonical_month(month) {
                Some(canonical) => self.apply_selection(json!({ field: canonical })),
                None => tracing::warn!(field, month = %month, "imported month name not recognized"),
            }
        }

        tracing::info!(year = %year, imported, "backup imported");
        Ok(ImportOutcome {
            year,
            imported,
            month_from: payload.month_from,
            month_to: payload.month_to,
        })
    }

    pub fn export_backup(&self, year: &str) -> AppResult<HealthDocument> {
        let settings = self.settings()?;
        let employees = self.roster(year)?;
        Ok(build_export(
            year,
            &settings.month_from,
            &settings.month_to,
            employees,
            Utc::now(),
        ))
    }

    pub fn export_backup_json(&self, year: &str) -> AppResult<String> {
        Ok(serde_json::to_string_pretty(&self.export_backup(year)?)?)
    }

    /// Computes the leaderboard and starts its reveal, replacing any reveal
    /// already in progress.
    pub fn open_ranking(&self, year: &str, selector: MetricSelector) -> AppResult<RevealSnapshot> {
        let settings = self.settings()?;
        let pool = self.roster(year)?;
        let entries = rank_by_metric(&pool, selector, settings.ranking_limit);
        tracing::info!(year = %year, selector = %selector, entries = entries.len(), "ranking opened");
        self.reveal.start(entries, pool, settings.reveal)
    }

    pub fn close_ranking(&self) -> AppResult<RevealSnapshot> {
        self.reveal.cancel()
    }

    pub fn reveal_snapshot(&self) -> AppResult<RevealSnapshot> {
        self.reveal.snapshot()
    }

    pub fn subscribe_reveal(&self) -> broadcast::Receiver<RevealEvent> {
        self.reveal.subscribe()
    }

    // Selection changes after an import are best-effort; the roster is already
    // replaced by then.
    fn apply_selection(&self, patch: serde_json::Value) {
        if let Err(error) = self.db.update_settings(patch.clone()) {
            tracing::warn!(error = %error, patch = %patch, "imported selection was not applied to settings");
        }
    }

    fn record(&self, year: &str, id: &str) -> AppResult<EmployeeRecord> {
        self.store()?
            .find(year, id)
            .ok_or_else(|| AppError::NotFound(format!("No employee {} in {}", id, year)))
    }

    fn store(&self) -> AppResult<MutexGuard<'_, RosterStore>> {
        self.store
            .lock()
            .map_err(|_| AppError::Internal("roster mutex poisoned".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::DashboardCore;
    use crate::errors::AppError;
    use crate::models::{MetricKey, MetricSelector, MonthField};
    use crate::reveal::RevealPhase;
    use std::time::Duration;

    fn open(dir: &tempfile::TempDir) -> std::sync::Arc<DashboardCore> {
        DashboardCore::new(dir.path().to_path_buf()).expect("core")
    }

    const IMPORT: &str = r#"{
        "year": "2569",
        "monthFrom": "January",
        "monthTo": "April",
        "employees": [
            { "id": "x", "name": "A", "company": "C",
              "weight": { "month1": 80, "month2": 75 },
              "bmi": { "month1": 0, "month2": 0 },
              "fat": { "month1": 0, "month2": 0 },
              "sFat": { "month1": 0, "month2": 0 },
              "muscle": { "month1": 0, "month2": 0 },
              "vFat": { "month1": 0, "month2": 0 } },
            { "id": "y", "name": "B", "company": "C" }
        ]
    }"#;

    #[test]
    fn import_replaces_year_and_selection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        core.set_lock(false).expect("unlock");

        let outcome = core.import_backup(IMPORT).expect("import");
        assert_eq!(outcome.year, "2569");
        assert_eq!(outcome.imported, 2);

        let roster = core.roster("2569").expect("roster");
        assert_eq!(roster.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["x", "y"]);
        assert!((core.success_score("2569", "x").expect("score") - 6.25).abs() < 1e-9);

        let settings = core.settings().expect("settings");
        assert_eq!(settings.selected_year, "2569");
        assert_eq!(settings.month_from, "January");
        assert_eq!(settings.month_to, "April");
    }

    #[test]
    fn import_is_refused_while_locked_or_malformed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        let before = core.roster("2568").expect("roster");

        assert!(matches!(core.import_backup(IMPORT), Err(AppError::Locked(_))));
        core.set_lock(false).expect("unlock");
        assert!(matches!(
            core.import_backup(r#"{ "year": "2568", "employees": "none" }"#),
            Err(AppError::Validation(_))
        ));
        assert_eq!(core.roster("2568").expect("roster"), before);
        assert_eq!(core.settings().expect("settings").month_from, "September");
    }

    #[test]
    fn import_into_unlisted_year_still_replaces_roster() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        core.set_lock(false).expect("unlock");
        core.import_backup(r#"{ "year": "2601", "employees": [ { "id": "z" } ] }"#)
            .expect("import");
        assert_eq!(core.roster("2601").expect("roster").len(), 1);
        assert_eq!(core.settings().expect("settings").selected_year, "2568");
    }

    #[test]
    fn import_applies_year_and_months_independently() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        core.set_lock(false).expect("unlock");

        let raw = serde_json::json!({
            "year": "2569",
            "monthFrom": "มกราคม",
            "monthTo": "Octember",
            "employees": [ { "id": "a" } ]
        })
        .to_string();
        let outcome = core.import_backup(&raw).expect("import");
        assert_eq!(outcome.year, "2569");

        let settings = core.settings().expect("settings");
        assert_eq!(settings.selected_year, "2569");
        assert_eq!(settings.month_from, "January");
        assert_eq!(settings.month_to, "December");

        let raw = r#"{ "year": "2570", "monthTo": "มีนาคม", "employees": [] }"#;
        core.import_backup(raw).expect("import");
        let settings = core.settings().expect("settings");
        assert_eq!(settings.selected_year, "2570");
        assert_eq!(settings.month_from, "January");
        assert_eq!(settings.month_to, "March");
    }

    #[test]
    fn export_mirrors_roster_and_selection() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        let document = core.export_backup("2568").expect("export");
        assert_eq!(document.employees, core.roster("2568").expect("roster"));
        assert_eq!(document.month_to, "December");

        let raw = core.export_backup_json("2568").expect("json");
        core.set_lock(false).expect("unlock");
        let outcome = core.import_backup(&raw).expect("re-import");
        assert_eq!(outcome.imported, document.employees.len());
    }

    #[test]
    fn state_survives_reopening() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let core = open(&dir);
            core.set_lock(false).expect("unlock");
            core.add_employee("2570").expect("add");
            let id = core.roster("2570").expect("roster")[0].id.clone();
            core.update_metric_value("2570", &id, MetricKey::Muscle, MonthField::Month1, "30")
                .expect("update");
        }
        let core = open(&dir);
        assert!(!core.is_locked().expect("lock"));
        let roster = core.roster("2570").expect("roster");
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].muscle.month1, 30.0);
    }

    #[test]
    fn unknown_employee_report_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        assert!(matches!(core.employee_report("2568", "nobody"), Err(AppError::NotFound(_))));
        let report = core.employee_report("2568", "11").expect("seeded employee");
        assert_eq!(report.comparisons.len(), 6);
    }

    #[test]
    fn ranking_uses_configured_limit() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);
        assert_eq!(core.ranking("2568", MetricSelector::Overall).expect("ranking").len(), 10);
        core.update_settings(serde_json::json!({ "rankingLimit": 3 })).expect("settings");
        let top = core
            .ranking("2568", MetricSelector::Metric(MetricKey::Weight))
            .expect("ranking");
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].record.id, "11");
    }

    #[tokio::test(start_paused = true)]
    async fn opening_and_closing_a_ranking_drives_the_reveal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let core = open(&dir);

        let snapshot = core.open_ranking("2568", MetricSelector::Overall).expect("open");
        assert_eq!(snapshot.phase, RevealPhase::Shuffling);
        assert_eq!(snapshot.entries.len(), 10);

        tokio::time::sleep(Duration::from_secs(15)).await;
        let done = core.reveal_snapshot().expect("snapshot");
        assert_eq!(done.phase, RevealPhase::RevealingChampion);
        assert_eq!(done.visible_entries().len(), 10);

        let closed = core.close_ranking().expect("close");
        assert_eq!(closed.phase, RevealPhase::Idle);
    }
}
