use crate::errors::{AppError, AppResult};
use crate::models::{DashboardSettings, MONTHS, SUPPORTED_YEARS};
use crate::roster::KeyValueStore;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const SCHEMA_SQL: &str = include_str!("schema.sql");

#[derive(Debug)]
pub struct Database {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl Database {
    pub fn new(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| AppError::Io(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(AppError::from)?;
        conn.execute_batch(SCHEMA_SQL).map_err(AppError::from)?;

        let db = Self {
            conn: Mutex::new(conn),
            db_path: path.to_path_buf(),
        };

        db.ensure_default_settings()?;

        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    pub fn get_value(&self, key: &str) -> AppResult<Option<String>> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let value = conn
            .query_row("SELECT value FROM kv_store WHERE key = ?1", [key], |row| {
                row.get::<_, String>(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set_value(&self, key: &str, value: &str) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_settings(&self) -> AppResult<DashboardSettings> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let raw = conn
            .query_row(
                "SELECT value_json FROM settings WHERE key = 'dashboard'",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()?;

        match raw {
            Some(raw) => Ok(serde_json::from_str::<DashboardSettings>(&raw).unwrap_or_default()),
            None => Ok(DashboardSettings::default()),
        }
    }

    /// Deep-merges `update` into the stored settings, validates the result
    /// and saves it.
    pub fn update_settings(&self, update: serde_json::Value) -> AppResult<DashboardSettings> {
        let current = self.get_settings()?;
        let mut merged = serde_json::to_value(current)?;
        merge_json(&mut merged, update);
        let settings: DashboardSettings = serde_json::from_value(merged)
            .map_err(|error| AppError::Validation(format!("invalid settings: {}", error)))?;
        validate_settings(&settings)?;

        self.save_settings(&settings)?;
        Ok(settings)
    }

    fn save_settings(&self, settings: &DashboardSettings) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        conn.execute(
            "INSERT INTO settings (key, value_json, updated_at)
             VALUES ('dashboard', ?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json, updated_at = excluded.updated_at",
            params![serde_json::to_string(settings)?, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn ensure_default_settings(&self) -> AppResult<()> {
        let conn = self.conn.lock().map_err(|_| AppError::Internal("database mutex poisoned".to_string()))?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(1) FROM settings WHERE key = 'dashboard'",
            [],
            |row| row.get(0),
        )?;
        if count == 0 {
            conn.execute(
                "INSERT INTO settings (key, value_json, updated_at) VALUES ('dashboard', ?1, ?2)",
                params![
                    serde_json::to_string(&DashboardSettings::default())?,
                    Utc::now().to_rfc3339()
                ],
            )?;
        }
        Ok(())
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.get_value(key)
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.set_value(key, value)
    }
}

pub fn validate_settings(settings: &DashboardSettings) -> AppResult<()> {
    if !SUPPORTED_YEARS.contains(&settings.selected_year.as_str()) {
        return Err(AppError::Validation(format!(
            "unsupported year '{}'",
            settings.selected_year
        )));
    }
    for month in [&settings.month_from, &settings.month_to] {
        if !MONTHS.contains(&month.as_str()) {
            return Err(AppError::Validation(format!("unknown month '{}'", month)));
        }
    }
    if settings.ranking_limit == 0 || settings.page_size == 0 {
        return Err(AppError::Validation(
            "ranking limit and page size must be positive".to_string(),
        ));
    }
    if settings.reveal.shuffle_tick_ms == 0 {
        return Err(AppError::Validation(
            "shuffle tick must be positive".to_string(),
        ));
    }
    Ok(())
}

fn merge_json(target: &mut serde_json::Value, update: serde_json::Value) {
    match (target, update) {
        (serde_json::Value::Object(target_map), serde_json::Value::Object(update_map)) => {
            for (key, value) in update_map {
                merge_json(target_map.entry(key).or_insert(serde_json::Value::Null), value);
            }
        }
        (target, update) => {
            *target = update;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Database;
    use crate::errors::AppError;
    use crate::roster::KeyValueStore;

    #[test]
    fn key_value_round_trip_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("nested").join("state.sqlite")).expect("db");

        assert!(db.get("missing").expect("get").is_none());
        db.set("lock", "true").expect("set");
        db.set("lock", "false").expect("overwrite");
        assert_eq!(db.get("lock").expect("get").as_deref(), Some("false"));
    }

    #[test]
    fn values_survive_reopening() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("state.sqlite");
        {
            let db = Database::new(&db_path).expect("db");
            db.set("roster", "{}").expect("set");
            db.update_settings(serde_json::json!({ "monthFrom": "March" }))
                .expect("settings");
        }
        let db = Database::new(&db_path).expect("reopen");
        assert_eq!(db.get("roster").expect("get").as_deref(), Some("{}"));
        assert_eq!(db.get_settings().expect("settings").month_from, "March");
    }

    #[test]
    fn settings_patch_merges_nested_values() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("state.sqlite")).expect("db");

        let settings = db
            .update_settings(serde_json::json!({ "reveal": { "shuffleTicks": 5 } }))
            .expect("update");
        assert_eq!(settings.reveal.shuffle_ticks, 5);
        assert_eq!(settings.reveal.shuffle_tick_ms, 100);
        assert_eq!(settings.month_to, "December");
    }

    #[test]
    fn invalid_settings_are_rejected_and_not_saved() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::new(&dir.path().join("state.sqlite")).expect("db");

        let error = db
            .update_settings(serde_json::json!({ "monthTo": "Smarch" }))
            .expect_err("unknown month");
        assert!(matches!(error, AppError::Validation(_)));
        let error = db
            .update_settings(serde_json::json!({ "selectedYear": "1999" }))
            .expect_err("unknown year");
        assert!(error.to_string().starts_with("VALIDATION_FAILED"));
        assert_eq!(db.get_settings().expect("settings").month_to, "December");
    }
}
