pub mod backup;
pub mod dashboard;
pub mod db;
pub mod errors;
pub mod metrics;
pub mod models;
pub mod ranking;
pub mod reveal;
pub mod roster;
pub mod scoring;
pub mod seed;

pub use crate::dashboard::DashboardCore;
pub use crate::errors::{AppError, AppResult};

use crate::models::{
    DashboardSettings, EmployeeRecord, HealthDocument, ImportOutcome, MetricSelector, RankingEntry,
    RosterPage, RosterPageRequest, UpdateFieldPayload, UpdateMetricPayload,
};
use crate::reveal::RevealSnapshot;
use crate::scoring::EmployeeReport;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_appender::non_blocking::WorkerGuard;

static LOG_GUARD: std::sync::OnceLock<WorkerGuard> = std::sync::OnceLock::new();

/// Handle a host keeps for the lifetime of the application and passes to
/// every command.
#[derive(Clone)]
pub struct AppState {
    pub core: Arc<DashboardCore>,
}

/// Creates the data directory, starts file logging and opens the stored
/// dashboard state.
pub fn bootstrap(app_data_dir: PathBuf) -> Result<AppState, String> {
    std::fs::create_dir_all(&app_data_dir).map_err(to_client_error)?;
    if let Err(error) = init_tracing(&app_data_dir) {
        eprintln!("logging disabled: {}", error);
    }
    let core = DashboardCore::new(app_data_dir).map_err(to_client_error)?;
    Ok(AppState { core })
}

pub fn get_roster(state: &AppState, year: String) -> Result<Vec<EmployeeRecord>, String> {
    state.core.roster(&year).map_err(to_client_error)
}

pub fn list_years(state: &AppState) -> Result<Vec<String>, String> {
    state.core.years().map_err(to_client_error)
}

pub fn get_roster_page(state: &AppState, request: RosterPageRequest) -> Result<RosterPage, String> {
    state
        .core
        .roster_page(&request.year, &request.search, request.page)
        .map_err(to_client_error)
}

pub fn get_ranking(state: &AppState, year: String, selector: String) -> Result<Vec<RankingEntry>, String> {
    let selector = MetricSelector::try_from(selector).map_err(to_client_error)?;
    state.core.ranking(&year, selector).map_err(to_client_error)
}

pub fn get_success_score(state: &AppState, year: String, id: String) -> Result<f64, String> {
    state.core.success_score(&year, &id).map_err(to_client_error)
}

pub fn get_employee_report(state: &AppState, year: String, id: String) -> Result<EmployeeReport, String> {
    state.core.employee_report(&year, &id).map_err(to_client_error)
}

pub fn add_employee(state: &AppState, year: String) -> Result<Vec<EmployeeRecord>, String> {
    state.core.add_employee(&year).map_err(to_client_error)
}

pub fn delete_employee(state: &AppState, year: String, id: String) -> Result<Vec<EmployeeRecord>, String> {
    state.core.delete_employee(&year, &id).map_err(to_client_error)
}

pub fn update_employee_field(state: &AppState, payload: UpdateFieldPayload) -> Result<Vec<EmployeeRecord>, String> {
    state
        .core
        .update_field(&payload.year, &payload.id, payload.field, &payload.value)
        .map_err(to_client_error)
}

pub fn update_metric_value(state: &AppState, payload: UpdateMetricPayload) -> Result<Vec<EmployeeRecord>, String> {
    state
        .core
        .update_metric_value(&payload.year, &payload.id, payload.key, payload.field, &payload.value)
        .map_err(to_client_error)
}

pub fn sort_by_progress(state: &AppState, year: String) -> Result<Vec<EmployeeRecord>, String> {
    state.core.sort_by_progress(&year).map_err(to_client_error)
}

pub fn get_lock(state: &AppState) -> Result<bool, String> {
    state.core.is_locked().map_err(to_client_error)
}

pub fn set_lock(state: &AppState, locked: bool) -> Result<bool, String> {
    state.core.set_lock(locked).map_err(to_client_error)
}

pub fn import_backup(state: &AppState, raw: String) -> Result<ImportOutcome, String> {
    state.core.import_backup(&raw).map_err(to_client_error)
}

pub fn export_backup(state: &AppState, year: String) -> Result<HealthDocument, String> {
    state.core.export_backup(&year).map_err(to_client_error)
}

pub fn get_settings(state: &AppState) -> Result<DashboardSettings, String> {
    state.core.settings().map_err(to_client_error)
}

pub fn update_settings(state: &AppState, update: serde_json::Value) -> Result<DashboardSettings, String> {
    state.core.update_settings(update).map_err(to_client_error)
}

pub fn open_ranking(state: &AppState, year: String, selector: String) -> Result<RevealSnapshot, String> {
    let selector = MetricSelector::try_from(selector).map_err(to_client_error)?;
    state.core.open_ranking(&year, selector).map_err(to_client_error)
}

pub fn close_ranking(state: &AppState) -> Result<RevealSnapshot, String> {
    state.core.close_ranking().map_err(to_client_error)
}

pub fn get_reveal_state(state: &AppState) -> Result<RevealSnapshot, String> {
    state.core.reveal_snapshot().map_err(to_client_error)
}

fn init_tracing(app_data_dir: &Path) -> Result<(), String> {
    let log_dir = app_data_dir.join("logs");
    std::fs::create_dir_all(&log_dir).map_err(|error| error.to_string())?;
    let file_appender = tracing_appender::rolling::daily(log_dir, "dashboard.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(guard);

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| error.to_string())
}

fn to_client_error(error: impl std::fmt::Display) -> String {
    error.to_string()
}
