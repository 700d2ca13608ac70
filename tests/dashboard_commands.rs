use health_dashboard_lib::models::{MetricKey, MonthField, ProfileField, RosterPageRequest, UpdateFieldPayload, UpdateMetricPayload};
use health_dashboard_lib::reveal::RevealPhase;
use health_dashboard_lib::{bootstrap, AppState};
use std::time::Duration;

fn open(dir: &tempfile::TempDir) -> AppState {
    bootstrap(dir.path().join("app-data")).expect("bootstrap")
}

#[test]
fn fresh_install_starts_locked_with_seed_year() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = open(&dir);

    assert!(health_dashboard_lib::get_lock(&state).expect("lock"));
    assert_eq!(health_dashboard_lib::list_years(&state).expect("years"), vec!["2568".to_string()]);
    let roster = health_dashboard_lib::get_roster(&state, "2568".into()).expect("roster");
    assert_eq!(roster.len(), 15);
    assert!(dir.path().join("app-data").join("state.sqlite").exists());
}

#[test]
fn edits_are_ignored_while_locked_and_applied_after_unlock() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = open(&dir);
    let before = health_dashboard_lib::get_roster(&state, "2568".into()).expect("roster");
    let id = before[0].id.clone();

    let after = health_dashboard_lib::update_employee_field(
        &state,
        UpdateFieldPayload {
            year: "2568".into(),
            id: id.clone(),
            field: ProfileField::Name,
            value: "Renamed".into(),
        },
    )
    .expect("locked edit is a no-op");
    assert_eq!(after, before);

    assert!(!health_dashboard_lib::set_lock(&state, false).expect("unlock"));

    let after = health_dashboard_lib::update_metric_value(
        &state,
        UpdateMetricPayload {
            year: "2568".into(),
            id: id.clone(),
            key: MetricKey::Weight,
            field: MonthField::Month2,
            value: "  68.4kg".into(),
        },
    )
    .expect("edit");
    let edited = after.iter().find(|record| record.id == id).expect("record");
    assert_eq!(edited.weight.month2, 68.4);

    let added = health_dashboard_lib::add_employee(&state, "2568".into()).expect("add");
    assert_eq!(added.len(), 16);
    assert_eq!(added[0].name, "New Employee 16");
    let remaining = health_dashboard_lib::delete_employee(&state, "2568".into(), added[0].id.clone()).expect("delete");
    assert_eq!(remaining.len(), 15);
}

#[test]
fn search_pages_and_rankings() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = open(&dir);

    let page = health_dashboard_lib::get_roster_page(
        &state,
        RosterPageRequest {
            year: "2568".into(),
            search: "employee 1".into(),
            page: 1,
        },
    )
    .expect("page");
    assert_eq!(page.total_records, 6);
    assert_eq!(page.total_pages, 1);

    let overall = health_dashboard_lib::get_ranking(&state, "2568".into(), "overall".into()).expect("ranking");
    assert_eq!(overall.len(), 10);
    assert!(overall.windows(2).all(|pair| pair[0].progress_value >= pair[1].progress_value));
    assert_eq!(overall.iter().map(|entry| entry.rank).collect::<Vec<_>>(), (1..=10).collect::<Vec<_>>());

    let error = health_dashboard_lib::get_ranking(&state, "2568".into(), "height".into()).expect_err("unknown");
    assert!(error.contains("height"));

    let error = health_dashboard_lib::get_success_score(&state, "2568".into(), "missing".into()).expect_err("missing");
    assert!(error.starts_with("NOT_FOUND"));
}

#[test]
fn backup_round_trip_through_commands() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = open(&dir);

    let exported = health_dashboard_lib::export_backup(&state, "2568".into()).expect("export");
    let raw = serde_json::to_string(&exported).expect("encode");

    let error = health_dashboard_lib::import_backup(&state, raw.clone()).expect_err("locked");
    assert!(error.starts_with("LOCKED"));

    health_dashboard_lib::set_lock(&state, false).expect("unlock");
    let outcome = health_dashboard_lib::import_backup(&state, raw).expect("import");
    assert_eq!(outcome.year, "2568");
    assert_eq!(outcome.imported, 15);
    assert_eq!(outcome.month_from.as_deref(), Some("September"));

    let error = health_dashboard_lib::import_backup(&state, "{\"employees\": 3}".into()).expect_err("invalid");
    assert!(error.starts_with("VALIDATION_FAILED"));
}

#[test]
fn settings_updates_are_validated() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = open(&dir);

    let settings = health_dashboard_lib::update_settings(&state, serde_json::json!({ "pageSize": 5 })).expect("update");
    assert_eq!(settings.page_size, 5);
    let page = health_dashboard_lib::get_roster_page(
        &state,
        RosterPageRequest {
            year: "2568".into(),
            search: String::new(),
            page: 9,
        },
    )
    .expect("page");
    assert_eq!(page.page, 3);
    assert_eq!(page.start_index, 10);

    let error = health_dashboard_lib::update_settings(&state, serde_json::json!({ "rankingLimit": 0 })).expect_err("zero");
    assert!(error.starts_with("VALIDATION_FAILED"));
    assert_eq!(health_dashboard_lib::get_settings(&state).expect("settings").ranking_limit, 10);
}

#[tokio::test(start_paused = true)]
async fn ranking_reveal_runs_to_the_champion() {
    let dir = tempfile::tempdir().expect("tempdir");
    let state = open(&dir);
    let mut events = state.core.subscribe_reveal();

    let started = health_dashboard_lib::open_ranking(&state, "2568".into(), "bmi".into()).expect("open");
    assert_eq!(started.phase, RevealPhase::Shuffling);
    assert!(started.visible_entries().is_empty());

    tokio::time::sleep(Duration::from_secs(12)).await;
    let finished = health_dashboard_lib::get_reveal_state(&state).expect("state");
    assert_eq!(finished.phase, RevealPhase::RevealingChampion);
    assert_eq!(finished.sequence_id, started.sequence_id);
    assert!(events.try_recv().is_ok());

    let closed = health_dashboard_lib::close_ranking(&state).expect("close");
    assert_eq!(closed.phase, RevealPhase::Idle);
    assert!(closed.entries.is_empty());
}
