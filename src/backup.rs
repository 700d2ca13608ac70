//! Backup documents: the JSON file a user exports and later imports to
//! restore a year's roster.

use crate::errors::{AppError, AppResult};
use crate::models::{EmployeeRecord, HealthDocument};
use crate::roster::ensure_unique_ids;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A validated import, not yet applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPayload {
    pub year: Option<String>,
    pub month_from: Option<String>,
    pub month_to: Option<String>,
    pub employees: Vec<EmployeeRecord>,
}

pub fn parse_import(raw: &str) -> AppResult<ImportPayload> {
    let document: Value = serde_json::from_str(raw)
        .map_err(|error| AppError::Validation(format!("backup file is not valid JSON: {}", error)))?;

    let Some(object) = document.as_object() else {
        return Err(AppError::Validation(
            "backup file must contain a JSON object".to_string(),
        ));
    };
    let Some(employees) = object.get("employees") else {
        return Err(AppError::Validation(
            "backup file has no 'employees' list".to_string(),
        ));
    };
    let Some(entries) = employees.as_array() else {
        return Err(AppError::Validation(
            "'employees' must be an array".to_string(),
        ));
    };

    let employees = entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            serde_json::from_value::<EmployeeRecord>(entry.clone()).map_err(|error| {
                AppError::Validation(format!("employee #{} is malformed: {}", index + 1, error))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;
    ensure_unique_ids(&employees)?;

    Ok(ImportPayload {
        year: optional_text(object.get("year")),
        month_from: optional_text(object.get("monthFrom")),
        month_to: optional_text(object.get("monthTo")),
        employees,
    })
}

pub fn build_export(
    year: &str,
    month_from: &str,
    month_to: &str,
    employees: Vec<EmployeeRecord>,
    export_date: DateTime<Utc>,
) -> HealthDocument {
    HealthDocument {
        year: year.to_string(),
        month_from: month_from.to_string(),
        month_to: month_to.to_string(),
        employees,
        export_date,
    }
}

// Empty strings count as absent, as does any non-string value other than a
// plain number (years are sometimes written unquoted).
fn optional_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricKey;
    use chrono::TimeZone;

    #[test]
    fn accepts_exported_shape_and_preserves_order() {
        let raw = serde_json::json!({
            "year": "2569",
            "monthFrom": "January",
            "monthTo": "June",
            "employees": [
                { "id": "x", "name": "A", "company": "C",
                  "weight": { "month1": 80, "month2": 75 },
                  "bmi": { "month1": 0, "month2": 0 } },
                { "id": "y", "name": "B", "company": "C" }
            ],
            "exportDate": "2026-01-01T00:00:00Z"
        })
        .to_string();

        let payload = parse_import(&raw).expect("valid import");
        assert_eq!(payload.year.as_deref(), Some("2569"));
        assert_eq!(payload.month_to.as_deref(), Some("June"));
        let ids = payload.employees.iter().map(|e| e.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["x", "y"]);
        assert_eq!(payload.employees[0].metric(MetricKey::Weight).month2, 75.0);
    }

    #[test]
    fn optional_header_fields_may_be_missing() {
        let payload = parse_import(r#"{ "employees": [], "year": 2570 }"#).expect("valid");
        assert_eq!(payload.year.as_deref(), Some("2570"));
        assert!(payload.month_from.is_none());
        assert!(payload.employees.is_empty());
    }

    #[test]
    fn rejects_documents_without_an_employee_array() {
        for raw in [
            "{ nope",
            "[]",
            r#"{ "year": "2568" }"#,
            r#"{ "employees": { "id": "x" } }"#,
            r#"{ "employees": [ { "name": "no id" } ] }"#,
            r#"{ "employees": [ { "id": "a" }, { "id": "a" } ] }"#,
        ] {
            let error = parse_import(raw).expect_err(raw);
            assert!(matches!(error, AppError::Validation(_)), "{}", raw);
        }
    }

    #[test]
    fn export_carries_selection_and_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 10, 16, 8, 30, 0).unwrap();
        let document = build_export("2568", "September", "December", Vec::new(), at);
        let value = serde_json::to_value(&document).expect("serialize");
        assert_eq!(value["monthFrom"], "September");
        assert_eq!(value["exportDate"], "2026-10-16T08:30:00Z");
        assert!(value["employees"].as_array().expect("array").is_empty());
    }
}
