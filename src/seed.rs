use crate::models::{EmployeeRecord, MetricKey, MetricValue};

pub const SEED_YEAR: &str = "2568";
const SEED_COMPANY: &str = "Chaophraya Tourist Boat";

// Screening results per employee, in `MetricKey::ALL` order.
const SEED_ROWS: [(&str, [(f64, f64); 6]); 15] = [
    ("1", [(71.4, 0.0), (23.3, 0.0), (21.2, 0.0), (14.7, 0.0), (33.5, 0.0), (7.5, 0.0)]),
    ("2", [(47.8, 47.0), (18.9, 18.6), (28.4, 28.9), (22.2, 22.2), (26.0, 25.8), (2.0, 2.0)]),
    ("3", [(62.2, 60.0), (24.6, 23.7), (33.9, 32.2), (29.1, 27.6), (24.1, 24.8), (6.5, 5.5)]),
    ("4", [(74.9, 71.2), (28.5, 27.1), (36.4, 35.3), (33.2, 31.6), (23.8, 24.1), (9.0, 8.0)]),
    ("5", [(72.2, 74.0), (28.6, 29.3), (34.9, 33.9), (32.5, 32.5), (24.4, 25.3), (9.0, 9.5)]),
    ("6", [(78.7, 75.5), (32.8, 31.8), (15.0, 39.9), (37.9, 37.4), (22.1, 21.7), (15.0, 14.0)]),
    ("7", [(50.8, 50.9), (19.8, 19.9), (28.9, 27.9), (23.2, 22.7), (25.7, 26.1), (3.0, 3.0)]),
    ("8", [(55.5, 54.4), (18.2, 17.8), (12.7, 12.2), (11.7, 11.2), (36.0, 35.8), (0.5, 0.5)]),
    ("9", [(50.1, 50.0), (18.6, 18.5), (25.3, 21.0), (20.5, 20.0), (27.5, 27.6), (2.0, 2.0)]),
    ("10", [(73.1, 75.3), (25.6, 26.4), (27.9, 27.4), (19.3, 19.0), (30.7, 30.8), (9.5, 10.5)]),
    ("11", [(95.6, 85.2), (33.5, 29.5), (40.4, 36.6), (38.8, 34.0), (22.8, 24.5), (15.0, 10.0)]),
    ("12", [(101.0, 106.8), (34.9, 37.4), (34.5, 36.2), (24.9, 26.3), (27.7, 26.8), (20.0, 23.0)]),
    ("13", [(47.5, 46.2), (20.0, 19.0), (21.4, 20.5), (19.5, 18.3), (28.7, 29.0), (2.5, 2.0)]),
    ("14", [(76.2, 74.4), (30.5, 29.8), (38.4, 38.6), (35.6, 35.2), (23.0, 22.6), (13.5, 13.0)]),
    ("15", [(93.4, 91.4), (35.6, 31.3), (35.3, 28.3), (36.8, 20.4), (23.6, 30.3), (16.5, 18.0)]),
];

/// Roster shipped for the first year when nothing has been saved yet.
pub fn initial_roster() -> Vec<EmployeeRecord> {
    SEED_ROWS
        .iter()
        .map(|(id, values)| {
            let mut record = EmployeeRecord::new(*id, format!("Employee {:0>2}", id), SEED_COMPANY);
            for (key, (month1, month2)) in MetricKey::ALL.into_iter().zip(values.iter()) {
                *record.metric_mut(key) = MetricValue::new(*month1, *month2);
            }
            record
        })
        .collect()
}
