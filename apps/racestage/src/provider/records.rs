//! # Provider Records
//!
//! Provider payload types and the steps that turn raw result rows into
//! participant records:
//!
//! 1. drop participants whose `status` is set (disqualified, did not start)
//! 2. strip the `_Time` suffix from split columns
//! 3. apply the optional `field:value` filter

use crate::config::SplitRange;
use racestage_core::{
    ParticipantRecord, SENTINEL, StageCounter, StageError, StageReport, StageSequence,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Suffix the provider appends to split time columns.
pub const TIME_SUFFIX: &str = "_Time";

/// Column holding the participant's race status.
const STATUS_FIELD: &str = "status";

// =============================================================================
// PROVIDER PAYLOADS
// =============================================================================

/// A split as listed by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct SplitData {
    #[serde(rename = "Splitnr", alias = "splitnr")]
    pub splitnr: String,
    #[serde(rename = "Splitname", alias = "splitname")]
    pub splitname: String,
}

/// A course as listed by the provider.
#[derive(Debug, Clone, Deserialize)]
pub struct CourseData {
    #[serde(rename = "Coursenr", alias = "coursenr")]
    pub coursenr: String,
    #[serde(rename = "Coursename", alias = "coursename")]
    pub coursename: String,
}

/// A split as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInfo {
    #[serde(rename = "splitName")]
    pub split_name: String,
    #[serde(rename = "splitID")]
    pub split_id: u32,
}

/// A course as served to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    #[serde(rename = "courseName")]
    pub course_name: String,
    #[serde(rename = "courseID")]
    pub course_id: u32,
}

fn parse_number(raw: &str, what: &str) -> Result<u32, StageError> {
    raw.trim()
        .parse()
        .map_err(|_| StageError::ProviderError(format!("{what} number '{raw}' is not a number")))
}

/// Convert provider courses, failing on a non-numeric course number.
pub fn course_infos(courses: Vec<CourseData>) -> Result<Vec<CourseInfo>, StageError> {
    courses
        .into_iter()
        .map(|c| {
            Ok(CourseInfo {
                course_id: parse_number(&c.coursenr, "course")?,
                course_name: c.coursename,
            })
        })
        .collect()
}

/// Keep the splits inside `range`, in provider order.
pub fn select_splits(
    splits: Vec<SplitData>,
    range: SplitRange,
) -> Result<Vec<SplitInfo>, StageError> {
    let mut selected = Vec::new();
    for split in splits {
        let number = parse_number(&split.splitnr, "split")?;
        if range.contains(number) {
            selected.push(SplitInfo {
                split_name: split.splitname,
                split_id: number,
            });
        }
    }
    Ok(selected)
}

/// Flatten a JSON row into a string record.
///
/// Strings are kept as is, `null` becomes an empty string, anything else
/// its JSON text.
pub fn record_from_json(row: Map<String, Value>) -> ParticipantRecord {
    row.into_iter()
        .map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            (key, text)
        })
        .collect()
}

// =============================================================================
// FIELD FILTER
// =============================================================================

/// `field:value` participant filter; `all:all` keeps everyone.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldFilter {
    #[default]
    All,
    Field { name: String, value: String },
}

impl FieldFilter {
    /// Parse `field:value`.
    pub fn parse(raw: &str) -> Result<Self, StageError> {
        if raw == "all:all" {
            return Ok(Self::All);
        }

        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(value), None) => Ok(Self::Field {
                name: name.to_string(),
                value: value.to_string(),
            }),
            _ => Err(StageError::InvalidFilter(raw.to_string())),
        }
    }

    /// Whether `record` passes the filter. A missing field never matches.
    #[must_use]
    pub fn matches(&self, record: &ParticipantRecord) -> bool {
        match self {
            Self::All => true,
            Self::Field { name, value } => record.get(name) == Some(value),
        }
    }
}

// =============================================================================
// RECORD PREPARATION
// =============================================================================

/// A participant without a status, or with status `"-"`, is still in the race.
fn is_active(record: &ParticipantRecord) -> bool {
    record
        .get(STATUS_FIELD)
        .is_none_or(|status| status == SENTINEL)
}

/// Rename `<stage>_Time` columns to `<stage>`.
///
/// A time column wins over a plain column of the same name; the plain
/// value is logged and dropped.
fn strip_time_suffix(record: ParticipantRecord) -> ParticipantRecord {
    let mut stripped = ParticipantRecord::new();
    let mut timed = Vec::new();
    for (key, value) in record {
        match key.strip_suffix(TIME_SUFFIX) {
            Some(stage) => timed.push((stage.to_string(), value)),
            None => {
                stripped.insert(key, value);
            }
        }
    }

    for (stage, time) in timed {
        if let Some(shadowed) = stripped.insert(stage.clone(), time) {
            tracing::warn!(
                stage = %stage,
                shadowed = %shadowed,
                "time column replaces a column of the same name"
            );
        }
    }
    stripped
}

/// Turn raw provider rows into the records to count.
pub fn prepare_records(
    rows: Vec<ParticipantRecord>,
    filter: &FieldFilter,
) -> Vec<ParticipantRecord> {
    let total = rows.len();
    let prepared: Vec<ParticipantRecord> = rows
        .into_iter()
        .filter(is_active)
        .map(strip_time_suffix)
        .filter(|record| filter.matches(record))
        .collect();

    if *filter != FieldFilter::All {
        tracing::info!(
            "filtered data with {:?}, {} of {} records matched",
            filter,
            prepared.len(),
            total
        );
    }
    prepared
}

/// First stage whose time width differs from the record's first time.
///
/// Times are ordered as strings, so `9:05` vs `10:00` would compare wrong.
pub fn mixed_width_stage<'a>(
    stages: &'a StageSequence,
    record: &ParticipantRecord,
) -> Option<&'a str> {
    let mut width = None;
    for stage in stages.iter() {
        let Some(time) = record.get(stage).filter(|t| t.as_str() != SENTINEL) else {
            continue;
        };
        match width {
            None => width = Some(time.len()),
            Some(w) if w != time.len() => return Some(stage),
            Some(_) => {}
        }
    }
    None
}

/// Count prepared records into a report, warning about mixed-width times.
pub fn count_records(stages: StageSequence, records: &[ParticipantRecord]) -> StageReport {
    for record in records {
        if let Some(stage) = mixed_width_stage(&stages, record) {
            tracing::warn!(
                record = ?record,
                stage,
                "time width differs from earlier stages; ordering may be wrong"
            );
        }
    }

    let counter = StageCounter::from_records(stages, records);
    tracing::info!("counted {} participants", counter.total());
    counter.report()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use racestage_core::ParticipantStatus;
    use serde_json::json;
    use std::io::Write;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::fmt::MakeWriter;

    /// In-memory log sink; one JSON event per line.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    /// Run `f` and return the warn-level events it emitted.
    fn capture_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<Value>) {
        let sink = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(sink.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();
        let out = tracing::subscriber::with_default(subscriber, f);

        let bytes = sink.0.lock().unwrap_or_else(|e| e.into_inner()).clone();
        let events = String::from_utf8_lossy(&bytes)
            .lines()
            .map(|line| serde_json::from_str(line).expect("json event"))
            .collect();
        (out, events)
    }

    fn record(pairs: &[(&str, &str)]) -> ParticipantRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn split(number: &str, name: &str) -> SplitData {
        SplitData {
            splitnr: number.to_string(),
            splitname: name.to_string(),
        }
    }

    #[test]
    fn filter_parse() {
        assert_eq!(FieldFilter::parse("all:all").expect("parse"), FieldFilter::All);
        assert_eq!(
            FieldFilter::parse("gender:W").expect("parse"),
            FieldFilter::Field {
                name: "gender".to_string(),
                value: "W".to_string()
            }
        );
        assert!(matches!(
            FieldFilter::parse("gender"),
            Err(StageError::InvalidFilter(_))
        ));
        assert!(FieldFilter::parse("a:b:c").is_err());
    }

    #[test]
    fn filter_missing_field_does_not_match() {
        let filter = FieldFilter::parse("gender:M").expect("parse");
        assert!(filter.matches(&record(&[("gender", "M")])));
        assert!(!filter.matches(&record(&[("gender", "W")])));
        assert!(!filter.matches(&record(&[("start", "1")])));
    }

    #[test]
    fn prepare_drops_inactive_and_strips_suffix() {
        let rows = vec![
            record(&[("raz_Time", "10:00"), ("status", "-")]),
            record(&[("raz_Time", "10:05"), ("status", "DNF")]),
            record(&[("raz_Time", "-")]),
        ];
        let prepared = prepare_records(rows, &FieldFilter::All);

        assert_eq!(prepared.len(), 2);
        assert_eq!(prepared[0].get("raz").map(String::as_str), Some("10:00"));
        assert!(!prepared[0].contains_key("raz_Time"));
    }

    #[test]
    fn prepare_filters_after_stripping() {
        let rows = vec![
            record(&[("raz_Time", "10:00"), ("gender", "W")]),
            record(&[("raz_Time", "10:01"), ("gender", "M")]),
        ];
        let prepared = prepare_records(rows, &FieldFilter::parse("gender:M").expect("parse"));

        assert_eq!(prepared.len(), 1);
        assert_eq!(prepared[0].get("raz").map(String::as_str), Some("10:01"));
    }

    #[test]
    fn filter_on_clock_time_is_malformed() {
        assert!(matches!(
            FieldFilter::parse("raz:10:00"),
            Err(StageError::InvalidFilter(raw)) if raw == "raz:10:00"
        ));
    }

    #[test]
    fn select_splits_in_range() {
        let splits = vec![
            split("1", "Start"),
            split("101", "raz"),
            split("102", "dva"),
            split("1000", "Finish"),
        ];
        let selected = select_splits(splits, SplitRange::default()).expect("select");
        let names: Vec<_> = selected.iter().map(|s| s.split_name.as_str()).collect();
        assert_eq!(names, vec!["raz", "dva"]);
        assert_eq!(selected[0].split_id, 101);
    }

    #[test]
    fn select_splits_rejects_garbage_number() {
        let splits = vec![split("x1", "raz")];
        assert!(select_splits(splits, SplitRange::default()).is_err());
    }

    #[test]
    fn provider_payloads_deserialize() {
        let split: SplitData = serde_json::from_value(json!({
            "Splitnr": "101", "Splitname": "raz", "ID": "7", "State": "1", "ToD": "0"
        }))
        .expect("split");
        assert_eq!(split.splitname, "raz");

        let courses = course_infos(vec![
            serde_json::from_value(json!({"Coursenr": "3", "Coursename": "Marathon"}))
                .expect("course"),
        ])
        .expect("courses");
        assert_eq!(courses[0].course_id, 3);

        let json = serde_json::to_string(&courses[0]).expect("serialize");
        assert_eq!(json, r#"{"courseName":"Marathon","courseID":3}"#);
    }

    #[test]
    fn json_rows_become_string_records() {
        let Value::Object(row) = json!({"raz_Time": "10:00", "start": 12, "gender": null}) else {
            unreachable!("literal is an object")
        };
        let record = record_from_json(row);
        assert_eq!(record.get("start").map(String::as_str), Some("12"));
        assert_eq!(record.get("gender").map(String::as_str), Some(""));
    }

    #[test]
    fn mixed_width_is_detected() {
        let stages = StageSequence::new(["raz", "dva", "tri"]).expect("stages");

        let mixed = record(&[("raz", "9:05"), ("dva", "-"), ("tri", "10:00")]);
        assert_eq!(mixed_width_stage(&stages, &mixed), Some("tri"));

        let padded = record(&[("raz", "09:05"), ("dva", "10:00"), ("tri", "-")]);
        assert_eq!(mixed_width_stage(&stages, &padded), None);
    }

    #[test]
    fn count_records_builds_report() {
        let stages = StageSequence::new(["raz", "dva"]).expect("stages");
        let records = vec![
            record(&[("raz", "10:00"), ("dva", "-")]),
            record(&[("raz", "10:00"), ("dva", "11:00")]),
        ];
        let report = count_records(stages, &records);
        assert_eq!(report.stage("raz"), 1);
        assert_eq!(report.status(ParticipantStatus::Finished), 1);
    }

    #[test]
    fn time_column_wins_over_plain_column() {
        let rows = vec![record(&[("Raz", "-"), ("Raz_Time", "10:00")])];

        let (prepared, events) = capture_warnings(|| prepare_records(rows, &FieldFilter::All));

        assert_eq!(prepared, vec![record(&[("Raz", "10:00")])]);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["fields"]["stage"], "Raz");
        assert_eq!(events[0]["fields"]["shadowed"], "-");
    }

    #[test]
    fn plain_columns_without_twin_are_silent() {
        let rows = vec![record(&[("Raz_Time", "10:00"), ("gender", "W")])];

        let (prepared, events) = capture_warnings(|| prepare_records(rows, &FieldFilter::All));

        assert_eq!(prepared, vec![record(&[("Raz", "10:00"), ("gender", "W")])]);
        assert!(events.is_empty());
    }

    #[test]
    fn count_records_warns_on_mixed_width() {
        let stages = StageSequence::new(["raz", "dva"]).expect("stages");
        let records = vec![
            record(&[("raz", "9:05"), ("dva", "9:10:00")]),
            record(&[("raz", "09:05"), ("dva", "10:00")]),
        ];

        let (report, events) = capture_warnings(|| count_records(stages, &records));

        assert_eq!(report.status(ParticipantStatus::Finished), 2);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["level"], "WARN");
        assert_eq!(events[0]["fields"]["stage"], "dva");
        let logged = events[0]["fields"]["record"].as_str().expect("record field");
        assert!(logged.contains("9:10:00"));
    }
}
