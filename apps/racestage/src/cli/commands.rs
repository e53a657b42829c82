//! # CLI Command Implementations

use crate::api::{self, AppState};
use crate::chart::build_chart;
use crate::config::RacestageConfig;
use crate::provider::{FieldFilter, RaceDataClient, RaceSource, records};
use racestage_core::{ParticipantRecord, StageError, StageReport, StageSequence};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

// =============================================================================
// FILE SIZE LIMITS
// =============================================================================

/// Maximum size of a results file (100 MB).
const MAX_REPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate that `path` is a regular file no larger than `max_size`.
fn validate_input_file(path: &Path, max_size: u64) -> Result<(), StageError> {
    let metadata = std::fs::metadata(path).map_err(|e| {
        StageError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !metadata.is_file() {
        return Err(StageError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    if metadata.len() > max_size {
        return Err(StageError::SerializationError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

fn create_client(config: &RacestageConfig) -> Result<RaceDataClient, StageError> {
    Ok(RaceDataClient::new(
        config.data_api.base_url.clone(),
        config.data_api.timeout(),
    )?)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), StageError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| StageError::SerializationError(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

/// Print a report as a two-part table.
fn print_report(report: &StageReport) {
    println!("Stages");
    println!("======");
    for tally in &report.stages {
        println!("  {:<24} {}", tally.stage_name, tally.num_runners);
    }
    println!();
    println!("Statuses");
    println!("========");
    for tally in &report.states {
        println!("  {:<24} {}", tally.status_name.name(), tally.num_runners);
    }
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    config: &RacestageConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), StageError> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let client = create_client(config)?;

    println!("Racestage Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Data API: {}", client.base_url());
    println!();
    println!("Endpoints:");
    println!("  GET  /health   - Health check");
    println!("  GET  /courses  - List courses");
    println!("  GET  /splits   - List splits of a course");
    println!("  GET  /chart    - Stage and status counts of a course");
    println!("  POST /report   - Stage and status counts of posted records");
    println!("  POST /classify - Classify one record");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let state = AppState::new(Arc::new(client), config.splits);
    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, state).await
}

// =============================================================================
// REPORT COMMAND
// =============================================================================

/// Read a results file: `{ "<key>": [ {..}, .. ] }` or a bare list of records.
///
/// Rows keep the file's key order.
pub fn load_rows(path: &Path) -> Result<Vec<Map<String, Value>>, StageError> {
    validate_input_file(path, MAX_REPORT_FILE_SIZE)?;

    let text = std::fs::read_to_string(path)
        .map_err(|e| StageError::IoError(format!("Cannot read '{}': {}", path.display(), e)))?;
    let payload: Value = serde_json::from_str(&text)
        .map_err(|e| StageError::SerializationError(format!("Invalid JSON: {}", e)))?;

    let rows = match payload {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.into_iter().next() {
            Some((_, Value::Array(rows))) => rows,
            _ => {
                return Err(StageError::SerializationError(
                    "Expected an object holding a list of records".to_string(),
                ));
            }
        },
        _ => {
            return Err(StageError::SerializationError(
                "Expected a list of records".to_string(),
            ));
        }
    };

    rows.into_iter()
        .map(|row| match row {
            Value::Object(fields) => Ok(fields),
            other => Err(StageError::SerializationError(format!(
                "Record is not an object: {}",
                other
            ))),
        })
        .collect()
}

/// Stage names from `--stages`, or the `_Time` columns of the first row.
///
/// A first row with no `_Time` columns contributes all its keys.
fn resolve_stages(
    stages: Option<&str>,
    rows: &[Map<String, Value>],
) -> Result<StageSequence, StageError> {
    match (stages, rows.first()) {
        (Some(list), _) => {
            StageSequence::new(list.split(',').map(str::trim).filter(|s| !s.is_empty()))
        }
        (None, Some(first)) => {
            let timed: Vec<String> = first
                .keys()
                .filter_map(|k| k.strip_suffix(records::TIME_SUFFIX))
                .map(str::to_string)
                .collect();
            if timed.is_empty() {
                StageSequence::new(first.keys().cloned())
            } else {
                StageSequence::new(timed)
            }
        }
        (None, None) => Err(StageError::EmptySequence),
    }
}

/// Count participants from a local results file.
pub fn cmd_report(
    path: &Path,
    stages: Option<&str>,
    filter: &str,
    json_mode: bool,
) -> Result<(), StageError> {
    let filter = FieldFilter::parse(filter)?;
    let report = report_from_file(path, stages, &filter)?;

    if json_mode {
        return print_json(&report);
    }
    println!("Racestage Report: {}", path.display());
    println!();
    print_report(&report);
    Ok(())
}

/// Load a results file, prepare its rows like live results and count them.
pub fn report_from_file(
    path: &Path,
    stages: Option<&str>,
    filter: &FieldFilter,
) -> Result<StageReport, StageError> {
    let rows = load_rows(path)?;
    let stages = resolve_stages(stages, &rows)?;
    tracing::info!("processing {} records from {}", rows.len(), path.display());

    let raw: Vec<ParticipantRecord> = rows.into_iter().map(records::record_from_json).collect();
    let prepared = records::prepare_records(raw, filter);
    Ok(records::count_records(stages, &prepared))
}

// =============================================================================
// PROVIDER COMMANDS
// =============================================================================

/// List courses.
pub async fn cmd_courses(config: &RacestageConfig, json_mode: bool) -> Result<(), StageError> {
    let client = create_client(config)?;
    let courses = records::course_infos(client.courses().await?)?;

    if json_mode {
        return print_json(&courses);
    }
    println!("Courses");
    println!("=======");
    for course in &courses {
        println!("  {:>6}  {}", course.course_id, course.course_name);
    }
    Ok(())
}

/// List stage splits of a course.
pub async fn cmd_splits(
    config: &RacestageConfig,
    course: u32,
    json_mode: bool,
) -> Result<(), StageError> {
    let client = create_client(config)?;
    let splits = records::select_splits(client.splits(course).await?, config.splits)?;

    if json_mode {
        return print_json(&splits);
    }
    println!("Splits of course {}", course);
    println!("==================");
    for split in &splits {
        println!("  {:>6}  {}", split.split_id, split.split_name);
    }
    Ok(())
}

/// Count participants of a course from the provider.
pub async fn cmd_chart(
    config: &RacestageConfig,
    course: u32,
    filter: &str,
    json_mode: bool,
) -> Result<(), StageError> {
    let filter = FieldFilter::parse(filter)?;
    let client = create_client(config)?;
    let report = build_chart(&client, course, &filter, config.splits).await?;

    if json_mode {
        return print_json(&report);
    }
    println!("Racestage Chart: course {}", course);
    println!();
    print_report(&report);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_is_not_a_record_list() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.json");
        std::fs::write(&path, "{}").expect("write");

        assert!(matches!(
            load_rows(&path),
            Err(StageError::SerializationError(_))
        ));
    }

    #[test]
    fn explicit_stages_are_trimmed() {
        let stages = resolve_stages(Some("raz, dva ,tri"), &[]).expect("stages");
        let names: Vec<_> = stages.iter().collect();
        assert_eq!(names, vec!["raz", "dva", "tri"]);
    }

    #[test]
    fn no_rows_and_no_stages_is_empty_sequence() {
        assert!(matches!(
            resolve_stages(None, &[]),
            Err(StageError::EmptySequence)
        ));
    }

    #[test]
    fn default_stages_come_from_time_columns() {
        let row: Map<String, Value> = serde_json::from_str(
            r#"{"bib": "7", "Raz_Time": "10:00", "status": "-", "Dva_Time": "-"}"#,
        )
        .expect("row");
        let stages = resolve_stages(None, &[row]).expect("stages");
        let names: Vec<_> = stages.iter().collect();
        assert_eq!(names, vec!["Raz", "Dva"]);
    }

    #[test]
    fn directory_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            validate_input_file(dir.path(), MAX_REPORT_FILE_SIZE),
            Err(StageError::IoError(_))
        ));
    }
}
