//! # Core Type Definitions
//!
//! This module contains all shared types for the Racestage classifier:
//! - Stage list (`StageSequence`)
//! - Participant input (`ParticipantRecord`, `SENTINEL`)
//! - Classification output (`ParticipantStatus`, `ClassificationResult`)
//! - Error types (`StageError`)
//!
//! ## Determinism Guarantees
//!
//! - Records are `BTreeMap`s so iteration and debug output are stable
//! - `ParticipantStatus` implements `Ord` and can key a `BTreeMap`
//! - Counters use saturating arithmetic

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

// =============================================================================
// PARTICIPANT RECORD
// =============================================================================

/// Value meaning "this stage has not been reached yet".
pub const SENTINEL: &str = "-";

/// One participant: stage name -> recorded time.
///
/// Keys that are not declared stages are allowed and ignored by the classifier.
pub type ParticipantRecord = BTreeMap<String, String>;

// =============================================================================
// STAGE SEQUENCE
// =============================================================================

/// Ordered list of unique stage names.
///
/// Fixed at construction; the order defines both classification order and
/// the set of stage buckets a counter exposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StageSequence(Vec<String>);

impl StageSequence {
    /// Build a sequence, rejecting empty lists and duplicate names.
    pub fn new<I, S>(names: I) -> Result<Self, StageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(StageError::EmptySequence);
        }

        let mut seen = BTreeSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(StageError::DuplicateStage(name.clone()));
            }
        }

        Ok(Self(names))
    }

    /// Number of declared stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when the sequence holds no stages; never the case once constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether `name` is a declared stage.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|s| s == name)
    }

    /// Iterate stage names in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Stage names as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<'de> Deserialize<'de> for StageSequence {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let names = Vec::<String>::deserialize(deserializer)?;
        Self::new(names).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// PARTICIPANT STATUS
// =============================================================================

/// Progress status of one participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParticipantStatus {
    /// Every declared stage holds the sentinel.
    Waiting,
    /// Some stages reached, not all, no violation.
    Running,
    /// Every declared stage reached, no violation.
    Finished,
    /// Missing stage, gap, or decreasing time.
    Invalid,
}

impl ParticipantStatus {
    /// All statuses in reporting order.
    pub const ALL: [ParticipantStatus; 4] = [
        ParticipantStatus::Waiting,
        ParticipantStatus::Running,
        ParticipantStatus::Finished,
        ParticipantStatus::Invalid,
    ];

    /// Wire name of the status.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            ParticipantStatus::Waiting => "WAITING",
            ParticipantStatus::Running => "RUNNING",
            ParticipantStatus::Finished => "FINISHED",
            ParticipantStatus::Invalid => "INVALID",
        }
    }
}

impl std::fmt::Display for ParticipantStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// CLASSIFICATION RESULT
// =============================================================================

/// Outcome of classifying one participant.
///
/// `stage_name` and `stage_time` name the last stage with an accepted time.
/// Both are `None` for `Waiting` and `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    pub status: ParticipantStatus,
    pub stage_name: Option<String>,
    pub stage_time: Option<String>,
}

impl ClassificationResult {
    /// A participant that has reached nothing yet.
    #[must_use]
    pub fn waiting() -> Self {
        Self {
            status: ParticipantStatus::Waiting,
            stage_name: None,
            stage_time: None,
        }
    }

    /// A rejected record.
    #[must_use]
    pub fn invalid() -> Self {
        Self {
            status: ParticipantStatus::Invalid,
            stage_name: None,
            stage_time: None,
        }
    }

    /// A participant whose latest accepted time is `time` at `stage`.
    #[must_use]
    pub fn running(stage: impl Into<String>, time: impl Into<String>) -> Self {
        Self {
            status: ParticipantStatus::Running,
            stage_name: Some(stage.into()),
            stage_time: Some(time.into()),
        }
    }

    /// The current stage name, if any.
    #[must_use]
    pub fn current_stage(&self) -> Option<&str> {
        self.stage_name.as_deref()
    }

    /// The current stage time, if any.
    #[must_use]
    pub fn current_time(&self) -> Option<&str> {
        self.stage_time.as_deref()
    }
}

impl Default for ClassificationResult {
    fn default() -> Self {
        Self::waiting()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur around the classifier.
///
/// Per-record problems are never errors: they classify as `Invalid`.
/// These variants cover construction and I/O at the edges.
#[derive(Debug, Error)]
pub enum StageError {
    /// A stage sequence must contain at least one stage.
    #[error("Stage sequence is empty")]
    EmptySequence,

    /// A stage name appears twice in the sequence.
    #[error("Duplicate stage name: {0}")]
    DuplicateStage(String),

    /// A `field:value` filter could not be parsed.
    #[error("Filter {0} is malformed")]
    InvalidFilter(String),

    /// Race data could not be fetched or parsed.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_sequence_rejects_empty() {
        let result = StageSequence::new(Vec::<String>::new());
        assert!(matches!(result, Err(StageError::EmptySequence)));
    }

    #[test]
    fn stage_sequence_rejects_duplicates() {
        let result = StageSequence::new(["raz", "dva", "raz"]);
        assert!(matches!(result, Err(StageError::DuplicateStage(name)) if name == "raz"));
    }

    #[test]
    fn stage_sequence_keeps_order() {
        let stages = StageSequence::new(["tri", "raz", "dva"]).expect("valid");
        let names: Vec<_> = stages.iter().collect();
        assert_eq!(names, vec!["tri", "raz", "dva"]);
        assert!(stages.contains("raz"));
        assert!(!stages.contains("cetyre"));
    }

    #[test]
    fn constructed_sequence_is_never_empty() {
        let stages = StageSequence::new(["raz"]).expect("valid");
        assert_eq!(stages.len(), 1);
        assert!(!stages.is_empty());
    }

    #[test]
    fn stage_sequence_deserialize_validates() {
        let ok: StageSequence = serde_json::from_str(r#"["raz","dva"]"#).expect("valid");
        assert_eq!(ok.len(), 2);

        let dup = serde_json::from_str::<StageSequence>(r#"["raz","raz"]"#);
        assert!(dup.is_err());
    }

    #[test]
    fn status_wire_names() {
        let json = serde_json::to_string(&ParticipantStatus::Finished).expect("serialize");
        assert_eq!(json, "\"FINISHED\"");
        for status in ParticipantStatus::ALL {
            assert_eq!(status.to_string(), status.name());
        }
    }

    #[test]
    fn status_ordering_matches_report_order() {
        let mut sorted = ParticipantStatus::ALL;
        sorted.sort();
        assert_eq!(sorted, ParticipantStatus::ALL);
    }
}
