//! # Stage Report
//!
//! Serializable snapshot of a [`StageCounter`](crate::StageCounter).
//!
//! Field names are camelCase on the wire:
//!
//! ```json
//! {
//!   "stages": [{ "stageName": "raz", "numRunners": 1 }],
//!   "states": [{ "statusName": "WAITING", "numRunners": 1 }]
//! }
//! ```

use crate::types::ParticipantStatus;
use serde::{Deserialize, Serialize};

/// Runners currently between `stage_name` and the next stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTally {
    pub stage_name: String,
    pub num_runners: u64,
}

impl StageTally {
    #[must_use]
    pub fn new(stage_name: impl Into<String>, num_runners: u64) -> Self {
        Self {
            stage_name: stage_name.into(),
            num_runners,
        }
    }
}

/// Participants classified with `status_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusTally {
    pub status_name: ParticipantStatus,
    pub num_runners: u64,
}

impl StatusTally {
    #[must_use]
    pub fn new(status_name: ParticipantStatus, num_runners: u64) -> Self {
        Self {
            status_name,
            num_runners,
        }
    }
}

/// Per-stage and per-status counts for one race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub stages: Vec<StageTally>,
    pub states: Vec<StatusTally>,
}

impl StageReport {
    /// Count for a status, 0 if absent from the report.
    #[must_use]
    pub fn status(&self, status: ParticipantStatus) -> u64 {
        self.states
            .iter()
            .find(|t| t.status_name == status)
            .map(|t| t.num_runners)
            .unwrap_or(0)
    }

    /// Count for a stage, 0 if absent from the report.
    #[must_use]
    pub fn stage(&self, stage_name: &str) -> u64 {
        self.stages
            .iter()
            .find(|t| t.stage_name == stage_name)
            .map(|t| t.num_runners)
            .unwrap_or(0)
    }
}
