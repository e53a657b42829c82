//! # API Request/Response Types
//!
//! JSON structures for the HTTP API. Report bodies reuse
//! [`StageReport`](racestage_core::StageReport) directly.

use racestage_core::{
    ClassificationResult, Diagnostic, ParticipantRecord, ParticipantStatus, StageSequence,
};
use serde::{Deserialize, Serialize};

/// Largest participant list accepted by `POST /report`.
pub const MAX_REPORT_PARTICIPANTS: usize = 100_000;

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// ERROR RESPONSE
// =============================================================================

/// Body of every non-2xx answer produced by a handler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// `GET /splits?course=N`
#[derive(Debug, Clone, Deserialize)]
pub struct SplitsParams {
    pub course: u32,
}

/// `GET /chart?course=N&filter=field:value`
#[derive(Debug, Clone, Deserialize)]
pub struct ChartParams {
    pub course: u32,
    #[serde(default = "default_filter")]
    pub filter: String,
}

fn default_filter() -> String {
    "all:all".to_string()
}

// =============================================================================
// REPORT REQUEST
// =============================================================================

/// Offline report: stages and already-prepared records in one body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub stages: StageSequence,
    pub participants: Vec<ParticipantRecord>,
}

// =============================================================================
// CLASSIFY REQUEST/RESPONSE
// =============================================================================

/// Classify a single record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub stages: StageSequence,
    pub record: ParticipantRecord,
}

/// One classification with its human-readable diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifyResponse {
    pub status: ParticipantStatus,
    pub stage_name: Option<String>,
    pub stage_time: Option<String>,
    pub diagnostic: String,
}

impl ClassifyResponse {
    pub fn new(result: ClassificationResult, diagnostic: &Diagnostic) -> Self {
        Self {
            status: result.status,
            stage_name: result.stage_name,
            stage_time: result.stage_time,
            diagnostic: diagnostic.to_string(),
        }
    }
}
