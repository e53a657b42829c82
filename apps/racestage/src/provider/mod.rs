//! # Race Data Provider
//!
//! Fetches courses, splits and participant results from the timing
//! provider's HTTP API and turns them into records the core can count.
//!
//! ## Provider Endpoints
//!
//! - `GET {base}/info/json?setting=courses`
//! - `GET {base}/info/json?course=N&setting=splits`
//! - `GET {base}/result/json?course=N&splitnr=a,b&detail=start,gender,status`
//!
//! Every payload is an object with a single key holding a list.

mod client;
pub mod records;

pub use client::RaceDataClient;
pub use records::{CourseData, CourseInfo, FieldFilter, SplitData, SplitInfo};

use async_trait::async_trait;
use racestage_core::ParticipantRecord;

// =============================================================================
// ERRORS
// =============================================================================

/// Errors from the provider layer.
#[derive(Debug)]
pub enum ProviderError {
    /// Cannot reach the provider.
    ConnectionFailed(String),
    /// Provider answered with a non-success status.
    Status(u16, String),
    /// Payload is not the expected JSON shape.
    ParseError(String),
    /// Payload object had no list in it.
    EmptyPayload(String),
}

impl ProviderError {
    /// True when the data could not be fetched at all (as opposed to fetched but unusable).
    #[must_use]
    pub fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::Status(..))
    }
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConnectionFailed(url) => write!(f, "Cannot connect to provider at {url}"),
            Self::Status(status, url) => write!(f, "Provider returned {status} for {url}"),
            Self::ParseError(msg) => write!(f, "Parse error: {msg}"),
            Self::EmptyPayload(url) => write!(f, "Empty payload from {url}"),
        }
    }
}

impl std::error::Error for ProviderError {}

impl From<ProviderError> for racestage_core::StageError {
    fn from(e: ProviderError) -> Self {
        racestage_core::StageError::ProviderError(e.to_string())
    }
}

// =============================================================================
// RACE SOURCE
// =============================================================================

/// Anything that can supply race data; the HTTP client in production.
#[async_trait]
pub trait RaceSource: Send + Sync {
    /// All courses of the event.
    async fn courses(&self) -> Result<Vec<CourseData>, ProviderError>;

    /// All splits (timing points) of a course, unfiltered.
    async fn splits(&self, course: u32) -> Result<Vec<SplitData>, ProviderError>;

    /// Raw participant rows for a course at the given split numbers.
    async fn results(
        &self,
        course: u32,
        split_numbers: &[u32],
    ) -> Result<Vec<ParticipantRecord>, ProviderError>;
}
