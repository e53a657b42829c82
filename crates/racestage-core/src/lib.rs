//! # racestage-core
//!
//! Participant classification and stage counting for Racestage - THE LOGIC.
//!
//! Given the ordered checkpoints of a race and, per participant, the time
//! recorded at each checkpoint (or `"-"` if not reached yet), this crate
//! decides whether the participant is waiting, running, finished or has an
//! inconsistent record, and counts participants per status and per stage.
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Consumes already-parsed string records; fetching and parsing live in the app
//! - Classification never fails: bad records become `ParticipantStatus::Invalid`
//! - A `StageCounter` is owned by exactly one report
//!
//! ## Example
//!
//! ```
//! use racestage_core::{ParticipantRecord, ParticipantStatus, StageCounter};
//!
//! let mut counter = StageCounter::with_stages(["raz", "dva"]).expect("stages");
//! let record: ParticipantRecord = [("raz", "10:00"), ("dva", "-")]
//!     .into_iter()
//!     .map(|(k, v)| (k.to_string(), v.to_string()))
//!     .collect();
//!
//! let result = counter.add_participant(&record);
//! assert_eq!(result.status, ParticipantStatus::Running);
//! assert_eq!(counter.stage_count("raz"), 1);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod classifier;
pub mod counter;
pub mod report;
pub mod types;

// =============================================================================
// RE-EXPORTS
// =============================================================================

pub use classifier::{Diagnostic, classify};
pub use counter::StageCounter;
pub use report::{StageReport, StageTally, StatusTally};
pub use types::{
    ClassificationResult, ParticipantRecord, ParticipantStatus, SENTINEL, StageError,
    StageSequence,
};
