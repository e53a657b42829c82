//! # Status Classifier
//!
//! Pure function that decides a participant's progress from the times
//! recorded at each declared stage.
//!
//! ## Rules
//!
//! Stages are walked in declared order:
//!
//! | Value at stage | Effect |
//! |----------------|--------|
//! | key absent     | `Invalid`, stop immediately |
//! | `"-"`          | remember a gap, keep going |
//! | time after gap | `Invalid` |
//! | time < previous time | `Invalid` |
//! | otherwise      | `Running` at this stage |
//!
//! A record without any gap that survives the walk is `Finished`.
//!
//! ## Time Ordering
//!
//! Times are compared as strings. This is only correct when every time in
//! a race has the same zero-padded width (`07:15`, not `7:15`). The
//! ingestion layer is responsible for that; the classifier does not parse.

use crate::types::{
    ClassificationResult, ParticipantRecord, ParticipantStatus, SENTINEL, StageSequence,
};

// =============================================================================
// DIAGNOSTIC
// =============================================================================

/// Why a record classified the way it did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Record is consistent.
    AllOk,
    /// The record has no entry at all for this stage.
    StageMissed(String),
    /// A time is present at this stage after an earlier stage was `"-"`.
    GapBefore(String),
    /// The time at `stage` is earlier than the time at `previous`.
    TimeOrder { previous: String, stage: String },
}

impl Diagnostic {
    /// True for every diagnostic except [`Diagnostic::AllOk`].
    #[must_use]
    pub fn is_violation(&self) -> bool {
        !matches!(self, Diagnostic::AllOk)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Diagnostic::AllOk => write!(f, "all ok"),
            Diagnostic::StageMissed(stage) => write!(f, "stage `{}` is missed", stage),
            Diagnostic::GapBefore(stage) => write!(f, "gap before `{}`", stage),
            Diagnostic::TimeOrder { previous, stage } => {
                write!(f, "`{}` time > `{}` time", previous, stage)
            }
        }
    }
}

// =============================================================================
// CLASSIFY
// =============================================================================

/// Classify one participant against the stage sequence.
///
/// Never fails: malformed records come back as `Invalid` with a diagnostic.
pub fn classify(
    stages: &StageSequence,
    record: &ParticipantRecord,
) -> (ClassificationResult, Diagnostic) {
    let mut result = ClassificationResult::waiting();
    let mut gap_seen = false;

    for stage in stages.iter() {
        let Some(time) = record.get(stage) else {
            return (
                ClassificationResult::invalid(),
                Diagnostic::StageMissed(stage.to_string()),
            );
        };

        if time == SENTINEL {
            gap_seen = true;
            continue;
        }

        if gap_seen {
            return (
                ClassificationResult::invalid(),
                Diagnostic::GapBefore(stage.to_string()),
            );
        }

        if let (Some(previous), Some(previous_time)) =
            (result.current_stage(), result.current_time())
            && time.as_str() < previous_time
        {
            let diagnostic = Diagnostic::TimeOrder {
                previous: previous.to_string(),
                stage: stage.to_string(),
            };
            return (ClassificationResult::invalid(), diagnostic);
        }

        result = ClassificationResult::running(stage, time.as_str());
    }

    if !gap_seen {
        result.status = ParticipantStatus::Finished;
    }

    (result, Diagnostic::AllOk)
}

// =============================================================================
// TESTS
// =============================================================================
