//! # Stage Counter
//!
//! Feeds participant records through [`classify`] and keeps running totals
//! per status and per current stage.
//!
//! ## Stage Buckets
//!
//! A stage bucket counts participants that are `Running` with this stage as
//! their latest reached checkpoint, i.e. runners currently between this
//! stage and the next one. It is not cumulative, and `Finished` participants
//! are in no bucket at all.
//!
//! ## Ownership
//!
//! The counter is not synchronized. Build one per report and drop it when
//! the report is done; never share one between concurrent requests.

use crate::classifier::classify;
use crate::report::{StageReport, StageTally, StatusTally};
use crate::types::{
    ClassificationResult, ParticipantRecord, ParticipantStatus, StageError, StageSequence,
};
use std::collections::BTreeMap;

/// Running per-status and per-stage participant counts.
#[derive(Debug, Clone)]
pub struct StageCounter {
    stages: StageSequence,
    status_counts: BTreeMap<ParticipantStatus, u64>,
    stage_counts: BTreeMap<String, u64>,
}

impl StageCounter {
    /// Create a counter with every status and every declared stage at zero.
    #[must_use]
    pub fn new(stages: StageSequence) -> Self {
        let status_counts = ParticipantStatus::ALL.iter().map(|s| (*s, 0)).collect();
        let stage_counts = stages.iter().map(|s| (s.to_string(), 0)).collect();

        Self {
            stages,
            status_counts,
            stage_counts,
        }
    }

    /// Validate `names` as a stage sequence and create a counter over it.
    pub fn with_stages<I, S>(names: I) -> Result<Self, StageError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        StageSequence::new(names).map(Self::new)
    }

    /// Create a counter and submit every record in `records`.
    #[must_use]
    pub fn from_records<'a, I>(stages: StageSequence, records: I) -> Self
    where
        I: IntoIterator<Item = &'a ParticipantRecord>,
    {
        let mut counter = Self::new(stages);
        for record in records {
            counter.add_participant(record);
        }
        counter
    }

    /// The stage sequence this counter was built with.
    #[must_use]
    pub fn stages(&self) -> &StageSequence {
        &self.stages
    }

    /// Classify one participant and count it.
    ///
    /// Invalid records are logged at `warn` with the raw record and the reason.
    pub fn add_participant(&mut self, record: &ParticipantRecord) -> ClassificationResult {
        let (result, diagnostic) = classify(&self.stages, record);

        if let Some(count) = self.status_counts.get_mut(&result.status) {
            *count = count.saturating_add(1);
        }

        match result.status {
            ParticipantStatus::Running => {
                if let Some(count) = result
                    .current_stage()
                    .and_then(|stage| self.stage_counts.get_mut(stage))
                {
                    *count = count.saturating_add(1);
                }
            }
            ParticipantStatus::Invalid => {
                tracing::warn!(record = ?record, reason = %diagnostic, "invalid participant record");
            }
            ParticipantStatus::Waiting | ParticipantStatus::Finished => {}
        }

        result
    }

    /// Number of running participants whose latest stage is `stage_name`.
    ///
    /// Returns 0 for names that are not declared stages.
    #[must_use]
    pub fn stage_count(&self, stage_name: &str) -> u64 {
        self.stage_counts.get(stage_name).copied().unwrap_or(0)
    }

    /// Number of participants classified with `status`.
    #[must_use]
    pub fn status_count(&self, status: ParticipantStatus) -> u64 {
        self.status_counts.get(&status).copied().unwrap_or(0)
    }

    /// Total number of records submitted so far.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.status_counts
            .values()
            .fold(0u64, |acc, n| acc.saturating_add(*n))
    }

    /// Snapshot the counts as a serializable report.
    #[must_use]
    pub fn report(&self) -> StageReport {
        let stages = self
            .stages
            .iter()
            .map(|name| StageTally::new(name, self.stage_count(name)))
            .collect();
        let states = ParticipantStatus::ALL
            .iter()
            .map(|status| StatusTally::new(*status, self.status_count(*status)))
            .collect();

        StageReport { stages, states }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
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

    impl Captured {
        fn events(&self) -> Vec<serde_json::Value> {
            let bytes = self.0.lock().unwrap_or_else(|e| e.into_inner()).clone();
            String::from_utf8_lossy(&bytes)
                .lines()
                .map(|line| serde_json::from_str(line).expect("json event"))
                .collect()
        }
    }

    /// Run `f` with warn-level events captured.
    fn capture_events(f: impl FnOnce()) -> Vec<serde_json::Value> {
        let sink = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_writer(sink.clone())
            .with_max_level(tracing::Level::WARN)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        sink.events()
    }

    fn record(pairs: &[(&str, &str)]) -> ParticipantRecord {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    fn counter() -> StageCounter {
        StageCounter::with_stages(["raz", "dva"]).expect("valid stages")
    }

    #[test]
    fn new_counter_is_all_zero() {
        let counter = counter();
        for status in ParticipantStatus::ALL {
            assert_eq!(counter.status_count(status), 0);
        }
        assert_eq!(counter.stage_count("raz"), 0);
        assert_eq!(counter.stage_count("dva"), 0);
        assert_eq!(counter.total(), 0);
    }

    #[test]
    fn unknown_stage_is_zero() {
        let mut counter = counter();
        counter.add_participant(&record(&[("raz", "10:00"), ("dva", "-")]));
        assert_eq!(counter.stage_count("tri"), 0);
        assert_eq!(counter.stage_count(""), 0);
    }

    #[test]
    fn running_increments_its_stage_only() {
        let mut counter = counter();
        let result = counter.add_participant(&record(&[("raz", "17:15"), ("dva", "-")]));

        assert_eq!(result.status, ParticipantStatus::Running);
        assert_eq!(counter.status_count(ParticipantStatus::Running), 1);
        assert_eq!(counter.stage_count("raz"), 1);
        assert_eq!(counter.stage_count("dva"), 0);
    }

    #[test]
    fn finished_is_in_no_stage_bucket() {
        let mut counter = counter();
        counter.add_participant(&record(&[("raz", "07:15"), ("dva", "18:00")]));

        assert_eq!(counter.status_count(ParticipantStatus::Finished), 1);
        assert_eq!(counter.stage_count("raz"), 0);
        assert_eq!(counter.stage_count("dva"), 0);
    }

    #[test]
    fn invalid_is_counted_but_not_bucketed() {
        let mut counter = counter();
        let result = counter.add_participant(&record(&[("raz", "-"), ("dva", "18:00")]));

        assert_eq!(result, ClassificationResult::invalid());
        assert_eq!(counter.status_count(ParticipantStatus::Invalid), 1);
        assert_eq!(counter.stage_count("dva"), 0);
    }

    #[test]
    fn report_follows_declared_order() {
        let mut counter = StageCounter::with_stages(["dva", "raz"]).expect("valid stages");
        counter.add_participant(&record(&[("dva", "09:00"), ("raz", "-")]));

        let report = counter.report();
        let names: Vec<_> = report.stages.iter().map(|s| s.stage_name.as_str()).collect();
        assert_eq!(names, vec!["dva", "raz"]);
        assert_eq!(report.stages[0].num_runners, 1);

        let statuses: Vec<_> = report.states.iter().map(|s| s.status_name).collect();
        assert_eq!(statuses, ParticipantStatus::ALL.to_vec());
    }

    #[test]
    fn from_records_counts_every_record() {
        let stages = StageSequence::new(["raz", "dva"]).expect("valid stages");
        let records = vec![
            record(&[("raz", "-"), ("dva", "-")]),
            record(&[("raz", "-")]),
            record(&[("raz", "10:00"), ("dva", "11:00")]),
        ];
        let counter = StageCounter::from_records(stages, &records);

        assert_eq!(counter.total(), 3);
        assert_eq!(counter.status_count(ParticipantStatus::Waiting), 1);
        assert_eq!(counter.status_count(ParticipantStatus::Invalid), 1);
        assert_eq!(counter.status_count(ParticipantStatus::Finished), 1);
    }

    #[test]
    fn invalid_record_logs_one_warning() {
        let mut counter = counter();
        let events = capture_events(|| {
            counter.add_participant(&record(&[("raz", "-"), ("dva", "18:00")]));
        });

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event["level"], "WARN");
        assert_eq!(event["fields"]["message"], "invalid participant record");
        assert_eq!(event["fields"]["reason"], "gap before `dva`");
        let logged = event["fields"]["record"].as_str().expect("record field");
        assert!(logged.contains("\"dva\": \"18:00\""));
        assert!(logged.contains("\"raz\": \"-\""));
    }

    #[test]
    fn valid_records_log_nothing() {
        let mut counter = counter();
        let events = capture_events(|| {
            counter.add_participant(&record(&[("raz", "-"), ("dva", "-")]));
            counter.add_participant(&record(&[("raz", "17:15"), ("dva", "-")]));
            counter.add_participant(&record(&[("raz", "07:15"), ("dva", "18:00")]));
        });

        assert!(events.is_empty());
        assert_eq!(counter.total(), 3);
    }
}
