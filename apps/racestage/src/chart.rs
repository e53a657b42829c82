//! # Chart
//!
//! Builds the stage report for one course straight from the provider:
//! splits -> stage names -> results -> prepared records -> fresh counter.

use crate::config::SplitRange;
use crate::provider::{FieldFilter, ProviderError, RaceSource, records};
use racestage_core::{StageReport, StageSequence};

/// Fetch a course and count its participants.
///
/// Each call owns its own counter; nothing is shared between calls.
pub async fn build_chart(
    source: &dyn RaceSource,
    course: u32,
    filter: &FieldFilter,
    range: SplitRange,
) -> Result<StageReport, ProviderError> {
    tracing::info!("chart started, course {}", course);

    let splits = records::select_splits(source.splits(course).await?, range)
        .map_err(|e| ProviderError::ParseError(e.to_string()))?;
    let split_numbers: Vec<u32> = splits.iter().map(|s| s.split_id).collect();
    tracing::info!("will use split numbers {:?}", split_numbers);

    let stages = StageSequence::new(splits.into_iter().map(|s| s.split_name))
        .map_err(|e| ProviderError::ParseError(format!("course {course} splits: {e}")))?;

    let rows = source.results(course, &split_numbers).await?;
    let prepared = records::prepare_records(rows, filter);

    let report = records::count_records(stages, &prepared);
    tracing::info!("chart done, course {}", course);
    Ok(report)
}
