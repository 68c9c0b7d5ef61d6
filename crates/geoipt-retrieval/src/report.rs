use chrono::Utc;
use geoipt_core::models::{BoundingBox, QueryPoint};

use crate::catalog::CandidateSet;
use crate::containment::CandidateOutcome;
use crate::models::{
    CandidateRow, ContainmentPhaseStats, FileStatus, QueryReport, QueryResult, QueryStats,
};

/// Builds the [`QueryResult`] from the outputs of both phases
pub struct ResultAssembler;

impl ResultAssembler {
    /// Combine candidates with their outcomes.
    ///
    /// `outcomes` is aligned with `candidates.records`; matches keep
    /// candidate order, then feature order within each file.
    pub fn assemble(
        point: QueryPoint,
        viewport: BoundingBox,
        candidates: CandidateSet,
        outcomes: Vec<CandidateOutcome>,
    ) -> QueryResult {
        let mut containment = ContainmentPhaseStats::default();
        let mut rows = Vec::with_capacity(candidates.records.len());
        let mut matches = Vec::new();

        for (record, outcome) in candidates.records.iter().zip(outcomes) {
            containment.files_examined += 1;
            containment.features_tested += outcome.features_tested;
            match outcome.status {
                FileStatus::Matched => containment.files_matched += 1,
                FileStatus::Unsupported => containment.files_unsupported += 1,
                FileStatus::Failed(_) => containment.files_failed += 1,
                FileStatus::NoMatch => {}
            }

            rows.push(CandidateRow {
                file_name: record.file_name.clone(),
                folder_key: record.folder_key.clone(),
                name: record.display_name.clone(),
                instrument_type: record.instrument_type.clone(),
                commune: record.commune.clone(),
                contains_point: outcome.status == FileStatus::Matched,
                status: outcome.status,
            });
            matches.extend(outcome.matches);
        }

        let report = QueryReport {
            point,
            viewport,
            matches: matches.clone(),
            candidates: rows,
            generated_at: Utc::now(),
        };

        QueryResult {
            matches,
            candidates_examined: candidates.records,
            report,
            stats: QueryStats { catalog: candidates.stats, containment },
        }
    }
}
