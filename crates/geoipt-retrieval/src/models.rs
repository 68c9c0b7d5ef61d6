use chrono::{DateTime, Utc};
use geoipt_core::models::{BoundingBox, InstrumentRecord, MatchResult, QueryPoint};
use serde::Serialize;

/// What examining one candidate file produced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum FileStatus {
    /// At least one feature contains the point
    Matched,
    /// The file parsed but no feature contains the point
    NoMatch,
    /// The extension has no registered reader
    Unsupported,
    /// Fetch or parse failed
    Failed(String),
}

impl FileStatus {
    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Matched => "matched",
            FileStatus::NoMatch => "no match",
            FileStatus::Unsupported => "unsupported",
            FileStatus::Failed(_) => "failed",
        }
    }
}

/// One row of the candidate table: a file examined for the query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateRow {
    pub file_name: String,
    pub folder_key: String,
    pub name: String,
    pub instrument_type: Option<String>,
    pub commune: Option<String>,
    pub contains_point: bool,
    pub status: FileStatus,
}

/// Explanation of the catalog phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogPhaseStats {
    /// Regions in the manifest
    pub regions_listed: usize,

    /// Regions whose listing was loaded
    pub regions_scanned: usize,

    /// Regions skipped because `active` is false
    pub regions_inactive: usize,

    /// Regions whose box does not touch the viewport
    pub regions_outside_viewport: usize,

    /// Regions whose listing could not be loaded
    pub regions_failed: usize,

    /// Records across all loaded listings
    pub records_loaded: usize,

    /// Records whose box intersects the viewport, or that have no box
    pub records_in_viewport: usize,

    /// Whether every record was filtered out and the unfiltered set was used
    pub fallback_applied: bool,
}

/// Explanation of the containment phase
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainmentPhaseStats {
    pub files_examined: usize,
    pub files_matched: usize,
    pub files_failed: usize,
    pub files_unsupported: usize,
    pub features_tested: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryStats {
    pub catalog: CatalogPhaseStats,
    pub containment: ContainmentPhaseStats,
}

/// Report handed to the presentation layer
#[derive(Debug, Clone, Serialize)]
pub struct QueryReport {
    pub point: QueryPoint,
    pub viewport: BoundingBox,

    /// Every matched polygon, in candidate order
    pub matches: Vec<MatchResult>,

    /// One row per candidate file, in candidate order
    pub candidates: Vec<CandidateRow>,

    pub generated_at: DateTime<Utc>,
}

/// Outcome of a point lookup
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub matches: Vec<MatchResult>,
    pub candidates_examined: Vec<InstrumentRecord>,
    pub report: QueryReport,
    pub stats: QueryStats,
}

impl QueryResult {
    pub fn status(&self) -> QueryStatus {
        if !self.matches.is_empty() {
            QueryStatus::Matched
        } else if self.candidates_examined.is_empty() {
            QueryStatus::NoCandidatesInViewport
        } else {
            QueryStatus::NoContainingPolygon
        }
    }

    /// The match a single-result view shows
    pub fn first_match(&self) -> Option<&MatchResult> {
        self.matches.first()
    }

    /// Catalog record of the instrument a match came from
    pub fn instrument_for(&self, hit: &MatchResult) -> Option<&InstrumentRecord> {
        self.candidates_examined
            .iter()
            .find(|record| record.file_name == hit.source_file && record.folder_key == hit.folder_key)
    }

    /// Instrument name for a match, falling back to its file name
    pub fn instrument_name(&self, hit: &MatchResult) -> String {
        self.instrument_for(hit)
            .map(|record| record.display_name.clone())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| hit.source_file.clone())
    }
}

/// Distinguishes the two empty outcomes from a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryStatus {
    Matched,
    NoCandidatesInViewport,
    NoContainingPolygon,
}

impl QueryStatus {
    pub fn user_message(&self) -> &'static str {
        match self {
            QueryStatus::Matched => "The point lies inside at least one zoning polygon.",
            QueryStatus::NoCandidatesInViewport => {
                "No planning instruments are loaded for this area. Move the map to a region with published layers and try again."
            }
            QueryStatus::NoContainingPolygon => {
                "Planning instruments were checked, but no zone contains this point. Try a different location."
            }
        }
    }
}
