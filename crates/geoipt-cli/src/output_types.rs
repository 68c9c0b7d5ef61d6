use chrono::{DateTime, Utc};
use geoipt_core::models::{BoundingBox, GeometryKind, QueryPoint};
use geoipt_retrieval::{CandidateRow, QueryStats, QueryStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Output for query command
#[derive(Debug, Serialize)]
pub struct QueryOutput {
    pub status: QueryStatus,
    pub message: String,
    pub point: QueryPoint,
    pub viewport: BoundingBox,
    pub matches: Vec<MatchOutput>,
    pub candidates: Vec<CandidateRow>,
    pub stats: QueryStats,
    pub generated_at: DateTime<Utc>,
    pub exports: Vec<ExportOutput>,
}

#[derive(Debug, Serialize)]
pub struct MatchOutput {
    pub source_file: String,
    pub folder_key: String,
    pub display_name: String,
    pub zone_label: String,
    pub attributes: BTreeMap<String, String>,
}

#[derive(Debug, Serialize)]
pub struct ExportOutput {
    pub format: String,
    pub path: String,
}

/// Output for regions command
#[derive(Debug, Serialize)]
pub struct RegionsOutput {
    pub source: String,
    pub regions: Vec<RegionInfo>,
}

#[derive(Debug, Serialize)]
pub struct RegionInfo {
    pub id: String,
    pub name: String,
    pub folder: String,
    pub active: bool,
    pub bbox: Option<BoundingBox>,
    pub center: Option<[f64; 2]>,
    pub zoom: u8,
}

/// Output for inspect command
#[derive(Debug, Serialize)]
pub struct InspectOutput {
    pub path: String,
    pub format: String,
    pub feature_count: usize,
    pub vertex_count: usize,
    pub bounds: Option<BoundingBox>,
    pub features: Vec<FeatureInfo>,
}

#[derive(Debug, Serialize)]
pub struct FeatureInfo {
    pub name: String,
    pub kind: GeometryKind,
    pub rings: usize,
    pub vertices: usize,
    pub bounds: Option<BoundingBox>,
    pub attributes: BTreeMap<String, String>,
}

/// Output for config command
#[derive(Debug, Serialize)]
pub struct InspectConfigOutput {
    pub values: BTreeMap<String, ConfigValue>,
}

#[derive(Debug, Serialize)]
pub struct ConfigValue {
    pub value: String,
    pub source: String,
}
