//! GeoIPT Retrieval - Point lookup pipeline
//!
//! This crate implements the lookup use case: the catalog funnel that turns
//! a viewport into candidate instrument files, the containment engine that
//! tests the clicked point against their polygons, and the assembly of the
//! report the presentation layer renders.

pub mod catalog;
pub mod containment;
pub mod models;
pub mod pipeline;
pub mod report;

pub use catalog::{filter_by_viewport, CandidateSet, CatalogResolver, ViewportFilter};
pub use containment::{CandidateOutcome, ContainmentEngine, GeometryCache};
pub use models::{
    CandidateRow, CatalogPhaseStats, ContainmentPhaseStats, FileStatus, QueryReport, QueryResult,
    QueryStats, QueryStatus,
};
pub use pipeline::QueryPipeline;
pub use report::ResultAssembler;
