use geoipt_core::config::{CatalogLayout, LayeredConfig};
use geoipt_core::error::Result;
use geoipt_core::formats::FormatRegistry;
use geoipt_core::models::{BoundingBox, QueryPoint};
use geoipt_store::LayerStore;
use std::sync::Arc;
use tracing::info;

use crate::catalog::CatalogResolver;
use crate::containment::ContainmentEngine;
use crate::models::QueryResult;
use crate::report::ResultAssembler;

/// Point lookup pipeline: catalog funnel, then point-in-polygon tests
pub struct QueryPipeline {
    resolver: CatalogResolver,
    engine: ContainmentEngine,
}

impl QueryPipeline {
    /// Create a pipeline over a store with the default geometry readers
    pub fn new(store: Arc<dyn LayerStore>, layout: CatalogLayout, max_concurrent_fetches: usize) -> Self {
        Self {
            resolver: CatalogResolver::new(store.clone(), layout),
            engine: ContainmentEngine::new(
                store,
                Arc::new(FormatRegistry::with_defaults()),
                max_concurrent_fetches,
            ),
        }
    }

    /// Create a pipeline with the layout and fan-out from configuration
    pub fn from_config(store: Arc<dyn LayerStore>, config: &LayeredConfig) -> Self {
        Self::new(store, config.layout(), config.max_concurrent_fetches.value)
    }

    pub fn resolver(&self) -> &CatalogResolver {
        &self.resolver
    }

    pub fn engine(&self) -> &ContainmentEngine {
        &self.engine
    }

    /// Resolve the zoning polygons containing `point` among the instruments
    /// listed for `viewport`.
    ///
    /// Only an invalid point or an unreadable region manifest fail the
    /// query. Broken listings and geometry files show up in the candidate
    /// rows instead.
    pub async fn resolve_query(&self, point: QueryPoint, viewport: BoundingBox) -> Result<QueryResult> {
        point.validate()?;

        // Phase 1: catalog funnel
        let candidates = self.resolver.candidates_for_viewport(&viewport).await?;
        info!(
            regions = candidates.stats.regions_scanned,
            candidates = candidates.records.len(),
            fallback = candidates.stats.fallback_applied,
            "Catalog phase complete"
        );

        // Phase 2: point-in-polygon
        let outcomes = self.engine.find_containing(&point, &candidates.records).await;

        let result = ResultAssembler::assemble(point, viewport, candidates, outcomes);
        info!(
            lat = point.lat,
            lon = point.lon,
            matches = result.matches.len(),
            files_failed = result.stats.containment.files_failed,
            "Query resolved"
        );

        Ok(result)
    }
}
