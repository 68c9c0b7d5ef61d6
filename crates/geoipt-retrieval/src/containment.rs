//! Point-in-polygon stage: fetch candidate geometry files and test the point.

use futures::stream::{self, StreamExt};
use geoipt_core::error::GeoiptError;
use geoipt_core::formats::FormatRegistry;
use geoipt_core::models::{GeometryFeature, InstrumentRecord, MatchResult, QueryPoint};
use geoipt_geo::feature_contains;
use geoipt_store::LayerStore;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::models::FileStatus;

/// Parsed features of one file, or the reason it could not be loaded
pub type CachedGeometry = Result<Arc<Vec<GeometryFeature>>, String>;

/// Parsed geometry keyed by storage path.
///
/// Concurrent loads of the same path share one fetch. Failures are cached
/// too, so a broken file is fetched once no matter how often it is listed.
#[derive(Default)]
pub struct GeometryCache {
    cells: Mutex<HashMap<String, Arc<OnceCell<CachedGeometry>>>>,
}

impl GeometryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry for `key`, running `loader` if there is none
    pub async fn get_or_load<F, Fut>(&self, key: &str, loader: F) -> CachedGeometry
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CachedGeometry>,
    {
        let cell = {
            let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
            cells.entry(key.to_string()).or_default().clone()
        };
        cell.get_or_init(loader).await.clone()
    }

    /// Number of paths with an entry
    pub fn len(&self) -> usize {
        self.cells.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// What testing the point against one candidate file produced
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateOutcome {
    pub status: FileStatus,

    /// Features of the file that contain the point, in file order
    pub matches: Vec<MatchResult>,

    pub features_tested: usize,
}

impl CandidateOutcome {
    fn without_features(status: FileStatus) -> Self {
        Self { status, matches: Vec::new(), features_tested: 0 }
    }
}

/// Tests a point against the polygons of candidate files
pub struct ContainmentEngine {
    store: Arc<dyn LayerStore>,
    registry: Arc<FormatRegistry>,
    max_concurrent_fetches: usize,
}

impl ContainmentEngine {
    pub fn new(store: Arc<dyn LayerStore>, registry: Arc<FormatRegistry>, max_concurrent_fetches: usize) -> Self {
        Self {
            store,
            registry,
            max_concurrent_fetches: max_concurrent_fetches.max(1),
        }
    }

    pub fn registry(&self) -> &FormatRegistry {
        &self.registry
    }

    pub fn max_concurrent_fetches(&self) -> usize {
        self.max_concurrent_fetches
    }

    /// Test the point against every candidate with a fresh per-query cache.
    ///
    /// Returns one outcome per candidate, aligned with `candidates`.
    pub async fn find_containing(&self, point: &QueryPoint, candidates: &[InstrumentRecord]) -> Vec<CandidateOutcome> {
        let cache = GeometryCache::new();
        self.find_containing_with_cache(point, candidates, &cache).await
    }

    /// [`find_containing`](Self::find_containing) with a caller-owned cache
    pub async fn find_containing_with_cache(
        &self,
        point: &QueryPoint,
        candidates: &[InstrumentRecord],
        cache: &GeometryCache,
    ) -> Vec<CandidateOutcome> {
        stream::iter(candidates.iter().map(|record| self.examine(point, record, cache)))
            .buffered(self.max_concurrent_fetches)
            .collect()
            .await
    }

    async fn examine(&self, point: &QueryPoint, record: &InstrumentRecord, cache: &GeometryCache) -> CandidateOutcome {
        let reader = match self.registry.detect_format(&record.file_name) {
            Ok(reader) => reader,
            Err(e) => {
                warn!(file = %record.file_name, error = %e, "Skipping candidate");
                return CandidateOutcome::without_features(FileStatus::Unsupported);
            }
        };

        let path = record.geometry_path();
        let loaded = cache
            .get_or_load(&path, || async {
                let payload = self.store.fetch_text(&path).await.map_err(|e| {
                    GeoiptError::GeometryUnavailable { path: path.clone(), reason: e.to_string() }.to_string()
                })?;
                reader.read(&path, &payload).map(Arc::new).map_err(|e| e.to_string())
            })
            .await;

        let features = match loaded {
            Ok(features) => features,
            Err(reason) => {
                warn!(path = %path, error = %reason, "Skipping candidate");
                return CandidateOutcome::without_features(FileStatus::Failed(reason));
            }
        };

        let matches: Vec<MatchResult> = features
            .iter()
            .filter(|feature| feature_contains(feature, point))
            .map(|feature| MatchResult {
                source_file: record.file_name.clone(),
                folder_key: record.folder_key.clone(),
                feature: feature.clone(),
            })
            .collect();

        debug!(
            path = %path,
            format = reader.format_name(),
            features = features.len(),
            matches = matches.len(),
            "Tested candidate"
        );

        let status = if matches.is_empty() { FileStatus::NoMatch } else { FileStatus::Matched };
        CandidateOutcome { status, matches, features_tested: features.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoipt_store::MemoryLayerStore;

    const SQUARE_GEOJSON: &str = r#"{"type": "FeatureCollection", "features": [
        {"type": "Feature", "properties": {"ZONA": "ZU-1"},
         "geometry": {"type": "Polygon", "coordinates": [[[0,0],[10,0],[10,10],[0,10],[0,0]]]}},
        {"type": "Feature", "properties": {"ZONA": "ZU-2"},
         "geometry": {"type": "Polygon", "coordinates": [[[20,20],[30,20],[30,30],[20,30],[20,20]]]}}
    ]}"#;

    fn engine(store: &MemoryLayerStore, concurrency: usize) -> ContainmentEngine {
        ContainmentEngine::new(
            Arc::new(store.clone()),
            Arc::new(FormatRegistry::with_defaults()),
            concurrency,
        )
    }

    #[tokio::test]
    async fn test_matches_only_containing_features() {
        let store = MemoryLayerStore::new().with_resource("r1/zonas.geojson", SQUARE_GEOJSON);
        let candidates = vec![InstrumentRecord::new("zonas.geojson", "r1")];

        let outcomes = engine(&store, 4)
            .find_containing(&QueryPoint::new(5.0, 5.0), &candidates)
            .await;

        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, FileStatus::Matched);
        assert_eq!(outcomes[0].features_tested, 2);
        assert_eq!(outcomes[0].matches.len(), 1);
        assert_eq!(outcomes[0].matches[0].feature.attribute("ZONA"), Some("ZU-1"));
        assert_eq!(outcomes[0].matches[0].source_path(), "r1/zonas.geojson");
    }

    #[tokio::test]
    async fn test_outcomes_follow_candidate_order() {
        let store = MemoryLayerStore::new()
            .with_resource("r1/a.geojson", SQUARE_GEOJSON)
            .with_resource("r1/broken.kml", "<kml><Placemark></Placemark></kml>");
        let candidates = vec![
            InstrumentRecord::new("missing.kml", "r1"),
            InstrumentRecord::new("a.geojson", "r1"),
            InstrumentRecord::new("plano.shp", "r1"),
            InstrumentRecord::new("broken.kml", "r1"),
        ];

        let outcomes = engine(&store, 1)
            .find_containing(&QueryPoint::new(25.0, 25.0), &candidates)
            .await;

        let labels: Vec<&str> = outcomes.iter().map(|o| o.status.label()).collect();
        assert_eq!(labels, vec!["failed", "matched", "unsupported", "failed"]);
        assert_eq!(outcomes[1].matches[0].feature.attribute("ZONA"), Some("ZU-2"));
        // unsupported files are never fetched
        assert_eq!(store.fetch_count("r1/plano.shp"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_candidates_fetch_once() {
        let store = MemoryLayerStore::new().with_resource("r1/a.geojson", SQUARE_GEOJSON);
        let candidates = vec![
            InstrumentRecord::new("a.geojson", "r1"),
            InstrumentRecord::new("missing.geojson", "r1"),
            InstrumentRecord::new("a.geojson", "r1"),
            InstrumentRecord::new("missing.geojson", "r1"),
        ];

        let outcomes = engine(&store, 4)
            .find_containing(&QueryPoint::new(5.0, 5.0), &candidates)
            .await;

        assert_eq!(outcomes[0], outcomes[2]);
        assert_eq!(outcomes[1], outcomes[3]);
        assert_eq!(store.fetch_count("r1/a.geojson"), 1);
        assert_eq!(store.fetch_count("r1/missing.geojson"), 1);
    }

    #[tokio::test]
    async fn test_failure_reason_names_the_path() {
        let store = MemoryLayerStore::new();
        let outcomes = engine(&store, 2)
            .find_containing(&QueryPoint::new(0.0, 0.0), &[InstrumentRecord::new("z.kml", "r9")])
            .await;

        match &outcomes[0].status {
            FileStatus::Failed(reason) => assert!(reason.contains("r9/z.kml"), "{reason}"),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_cache_shares_entries() {
        let cache = GeometryCache::new();
        let first = cache.get_or_load("a", || async { Err("boom".to_string()) }).await;
        let second = cache
            .get_or_load("a", || async { Ok(Arc::new(Vec::new())) })
            .await;

        assert_eq!(first, Err("boom".to_string()));
        assert_eq!(second, Err("boom".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let store = MemoryLayerStore::new();
        assert_eq!(engine(&store, 0).max_concurrent_fetches(), 1);
    }
}
