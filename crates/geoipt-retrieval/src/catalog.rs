//! Catalog funnel: region manifest → per-region listings → viewport candidates.

use geoipt_core::config::CatalogLayout;
use geoipt_core::error::{GeoiptError, Result};
use geoipt_core::models::{decode_listing, decode_manifest, BoundingBox, InstrumentRecord, RegionDescriptor};
use geoipt_geo::BBoxIndex;
use geoipt_store::LayerStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::models::CatalogPhaseStats;

/// Candidate records for one viewport, in region then listing order
#[derive(Debug, Clone)]
pub struct CandidateSet {
    pub records: Vec<InstrumentRecord>,
    pub stats: CatalogPhaseStats,
}

/// Result of filtering loaded records against a viewport
#[derive(Debug, Clone)]
pub struct ViewportFilter {
    pub records: Vec<InstrumentRecord>,

    /// Records that passed the box test before any fallback
    pub in_viewport: usize,

    pub fallback_applied: bool,
}

/// Keep the records whose declared box intersects the viewport.
///
/// Records without a box always stay. If records were loaded but the box
/// test rejects every one of them, all of them are returned instead: a
/// stale or undersized listing box must not hide an instrument, so recall
/// wins over precision here.
pub fn filter_by_viewport(records: Vec<InstrumentRecord>, viewport: &BoundingBox) -> ViewportFilter {
    let index = BBoxIndex::from_boxes(records.iter().map(|r| r.bounding_box));
    let keep: HashSet<usize> = index.query(viewport).into_iter().collect();
    let in_viewport = keep.len();

    if keep.is_empty() && !records.is_empty() {
        return ViewportFilter { records, in_viewport, fallback_applied: true };
    }

    let records = records
        .into_iter()
        .enumerate()
        .filter(|(slot, _)| keep.contains(slot))
        .map(|(_, record)| record)
        .collect();

    ViewportFilter { records, in_viewport, fallback_applied: false }
}

/// Walks the two-level catalog held by a [`LayerStore`]
pub struct CatalogResolver {
    store: Arc<dyn LayerStore>,
    layout: CatalogLayout,
}

impl CatalogResolver {
    pub fn new(store: Arc<dyn LayerStore>, layout: CatalogLayout) -> Self {
        Self { store, layout }
    }

    pub fn layout(&self) -> &CatalogLayout {
        &self.layout
    }

    /// Load and decode the region manifest.
    ///
    /// Any failure is `CatalogUnavailable`: without the manifest no region
    /// can be resolved.
    pub async fn list_regions(&self) -> Result<Vec<RegionDescriptor>> {
        let path = self.layout.manifest_path();
        let manifest = self.store.fetch_json(&path).await.map_err(|e| match e {
            GeoiptError::CatalogUnavailable { .. } => e,
            other => GeoiptError::CatalogUnavailable {
                path: path.clone(),
                reason: other.to_string(),
            },
        })?;

        let regions = decode_manifest(&path, &manifest)?;
        debug!(path = %path, regions = regions.len(), "Loaded region manifest");
        Ok(regions)
    }

    /// Load one region's instrument listing
    pub async fn load_listing(&self, region: &RegionDescriptor) -> Result<Vec<InstrumentRecord>> {
        if region.folder_key.trim().is_empty() {
            return Err(GeoiptError::ListingUnavailable {
                region: region.id.clone(),
                reason: "region has no folder".to_string(),
            });
        }

        let path = self.layout.listing_path(&region.folder_key);
        let listing = self.store.fetch_json(&path).await.map_err(|e| GeoiptError::ListingUnavailable {
            region: region.id.clone(),
            reason: e.to_string(),
        })?;

        decode_listing(region, &listing)
    }

    /// Candidate records whose declared box intersects the viewport.
    ///
    /// Inactive regions are never scanned. Regions without a box are always
    /// scanned. A listing that fails to load is logged and skipped.
    pub async fn candidates_for_viewport(&self, viewport: &BoundingBox) -> Result<CandidateSet> {
        let regions = self.list_regions().await?;
        let mut stats = CatalogPhaseStats { regions_listed: regions.len(), ..Default::default() };

        let region_index = BBoxIndex::from_boxes(regions.iter().map(|r| r.bounding_box));
        let touching: HashSet<usize> = region_index.query(viewport).into_iter().collect();

        let mut loaded = Vec::new();
        for (slot, region) in regions.iter().enumerate() {
            if !region.active {
                stats.regions_inactive += 1;
                continue;
            }
            if !touching.contains(&slot) {
                debug!(region = %region.id, "Region outside viewport");
                stats.regions_outside_viewport += 1;
                continue;
            }

            match self.load_listing(region).await {
                Ok(records) => {
                    debug!(region = %region.id, records = records.len(), "Loaded listing");
                    stats.regions_scanned += 1;
                    loaded.extend(records);
                }
                Err(e) => {
                    warn!(region = %region.id, error = %e, "Skipping region");
                    stats.regions_failed += 1;
                }
            }
        }

        stats.records_loaded = loaded.len();
        let filtered = filter_by_viewport(loaded, viewport);
        stats.records_in_viewport = filtered.in_viewport;
        stats.fallback_applied = filtered.fallback_applied;

        if filtered.fallback_applied {
            info!(
                records = filtered.records.len(),
                "No listed box intersects the viewport, keeping every loaded record"
            );
        }

        Ok(CandidateSet { records: filtered.records, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geoipt_store::MemoryLayerStore;
    use serde_json::json;

    fn bbox(n: f64, e: f64, s: f64, w: f64) -> BoundingBox {
        BoundingBox::new(n, e, s, w).unwrap()
    }

    fn record(file: &str, bbox: Option<BoundingBox>) -> InstrumentRecord {
        let record = InstrumentRecord::new(file, "r1");
        match bbox {
            Some(b) => record.with_bounding_box(b),
            None => record,
        }
    }

    fn files(records: &[InstrumentRecord]) -> Vec<&str> {
        records.iter().map(|r| r.file_name.as_str()).collect()
    }

    #[test]
    fn test_filter_keeps_order_and_unboxed_records() {
        let viewport = bbox(10.0, 10.0, 0.0, 0.0);
        let records = vec![
            record("far.kml", Some(bbox(50.0, 50.0, 40.0, 40.0))),
            record("near.kml", Some(bbox(5.0, 5.0, 1.0, 1.0))),
            record("unboxed.kml", None),
            record("edge.kml", Some(bbox(20.0, 10.0, 10.0, 0.0))),
        ];

        let filtered = filter_by_viewport(records, &viewport);
        assert!(!filtered.fallback_applied);
        assert_eq!(files(&filtered.records), vec!["near.kml", "unboxed.kml", "edge.kml"]);
    }

    #[test]
    fn test_fallback_returns_everything_when_nothing_passes() {
        let viewport = bbox(10.0, 10.0, 0.0, 0.0);
        let records = vec![
            record("a.kml", Some(bbox(50.0, 50.0, 40.0, 40.0))),
            record("b.kml", Some(bbox(-40.0, -40.0, -50.0, -50.0))),
        ];

        let filtered = filter_by_viewport(records, &viewport);
        assert!(filtered.fallback_applied);
        assert_eq!(filtered.in_viewport, 0);
        assert_eq!(files(&filtered.records), vec!["a.kml", "b.kml"]);
    }

    #[test]
    fn test_no_records_no_fallback() {
        let filtered = filter_by_viewport(Vec::new(), &bbox(1.0, 1.0, 0.0, 0.0));
        assert!(!filtered.fallback_applied);
        assert!(filtered.records.is_empty());
    }

    fn catalog() -> MemoryLayerStore {
        let store = MemoryLayerStore::new();
        store.insert_json(
            "regiones.json",
            &json!({"regiones": [
                {"codigo_ine": "03", "nombre": "Atacama", "carpeta": "r3",
                 "bbox": [[-29.5, -71.5], [-25.0, -68.0]]},
                {"codigo_ine": "05", "nombre": "Valparaíso", "carpeta": "r5",
                 "bbox": [[-33.9, -72.0], [-32.0, -70.0]]},
                {"codigo_ine": "99", "nombre": "Sin caja", "carpeta": "r99"},
                {"codigo_ine": "13", "nombre": "Inactiva", "carpeta": "r13", "activo": false},
                {"codigo_ine": "00", "nombre": "Sin carpeta"}
            ]}),
        );
        store.insert_json(
            "r3/listado.json",
            &json!({"instrumentos": [
                {"archivo": "prc_copiapo.kml", "bbox": [[-27.4, -70.4], [-27.3, -70.2]]},
                {"archivo": "prc_vallenar.kml", "bbox": [[-28.6, -70.8], [-28.5, -70.7]]}
            ]}),
        );
        store.insert_json("r5/listado.json", &json!(["prc_valpo.kml"]));
        store.insert_json("r13/listado.json", &json!(["nunca.kml"]));
        store
    }

    #[tokio::test]
    async fn test_candidates_for_viewport() {
        let store = catalog();
        let resolver = CatalogResolver::new(Arc::new(store.clone()), CatalogLayout::default());

        let viewport = bbox(-27.0, -70.0, -28.0, -71.0);
        let candidates = resolver.candidates_for_viewport(&viewport).await.unwrap();

        assert_eq!(files(&candidates.records), vec!["prc_copiapo.kml"]);
        assert_eq!(candidates.stats.regions_listed, 5);
        assert_eq!(candidates.stats.regions_inactive, 1);
        assert_eq!(candidates.stats.regions_outside_viewport, 1);
        // r3 loaded; r99 has no listing; "Sin carpeta" has no folder
        assert_eq!(candidates.stats.regions_scanned, 1);
        assert_eq!(candidates.stats.regions_failed, 2);
        assert_eq!(candidates.stats.records_loaded, 2);
        assert!(!candidates.stats.fallback_applied);

        assert_eq!(store.fetch_count("r5/listado.json"), 0);
        assert_eq!(store.fetch_count("r13/listado.json"), 0);
        assert_eq!(store.fetch_count("r99/listado.json"), 1);
    }

    #[tokio::test]
    async fn test_candidates_fallback_through_resolver() {
        let store = catalog();
        let resolver = CatalogResolver::new(Arc::new(store), CatalogLayout::default());

        // Inside Atacama's region box but away from both instruments
        let viewport = bbox(-25.5, -68.5, -26.0, -69.0);
        let candidates = resolver.candidates_for_viewport(&viewport).await.unwrap();

        assert!(candidates.stats.fallback_applied);
        assert_eq!(files(&candidates.records), vec!["prc_copiapo.kml", "prc_vallenar.kml"]);
    }

    #[tokio::test]
    async fn test_missing_manifest_is_catalog_unavailable() {
        let resolver = CatalogResolver::new(Arc::new(MemoryLayerStore::new()), CatalogLayout::default());
        let err = resolver.candidates_for_viewport(&bbox(1.0, 1.0, 0.0, 0.0)).await.unwrap_err();
        assert!(matches!(err, GeoiptError::CatalogUnavailable { ref path, .. } if path == "regiones.json"));
    }

    #[tokio::test]
    async fn test_malformed_manifest_is_catalog_unavailable() {
        let store = MemoryLayerStore::new().with_resource("regiones.json", "{\"otro\": 1}");
        let resolver = CatalogResolver::new(Arc::new(store), CatalogLayout::default());
        assert!(matches!(
            resolver.list_regions().await,
            Err(GeoiptError::CatalogUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_listing_without_folder() {
        let resolver = CatalogResolver::new(Arc::new(MemoryLayerStore::new()), CatalogLayout::default());
        let region = RegionDescriptor::new("00", "");
        assert!(matches!(
            resolver.load_listing(&region).await,
            Err(GeoiptError::ListingUnavailable { .. })
        ));
    }
}
