//! End-to-end point lookups through the catalog funnel and containment stage

use geoipt_core::config::CatalogLayout;
use geoipt_core::error::GeoiptError;
use geoipt_core::models::{BoundingBox, QueryPoint};
use geoipt_retrieval::{FileStatus, QueryPipeline, QueryStatus};
use geoipt_store::{FsLayerStore, MemoryLayerStore};
use serde_json::json;
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const ZONE_KML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2"><Document>
  <Placemark>
    <name>Zona H1</name>
    <ExtendedData><Data name="ZONA"><value>H1</value></Data></ExtendedData>
    <Polygon><outerBoundaryIs><LinearRing><coordinates>
      -70.46,-29.46 -70.44,-29.46 -70.44,-29.44 -70.46,-29.44 -70.46,-29.46
    </coordinates></LinearRing></outerBoundaryIs></Polygon>
  </Placemark>
</Document></kml>"#;

fn region_viewport() -> BoundingBox {
    BoundingBox::new(-29.0, -70.0, -30.0, -71.0).unwrap()
}

fn layer_tree() -> MemoryLayerStore {
    let store = MemoryLayerStore::new();
    store.insert_json(
        "regiones.json",
        &json!([{"id": "04", "nombre": "Coquimbo", "carpeta": "r1",
                 "bbox": [[-30.0, -71.0], [-29.0, -70.0]]}]),
    );
    store.insert_json(
        "r1/listado.json",
        &json!([{"archivo": "z.kml", "nombre": "PRC La Serena", "tipo": "PRC",
                 "bbox": [[-29.5, -70.5], [-29.4, -70.4]]}]),
    );
    store.insert("r1/z.kml", ZONE_KML);
    store
}

fn pipeline(store: &MemoryLayerStore) -> QueryPipeline {
    QueryPipeline::new(Arc::new(store.clone()), CatalogLayout::default(), 4)
}

#[tokio::test]
async fn test_point_inside_zone() {
    let store = layer_tree();
    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(-29.45, -70.45), region_viewport())
        .await
        .unwrap();

    assert_eq!(result.status(), QueryStatus::Matched);
    assert_eq!(result.matches.len(), 1);

    let hit = result.first_match().unwrap();
    assert_eq!(hit.feature.attribute("ZONA"), Some("H1"));
    assert_eq!(hit.source_file, "z.kml");
    assert_eq!(hit.source_path(), "r1/z.kml");

    let row = &result.report.candidates[0];
    assert_eq!(row.name, "PRC La Serena");
    assert_eq!(row.instrument_type.as_deref(), Some("PRC"));
    assert!(row.contains_point);
    assert_eq!(result.stats.catalog.regions_scanned, 1);
    assert_eq!(result.stats.containment.features_tested, 1);
}

#[tokio::test]
async fn test_point_outside_every_zone() {
    let store = layer_tree();
    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(-29.8, -70.9), region_viewport())
        .await
        .unwrap();

    assert_eq!(result.status(), QueryStatus::NoContainingPolygon);
    assert!(result.matches.is_empty());
    assert_eq!(result.candidates_examined.len(), 1);
    assert_eq!(result.report.candidates[0].status, FileStatus::NoMatch);

    // Far away from everything, with the viewport still over the region
    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(-10.0, -10.0), region_viewport())
        .await
        .unwrap();
    assert_eq!(result.status(), QueryStatus::NoContainingPolygon);
    assert!(result.matches.is_empty());
}

#[tokio::test]
async fn test_viewport_without_regions() {
    let store = layer_tree();
    let viewport = BoundingBox::new(10.0, 10.0, 0.0, 0.0).unwrap();
    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(5.0, 5.0), viewport)
        .await
        .unwrap();

    assert_eq!(result.status(), QueryStatus::NoCandidatesInViewport);
    assert_eq!(result.stats.catalog.regions_outside_viewport, 1);
    assert_eq!(store.fetch_count("r1/listado.json"), 0);
}

#[tokio::test]
async fn test_fallback_when_listing_boxes_miss_the_viewport() {
    let store = layer_tree();
    // Listed box is stale; the polygon actually lies elsewhere in the region
    store.insert_json(
        "r1/listado.json",
        &json!([{"archivo": "z.kml", "bbox": [[-29.95, -70.95], [-29.9, -70.9]]}]),
    );

    let viewport = BoundingBox::new(-29.4, -70.4, -29.5, -70.5).unwrap();
    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(-29.45, -70.45), viewport)
        .await
        .unwrap();

    assert!(result.stats.catalog.fallback_applied);
    assert_eq!(result.status(), QueryStatus::Matched);
}

#[tokio::test]
async fn test_missing_manifest_fails_the_query() {
    let store = layer_tree();
    store.remove("regiones.json");

    let err = pipeline(&store)
        .resolve_query(QueryPoint::new(-29.45, -70.45), region_viewport())
        .await
        .unwrap_err();
    assert!(matches!(err, GeoiptError::CatalogUnavailable { .. }));
}

#[tokio::test]
async fn test_broken_files_do_not_fail_the_query() {
    let store = layer_tree();
    store.insert_json(
        "regiones.json",
        &json!([
            {"id": "04", "carpeta": "r1", "bbox": [[-30.0, -71.0], [-29.0, -70.0]]},
            {"id": "05", "carpeta": "r2", "bbox": [[-30.0, -71.0], [-29.0, -70.0]]}
        ]),
    );
    store.insert_json(
        "r1/listado.json",
        &json!(["roto.kml", "plano.dwg", "z.kml", "ausente.geojson"]),
    );
    store.insert("r1/roto.kml", "<kml><Document>");

    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(-29.45, -70.45), region_viewport())
        .await
        .unwrap();

    assert_eq!(result.status(), QueryStatus::Matched);
    assert_eq!(result.stats.catalog.regions_failed, 1);

    let labels: Vec<&str> = result.report.candidates.iter().map(|r| r.status.label()).collect();
    assert_eq!(labels, vec!["failed", "unsupported", "matched", "failed"]);
    assert_eq!(result.stats.containment.files_failed, 2);
    assert_eq!(result.stats.containment.files_unsupported, 1);
}

#[tokio::test]
async fn test_repeated_listing_entries_fetch_geometry_once() {
    let store = layer_tree();
    store.insert_json(
        "regiones.json",
        &json!([
            {"id": "a", "carpeta": "r1"},
            {"id": "b", "carpeta": "r1"}
        ]),
    );
    store.insert_json("r1/listado.json", &json!(["z.kml"]));

    let result = pipeline(&store)
        .resolve_query(QueryPoint::new(-29.45, -70.45), region_viewport())
        .await
        .unwrap();

    assert_eq!(result.matches.len(), 2);
    assert_eq!(store.fetch_count("r1/z.kml"), 1);
}

#[tokio::test]
async fn test_invalid_point_is_rejected_before_any_fetch() {
    let store = layer_tree();
    let err = pipeline(&store)
        .resolve_query(QueryPoint::new(95.0, 0.0), region_viewport())
        .await
        .unwrap_err();

    assert!(matches!(err, GeoiptError::InvalidQueryPoint { .. }));
    assert_eq!(store.total_fetches(), 0);
}

#[tokio::test]
async fn test_directory_layer_tree() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("r1")).unwrap();
    fs::write(
        root.join("regiones.json"),
        json!({"regiones": [{"codigo_ine": "04", "carpeta": "r1"}]}).to_string(),
    )
    .unwrap();
    fs::write(root.join("r1/listado.json"), json!({"instrumentos": ["z.kml"]}).to_string()).unwrap();
    fs::write(root.join("r1/z.kml"), ZONE_KML).unwrap();

    let pipeline = QueryPipeline::new(Arc::new(FsLayerStore::new(root)), CatalogLayout::default(), 2);
    let result = pipeline
        .resolve_query(QueryPoint::new(-29.45, -70.45), region_viewport())
        .await
        .unwrap();

    assert_eq!(result.status(), QueryStatus::Matched);
    assert_eq!(result.report.matches[0].feature.attribute("ZONA"), Some("H1"));
}
