//! Integration tests for the geoipt binary
//!
//! These tests run the binary against a layer tree in a temporary directory
//! and check that JSON output is valid and carries the query outcome.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
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

fn layer_tree() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("capas");
    fs::create_dir_all(root.join("r1")).unwrap();
    fs::write(
        root.join("regiones.json"),
        r#"{"regiones": [
            {"codigo_ine": "04", "nombre": "Coquimbo", "carpeta": "r1", "bbox": [[-30, -71], [-29, -70]]},
            {"codigo_ine": "13", "nombre": "Metropolitana", "carpeta": "r13", "activo": false}
        ]}"#,
    )
    .unwrap();
    fs::write(
        root.join("r1/listado.json"),
        r#"[{"archivo": "z.kml", "nombre": "PRC La Serena", "bbox": [[-29.5, -70.5], [-29.4, -70.4]]}]"#,
    )
    .unwrap();
    fs::write(root.join("r1/z.kml"), ZONE_KML).unwrap();
    dir
}

/// Run the binary inside `dir` with no GEOIPT_* variables leaking in
fn geoipt(dir: &Path, args: &[&str]) -> Output {
    let mut command = Command::new(env!("CARGO_BIN_EXE_geoipt"));
    command.current_dir(dir).args(args).env("RUST_LOG", "off");
    for (key, _) in std::env::vars() {
        if key.starts_with("GEOIPT_") {
            command.env_remove(key);
        }
    }
    command.output().expect("Failed to execute command")
}

fn json_stdout(output: &Output) -> serde_json::Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&stdout).expect("Output should be valid JSON")
}

#[test]
fn test_query_json_reports_match() {
    let dir = layer_tree();
    let output = geoipt(
        dir.path(),
        &["--json", "query", "--lat", "-29.45", "--lon", "-70.45", "--bbox=-29,-70,-30,-71"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let parsed = json_stdout(&output);
    assert_eq!(parsed["status"], "success");
    let data = &parsed["data"];
    assert_eq!(data["status"], "matched");
    assert_eq!(data["matches"][0]["attributes"]["ZONA"], "H1");
    assert_eq!(data["candidates"][0]["name"], "PRC La Serena");
    assert_eq!(data["candidates"][0]["contains_point"], true);
}

#[test]
fn test_query_json_distinguishes_empty_outcomes() {
    let dir = layer_tree();

    let outside_zone = geoipt(
        dir.path(),
        &["--json", "query", "--lat", "-29.9", "--lon", "-70.9", "--bbox=-29,-70,-30,-71"],
    );
    assert_eq!(json_stdout(&outside_zone)["data"]["status"], "no_containing_polygon");

    let empty_area = geoipt(
        dir.path(),
        &["--json", "query", "--lat", "5", "--lon", "5", "--bbox", "0,0,10,10", "--bbox-order", "lonlat"],
    );
    let data = json_stdout(&empty_area)["data"].clone();
    assert_eq!(data["status"], "no_candidates_in_viewport");
    assert_ne!(
        data["message"],
        json_stdout(&outside_zone)["data"]["message"]
    );
}

#[test]
fn test_query_exports_first_match() {
    let dir = layer_tree();
    let output = geoipt(
        dir.path(),
        &[
            "query", "--lat", "-29.45", "--lon", "-70.45", "--bbox=-29,-70,-30,-71",
            "--export-kml", "zona.kml", "--export-json", "zona.geojson",
        ],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let kml = fs::read_to_string(dir.path().join("zona.kml")).unwrap();
    assert!(kml.contains("<name>PRC La Serena</name>"));
    assert!(kml.contains("<name>H1</name>"));
    assert!(kml.contains("-70.46,-29.46,0"));

    let geojson: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("zona.geojson")).unwrap()).unwrap();
    assert_eq!(geojson["type"], "Feature");
    assert_eq!(geojson["properties"]["ZONA"], "H1");
}

#[test]
fn test_invalid_bbox_fails() {
    let dir = layer_tree();
    let output = geoipt(dir.path(), &["query", "--lat", "0", "--lon", "0", "--bbox", "1,2,3"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Invalid viewport"));
}

#[test]
fn test_missing_catalog_fails_with_guidance() {
    let dir = TempDir::new().unwrap();
    let output = geoipt(
        dir.path(),
        &["query", "--lat", "0", "--lon", "0", "--bbox", "1,1,0,0"],
    );
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Region catalog unavailable"));
}

#[test]
fn test_regions_hides_inactive_by_default() {
    let dir = layer_tree();

    let active = json_stdout(&geoipt(dir.path(), &["--json", "regions"]));
    let ids: Vec<&str> = active["data"]["regions"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|r| r["id"].as_str())
        .collect();
    assert_eq!(ids, vec!["04"]);

    let all = json_stdout(&geoipt(dir.path(), &["--json", "regions", "--all"]));
    assert_eq!(all["data"]["regions"].as_array().unwrap().len(), 2);
}

#[test]
fn test_inspect_local_file() {
    let dir = layer_tree();
    let output = geoipt(dir.path(), &["--json", "inspect", "capas/r1/z.kml"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let data = json_stdout(&output)["data"].clone();
    assert_eq!(data["format"], "KML");
    assert_eq!(data["feature_count"], 1);
    assert_eq!(data["features"][0]["attributes"]["ZONA"], "H1");
}

#[test]
fn test_config_reports_sources() {
    let dir = layer_tree();
    fs::write(dir.path().join("geoipt.toml"), "max_concurrent_fetches = 3\n").unwrap();

    let output = geoipt(dir.path(), &["--json", "--root", "/srv/capas", "config"]);
    let values = json_stdout(&output)["data"]["values"].clone();

    assert_eq!(values["layers_root"]["value"], "/srv/capas");
    assert_eq!(values["layers_root"]["source"], "Cli");
    assert_eq!(values["max_concurrent_fetches"]["value"], "3");
    assert_eq!(values["max_concurrent_fetches"]["source"], "File");
    assert_eq!(values["listing_file"]["source"], "Default");
}
