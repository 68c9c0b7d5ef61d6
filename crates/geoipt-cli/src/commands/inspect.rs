//! Inspect command implementation

use crate::cli::InspectArgs;
use crate::output::{format_nesw, truncate, OutputWriter};
use crate::output_types::{FeatureInfo, InspectOutput};
use anyhow::{Context, Result};
use geoipt_core::formats::FormatRegistry;
use geoipt_core::models::GeometryFeature;
use geoipt_geo::feature_bounds;
use geoipt_geo::models::features_bounds;
use tabled::Tabled;

pub async fn execute(args: &InspectArgs, output: &OutputWriter) -> Result<()> {
    let path = &args.path;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("Not a file path: {}", path.display()))?;

    let registry = FormatRegistry::with_defaults();
    let reader = registry.detect_format(file_name)?;

    let payload = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let source = path.display().to_string();
    let features = reader.read(&source, &payload)?;

    let inspected = InspectOutput {
        path: source,
        format: reader.format_name().to_string(),
        feature_count: features.len(),
        vertex_count: features.iter().map(GeometryFeature::vertex_count).sum(),
        bounds: features_bounds(&features),
        features: features.iter().map(feature_info).collect(),
    };

    if output.is_json() {
        return output.result(inspected);
    }

    output.section("Geometry File");
    output.kv("Path", &inspected.path);
    output.kv("Format", &inspected.format);
    output.kv("Features", inspected.feature_count);
    output.kv("Vertices", inspected.vertex_count);
    if let Some(bounds) = inspected.bounds {
        output.kv("Extent", format_nesw(bounds.as_nesw()));
    }

    #[derive(Tabled)]
    struct FeatureRow {
        #[tabled(rename = "#")]
        index: usize,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Kind")]
        kind: String,
        #[tabled(rename = "Rings")]
        rings: usize,
        #[tabled(rename = "Vertices")]
        vertices: usize,
        #[tabled(rename = "Attributes")]
        attributes: usize,
    }

    output.section("Features");
    let rows: Vec<FeatureRow> = inspected
        .features
        .iter()
        .enumerate()
        .map(|(i, feature)| FeatureRow {
            index: i + 1,
            name: truncate(&feature.name, 40),
            kind: format!("{:?}", feature.kind),
            rings: feature.rings,
            vertices: feature.vertices,
            attributes: feature.attributes.len(),
        })
        .collect();
    output.table(rows);

    if args.attributes {
        for (i, feature) in inspected.features.iter().enumerate() {
            output.section(format!("{}. {}", i + 1, feature.name));
            for (key, value) in &feature.attributes {
                output.kv(key, truncate(value, 100));
            }
        }
    }

    Ok(())
}

fn feature_info(feature: &GeometryFeature) -> FeatureInfo {
    FeatureInfo {
        name: feature.display_name(),
        kind: feature.kind,
        rings: feature.rings.len(),
        vertices: feature.vertex_count(),
        bounds: feature_bounds(feature),
        attributes: feature.attributes.clone(),
    }
}
