//! Query command implementation

use crate::cli::{Cli, QueryArgs};
use crate::config_loader::load_config;
use crate::errors;
use crate::output::{check_mark, format_nesw, truncate, OutputWriter};
use crate::output_types::{ExportOutput, MatchOutput, QueryOutput};
use anyhow::{Context, Result};
use geoipt_core::formats::{write_zone_kml, zone_to_geojson};
use geoipt_core::models::{BoundingBox, MatchResult, QueryPoint};
use geoipt_retrieval::{QueryPipeline, QueryResult, QueryStatus};
use geoipt_store::store_from_config;
use std::path::Path;
use tabled::Tabled;

pub async fn execute(cli: &Cli, args: &QueryArgs, output: &OutputWriter) -> Result<()> {
    let point = QueryPoint::new(args.lat, args.lon);
    point.validate()?;
    let viewport = BoundingBox::parse_viewport(&args.bbox, args.bbox_order.into())?;

    let config = load_config(cli)?;
    let store = store_from_config(&config)?;
    tracing::debug!(store = %store.describe(), "Opened layer store");

    let pipeline = QueryPipeline::from_config(store, &config);
    let result = pipeline
        .resolve_query(point, viewport)
        .await
        .context("Failed to resolve query")?;

    let exports = export_first_match(&result, args, output).await?;

    if output.is_json() {
        output.result(to_output(&result, exports))?;
    } else {
        print_report(&result, &exports, output);
    }

    Ok(())
}

/// Write the first match to the requested export files
async fn export_first_match(result: &QueryResult, args: &QueryArgs, output: &OutputWriter) -> Result<Vec<ExportOutput>> {
    let mut exports = Vec::new();
    if args.export_kml.is_none() && args.export_json.is_none() {
        return Ok(exports);
    }

    let Some(hit) = result.first_match() else {
        output.warning("No matched zone to export");
        return Ok(exports);
    };

    if let Some(path) = &args.export_kml {
        let kml = write_zone_kml(&result.instrument_name(hit), &hit.feature)?;
        write_export(path, &kml).await?;
        exports.push(ExportOutput { format: "kml".to_string(), path: path.display().to_string() });
    }

    if let Some(path) = &args.export_json {
        let feature = zone_to_geojson(&hit.feature);
        let json = serde_json::to_string_pretty(&feature).context("Failed to serialize GeoJSON")?;
        write_export(path, &json).await?;
        exports.push(ExportOutput { format: "geojson".to_string(), path: path.display().to_string() });
    }

    Ok(exports)
}

async fn write_export(path: &Path, content: &str) -> Result<()> {
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn to_output(result: &QueryResult, exports: Vec<ExportOutput>) -> QueryOutput {
    let status = result.status();
    QueryOutput {
        status,
        message: status.user_message().to_string(),
        point: result.report.point,
        viewport: result.report.viewport,
        matches: result.matches.iter().map(match_output).collect(),
        candidates: result.report.candidates.clone(),
        stats: result.stats.clone(),
        generated_at: result.report.generated_at,
        exports,
    }
}

fn match_output(hit: &MatchResult) -> MatchOutput {
    MatchOutput {
        source_file: hit.source_file.clone(),
        folder_key: hit.folder_key.clone(),
        display_name: hit.feature.display_name(),
        zone_label: hit.feature.zone_label(),
        attributes: hit.feature.attributes.clone(),
    }
}

#[derive(Tabled)]
struct CandidateTableRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    instrument_type: String,
    #[tabled(rename = "Commune")]
    commune: String,
    #[tabled(rename = "Contains")]
    contains: String,
    #[tabled(rename = "Status")]
    status: String,
}

#[derive(Tabled)]
struct AttributeRow {
    #[tabled(rename = "Attribute")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

fn print_report(result: &QueryResult, exports: &[ExportOutput], output: &OutputWriter) {
    let report = &result.report;
    let catalog = &result.stats.catalog;
    let containment = &result.stats.containment;

    output.section("Query");
    output.kv("Point", format!("{:.6}, {:.6}", report.point.lat, report.point.lon));
    output.kv("Viewport", format_nesw(report.viewport.as_nesw()));
    output.kv(
        "Regions",
        format!(
            "{} listed, {} scanned, {} outside viewport, {} failed",
            catalog.regions_listed, catalog.regions_scanned, catalog.regions_outside_viewport, catalog.regions_failed
        ),
    );
    output.kv(
        "Instruments",
        format!("{} loaded, {} in viewport", catalog.records_loaded, catalog.records_in_viewport),
    );
    if catalog.fallback_applied {
        output.warning("No listed extent touches the viewport; every loaded instrument was checked");
    }
    output.kv(
        "Files",
        format!(
            "{} examined, {} matched, {} failed, {} unsupported",
            containment.files_examined, containment.files_matched, containment.files_failed, containment.files_unsupported
        ),
    );

    match result.status() {
        QueryStatus::NoCandidatesInViewport => {
            errors::no_candidates_in_viewport(&report.viewport).display_notice();
            return;
        }
        QueryStatus::NoContainingPolygon => {
            errors::no_containing_polygon(result.candidates_examined.len()).display_notice();
        }
        QueryStatus::Matched => {
            output.success(QueryStatus::Matched.user_message());
            for (i, hit) in result.matches.iter().enumerate() {
                output.section(format!("{}. {}", i + 1, hit.feature.display_name()));
                output.kv("Zone", hit.feature.zone_label());
                output.kv("Source", hit.source_path());
                let rows: Vec<AttributeRow> = hit
                    .feature
                    .attributes
                    .iter()
                    .map(|(key, value)| AttributeRow { key: key.clone(), value: truncate(value, 80) })
                    .collect();
                output.table(rows);
            }
        }
    }

    output.section("Candidates");
    let rows: Vec<CandidateTableRow> = report
        .candidates
        .iter()
        .map(|row| CandidateTableRow {
            file: row.file_name.clone(),
            name: truncate(&row.name, 40),
            instrument_type: row.instrument_type.clone().unwrap_or_default(),
            commune: row.commune.clone().unwrap_or_default(),
            contains: check_mark(row.contains_point),
            status: row.status.label().to_string(),
        })
        .collect();
    output.table(rows);

    for export in exports {
        output.success(format!("Exported {} to {}", export.format, export.path));
    }
}
