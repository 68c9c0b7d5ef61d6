//! Regions command implementation

use crate::cli::{Cli, RegionsArgs};
use crate::config_loader::load_config;
use crate::output::{check_mark, format_nesw, OutputWriter};
use crate::output_types::{RegionInfo, RegionsOutput};
use anyhow::{Context, Result};
use geoipt_retrieval::CatalogResolver;
use geoipt_store::store_from_config;
use tabled::Tabled;

pub async fn execute(cli: &Cli, args: &RegionsArgs, output: &OutputWriter) -> Result<()> {
    let config = load_config(cli)?;
    let store = store_from_config(&config)?;
    let source = store.describe();

    let resolver = CatalogResolver::new(store, config.layout());
    let regions = resolver.list_regions().await.context("Failed to list regions")?;

    let regions: Vec<RegionInfo> = regions
        .into_iter()
        .filter(|region| args.all || region.active)
        .map(|region| RegionInfo {
            center: region.map_center(),
            id: region.id,
            name: region.display_name,
            folder: region.folder_key,
            active: region.active,
            bbox: region.bounding_box,
            zoom: region.default_zoom,
        })
        .collect();

    if output.is_json() {
        return output.result(RegionsOutput { source, regions });
    }

    #[derive(Tabled)]
    struct RegionRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Folder")]
        folder: String,
        #[tabled(rename = "Active")]
        active: String,
        #[tabled(rename = "Extent")]
        extent: String,
    }

    output.section(format!("Regions ({})", source));
    let rows: Vec<RegionRow> = regions
        .iter()
        .map(|region| RegionRow {
            id: region.id.clone(),
            name: region.name.clone(),
            folder: region.folder.clone(),
            active: check_mark(region.active),
            extent: region
                .bbox
                .map(|b| format_nesw(b.as_nesw()))
                .unwrap_or_else(|| "(none)".to_string()),
        })
        .collect();
    output.table(rows);

    Ok(())
}
