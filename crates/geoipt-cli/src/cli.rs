use clap::{Parser, Subcommand, ValueEnum};
use geoipt_core::models::ViewportOrder;
use std::path::PathBuf;

/// GeoIPT - Zoning instrument lookup for a map point
#[derive(Parser, Debug)]
#[command(name = "geoipt")]
#[command(about = "Find the zoning polygons that contain a map point", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./geoipt.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Layers root: a directory or an http(s) base URL
    #[arg(long, global = true, value_name = "ROOT")]
    pub root: Option<String>,

    /// Maximum geometry files fetched at once
    #[arg(long, global = true, value_name = "N")]
    pub max_concurrent_fetches: Option<usize>,

    /// Per-request timeout for remote layers, in seconds
    #[arg(long, global = true, value_name = "SECS")]
    pub fetch_timeout: Option<u64>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Find the zones containing a point
    Query(QueryArgs),

    /// List the regions in the manifest
    Regions(RegionsArgs),

    /// Parse a local KML or GeoJSON file and describe its features
    Inspect(InspectArgs),

    /// Show the effective configuration and where each value came from
    Config,
}

/// Component order of the `--bbox` value
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum BboxOrder {
    /// north,east,south,west
    #[default]
    Nesw,
    /// minLon,minLat,maxLon,maxLat
    Lonlat,
}

impl From<BboxOrder> for ViewportOrder {
    fn from(order: BboxOrder) -> Self {
        match order {
            BboxOrder::Nesw => ViewportOrder::Nesw,
            BboxOrder::Lonlat => ViewportOrder::LonLat,
        }
    }
}

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// Latitude of the point (WGS84)
    #[arg(long, allow_negative_numbers = true)]
    pub lat: f64,

    /// Longitude of the point (WGS84)
    #[arg(long, allow_negative_numbers = true)]
    pub lon: f64,

    /// Visible map extent, four comma separated numbers
    /// Example: --bbox=-29,-70,-30,-71
    #[arg(long, allow_hyphen_values = true, value_name = "N,E,S,W")]
    pub bbox: String,

    /// Component order of --bbox
    #[arg(long, value_enum, default_value_t = BboxOrder::Nesw)]
    pub bbox_order: BboxOrder,

    /// Write the first matched zone to a KML file
    #[arg(long, value_name = "FILE")]
    pub export_kml: Option<PathBuf>,

    /// Write the first matched zone to a GeoJSON file
    #[arg(long, value_name = "FILE")]
    pub export_json: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct RegionsArgs {
    /// Include inactive regions
    #[arg(long)]
    pub all: bool,
}

#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// Path to a .kml, .json or .geojson file
    pub path: PathBuf,

    /// Print every attribute of every feature
    #[arg(long)]
    pub attributes: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_query_accepts_negative_coordinates() {
        let cli = Cli::try_parse_from([
            "geoipt", "query", "--lat", "-29.45", "--lon", "-70.45", "--bbox", "-29,-70,-30,-71",
        ])
        .unwrap();

        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.lat, -29.45);
                assert_eq!(args.lon, -70.45);
                assert_eq!(args.bbox, "-29,-70,-30,-71");
                assert!(matches!(args.bbox_order, BboxOrder::Nesw));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["geoipt", "regions", "--json", "--root", "/srv/capas"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.root.as_deref(), Some("/srv/capas"));
    }
}
