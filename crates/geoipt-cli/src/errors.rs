use console::style;
use geoipt_core::error::GeoiptError;
use geoipt_core::models::BoundingBox;
use std::fmt;

/// Error type with context and suggestions
pub struct CliError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
    pub help_command: Option<String>,
}

impl CliError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
            help_command: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    pub fn with_help(mut self, command: impl Into<String>) -> Self {
        self.help_command = Some(command.into());
        self
    }

    pub fn display(&self) {
        eprintln!("{} {}\n", style("✗").red().bold(), style(&self.message).red().bold());
        self.display_details();
    }

    /// Show as a notice rather than a failure
    pub fn display_notice(&self) {
        eprintln!("{} {}\n", style("⚠").yellow().bold(), style(&self.message).yellow().bold());
        self.display_details();
    }

    fn display_details(&self) {
        if let Some(ref context) = self.context {
            eprintln!("{}", context);
            eprintln!();
        }

        if !self.suggestions.is_empty() {
            eprintln!("{}", style("Try this:").yellow().bold());
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                eprintln!("  {}. {}", i + 1, suggestion);
            }
            eprintln!();
        }

        if let Some(ref help_cmd) = self.help_command {
            eprintln!("{} {}", style("Need help?").cyan(), style(help_cmd).cyan().bold());
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Debug for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Nothing listed for the viewport
pub fn no_candidates_in_viewport(viewport: &BoundingBox) -> CliError {
    CliError::new("No planning instruments in this area")
        .with_context(format!(
            "No region with published layers covers the visible extent.\n\nViewport: {}",
            crate::output::format_nesw(viewport.as_nesw())
        ))
        .with_suggestion("Zoom out or move the viewport (--bbox) over a region with published layers")
        .with_suggestion("List the regions and their extents: geoipt regions")
        .with_help("Run: geoipt query --help")
}

/// Candidates examined, none containing the point
pub fn no_containing_polygon(examined: usize) -> CliError {
    CliError::new("No zone contains this point")
        .with_context(format!(
            "{} planning instrument file(s) were checked, but no polygon contains the point.",
            examined
        ))
        .with_suggestion("Check the --lat/--lon values; a swapped pair lands far away")
        .with_suggestion("Try a point a little further inside the urban area")
        .with_help("Run: geoipt query --help")
}

/// The region manifest could not be read
pub fn catalog_unavailable(path: &str, reason: &str) -> CliError {
    CliError::new("Region catalog unavailable")
        .with_context(format!("The region manifest could not be loaded.\n\nPath: {}\nError: {}", path, reason))
        .with_suggestion("Point --root at the layers directory or base URL")
        .with_suggestion("Or set GEOIPT_LAYERS_ROOT / layers_root in geoipt.toml")
        .with_help("Run: geoipt config")
}

/// The --bbox value did not parse into a box
pub fn invalid_bbox(reason: &str) -> CliError {
    CliError::new("Invalid viewport")
        .with_context(format!("The --bbox value is not a valid bounding box.\n\nReason: {}", reason))
        .with_suggestion("Pass four numbers as north,east,south,west: --bbox=-29,-70,-30,-71")
        .with_suggestion("Or use --bbox-order lonlat for minLon,minLat,maxLon,maxLat")
        .with_help("Run: geoipt query --help")
}

/// Coordinates outside WGS84 ranges
pub fn invalid_point(reason: &str) -> CliError {
    CliError::new("Invalid point")
        .with_context(format!("Reason: {}", reason))
        .with_suggestion("Latitude must be within [-90, 90] and longitude within [-180, 180]")
        .with_help("Run: geoipt query --help")
}

/// A local file with an extension no reader handles
pub fn unsupported_format(extension: &str, supported: &[String]) -> CliError {
    CliError::new(format!("Unsupported geometry format '.{}'", extension))
        .with_context(format!("Supported extensions: {}", supported.join(", ")))
        .with_suggestion("Convert the file to KML or GeoJSON")
}

/// Invalid configuration value or file
pub fn invalid_config(key: &str, reason: &str) -> CliError {
    CliError::new(format!("Invalid configuration: {}", key))
        .with_context(format!("Configuration value is invalid.\n\nReason: {}", reason))
        .with_suggestion("Check geoipt.toml for syntax errors")
        .with_suggestion("Check GEOIPT_* environment variables")
        .with_help("Run: geoipt config")
}

/// Convert anyhow::Error to CliError with context
pub fn from_anyhow(error: anyhow::Error) -> CliError {
    let error = match error.downcast::<CliError>() {
        Ok(cli_error) => return cli_error,
        Err(error) => error,
    };

    if let Some(geoipt_error) = error.chain().find_map(|e| e.downcast_ref::<GeoiptError>()) {
        return match geoipt_error {
            GeoiptError::CatalogUnavailable { path, reason } => catalog_unavailable(path, reason),
            GeoiptError::InvalidBoundingBox { reason } => invalid_bbox(reason),
            GeoiptError::InvalidQueryPoint { reason } => invalid_point(reason),
            GeoiptError::UnsupportedFormat { extension, supported } => {
                unsupported_format(extension, supported)
            }
            GeoiptError::ConfigInvalid { key, reason } => invalid_config(key, reason),
            other => CliError::new(error.to_string()).with_context(format!("Error: {}", other)),
        };
    }

    let message = error.to_string();
    if message.contains("No such file or directory") {
        CliError::new("File not found")
            .with_context(format!("Error: {:#}", error))
            .with_suggestion("Check the file path and try again")
    } else {
        CliError::new(format!("{:#}", error))
    }
}
