//! Region manifest and per-region instrument listings.
//!
//! The layer tree publishes these as loosely shaped JSON: bare arrays or
//! objects wrapping the records under one of several keys, records with
//! Spanish or English field names, numbers where strings are expected. Each
//! shape is detected once here and decoded into [`RegionDescriptor`] and
//! [`InstrumentRecord`]; nothing past this module looks at raw JSON shapes.

use serde::Serialize;
use serde_json::{Map, Value};

use super::bbox::BoundingBox;
use crate::error::{GeoiptError, Result};

const MANIFEST_KEYS: &[&str] = &["regiones_ipt", "regiones", "regions"];
const LISTING_KEYS: &[&str] = &["instrumentos", "listado", "kml", "kml_files"];
const DEFAULT_ZOOM: u8 = 7;

/// One administrative region and the folder holding its geometry bundle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegionDescriptor {
    pub id: String,
    pub display_name: String,
    pub folder_key: String,
    pub bounding_box: Option<BoundingBox>,
    /// `[lat, lon]` map center
    pub center: Option<[f64; 2]>,
    pub default_zoom: u8,
    pub active: bool,
}

impl RegionDescriptor {
    pub fn new(id: impl Into<String>, folder_key: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: id.clone(),
            id,
            folder_key: folder_key.into(),
            bounding_box: None,
            center: None,
            default_zoom: DEFAULT_ZOOM,
            active: true,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Map center, falling back to the middle of the bounding box
    pub fn map_center(&self) -> Option<[f64; 2]> {
        self.center.or_else(|| {
            self.bounding_box.map(|b| {
                let (lat, lon) = b.center();
                [lat, lon]
            })
        })
    }
}

/// One zoning-instrument geometry file listed for a region
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InstrumentRecord {
    pub file_name: String,
    pub folder_key: String,
    pub bounding_box: Option<BoundingBox>,
    pub display_name: String,
    pub instrument_type: Option<String>,
    pub commune: Option<String>,
    pub region_name: String,
    pub region_code: String,
    /// The listing entry exactly as published
    pub raw_metadata: Value,
}

impl InstrumentRecord {
    pub fn new(file_name: impl Into<String>, folder_key: impl Into<String>) -> Self {
        let file_name = file_name.into();
        Self {
            display_name: strip_geometry_extension(&file_name),
            file_name,
            folder_key: folder_key.into(),
            bounding_box: None,
            instrument_type: None,
            commune: None,
            region_name: String::new(),
            region_code: String::new(),
            raw_metadata: Value::Null,
        }
    }

    pub fn with_bounding_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = Some(bounding_box);
        self
    }

    /// Storage path of the geometry file relative to the layers root
    pub fn geometry_path(&self) -> String {
        if self.folder_key.is_empty() {
            self.file_name.clone()
        } else {
            format!("{}/{}", self.folder_key.trim_end_matches('/'), self.file_name)
        }
    }

    /// Lowercased file extension without the dot
    pub fn extension(&self) -> Option<String> {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Top-level shape of a region manifest
#[derive(Debug, Clone, Copy)]
pub enum ManifestShape<'a> {
    Bare(&'a [Value]),
    Keyed { key: &'static str, records: &'a [Value] },
}

impl<'a> ManifestShape<'a> {
    pub fn detect(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(records) => Some(Self::Bare(records)),
            Value::Object(map) => MANIFEST_KEYS.iter().find_map(|&key| {
                map.get(key)
                    .and_then(Value::as_array)
                    .map(|records| Self::Keyed { key, records: records.as_slice() })
            }),
            _ => None,
        }
    }

    pub fn records(&self) -> &'a [Value] {
        match self {
            Self::Bare(records) => records,
            Self::Keyed { records, .. } => records,
        }
    }
}

/// Top-level shape of a per-region instrument listing
#[derive(Debug, Clone, Copy)]
pub enum ListingShape<'a> {
    Bare(&'a [Value]),
    Keyed {
        key: &'static str,
        records: &'a [Value],
        header: &'a Map<String, Value>,
    },
}

impl<'a> ListingShape<'a> {
    pub fn detect(value: &'a Value) -> Option<Self> {
        match value {
            Value::Array(records) => Some(Self::Bare(records)),
            Value::Object(header) => LISTING_KEYS.iter().find_map(|&key| {
                header.get(key).and_then(Value::as_array).map(|records| Self::Keyed {
                    key,
                    records: records.as_slice(),
                    header,
                })
            }),
            _ => None,
        }
    }

    pub fn records(&self) -> &'a [Value] {
        match self {
            Self::Bare(records) => records,
            Self::Keyed { records, .. } => records,
        }
    }

    fn header_field(&self, key: &str) -> Option<String> {
        match self {
            Self::Bare(_) => None,
            Self::Keyed { header, .. } => header.get(key).and_then(lenient_string),
        }
    }
}

/// Decode a region manifest payload.
///
/// Malformed region records are skipped with a warning; an unrecognized
/// top-level shape is an error.
pub fn decode_manifest(path: &str, value: &Value) -> Result<Vec<RegionDescriptor>> {
    let shape = ManifestShape::detect(value).ok_or_else(|| GeoiptError::CatalogUnavailable {
        path: path.to_string(),
        reason: format!(
            "expected an array or an object with one of {:?}",
            MANIFEST_KEYS
        ),
    })?;

    Ok(shape
        .records()
        .iter()
        .enumerate()
        .filter_map(|(idx, record)| {
            let region = decode_region(record);
            if region.is_none() {
                tracing::warn!(path = %path, index = idx, "Skipping malformed region record");
            }
            region
        })
        .collect())
}

fn decode_region(record: &Value) -> Option<RegionDescriptor> {
    let fields = record.as_object()?;

    let folder_key = first_string(fields, &["carpeta", "folder"]).unwrap_or_default();
    let id = first_string(fields, &["codigo_ine", "id", "code"])
        .or_else(|| (!folder_key.is_empty()).then(|| folder_key.clone()))?;
    let display_name = first_string(fields, &["nombre", "name"]).unwrap_or_else(|| id.clone());

    let bounding_box = fields.get("bbox").and_then(BoundingBox::from_value);
    let center = first_value(fields, &["centro", "center"]).and_then(lat_lon);
    let default_zoom = fields
        .get("zoom")
        .and_then(Value::as_u64)
        .and_then(|z| u8::try_from(z).ok())
        .unwrap_or(DEFAULT_ZOOM);
    let active = first_value(fields, &["activo", "active"]).map(truthy).unwrap_or(true);

    Some(RegionDescriptor {
        id,
        display_name,
        folder_key,
        bounding_box,
        center,
        default_zoom,
        active,
    })
}

/// Decode a region's instrument listing.
///
/// Entries are bare file names or objects. Entries without a file name are
/// skipped; an unrecognized top-level shape is an error.
pub fn decode_listing(region: &RegionDescriptor, value: &Value) -> Result<Vec<InstrumentRecord>> {
    let shape = ListingShape::detect(value).ok_or_else(|| GeoiptError::ListingUnavailable {
        region: region.id.clone(),
        reason: format!("expected an array or an object with one of {:?}", LISTING_KEYS),
    })?;

    let listing_folder = shape.header_field("carpeta");
    let region_name = shape
        .header_field("region")
        .unwrap_or_else(|| region.display_name.clone());
    let region_code = shape
        .header_field("codigo_region")
        .unwrap_or_else(|| region.id.clone());

    let default_folder = listing_folder.unwrap_or_else(|| region.folder_key.clone());

    let mut records = Vec::with_capacity(shape.records().len());
    for entry in shape.records() {
        let record = match entry {
            Value::String(file_name) if !file_name.trim().is_empty() => {
                InstrumentRecord::new(file_name.trim(), default_folder.clone())
            }
            Value::Object(fields) => {
                let Some(file_name) = first_string(fields, &["archivo", "kml", "file", "fileName"])
                else {
                    tracing::warn!(region = %region.id, "Skipping listing entry without a file name");
                    continue;
                };
                let folder = first_string(fields, &["carpeta"]).unwrap_or_else(|| default_folder.clone());

                let mut record = InstrumentRecord::new(file_name, folder);
                if let Some(name) = first_string(fields, &["nombre", "name"]) {
                    record.display_name = strip_geometry_extension(&name);
                }
                record.bounding_box = fields.get("bbox").and_then(BoundingBox::from_value);
                record.instrument_type = first_string(fields, &["tipo", "type"]);
                record.commune = first_string(fields, &["comuna", "commune"]);
                record
            }
            _ => {
                tracing::warn!(region = %region.id, entry = %entry, "Skipping unrecognized listing entry");
                continue;
            }
        };

        records.push(InstrumentRecord {
            region_name: region_name.clone(),
            region_code: region_code.clone(),
            raw_metadata: entry.clone(),
            ..record
        });
    }

    Ok(records)
}

fn strip_geometry_extension(name: &str) -> String {
    let lower = name.to_ascii_lowercase();
    [".kml", ".geojson", ".json"]
        .iter()
        .find(|ext| lower.ends_with(*ext))
        .map(|ext| name[..name.len() - ext.len()].to_string())
        .unwrap_or_else(|| name.to_string())
}

fn first_value<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| fields.get(*k).filter(|v| !v.is_null()))
}

fn first_string(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| fields.get(*k).and_then(lenient_string))
}

/// Strings verbatim (trimmed, non-empty) and numbers as text
fn lenient_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn lat_lon(value: &Value) -> Option<[f64; 2]> {
    let pair = value.as_array()?;
    match pair.as_slice() {
        [lat, lon, ..] => Some([lat.as_f64()?, lon.as_f64()?]),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(true),
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no"),
        _ => true,
    }
}
