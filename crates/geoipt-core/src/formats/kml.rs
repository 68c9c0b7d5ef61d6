//! KML reading and zone export.
//!
//! The reader walks the document with a streaming quick-xml parser instead
//! of deserializing a full KML tree, so files with stray elements or broken
//! coordinate tuples still yield whatever polygons they do contain.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use super::{is_usable_ring, GeometryReader};
use crate::error::{GeoiptError, Result};
use crate::models::{GeometryFeature, GeometryKind, LonLat};

const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";
const EXPORT_STYLE_ID: &str = "geoipt_zone";

/// KML reader
pub struct KmlReader;

impl GeometryReader for KmlReader {
    fn read(&self, source: &str, payload: &str) -> Result<Vec<GeometryFeature>> {
        let features = parse_placemarks(payload).map_err(|e| GeoiptError::GeometryParse {
            path: source.to_string(),
            format: self.format_name().to_string(),
            reason: e.to_string(),
        })?;

        if features.is_empty() {
            return Err(GeoiptError::GeometryParse {
                path: source.to_string(),
                format: self.format_name().to_string(),
                reason: "no Placemark with a usable outer boundary".to_string(),
            });
        }

        debug!(source, features = features.len(), "Parsed KML");
        Ok(features)
    }

    fn supported_extensions(&self) -> &[&str] {
        &["kml"]
    }

    fn format_name(&self) -> &str {
        "KML"
    }
}

/// Parse a KML payload, logging and returning an empty list on failure
pub fn parse_kml(payload: &str) -> Vec<GeometryFeature> {
    match KmlReader.read("<inline>", payload) {
        Ok(features) => features,
        Err(e) => {
            warn!(error = %e, "KML payload yielded no polygons");
            Vec::new()
        }
    }
}

#[derive(Default)]
struct PlacemarkBuilder {
    name: Option<String>,
    description: Option<String>,
    attributes: BTreeMap<String, String>,
    rings: Vec<Vec<LonLat>>,
    in_multi_geometry: bool,
    data_key: Option<String>,
    simple_data_key: Option<String>,
}

impl PlacemarkBuilder {
    fn finish(self) -> Option<GeometryFeature> {
        if self.rings.is_empty() {
            return None;
        }

        let kind = if self.in_multi_geometry || self.rings.len() > 1 {
            GeometryKind::MultiPolygon
        } else {
            GeometryKind::Polygon
        };

        let mut attributes = self.attributes;
        if let Some(name) = self.name.filter(|n| !n.is_empty()) {
            attributes.entry("NAME".to_string()).or_insert_with(|| name.clone());
            attributes.entry("NOMBRE_PM".to_string()).or_insert(name);
        }
        if let Some(description) = self.description.filter(|d| !d.is_empty()) {
            attributes.entry("DESCRIPTION".to_string()).or_insert(description);
        }

        Some(GeometryFeature::new(kind, self.rings, attributes))
    }
}

fn parse_placemarks(payload: &str) -> std::result::Result<Vec<GeometryFeature>, quick_xml::Error> {
    let mut reader = Reader::from_str(payload);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut text = String::new();
    let mut current: Option<PlacemarkBuilder> = None;
    let mut features = Vec::new();
    // Stack depth of the text field being read; markup below it is flattened
    let mut field_depth: Option<usize> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = local_name(&e);
                if field_depth.is_some() {
                    text.push(' ');
                    stack.push(name);
                    continue;
                }
                text.clear();
                if current.is_some() && is_text_field(&name, stack.last().map(String::as_str)) {
                    field_depth = Some(stack.len());
                }
                if name == "Placemark" {
                    current = Some(PlacemarkBuilder::default());
                } else if let Some(placemark) = current.as_mut() {
                    match name.as_str() {
                        "MultiGeometry" => placemark.in_multi_geometry = true,
                        "Data" => placemark.data_key = attribute(&e, "name"),
                        "SimpleData" => placemark.simple_data_key = attribute(&e, "name"),
                        _ => {}
                    }
                }
                stack.push(name);
            }
            Event::Empty(e) => {
                if field_depth.is_some() {
                    text.push(' ');
                    continue;
                }
                let Some(placemark) = current.as_mut() else { continue };
                match local_name(&e).as_str() {
                    "value" if stack.last().is_some_and(|p| p == "Data") => {
                        if let Some(key) = placemark.data_key.clone() {
                            placemark.attributes.insert(key, String::new());
                        }
                    }
                    "SimpleData" => {
                        if let Some(key) = attribute(&e, "name") {
                            placemark.attributes.entry(key).or_default();
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                let decoded = t
                    .unescape()
                    .map(|s| s.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                text.push_str(&decoded);
            }
            Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c)),
            Event::End(_) => {
                let name = stack.pop().unwrap_or_default();
                if let Some(depth) = field_depth {
                    if stack.len() > depth {
                        text.push(' ');
                        continue;
                    }
                    field_depth = None;
                }
                if name == "Placemark" {
                    if let Some(feature) = current.take().and_then(PlacemarkBuilder::finish) {
                        features.push(feature);
                    }
                } else if let Some(placemark) = current.as_mut() {
                    let parent = stack.last().map(String::as_str);
                    match name.as_str() {
                        "coordinates" if is_outer_ring(&stack) => {
                            let ring = parse_coordinates(&text);
                            if is_usable_ring(&ring) {
                                placemark.rings.push(ring);
                            } else {
                                debug!(vertices = ring.len(), "Dropping degenerate KML ring");
                            }
                        }
                        "name" if parent == Some("Placemark") => {
                            placemark.name = Some(collapse_whitespace(&text));
                        }
                        "description" if parent == Some("Placemark") => {
                            placemark.description = Some(strip_html(&text));
                        }
                        "value" if parent == Some("Data") => {
                            if let Some(key) = placemark.data_key.clone() {
                                placemark.attributes.insert(key, collapse_whitespace(&text));
                            }
                        }
                        "SimpleData" => {
                            if let Some(key) = placemark.simple_data_key.take() {
                                placemark.attributes.insert(key, collapse_whitespace(&text));
                            }
                        }
                        "Data" => placemark.data_key = None,
                        _ => {}
                    }
                }
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(features)
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.trim().to_string()))
        .filter(|v| !v.is_empty())
}

/// Elements whose text is stored on the placemark
fn is_text_field(name: &str, parent: Option<&str>) -> bool {
    matches!(
        (name, parent),
        ("name" | "description", Some("Placemark")) | ("value", Some("Data")) | ("SimpleData", _)
    )
}

/// `coordinates` closes an outer ring only under Polygon/outerBoundaryIs/LinearRing
fn is_outer_ring(stack: &[String]) -> bool {
    match stack {
        [.., polygon, boundary, ring] => {
            polygon == "Polygon" && boundary == "outerBoundaryIs" && ring == "LinearRing"
        }
        _ => false,
    }
}

/// Parse a KML coordinate list (`lon,lat[,alt]` tuples separated by whitespace).
///
/// Tuples that do not yield two finite numbers are skipped.
pub fn parse_coordinates(text: &str) -> Vec<LonLat> {
    text.split_whitespace()
        .filter_map(|tuple| {
            let mut parts = tuple.split(',');
            let lon = parts.next()?.trim().parse::<f64>().ok()?;
            let lat = parts.next()?.trim().parse::<f64>().ok()?;
            (lon.is_finite() && lat.is_finite()).then_some([lon, lat])
        })
        .collect()
}

/// Reduce an HTML description to plain text
fn strip_html(html: &str) -> String {
    let mut plain = String::with_capacity(html.len());
    let mut in_tag = false;

    for ch in html.chars() {
        match ch {
            '<' => {
                in_tag = true;
                plain.push(' ');
            }
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(ch),
            _ => {}
        }
    }

    let plain = plain
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");

    collapse_whitespace(&plain)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Render one zone as a standalone KML document.
///
/// Only the first ring is written. The zone attributes go to ExtendedData
/// and the Placemark is named after [`GeometryFeature::zone_label`].
pub fn write_zone_kml(document_name: &str, feature: &GeometryFeature) -> Result<String> {
    let ring = feature
        .rings
        .first()
        .filter(|r| is_usable_ring(r))
        .ok_or_else(|| GeoiptError::Export {
            reason: "zone has no ring with at least 3 vertices".to_string(),
        })?;

    let mut out = KmlWriter::new();
    out.emit(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    out.open("kml", &[("xmlns", KML_NAMESPACE)])?;
    out.open("Document", &[])?;
    out.text_element("name", document_name)?;

    out.open("Style", &[("id", EXPORT_STYLE_ID)])?;
    out.open("LineStyle", &[])?;
    out.text_element("color", "ff2563eb")?;
    out.text_element("width", "2")?;
    out.close("LineStyle")?;
    out.open("PolyStyle", &[])?;
    out.text_element("color", "553b82f6")?;
    out.close("PolyStyle")?;
    out.close("Style")?;

    out.open("Placemark", &[])?;
    out.text_element("name", &feature.zone_label())?;
    out.text_element("styleUrl", &format!("#{EXPORT_STYLE_ID}"))?;

    if !feature.attributes.is_empty() {
        out.open("ExtendedData", &[])?;
        for (key, value) in &feature.attributes {
            out.open("Data", &[("name", key.as_str())])?;
            out.text_element("value", value)?;
            out.close("Data")?;
        }
        out.close("ExtendedData")?;
    }

    out.open("Polygon", &[])?;
    out.open("outerBoundaryIs", &[])?;
    out.open("LinearRing", &[])?;
    out.text_element("coordinates", &format_ring(ring))?;
    out.close("LinearRing")?;
    out.close("outerBoundaryIs")?;
    out.close("Polygon")?;

    out.close("Placemark")?;
    out.close("Document")?;
    out.close("kml")?;

    out.finish()
}

fn format_ring(ring: &[LonLat]) -> String {
    let mut coords: Vec<String> = ring.iter().map(|[lon, lat]| format!("{lon},{lat},0")).collect();
    if ring.first() != ring.last() {
        if let Some([lon, lat]) = ring.first() {
            coords.push(format!("{lon},{lat},0"));
        }
    }
    coords.join(" ")
}

struct KmlWriter {
    inner: Writer<Vec<u8>>,
}

impl KmlWriter {
    fn new() -> Self {
        Self { inner: Writer::new_with_indent(Vec::new(), b' ', 2) }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.inner
            .write_event(event)
            .map_err(|e| GeoiptError::Export { reason: e.to_string() })
    }

    fn open(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<()> {
        let mut tag = BytesStart::new(name);
        for attr in attributes {
            tag.push_attribute(*attr);
        }
        self.emit(Event::Start(tag))
    }

    fn close(&mut self, name: &str) -> Result<()> {
        self.emit(Event::End(BytesEnd::new(name)))
    }

    fn text_element(&mut self, name: &str, text: &str) -> Result<()> {
        self.open(name, &[])?;
        self.emit(Event::Text(BytesText::new(text)))?;
        self.close(name)
    }

    fn finish(self) -> Result<String> {
        String::from_utf8(self.inner.into_inner())
            .map_err(|e| GeoiptError::Export { reason: e.to_string() })
    }
}
