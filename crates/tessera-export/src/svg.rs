//! SVG export serializer.
//!
//! Each layer of a [`PathDocument`] becomes one `<g>` element carrying
//! the fill color and `fill-rule="evenodd"`, holding a single compound
//! `<path>` with one `M ... Z` subpath per polygon. Even-odd filling
//! lets hole borders punch through the outer borders they sit in, so
//! no nesting information is needed.
//!
//! Document construction and XML escaping go through the [`svg`] crate.
//! The background color is not emitted.
//!
//! This is a pure function with no I/O: it returns a `String`.

use std::fmt::Write;

use svg::Document;
use svg::node::element::{Description, Element, Group, Path, Title};
use svg::node::{Node, Text};

use tessera_pipeline::{PathDocument, Polygon};

/// Namespace of the `<tessera:pipeline>` metadata element.
const METADATA_NAMESPACE: &str = "urn:tessera:pipeline:1";

/// Metadata to embed in the SVG document.
///
/// All fields are optional. Text values are XML-escaped automatically
/// by the `svg` crate.
#[derive(Debug, Clone, Default)]
pub struct SvgMetadata<'a> {
    /// Document title, emitted as `<title>`.
    ///
    /// Typically the output name.
    pub title: Option<&'a str>,

    /// Document description, emitted as `<desc>`.
    pub description: Option<&'a str>,

    /// Serialized pipeline configuration, emitted inside `<metadata>`
    /// so exported files carry the settings that produced them.
    pub config_json: Option<&'a str>,
}

/// Build an SVG path `d` attribute from a set of closed polygons.
///
/// Every polygon becomes `M x1,y1 x2,y2 ... Z`; subpaths are separated
/// by a space. Polygons with fewer than 3 points are skipped.
///
/// # Examples
///
/// ```
/// use tessera_pipeline::{Point, Polygon};
/// use tessera_export::build_path_data;
///
/// let triangle = Polygon::new(vec![
///     Point::new(0, 0),
///     Point::new(4, 0),
///     Point::new(0, 3),
/// ]);
/// assert_eq!(build_path_data(&[triangle]), "M 0,0 4,0 0,3 Z");
/// ```
#[must_use]
pub fn build_path_data(polygons: &[Polygon]) -> String {
    let mut d = String::new();
    for polygon in polygons.iter().filter(|p| p.len() >= 3) {
        if !d.is_empty() {
            d.push(' ');
        }
        d.push('M');
        for p in polygon.points() {
            let _ = write!(d, " {},{}", p.x, p.y);
        }
        d.push_str(" Z");
    }
    d
}

/// Serialize a document into an SVG string.
///
/// The canvas is `width` x `height` pixels with a matching `viewBox`.
/// Layers are emitted in document order, so later layers paint over
/// earlier ones.
#[must_use]
pub fn to_svg(document: &PathDocument, metadata: &SvgMetadata<'_>) -> String {
    let dims = document.dimensions();
    let mut doc = Document::new()
        .set("width", dims.width)
        .set("height", dims.height)
        .set("viewBox", (0, 0, dims.width, dims.height));

    if let Some(title) = metadata.title {
        doc = doc.add(Title::new(title));
    }

    if let Some(description) = metadata.description {
        doc = doc.add(Description::new().add(Text::new(description)));
    }

    if let Some(config_json) = metadata.config_json {
        let mut pipeline_el = Element::new("tessera:pipeline");
        pipeline_el.assign("xmlns:tessera", METADATA_NAMESPACE);
        pipeline_el.append(Text::new(config_json));
        let mut metadata_el = Element::new("metadata");
        metadata_el.append(pipeline_el);
        doc = doc.add(metadata_el);
    }

    for layer in document.layers() {
        let d = build_path_data(&layer.polygons);
        if d.is_empty() {
            continue;
        }
        let group = Group::new()
            .set("fill", layer.color.to_string())
            .set("fill-rule", "evenodd")
            .add(Path::new().set("d", d));
        doc = doc.add(group);
    }

    // The svg crate omits the XML declaration, so we prepend it.
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{doc}\n")
}
