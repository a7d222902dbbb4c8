use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use log::{error, warn};
use regex::Regex;
use svg::node::element::{Group, Path as SvgPath, Title};
use thiserror::Error;

use crate::color::{Color, is_bright};
use crate::geometry::vector::Vec2;
use crate::osm::reader::Tags;

pub const DEFAULT_SHAPE_ID: &str = "default";
pub const DEFAULT_SMALL_SHAPE_ID: &str = "default_small";

/// Icon shapes are aligned to a 16 × 16 pixel grid.
const GRID_STEP: f64 = 16.0;

static STANDARD_INKSCAPE_ID_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new("^((circle|defs|ellipse|grid|guide|marker|metadata|path|rect|use)[\\d-]+|base)$")
    .expect("verified regex")
});
static PATH_MATCHER: LazyLock<Regex> = LazyLock::new(|| {
  Regex::new("[Mm] ([0-9.e-]*)[, ]([0-9.e-]*)").expect("verified regex")
});

/// Experimental shapes are marked with blue or red fill.
const UNUSED_ICON_COLORS: [&str; 2] = ["#0000ff", "#ff0000"];

#[derive(Error, Debug)]
pub enum ShapeError {
  #[error("failed to read icon file: {0}")]
  Io(#[from] std::io::Error),
  #[error("malformed icon SVG: {0}")]
  Svg(String),
  #[error("malformed icon configuration: {0}")]
  Configuration(String),
  #[error("missing required shape `{0}`")]
  MissingDefault(String),
}

/// SVG icon path description.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
  /// String representation of SVG path commands.
  pub path: String,
  /// Vector that should be used to shift the path.
  pub offset: Vec2,
  /// Shape unique string identifier, e.g. `tree`.
  pub id_: String,
  /// Shape human-readable description.
  pub name: Option<String>,
  /// If `None`, the shape has no meaningful direction. Otherwise `true`
  /// means the shape is directed to the right, `false` to the left; such
  /// shapes may be flipped horizontally to follow e.g. a surveillance
  /// direction.
  pub is_right_directed: Option<bool>,
  /// Emojis that represent the same entity.
  pub emojis: BTreeSet<String>,
  /// Whether the shape is used only as a part of other icons.
  pub is_part: bool,
  /// Hierarchical icon group, used for sorting.
  pub group: String,
  /// Icon categories used in the OpenStreetMap wiki.
  pub categories: BTreeSet<String>,
}

impl Shape {
  fn from_configuration(
    configuration: &serde_json::Value,
    path: String,
    offset: Vec2,
    id_: String,
    name: Option<String>,
  ) -> Self {
    let mut shape = Self {
      path,
      offset,
      id_,
      name,
      is_right_directed: None,
      emojis: BTreeSet::new(),
      is_part: false,
      group: String::new(),
      categories: BTreeSet::new(),
    };

    if let Some(name) = configuration["name"].as_str() {
      shape.name = Some(name.to_string());
    }
    match configuration["directed"].as_str() {
      Some("right") => shape.is_right_directed = Some(true),
      Some("left") => shape.is_right_directed = Some(false),
      _ => {}
    }
    match &configuration["emoji"] {
      serde_json::Value::String(emoji) => {
        shape.emojis.insert(emoji.clone());
      }
      serde_json::Value::Array(emojis) => {
        shape.emojis =
          emojis.iter().filter_map(|emoji| emoji.as_str().map(str::to_string)).collect();
      }
      _ => {}
    }
    shape.is_part = configuration["is_part"].as_bool().unwrap_or(false);
    if let Some(group) = configuration["group"].as_str() {
      shape.group = group.to_string();
    }
    if let Some(categories) = configuration["categories"].as_array() {
      shape.categories =
        categories.iter().filter_map(|category| category.as_str().map(str::to_string)).collect();
    }

    shape
  }

  /// Whether this is a placeholder shape that doesn't represent anything.
  #[must_use]
  pub fn is_default(&self) -> bool {
    self.id_ == DEFAULT_SHAPE_ID || self.id_ == DEFAULT_SMALL_SHAPE_ID
  }

  /// SVG path of the shape translated to `point`, with an extra offset and
  /// scaling applied.
  #[must_use]
  pub fn get_path(&self, point: Vec2, offset: Vec2, scale: Vec2) -> SvgPath {
    let mut transformations: Vec<String> = Vec::new();
    let shift = point + offset;

    transformations.push(format!("translate({},{})", shift.x, shift.y));
    if (scale.x - 1.0).abs() > f64::EPSILON || (scale.y - 1.0).abs() > f64::EPSILON {
      transformations.push(format!("scale({},{})", scale.x, scale.y));
    }
    transformations.push(format!("translate({},{})", self.offset.x, self.offset.y));

    SvgPath::new().set("d", self.path.clone()).set("transform", transformations.join(" "))
  }
}

fn parse_style_length(text: &str) -> Option<f64> {
  text.trim_end_matches("px").parse::<f64>().ok()
}

/// Verify a sketch SVG element (an element with a standard Inkscape
/// identifier): drafts are stroke-only thin lines, 20 %-opacity sketches, or
/// blue/red experimental fills.
fn verify_sketch_element(element: &roxmltree::Node, id_: &str) -> bool {
  let Some(style_text) = element.attribute("style").filter(|style| !style.is_empty()) else {
    return true;
  };

  let style: BTreeMap<&str, &str> = style_text
    .split(';')
    .filter_map(|part| part.split_once(':'))
    .collect();
  let fill = style.get("fill").copied().unwrap_or_default();
  let stroke = style.get("stroke").copied().unwrap_or_default();
  let stroke_width = style.get("stroke-width").and_then(|width| parse_style_length(width));

  // Sketch element: black 0.1 px stroke, no fill.
  if fill == "none"
    && stroke == "#000000"
    && stroke_width.is_some_and(|width| (width - 0.1).abs() < 1e-6)
  {
    return true;
  }

  // Sketch element: black 1 px stroke, no fill, 20% opacity.
  let opacity = style.get("opacity").and_then(|opacity| opacity.parse::<f64>().ok());
  if fill == "none"
    && stroke == "#000000"
    && opacity.is_some_and(|opacity| (opacity - 0.2).abs() < 1e-6)
    && stroke_width
      .is_none_or(|width| [0.7, 1.0, 2.0, 3.0].iter().any(|known| (width - known).abs() < 1e-6))
  {
    return true;
  }

  // Experimental shape: blue or red fill, no stroke.
  if UNUSED_ICON_COLORS.contains(&fill) && stroke == "none" {
    return true;
  }

  id_.starts_with("use")
}

/// Flatten the nested shape configuration; nested keys form the group path.
fn parse_configuration(
  root: &serde_json::Map<String, serde_json::Value>,
  configuration: &mut BTreeMap<String, serde_json::Value>,
  group: &str,
) {
  for (key, value) in root {
    let is_description = match value.as_object() {
      None => true,
      Some(object) => {
        object.is_empty()
          || ["name", "emoji", "is_part", "directed", "categories"]
            .iter()
            .any(|field| object.contains_key(*field))
      }
    };
    if is_description {
      let mut description = value.clone();
      if let Some(object) = description.as_object_mut() {
        object.insert("group".to_string(), serde_json::Value::String(group.to_string()));
      }
      configuration.insert(key.clone(), description);
    } else if let Some(object) = value.as_object() {
      parse_configuration(object, configuration, &format!("{group}_{key}"));
    }
  }
}

/// Extract shapes from an SVG file.
///
/// A shape is a single path with an `id` attribute that is aligned to the
/// 16 × 16 grid. The source file may contain any other irrelevant graphics.
pub struct ShapeExtractor {
  shapes: BTreeMap<String, Shape>,
}

impl ShapeExtractor {
  pub fn from_files(svg_file_name: &Path, configuration_file_name: &Path) -> Result<Self, ShapeError> {
    let svg_text = std::fs::read_to_string(svg_file_name)?;
    let configuration_text = std::fs::read_to_string(configuration_file_name)?;
    Self::from_texts(&svg_text, &configuration_text)
  }

  pub fn from_texts(svg_text: &str, configuration_text: &str) -> Result<Self, ShapeError> {
    let structure: serde_json::Value = serde_json::from_str(configuration_text)
      .map_err(|error| ShapeError::Configuration(error.to_string()))?;
    let root = structure
      .as_object()
      .ok_or_else(|| ShapeError::Configuration("object expected".to_string()))?;
    let mut configuration: BTreeMap<String, serde_json::Value> = BTreeMap::new();
    parse_configuration(root, &mut configuration, "root");

    let document = roxmltree::Document::parse(svg_text)
      .map_err(|error| ShapeError::Svg(error.to_string()))?;

    let mut extractor = Self { shapes: BTreeMap::new() };
    extractor.parse(&document, &configuration);

    for shape_id in configuration.keys() {
      if !extractor.shapes.contains_key(shape_id) {
        warn!("Configuration for unknown shape `{shape_id}`.");
      }
    }
    for required in [DEFAULT_SHAPE_ID, DEFAULT_SMALL_SHAPE_ID] {
      if !extractor.shapes.contains_key(required) {
        return Err(ShapeError::MissingDefault(required.to_string()));
      }
    }
    Ok(extractor)
  }

  fn parse(
    &mut self,
    document: &roxmltree::Document,
    configuration: &BTreeMap<String, serde_json::Value>,
  ) {
    for element in document.descendants().filter(roxmltree::Node::is_element) {
      let tag = element.tag_name().name();
      if tag == "g" || tag == "svg" {
        continue;
      }
      let Some(id_) = element.attribute("id").filter(|id| !id.is_empty()) else {
        continue;
      };

      if STANDARD_INKSCAPE_ID_MATCHER.is_match(id_) {
        if !verify_sketch_element(&element, id_) {
          warn!("Not verified SVG element `{id_}`.");
        }
        continue;
      }

      let Some(path) = element.attribute("d").filter(|d| !d.is_empty()) else {
        error!("Not standard ID `{id_}`.");
        continue;
      };
      let Some(groups) = PATH_MATCHER.captures(path) else {
        continue;
      };

      // Negated icon offset from the origin, aligned to the grid.
      let get_offset = |value: &str| {
        let value: f64 = value.parse().unwrap_or_default();
        -(value / GRID_STEP).trunc() * GRID_STEP - GRID_STEP / 2.0
      };
      let offset = Vec2::new(get_offset(&groups[1]), get_offset(&groups[2]));

      let name = element
        .children()
        .find(roxmltree::Node::is_element)
        .and_then(|child| child.text())
        .map(str::to_string);

      let shape_configuration = match configuration.get(id_) {
        Some(shape_configuration) => {
          if shape_configuration["name"].as_str().is_none() {
            warn!("Shape `{id_}` doesn't have name.");
          }
          shape_configuration.clone()
        }
        None => {
          warn!("Shape `{id_}` doesn't have configuration.");
          serde_json::Value::Null
        }
      };

      self.shapes.insert(
        id_.to_string(),
        Shape::from_configuration(
          &shape_configuration,
          path.to_string(),
          offset,
          id_.to_string(),
          name,
        ),
      );
    }
  }

  /// Get a shape by its identifier.
  ///
  /// # Panics
  ///
  /// Panics for unknown identifiers: shape references are validated when the
  /// scheme is loaded, so a missing shape is a programmer error.
  #[must_use]
  pub fn get_shape(&self, id_: &str) -> &Shape {
    self
      .shapes
      .get(id_)
      .unwrap_or_else(|| panic!("no shape with id `{id_}` in the icons file"))
  }

  #[must_use]
  pub fn has_shape(&self, id_: &str) -> bool {
    self.shapes.contains_key(id_)
  }
}

/// Specification for a shape as a part of an icon.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpecification {
  pub shape: Shape,
  pub color: Color,
  pub offset: Vec2,
  pub flip_horizontally: bool,
  pub flip_vertically: bool,
  pub use_outline: bool,
}

impl ShapeSpecification {
  #[must_use]
  pub fn new(shape: Shape, color: Color) -> Self {
    Self {
      shape,
      color,
      offset: Vec2::default(),
      flip_horizontally: false,
      flip_vertically: false,
      use_outline: true,
    }
  }

  /// Whether the shape is the default dot.
  #[must_use]
  pub fn is_default(&self) -> bool {
    self.shape.id_ == DEFAULT_SHAPE_ID
  }

  /// Draw the shape at `point`, returning the SVG path element.
  #[must_use]
  pub fn draw(
    &self,
    point: Vec2,
    tags: Option<&Tags>,
    outline: bool,
    outline_opacity: f64,
    scale: f64,
  ) -> SvgPath {
    let mut scale_vector = Vec2::new(scale, scale);
    if self.flip_vertically {
      scale_vector = Vec2::new(scale, -scale);
    }
    if self.flip_horizontally {
      scale_vector = Vec2::new(-scale, scale);
    }

    // Down-cast floats to integers to make icons pixel-perfect.
    let point = Vec2::new(point.x.trunc(), point.y.trunc());
    let mut path = self
      .shape
      .get_path(point, self.offset * scale, scale_vector)
      .set("fill", self.color.to_hex());

    if outline && self.use_outline {
      let color = if is_bright(self.color) { Color::BLACK } else { Color::WHITE };
      path = path
        .set("fill", color.to_hex())
        .set("stroke", color.to_hex())
        .set("stroke-width", 2.2)
        .set("stroke-linejoin", "round")
        .set("opacity", outline_opacity);
    }
    if let Some(tags) = tags {
      let title =
        tags.iter().map(|(key, value)| format!("{key}: {value}")).collect::<Vec<_>>().join("\n");
      path = path.add(Title::new(title));
    }
    path
  }
}

/// Icon that consists of (probably) multiple shapes, drawn in order.
#[derive(Debug, Clone, PartialEq)]
pub struct Icon {
  pub shape_specifications: Vec<ShapeSpecification>,
  pub opacity: f64,
}

impl Icon {
  #[must_use]
  pub fn new(shape_specifications: Vec<ShapeSpecification>) -> Self {
    Self { shape_specifications, opacity: 1.0 }
  }

  /// All shape identifiers in the icon.
  #[must_use]
  pub fn get_shape_ids(&self) -> Vec<&str> {
    self.shape_specifications.iter().map(|spec| spec.shape.id_.as_str()).collect()
  }

  /// Whether the icon is a single default shape.
  #[must_use]
  pub fn is_default(&self) -> bool {
    self.shape_specifications.len() == 1 && self.shape_specifications[0].is_default()
  }

  /// Paint all shapes in the color; white parts keep a dedicated replacement
  /// color if one is given.
  pub fn recolor(&mut self, color: Color, white: Option<Color>) {
    for specification in &mut self.shape_specifications {
      if specification.color == Color::WHITE
        && let Some(white) = white
      {
        specification.color = white;
      } else {
        specification.color = color;
      }
    }
  }

  pub fn add_specifications(&mut self, specifications: Vec<ShapeSpecification>) {
    self.shape_specifications.extend(specifications);
  }

  /// Draw the icon as an SVG group; the outline pass comes with its own
  /// group opacity picked from the brightness of the first shape.
  #[must_use]
  pub fn draw(&self, point: Vec2, tags: Option<&Tags>, outline: bool) -> Group {
    if outline {
      let bright = is_bright(self.shape_specifications[0].color);
      let opacity = if bright { 0.7 } else { 0.5 };
      let mut group = Group::new().set("opacity", opacity);
      for specification in &self.shape_specifications {
        group = group.add(specification.draw(point, tags, true, 1.0, 1.0));
      }
      group
    } else {
      let mut group = Group::new().set("opacity", self.opacity);
      for specification in &self.shape_specifications {
        group = group.add(specification.draw(point, tags, false, 1.0, 1.0));
      }
      group
    }
  }
}

/// Node representation: icons and color.
#[derive(Debug, Clone)]
pub struct IconSet {
  pub main_icon: Icon,
  pub extra_icons: Vec<Icon>,
  /// Icon to use if the point is hidden by overlapping icons but still needs
  /// to be shown.
  pub default_icon: Option<Icon>,
  /// Tag keys that were processed to create the icon set; other tag keys
  /// should be displayed as text or ignored.
  pub processed: BTreeSet<String>,
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  const TEST_ICONS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
    <path id="default" d="M 4,4 L 12,12"/>
    <path id="default_small" d="M 6,6 L 10,10"/>
    <g>
      <path id="tree" d="M 18 20 L 24 28"><title>tree</title></path>
    </g>
    <path id="path123" d="M 0,0 L 1,1" style="fill:none;stroke:#000000;stroke-width:0.1"/>
    <path id="rect4-2" d="M 0,0 L 2,2" style="fill:#0000ff;stroke:none"/>
  </svg>"##;

  const TEST_CONFIGURATION: &str = r#"{
    "default": {"name": "default"},
    "default_small": {"name": "default small"},
    "nature": {
      "tree": {"name": "tree", "categories": ["vegetation"]}
    }
  }"#;

  fn extractor() -> ShapeExtractor {
    ShapeExtractor::from_texts(TEST_ICONS, TEST_CONFIGURATION).unwrap()
  }

  #[test]
  fn shapes_are_extracted() {
    let extractor = extractor();
    assert!(extractor.has_shape("default"));
    assert!(extractor.has_shape("tree"));
    // Inkscape-generated sketch elements are not shapes.
    assert!(!extractor.has_shape("path123"));
    assert!(!extractor.has_shape("rect4-2"));
  }

  #[test]
  fn grid_offset() {
    let shape = extractor().get_shape("tree").clone();
    assert_approx_eq!(shape.offset.x, -24.0);
    assert_approx_eq!(shape.offset.y, -24.0);
    assert_eq!(shape.group, "root_nature");
    assert!(shape.categories.contains("vegetation"));
  }

  #[test]
  fn missing_default_is_an_error() {
    let result = ShapeExtractor::from_texts(
      r#"<svg><path id="tree" d="M 0 0 L 1 1"/></svg>"#,
      "{}",
    );
    assert!(matches!(result, Err(ShapeError::MissingDefault(_))));
  }

  #[test]
  #[should_panic(expected = "no shape with id")]
  fn unknown_shape_is_a_bug() {
    let _ = extractor().get_shape("no-such-shape");
  }

  #[test]
  fn default_detection() {
    let extractor = extractor();
    let default =
      Icon::new(vec![ShapeSpecification::new(extractor.get_shape("default").clone(), Color::BLACK)]);
    assert!(default.is_default());
    let tree =
      Icon::new(vec![ShapeSpecification::new(extractor.get_shape("tree").clone(), Color::BLACK)]);
    assert!(!tree.is_default());
  }

  #[test]
  fn recolor_keeps_white_replacement() {
    let extractor = extractor();
    let mut icon = Icon::new(vec![
      ShapeSpecification::new(extractor.get_shape("tree").clone(), Color::WHITE),
      ShapeSpecification::new(extractor.get_shape("default").clone(), Color::BLACK),
    ]);
    let grey = Color::from_hex("#888888").unwrap();
    let yellow = Color::from_hex("#FFFF00").unwrap();
    icon.recolor(grey, Some(yellow));
    assert_eq!(icon.shape_specifications[0].color, yellow);
    assert_eq!(icon.shape_specifications[1].color, grey);
  }

  #[test]
  fn shape_transform() {
    let extractor = extractor();
    let specification =
      ShapeSpecification::new(extractor.get_shape("tree").clone(), Color::BLACK);
    let path = specification.draw(Vec2::new(100.7, 200.2), None, false, 1.0, 1.0);
    let rendered = path.to_string();
    assert!(rendered.contains("translate(100,200)"));
    assert!(rendered.contains("translate(-24,-24)"));
  }
}
