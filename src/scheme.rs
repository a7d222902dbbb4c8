use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

use itertools::Itertools;
use log::debug;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::color::Color;
use crate::feature::direction::DirectionSet;
use crate::geometry::vector::Vec2;
use crate::icon::{
  DEFAULT_SHAPE_ID, DEFAULT_SMALL_SHAPE_ID, Icon, IconSet, ShapeExtractor, ShapeSpecification,
};
use crate::osm::reader::Tags;

const DEFAULT_COLOR: Color = Color::BLACK;

#[derive(Error, Debug)]
pub enum SchemeError {
  #[error("failed to read scheme file: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to parse scheme file: {0}")]
  Parse(#[from] serde_yaml::Error),
}

/// SVG line style and its priority.
#[derive(Debug, Clone, Default)]
pub struct LineStyle {
  pub style: BTreeMap<String, String>,
  pub parallel_offset: f64,
  pub priority: f64,
}

/// Check whether element tags satisfy a single tag pattern; returns captured
/// regex groups when the pattern is a regular expression.
fn is_matched_tag(
  matcher_tag_key: &str,
  matcher_tag_value: &str,
  tags: &Tags,
) -> (bool, Vec<String>) {
  let Some(value) = tags.get(matcher_tag_key) else {
    return (false, Vec::new());
  };
  if matcher_tag_value == "*" {
    return (true, Vec::new());
  }
  if value == matcher_tag_value {
    return (true, Vec::new());
  }
  if matcher_tag_value.starts_with('^')
    && let Ok(pattern) = Regex::new(matcher_tag_value)
    && let Some(groups) = pattern.captures(value)
  {
    let captured = groups
      .iter()
      .skip(1)
      .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
      .collect();
    return (true, captured);
  }
  (false, Vec::new())
}

/// Country filter of a matcher; the explicit `world` include always passes.
#[derive(Debug, Clone, Default)]
pub struct LocationRestrictions {
  include: Vec<String>,
  exclude: Vec<String>,
}

impl LocationRestrictions {
  #[must_use]
  pub fn matches(&self, country: &str) -> bool {
    if self.exclude.iter().any(|excluded| excluded == country) {
      return false;
    }
    if !self.include.is_empty()
      && self.include != ["world"]
      && !self.include.iter().any(|included| included == country)
    {
      return false;
    }
    true
  }
}

/// Tag matching.
#[derive(Debug, Clone, Default)]
pub struct Matcher {
  pub tags: BTreeMap<String, String>,
  pub exception: BTreeMap<String, String>,
  pub start_zoom_level: Option<f64>,
  pub replace_shapes: bool,
  pub location_restrictions: LocationRestrictions,
}

impl Matcher {
  /// Whether the zoom level is high enough for this matcher.
  #[must_use]
  pub fn check_zoom_level(&self, zoom_level: f64) -> bool {
    self.start_zoom_level.is_none_or(|start| zoom_level >= start)
  }

  /// Check whether element tags match; on success the result carries regex
  /// capture groups keyed `#<tag key><index>` for shape id substitution.
  #[must_use]
  pub fn is_matched(
    &self,
    tags: &Tags,
    country: Option<&str>,
  ) -> (bool, BTreeMap<String, String>) {
    let mut groups: BTreeMap<String, String> = BTreeMap::new();

    if let Some(country) = country
      && !self.location_restrictions.matches(country)
    {
      return (false, BTreeMap::new());
    }

    for (key, value) in &self.tags {
      let (matched, captured) = is_matched_tag(key, value, tags);
      if !matched {
        return (false, BTreeMap::new());
      }
      for (index, element) in captured.into_iter().enumerate() {
        groups.insert(format!("#{key}{index}"), element);
      }
    }

    for (key, value) in &self.exception {
      let (matched, _) = is_matched_tag(key, value, tags);
      if matched {
        return (false, BTreeMap::new());
      }
    }

    (true, groups)
  }
}

/// Matcher that produces icons for nodes and area centers.
#[derive(Debug, Clone)]
pub struct NodeMatcher {
  pub matcher: Matcher,
  pub draw: bool,
  pub shapes: Option<Vec<ShapeDescriptor>>,
  pub over_icon: Option<Vec<ShapeDescriptor>>,
  pub add_shapes: Option<Vec<ShapeDescriptor>>,
  /// Expansion hints used only by icon grid generation.
  pub under_icon: Option<Vec<ShapeDescriptor>>,
  pub with_icon: Option<Vec<ShapeDescriptor>>,
  pub set_main_color: Option<String>,
  pub set_opacity: Option<f64>,
}

/// Matcher that produces line styles for ways.
#[derive(Debug, Clone)]
pub struct WayMatcher {
  pub matcher: Matcher,
  pub style: BTreeMap<String, String>,
  pub priority: f64,
  pub parallel_offset: f64,
}

/// Matcher that classifies highways.
#[derive(Debug, Clone)]
pub struct RoadMatcher {
  pub matcher: Matcher,
  pub border_color: Color,
  pub color: Color,
  pub default_width: f64,
  pub priority: f64,
}

/// One shape inside an icon description.
#[derive(Debug, Clone)]
pub struct ShapeDescriptor {
  pub shape: String,
  pub color: Option<String>,
  pub offset: Vec2,
  pub flip_horizontally: bool,
  pub flip_vertically: bool,
  pub outline: bool,
}

// Raw serde structures mirroring the YAML scheme file.

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct SchemeContent {
  colors: BTreeMap<String, RawColorSpec>,
  material_colors: BTreeMap<String, String>,
  node_icons: Vec<RawNodeIconGroup>,
  ways: Vec<RawWayMatcher>,
  roads: Vec<RawRoadMatcher>,
  area_tags: Vec<RawMatcher>,
  keys_to_write: Vec<String>,
  prefix_to_write: Vec<String>,
  keys_to_skip: Vec<String>,
  prefix_to_skip: Vec<String>,
  tags_to_skip: BTreeMap<String, String>,
  options: RawOptions,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawColorSpec {
  Name(String),
  Derived { color: String, darken: f64 },
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawStringList {
  One(String),
  Many(Vec<String>),
}

impl RawStringList {
  fn into_vec(self) -> Vec<String> {
    match self {
      RawStringList::One(value) => vec![value],
      RawStringList::Many(values) => values,
    }
  }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawLocationRestrictions {
  include: Option<RawStringList>,
  exclude: Option<RawStringList>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawMatcher {
  tags: BTreeMap<String, String>,
  exception: BTreeMap<String, String>,
  replace_shapes: Option<bool>,
  location_restrictions: Option<RawLocationRestrictions>,
}

impl RawMatcher {
  fn into_matcher(self, start_zoom_level: Option<f64>) -> Matcher {
    let location_restrictions = self.location_restrictions.map_or_else(
      LocationRestrictions::default,
      |raw| LocationRestrictions {
        include: raw.include.map(RawStringList::into_vec).unwrap_or_default(),
        exclude: raw.exclude.map(RawStringList::into_vec).unwrap_or_default(),
      },
    );
    Matcher {
      tags: self.tags,
      exception: self.exception,
      start_zoom_level,
      replace_shapes: self.replace_shapes.unwrap_or(true),
      location_restrictions,
    }
  }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawNodeIconGroup {
  start_zoom_level: Option<f64>,
  tags: Vec<RawNodeMatcher>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawNodeMatcher {
  #[serde(flatten)]
  matcher: RawMatcher,
  draw: Option<bool>,
  shapes: Option<Vec<RawShapeDescriptor>>,
  over_icon: Option<Vec<RawShapeDescriptor>>,
  add_shapes: Option<Vec<RawShapeDescriptor>>,
  under_icon: Option<Vec<RawShapeDescriptor>>,
  with_icon: Option<Vec<RawShapeDescriptor>>,
  set_main_color: Option<String>,
  set_opacity: Option<f64>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
enum RawShapeDescriptor {
  Id(String),
  Full {
    shape: String,
    #[serde(default)]
    color: Option<String>,
    #[serde(default)]
    offset: Option<[f64; 2]>,
    #[serde(default)]
    flip_horizontally: Option<bool>,
    #[serde(default)]
    flip_vertically: Option<bool>,
    #[serde(default)]
    outline: Option<bool>,
  },
}

impl RawShapeDescriptor {
  fn into_descriptor(self) -> ShapeDescriptor {
    match self {
      RawShapeDescriptor::Id(shape) => ShapeDescriptor {
        shape,
        color: None,
        offset: Vec2::default(),
        flip_horizontally: false,
        flip_vertically: false,
        outline: true,
      },
      RawShapeDescriptor::Full { shape, color, offset, flip_horizontally, flip_vertically, outline } => {
        ShapeDescriptor {
          shape,
          color,
          offset: offset.map_or_else(Vec2::default, |[x, y]| Vec2::new(x, y)),
          flip_horizontally: flip_horizontally.unwrap_or(false),
          flip_vertically: flip_vertically.unwrap_or(false),
          outline: outline.unwrap_or(true),
        }
      }
    }
  }
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawWayMatcher {
  #[serde(flatten)]
  matcher: RawMatcher,
  style: BTreeMap<String, serde_yaml::Value>,
  priority: Option<f64>,
  parallel_offset: Option<f64>,
}

#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct RawRoadMatcher {
  #[serde(flatten)]
  matcher: RawMatcher,
  border_color: String,
  color: Option<String>,
  default_width: f64,
  priority: Option<f64>,
}

#[derive(Deserialize, Debug)]
#[serde(default)]
struct RawOptions {
  draw_nodes: bool,
  draw_buildings: bool,
  draw_trees: bool,
  draw_craters: bool,
  draw_directions: bool,
}

impl Default for RawOptions {
  fn default() -> Self {
    Self {
      draw_nodes: true,
      draw_buildings: true,
      draw_trees: true,
      draw_craters: true,
      draw_directions: true,
    }
  }
}

fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
  match value {
    serde_yaml::Value::String(string) => string.clone(),
    serde_yaml::Value::Number(number) => number.to_string(),
    serde_yaml::Value::Bool(boolean) => boolean.to_string(),
    _ => String::new(),
  }
}

/// Map style: colors and rules to draw icons, lines, and roads for
/// OpenStreetMap tags.
#[derive(Debug, Default)]
pub struct Scheme {
  pub node_matchers: Vec<NodeMatcher>,
  pub way_matchers: Vec<WayMatcher>,
  pub road_matchers: Vec<RoadMatcher>,
  pub area_matchers: Vec<Matcher>,

  colors: BTreeMap<String, RawColorSpec>,
  pub material_colors: BTreeMap<String, String>,

  keys_to_write: Vec<String>,
  prefix_to_write: Vec<String>,
  keys_to_skip: Vec<String>,
  prefix_to_skip: Vec<String>,
  tags_to_skip: BTreeMap<String, String>,

  pub draw_nodes: bool,
  pub draw_buildings: bool,
  pub draw_trees: bool,
  pub draw_craters: bool,
  pub draw_directions: bool,

  /// Storage for created icon sets, keyed by the order-sensitive tag hash.
  cache: RefCell<HashMap<String, (IconSet, i32)>>,
}

impl Scheme {
  pub fn from_file(file_name: &Path) -> Result<Self, SchemeError> {
    let text = std::fs::read_to_string(file_name)?;
    Self::from_text(&text)
  }

  pub fn from_text(text: &str) -> Result<Self, SchemeError> {
    let content: SchemeContent = serde_yaml::from_str(text)?;
    Ok(Self::from_content(content))
  }

  fn from_content(content: SchemeContent) -> Self {
    let mut scheme = Self {
      colors: content.colors,
      material_colors: content.material_colors,
      keys_to_write: content.keys_to_write,
      prefix_to_write: content.prefix_to_write,
      keys_to_skip: content.keys_to_skip,
      prefix_to_skip: content.prefix_to_skip,
      tags_to_skip: content.tags_to_skip,
      draw_nodes: content.options.draw_nodes,
      draw_buildings: content.options.draw_buildings,
      draw_trees: content.options.draw_trees,
      draw_craters: content.options.draw_craters,
      draw_directions: content.options.draw_directions,
      ..Self::default()
    };

    for group in content.node_icons {
      let start_zoom_level = group.start_zoom_level;
      for element in group.tags {
        scheme.node_matchers.push(NodeMatcher {
          matcher: element.matcher.into_matcher(start_zoom_level),
          draw: element.draw.unwrap_or(true),
          shapes: element
            .shapes
            .map(|shapes| shapes.into_iter().map(RawShapeDescriptor::into_descriptor).collect()),
          over_icon: element
            .over_icon
            .map(|shapes| shapes.into_iter().map(RawShapeDescriptor::into_descriptor).collect()),
          add_shapes: element
            .add_shapes
            .map(|shapes| shapes.into_iter().map(RawShapeDescriptor::into_descriptor).collect()),
          under_icon: element
            .under_icon
            .map(|shapes| shapes.into_iter().map(RawShapeDescriptor::into_descriptor).collect()),
          with_icon: element
            .with_icon
            .map(|shapes| shapes.into_iter().map(RawShapeDescriptor::into_descriptor).collect()),
          set_main_color: element.set_main_color,
          set_opacity: element.set_opacity,
        });
      }
    }

    for element in content.ways {
      let mut style: BTreeMap<String, String> =
        BTreeMap::from([("fill".to_string(), "none".to_string())]);
      for (key, value) in &element.style {
        let value_text = yaml_value_to_string(value);
        if value_text.ends_with("_color") {
          style.insert(key.clone(), scheme.get_color(&value_text).to_hex());
        } else {
          style.insert(key.clone(), value_text);
        }
      }
      scheme.way_matchers.push(WayMatcher {
        matcher: element.matcher.into_matcher(None),
        style,
        priority: element.priority.unwrap_or(0.0),
        parallel_offset: element.parallel_offset.unwrap_or(0.0),
      });
    }

    for element in content.roads {
      let border_color = scheme.get_color(&element.border_color);
      let color = element
        .color
        .map_or_else(|| scheme.get_color("road_color"), |color| scheme.get_color(&color));
      scheme.road_matchers.push(RoadMatcher {
        matcher: element.matcher.into_matcher(None),
        border_color,
        color,
        default_width: element.default_width,
        priority: element.priority.unwrap_or(0.0),
      });
    }

    scheme.area_matchers =
      content.area_tags.into_iter().map(|raw| raw.into_matcher(None)).collect();

    scheme
  }

  /// Resolve a color name through the palette, falling back to the `default`
  /// palette entry (or black) for unknown colors.
  #[must_use]
  pub fn get_color(&self, color: &str) -> Color {
    match self.colors.get(color) {
      Some(RawColorSpec::Name(name)) => {
        if let Some(parsed) = Color::parse(name) {
          return parsed;
        }
      }
      Some(RawColorSpec::Derived { color: base, darken }) => {
        let base_color = self.get_color(base);
        return base_color.with_luminance(base_color.luminance() * (1.0 - darken));
      }
      None => {}
    }

    if let Some(RawColorSpec::Name(name)) = self.colors.get(&color.to_lowercase())
      && let Some(parsed) = Color::parse(name)
    {
      return parsed;
    }

    if let Some(parsed) = Color::parse(color) {
      return parsed;
    }

    debug!("Unknown color `{color}`.");
    if let Some(RawColorSpec::Name(name)) = self.colors.get("default")
      && let Some(parsed) = Color::parse(name)
    {
      return parsed;
    }
    DEFAULT_COLOR
  }

  /// Default color for a main icon.
  #[must_use]
  pub fn get_default_color(&self) -> Color {
    self.get_color("default")
  }

  /// Default color for an extra icon.
  #[must_use]
  pub fn get_extra_color(&self) -> Color {
    self.get_color("extra")
  }

  /// Whether the key should not be represented on the map at all, neither as
  /// an icon nor as text.
  #[must_use]
  pub fn is_no_drawable(&self, key: &str, value: &str) -> bool {
    if self.keys_to_write.iter().chain(&self.keys_to_skip).any(|known| known == key)
      || self.tags_to_skip.get(key).is_some_and(|skipped| skipped == value)
    {
      return true;
    }
    if let Some((prefix, _)) = key.split_once(':')
      && self.prefix_to_write.iter().chain(&self.prefix_to_skip).any(|known| known == prefix)
    {
      return true;
    }
    false
  }

  /// Whether the key should be represented on the map as text.
  #[must_use]
  pub fn is_writable(&self, key: &str, value: &str) -> bool {
    if self.keys_to_skip.iter().any(|skipped| skipped == key)
      || self.tags_to_skip.get(key).is_some_and(|skipped| skipped == value)
    {
      return false;
    }
    if self.keys_to_write.iter().any(|written| written == key) {
      return true;
    }
    let prefix = key.split_once(':').map(|(prefix, _)| prefix);
    if let Some(prefix) = prefix {
      if self.prefix_to_skip.iter().any(|skipped| skipped == prefix) {
        return false;
      }
      if self.prefix_to_write.iter().any(|written| written == prefix) {
        return true;
      }
    }
    false
  }

  /// Mark all ignored tags as processed.
  pub fn process_ignored(&self, tags: &Tags, processed: &mut BTreeSet<String>) {
    for (key, value) in tags {
      if self.is_no_drawable(key, value) {
        processed.insert(key.clone());
      }
    }
  }

  /// Construct an icon set for the tags.
  ///
  /// Returns the icon set together with its priority, or `None` when a
  /// matching matcher requires a higher zoom level. Results are cached for
  /// the lifetime of the scheme, keyed by the tag hash string.
  #[must_use]
  #[allow(clippy::too_many_lines, clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
  pub fn get_icon(
    &self,
    extractor: &ShapeExtractor,
    tags: &Tags,
    processed: &mut BTreeSet<String>,
    country: Option<&str>,
    zoom_level: f64,
    ignore_level_matching: bool,
    show_overlapped: bool,
  ) -> Option<(IconSet, i32)> {
    let tags_hash = format!("{}:{}", tags.keys().join(","), tags.values().join(","));
    if let Some((icon_set, priority)) = self.cache.borrow().get(&tags_hash) {
      processed.extend(icon_set.processed.iter().cloned());
      return Some((icon_set.clone(), *priority));
    }

    let mut main_icon: Option<Icon> = None;
    let mut extra_icons: Vec<Icon> = Vec::new();
    let mut priority: i32 = 0;
    let mut color: Option<Color> = None;

    for (index, node_matcher) in self.node_matchers.iter().enumerate() {
      if !node_matcher.matcher.replace_shapes && main_icon.is_some() {
        continue;
      }
      let (matching, groups) = node_matcher.matcher.is_matched(tags, country);
      if !matching {
        continue;
      }
      if !ignore_level_matching && !node_matcher.matcher.check_zoom_level(zoom_level) {
        return None;
      }
      let matcher_tags: Vec<&String> = node_matcher.matcher.tags.keys().collect();
      priority = (self.node_matchers.len() - index) as i32;
      if !node_matcher.draw {
        processed.extend(matcher_tags.iter().map(|key| (*key).clone()));
      }
      if let Some(shapes) = &node_matcher.shapes {
        let specifications = shapes
          .iter()
          .map(|descriptor| self.get_shape_specification(descriptor, extractor, Some(&groups), None))
          .collect();
        main_icon = Some(Icon::new(specifications));
        processed.extend(matcher_tags.iter().map(|key| (*key).clone()));
      }
      if let Some(over_icon) = &node_matcher.over_icon
        && let Some(icon) = &mut main_icon
      {
        let specifications = over_icon
          .iter()
          .map(|descriptor| self.get_shape_specification(descriptor, extractor, None, None))
          .collect();
        icon.add_specifications(specifications);
        processed.extend(matcher_tags.iter().map(|key| (*key).clone()));
      }
      if let Some(add_shapes) = &node_matcher.add_shapes {
        let specifications = add_shapes
          .iter()
          .map(|descriptor| {
            self.get_shape_specification(descriptor, extractor, None, Some(self.get_extra_color()))
          })
          .collect();
        extra_icons.push(Icon::new(specifications));
        processed.extend(matcher_tags.iter().map(|key| (*key).clone()));
      }
      if let Some(main_color) = &node_matcher.set_main_color
        && main_icon.is_some()
      {
        color = Some(self.get_color(main_color));
      }
      if let Some(opacity) = node_matcher.set_opacity
        && let Some(icon) = &mut main_icon
      {
        icon.opacity = opacity;
      }
    }

    if let Some(material) = tags.get("material")
      && let Some(material_color) = self.material_colors.get(material)
    {
      color = Some(self.get_color(material_color));
      processed.insert("material".to_string());
    }

    for tag_key in tags.keys() {
      if tag_key.ends_with(":color") || tag_key.ends_with(":colour") {
        color = Some(self.get_color(&tags[tag_key]));
        processed.insert(tag_key.clone());
      }
    }

    for color_tag_key in ["colour", "color", "building:colour"] {
      if let Some(value) = tags.get(color_tag_key) {
        color = Some(self.get_color(value));
        processed.insert(color_tag_key.to_string());
      }
    }

    let mut main_icon: Icon = main_icon.unwrap_or_else(|| {
      Icon::new(vec![ShapeSpecification::new(
        extractor.get_shape(DEFAULT_SHAPE_ID).clone(),
        self.get_color("default"),
      )])
    });

    if let Some(color) = color {
      main_icon.recolor(color, None);
    }

    let default_icon: Option<Icon> = show_overlapped.then(|| {
      Icon::new(vec![ShapeSpecification::new(
        extractor.get_shape(DEFAULT_SMALL_SHAPE_ID).clone(),
        color.unwrap_or_else(|| self.get_color("default")),
      )])
    });

    for key in ["direction", "camera:direction"] {
      if let Some(value) = tags.get(key) {
        let is_right = DirectionSet::new(value).is_right();
        for specification in &mut main_icon.shape_specifications {
          if let (Some(is_right), Some(shape_right)) =
            (is_right, specification.shape.is_right_directed)
            && is_right != shape_right
          {
            specification.flip_horizontally = true;
          }
        }
      }
    }

    let returned =
      IconSet { main_icon, extra_icons, default_icon, processed: processed.clone() };
    self.cache.borrow_mut().insert(tags_hash, (returned.clone(), priority));

    Some((returned, priority))
  }

  /// All way line styles matching the tags; multiple styles compose for a
  /// single way.
  #[must_use]
  pub fn get_style(&self, tags: &Tags) -> Vec<LineStyle> {
    let mut line_styles: Vec<LineStyle> = Vec::new();
    for way_matcher in &self.way_matchers {
      let (matching, _) = way_matcher.matcher.is_matched(tags, None);
      if !matching {
        continue;
      }
      line_styles.push(LineStyle {
        style: way_matcher.style.clone(),
        parallel_offset: way_matcher.parallel_offset,
        priority: way_matcher.priority,
      });
    }
    line_styles
  }

  /// The first road matcher matching the tags.
  #[must_use]
  pub fn get_road(&self, tags: &Tags) -> Option<&RoadMatcher> {
    self
      .road_matchers
      .iter()
      .find(|road_matcher| road_matcher.matcher.is_matched(tags, None).0)
  }

  /// Whether the way described by the tags is an area.
  #[must_use]
  pub fn is_area(&self, tags: &Tags) -> bool {
    self.area_matchers.iter().any(|matcher| matcher.is_matched(tags, None).0)
  }

  /// Resolve a shape descriptor into a drawable specification, substituting
  /// regex capture groups into the shape identifier.
  fn get_shape_specification(
    &self,
    descriptor: &ShapeDescriptor,
    extractor: &ShapeExtractor,
    groups: Option<&BTreeMap<String, String>>,
    color: Option<Color>,
  ) -> ShapeSpecification {
    let mut shape_id = descriptor.shape.clone();
    if let Some(groups) = groups {
      for (key, value) in groups {
        shape_id = shape_id.replace(key, value);
      }
    }
    let shape = extractor.get_shape(&shape_id).clone();
    let color = descriptor
      .color
      .as_ref()
      .map_or_else(|| color.unwrap_or_else(|| self.get_color("default")), |name| self.get_color(name));

    ShapeSpecification {
      shape,
      color,
      offset: descriptor.offset,
      flip_horizontally: descriptor.flip_horizontally,
      flip_vertically: descriptor.flip_vertically,
      use_outline: descriptor.outline,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TEST_ICONS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
    <path id="default" d="M 4,4 L 12,12"/>
    <path id="default_small" d="M 6,6 L 10,10"/>
    <path id="tree" d="M 2 2 L 14 14"/>
    <path id="tree_with_leaf" d="M 2 2 L 14 14"/>
    <path id="barrier_gate" d="M 1 1 L 15 15"/>
    <path id="lock" d="M 1 1 L 15 15"/>
    <path id="bicycle" d="M 1 1 L 15 15"/>
  </svg>"##;

  const TEST_CONFIGURATION: &str = r#"{
    "default": {"name": "default"},
    "default_small": {"name": "default small"},
    "tree": {"name": "tree"},
    "tree_with_leaf": {"name": "tree with leaf"},
    "barrier_gate": {"name": "gate"},
    "lock": {"name": "lock"},
    "bicycle": {"name": "bicycle"}
  }"#;

  const TEST_SCHEME: &str = r##"
colors:
  default: "#444444"
  extra: "#888888"
  tree_color: "#98AC64"
  grass_color: "#CFE0A8"
  grass_border_color: "#BFD098"
  grass_dark_color: {color: grass_color, darken: 0.1}
  road_color: "#FFFFFF"
node_icons:
  - tags:
      - tags: {natural: tree}
        shapes: [{shape: tree, color: tree_color}]
      - tags: {natural: "^tree_(.*)$"}
        shapes: ["tree_#natural0"]
      - tags: {barrier: gate}
        shapes: [barrier_gate]
      - tags: {access: private}
        add_shapes: [lock]
      - tags: {bicycle: "*"}
        add_shapes: [bicycle]
      - tags: {highway: bus_stop}
        shapes: [default]
  - start_zoom_level: 12
    tags:
      - tags: {natural: peak}
        shapes: [default]
ways:
  - tags: {landuse: grass}
    style: {fill: grass_color, stroke: grass_border_color}
    priority: 20
roads:
  - tags: {highway: primary}
    border_color: "#AA8800"
    color: "#FFDD66"
    default_width: 7
    priority: 50
area_tags:
  - tags: {landuse: "*"}
keys_to_write: [description]
prefix_to_write: [operator]
keys_to_skip: [source]
prefix_to_skip: [source]
"##;

  fn scheme() -> Scheme {
    Scheme::from_text(TEST_SCHEME).unwrap()
  }

  fn extractor() -> ShapeExtractor {
    ShapeExtractor::from_texts(TEST_ICONS, TEST_CONFIGURATION).unwrap()
  }

  fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
  }

  fn get_icon(scheme: &Scheme, tags: &Tags) -> Option<(IconSet, i32)> {
    let mut processed = BTreeSet::new();
    scheme.get_icon(&extractor(), tags, &mut processed, None, 18.0, false, false)
  }

  #[test]
  fn tree_icon() {
    let scheme = scheme();
    let (icon_set, _) = get_icon(&scheme, &tags(&[("natural", "tree")])).unwrap();
    assert_eq!(icon_set.main_icon.shape_specifications.len(), 1);
    assert_eq!(icon_set.main_icon.shape_specifications[0].shape.id_, "tree");
    assert_eq!(
      icon_set.main_icon.shape_specifications[0].color,
      Color::from_hex("#98AC64").unwrap()
    );
    assert!(icon_set.extra_icons.is_empty());
  }

  #[test]
  fn unknown_tags_give_default_icon() {
    let scheme = scheme();
    let (icon_set, priority) = get_icon(&scheme, &tags(&[("aaa", "bbb")])).unwrap();
    assert!(icon_set.main_icon.is_default());
    assert_eq!(priority, 0);
  }

  #[test]
  fn regex_capture_is_substituted_into_shape_id() {
    let scheme = scheme();
    let (icon_set, _) =
      get_icon(&scheme, &tags(&[("natural", "tree_with_leaf")])).unwrap();
    assert_eq!(icon_set.main_icon.shape_specifications[0].shape.id_, "tree_with_leaf");
  }

  #[test]
  fn gate_with_private_access_and_bicycle() {
    let scheme = scheme();
    let (icon_set, _) = get_icon(
      &scheme,
      &tags(&[("barrier", "gate"), ("access", "private"), ("bicycle", "yes")]),
    )
    .unwrap();
    assert_eq!(icon_set.main_icon.shape_specifications[0].shape.id_, "barrier_gate");
    assert_eq!(icon_set.extra_icons.len(), 2);
  }

  #[test]
  fn earlier_matcher_wins_priority() {
    let scheme = scheme();
    let (_, tree_priority) = get_icon(&scheme, &tags(&[("natural", "tree")])).unwrap();
    let (_, stop_priority) = get_icon(&scheme, &tags(&[("highway", "bus_stop")])).unwrap();
    assert!(tree_priority > stop_priority);
  }

  #[test]
  fn start_zoom_level_suppresses_icon() {
    let scheme = scheme();
    let extractor = extractor();
    let peak = tags(&[("natural", "peak")]);
    let mut processed = BTreeSet::new();
    assert!(
      scheme.get_icon(&extractor, &peak, &mut processed, None, 10.0, false, false).is_none()
    );
    assert!(
      scheme.get_icon(&extractor, &peak, &mut processed, None, 14.0, false, false).is_some()
    );
  }

  #[test]
  fn icon_cache_returns_processed_keys() {
    let scheme = scheme();
    let extractor = extractor();
    let tree = tags(&[("natural", "tree")]);

    let mut processed_first = BTreeSet::new();
    let _ = scheme.get_icon(&extractor, &tree, &mut processed_first, None, 18.0, false, false);
    let mut processed_second = BTreeSet::new();
    let _ = scheme.get_icon(&extractor, &tree, &mut processed_second, None, 18.0, false, false);
    assert_eq!(processed_first, processed_second);
    assert!(processed_second.contains("natural"));
  }

  #[test]
  fn grass_area_style() {
    let scheme = scheme();
    let styles = scheme.get_style(&tags(&[("landuse", "grass")]));
    assert_eq!(styles.len(), 1);
    assert_eq!(styles[0].style["fill"], "#CFE0A8");
    assert_eq!(styles[0].style["stroke"], "#BFD098");
    assert!(scheme.is_area(&tags(&[("landuse", "grass")])));
  }

  #[test]
  fn derived_color_is_darkened() {
    let scheme = scheme();
    let base = scheme.get_color("grass_color");
    let darkened = scheme.get_color("grass_dark_color");
    assert!(darkened.luminance() < base.luminance());
    assert!((darkened.luminance() - base.luminance() * 0.9).abs() < 1e-9);
  }

  #[test]
  fn road_lookup() {
    let scheme = scheme();
    assert!(scheme.get_road(&tags(&[("highway", "primary")])).is_some());
    assert!(scheme.get_road(&tags(&[("highway", "footway")])).is_none());
  }

  #[test]
  fn writable_and_skippable_keys() {
    let scheme = scheme();
    assert!(scheme.is_writable("description", "text"));
    assert!(scheme.is_writable("operator:type", "private"));
    assert!(!scheme.is_writable("source", "survey"));
    assert!(!scheme.is_writable("source:date", "2021"));
    assert!(scheme.is_no_drawable("description", "text"));
    assert!(scheme.is_no_drawable("source", "survey"));
    assert!(!scheme.is_no_drawable("name", "A"));
  }

  #[test]
  fn location_restrictions() {
    let mut restrictions = LocationRestrictions::default();
    assert!(restrictions.matches("de"));
    restrictions.include = vec!["world".to_string()];
    assert!(restrictions.matches("de"));
    restrictions.include = vec!["us".to_string()];
    assert!(!restrictions.matches("de"));
    restrictions.include = vec!["world".to_string()];
    restrictions.exclude = vec!["de".to_string()];
    assert!(!restrictions.matches("de"));
  }
}
