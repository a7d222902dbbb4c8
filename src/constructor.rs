use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use sha2::{Digest, Sha256};

use crate::color::{Color, get_gradient_color};
use crate::config::{BuildingMode, DrawingMode, MapConfiguration};
use crate::feature::building::{BUILDING_SCALE, Building};
use crate::feature::crater::Crater;
use crate::feature::direction::DirectionSector;
use crate::feature::road::{Road, Roads};
use crate::feature::tree::Tree;
use crate::figure::StyledFigure;
use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{GeoCoordinate, Vec2};
use crate::icon::{DEFAULT_SMALL_SHAPE_ID, Icon, IconSet, ShapeExtractor, ShapeSpecification};
use crate::osm::reader::{
  ElementMetadata, MinMax, OSMData, OSMNode, OSMWay, Tags, parse_levels,
};
use crate::point::Point;
use crate::scheme::LineStyle;
use crate::text::TextConstructor;

const TIME_COLOR_SCALE: [&str; 6] =
  ["#581845", "#900C3F", "#C70039", "#FF5733", "#FFC300", "#DAF7A6"];

/// Geometric center of a node set: the projected point and the geographic
/// coordinates.
fn line_center(nodes: &[OSMNode], flinger: &Flinger) -> (Vec2, GeoCoordinate) {
  let mut latitudes: MinMax<f64> = MinMax::default();
  let mut longitudes: MinMax<f64> = MinMax::default();
  for node in nodes {
    latitudes.update(node.coordinates.lat);
    longitudes.update(node.coordinates.lon);
  }
  let center = GeoCoordinate::new(
    (latitudes.min_.unwrap_or_default() + latitudes.max_.unwrap_or_default()) / 2.0,
    (longitudes.min_.unwrap_or_default() + longitudes.max_.unwrap_or_default()) / 2.0,
  );
  (flinger.fling(center), center)
}

/// Generate a pseudo-random color based on the author name.
fn get_user_color(text: &str, seed: &str) -> Color {
  if text.is_empty() {
    return Color::BLACK;
  }
  let digest = format!("{:x}", Sha256::digest(format!("{seed}{text}").as_bytes()));
  Color::from_hex(&digest[digest.len() - 6..]).unwrap_or(Color::BLACK)
}

/// Generate a color based on the element creation time within the time span
/// of the whole map.
fn get_time_color(time: Option<DateTime<Utc>>, boundaries: &MinMax<DateTime<Utc>>) -> Color {
  let scale: Vec<Color> =
    TIME_COLOR_SCALE.iter().map(|hex| Color::from_hex(hex).expect("verified hex")).collect();
  let (Some(min_), Some(max_)) = (boundaries.min_, boundaries.max_) else {
    return get_gradient_color(0.0, &scale);
  };
  let time = time.unwrap_or(max_);
  #[allow(clippy::cast_precision_loss)]
  let coefficient = if boundaries.is_empty() {
    0.0
  } else {
    (time - min_).num_seconds() as f64 / (max_ - min_).num_seconds() as f64
  };
  get_gradient_color(coefficient, &scale)
}

/// Whether the way is a cycle or an area boundary.
fn is_cycle(nodes: &[OSMNode]) -> bool {
  nodes[0] == nodes[nodes.len() - 1]
}

/// Create a new combined node chain if the ways share an endpoint.
fn try_to_glue(nodes: &[OSMNode], other: &[OSMNode]) -> Option<Vec<OSMNode>> {
  if nodes[0] == other[0] {
    let mut result: Vec<OSMNode> = other[1..].iter().rev().cloned().collect();
    result.extend_from_slice(nodes);
    return Some(result);
  }
  if nodes[0] == other[other.len() - 1] {
    let mut result = other[..other.len() - 1].to_vec();
    result.extend_from_slice(nodes);
    return Some(result);
  }
  if nodes[nodes.len() - 1] == other[other.len() - 1] {
    let mut result = nodes.to_vec();
    result.extend(other[..other.len() - 1].iter().rev().cloned());
    return Some(result);
  }
  if nodes[nodes.len() - 1] == other[0] {
    let mut result = nodes.to_vec();
    result.extend_from_slice(&other[1..]);
    return Some(result);
  }
  None
}

/// Try to glue ways that share endpoints.
///
/// Ways whose endpoints never line up stay in the result as open chains;
/// callers must not assume every returned ring is closed.
fn glue(ways: &[&OSMWay]) -> Vec<Vec<OSMNode>> {
  let mut result: Vec<Vec<OSMNode>> = Vec::new();
  let mut to_process: Vec<Vec<OSMNode>> = Vec::new();

  for way in ways {
    if way.is_cycle() {
      result.push(way.nodes.clone());
    } else {
      to_process.push(way.nodes.clone());
    }
  }

  while let Some(nodes) = to_process.pop() {
    let mut glued: Option<Vec<OSMNode>> = None;
    let mut glued_index = 0;

    for (index, other_nodes) in to_process.iter().enumerate() {
      glued = try_to_glue(&nodes, other_nodes);
      if glued.is_some() {
        glued_index = index;
        break;
      }
    }

    match glued {
      Some(glued) => {
        to_process.remove(glued_index);
        if is_cycle(&glued) {
          result.push(glued);
        } else {
          to_process.push(glued);
        }
      }
      None => result.push(nodes),
    }
  }

  result
}

enum LevelFilter {
  All,
  Overground,
  Underground,
  Number(f64),
}

impl LevelFilter {
  fn from_text(level: &str) -> Self {
    match level {
      "all" => LevelFilter::All,
      "overground" => LevelFilter::Overground,
      "underground" => LevelFilter::Underground,
      number => match number.parse::<f64>() {
        Ok(number) => LevelFilter::Number(number),
        Err(_) => {
          warn!("Unknown level specification `{level}`, drawing all levels.");
          LevelFilter::All
        }
      },
    }
  }

  fn check(&self, tags: &Tags) -> bool {
    match self {
      LevelFilter::All => true,
      LevelFilter::Overground => check_level_overground(tags),
      LevelFilter::Underground => !check_level_overground(tags),
      LevelFilter::Number(level) => check_level_number(tags, *level),
    }
  }
}

/// Whether the element described by the tags is on the given level.
fn check_level_number(tags: &Tags, level: f64) -> bool {
  tags.get("level").is_some_and(|value| parse_levels(value).contains(&level))
}

/// Whether the element described by the tags is overground.
fn check_level_overground(tags: &Tags) -> bool {
  if let Some(value) = tags.get("level") {
    let levels: Result<Vec<f64>, _> =
      value.replace(',', ".").split(';').map(str::parse::<f64>).collect();
    if let Ok(levels) = levels
      && levels.iter().any(|level| *level < 0.0)
    {
      return false;
    }
  }

  tags.get("location").is_none_or(|value| value != "underground")
    && tags.get("parking").is_none_or(|value| value != "underground")
    && tags.get("tunnel").is_none_or(|value| value != "yes")
}

/// Node and way constructor: walks the parsed map and materializes drawable
/// primitives.
pub struct Constructor<'a> {
  osm_data: &'a OSMData,
  pub flinger: &'a Flinger,
  extractor: &'a ShapeExtractor,
  configuration: &'a MapConfiguration,
  level_filter: LevelFilter,

  pub points: Vec<Point>,
  pub figures: Vec<StyledFigure>,
  pub buildings: Vec<Building>,
  pub roads: Roads,
  pub trees: Vec<Tree>,
  pub craters: Vec<Crater>,
  pub direction_sectors: Vec<DirectionSector>,
  /// Height bands used for isometric wall painting.
  pub heights: Vec<f64>,
}

impl<'a> Constructor<'a> {
  #[must_use]
  pub fn new(
    osm_data: &'a OSMData,
    flinger: &'a Flinger,
    extractor: &'a ShapeExtractor,
    configuration: &'a MapConfiguration,
  ) -> Self {
    Self {
      osm_data,
      flinger,
      extractor,
      configuration,
      level_filter: LevelFilter::from_text(&configuration.level),
      points: Vec::new(),
      figures: Vec::new(),
      buildings: Vec::new(),
      roads: Roads::default(),
      trees: Vec::new(),
      craters: Vec::new(),
      direction_sectors: Vec::new(),
      heights: vec![0.25 / BUILDING_SCALE, 0.5 / BUILDING_SCALE],
    }
  }

  fn add_height(&mut self, height: f64) {
    if !self.heights.iter().any(|known| (known - height).abs() < f64::EPSILON) {
      self.heights.push(height);
    }
  }

  fn add_building(&mut self, building: Building) {
    self.add_height(building.height);
    self.add_height(building.min_height);
    self.buildings.push(building);
  }

  /// Construct nodes, ways, and relations.
  pub fn construct(&mut self) {
    self.construct_ways();
    self.construct_relations();
    self.construct_nodes();
  }

  fn construct_ways(&mut self) {
    info!("Constructing ways...");
    for way in self.osm_data.ways.values() {
      self.construct_line(&way.tags, &way.metadata, &[], &[way.nodes.clone()]);
    }
  }

  fn construct_relations(&mut self) {
    for relation in self.osm_data.relations.values() {
      if !self.level_filter.check(&relation.tags) {
        continue;
      }
      if relation.tags.get("type").map(String::as_str) != Some("multipolygon") {
        continue;
      }
      let mut inner_ways: Vec<&OSMWay> = Vec::new();
      let mut outer_ways: Vec<&OSMWay> = Vec::new();
      for member in &relation.members {
        if member.type_ != "way" {
          continue;
        }
        match member.role.as_str() {
          "inner" => {
            if let Some(way) = self.osm_data.ways.get(&member.ref_) {
              inner_ways.push(way);
            }
          }
          "outer" => {
            if let Some(way) = self.osm_data.ways.get(&member.ref_) {
              outer_ways.push(way);
            }
          }
          role => warn!("Unknown member role `{role}`."),
        }
      }
      if !outer_ways.is_empty() {
        let inners = glue(&inner_ways);
        let outers = glue(&outer_ways);
        self.construct_line(&relation.tags, &relation.metadata, &inners, &outers);
      }
    }
  }

  /// Construct a way or a relation.
  #[allow(clippy::too_many_lines)]
  fn construct_line(
    &mut self,
    tags: &Tags,
    metadata: &ElementMetadata,
    inners: &[Vec<OSMNode>],
    outers: &[Vec<OSMNode>],
  ) {
    if outers.is_empty() || outers[0].is_empty() {
      return;
    }
    if !self.level_filter.check(tags) {
      return;
    }

    let (center_point, _) = line_center(&outers[0], self.flinger);

    if self.configuration.is_wireframe() {
      let color = match self.configuration.drawing_mode {
        DrawingMode::Author => get_user_color(
          metadata.user.as_deref().unwrap_or(""),
          &self.configuration.seed,
        ),
        DrawingMode::Time => get_time_color(metadata.timestamp, &self.osm_data.time),
        DrawingMode::White => Color::from_hex("#666666").expect("verified hex"),
        DrawingMode::Black => Color::from_hex("#BBBBBB").expect("verified hex"),
        DrawingMode::Normal => unreachable!("not a wireframe mode"),
      };
      self.draw_special_mode(tags, inners, outers, color);
      return;
    }

    if tags.is_empty() {
      return;
    }

    let building_mode = self.configuration.building_mode;
    if self.configuration.scheme.draw_buildings
      && (tags.contains_key("building")
        || (building_mode == BuildingMode::Isometric && tags.contains_key("building:part")))
    {
      self.add_building(Building::new(
        tags.clone(),
        inners,
        outers,
        self.flinger,
        &self.configuration.scheme,
      ));
    }

    if let Some(road_matcher) = self.configuration.scheme.get_road(tags) {
      self.roads.append(Road::new(
        tags.clone(),
        outers[0].clone(),
        road_matcher.clone(),
        self.flinger,
        &self.configuration.scheme,
      ));
      return;
    }

    let mut processed: BTreeSet<String> = BTreeSet::new();
    let mut recolor: Option<Color> = None;

    if tags.get("railway").map(String::as_str) == Some("subway") {
      for color_tag_key in ["color", "colour"] {
        if let Some(value) = tags.get(color_tag_key) {
          recolor = Some(self.configuration.scheme.get_color(value));
          processed.insert(color_tag_key.to_string());
        }
      }
    }

    let line_styles = self.configuration.scheme.get_style(tags);

    for mut line_style in line_styles {
      if let Some(recolor) = recolor {
        line_style.style.insert("stroke".to_string(), recolor.to_hex());
      }

      self.figures.push(StyledFigure::new(tags.clone(), inners, outers, line_style));

      let is_area_like = tags.get("area").map(String::as_str) == Some("yes")
        || tags.get("type").map(String::as_str) == Some("multipolygon")
        || (is_cycle(&outers[0])
          && tags.get("area").map(String::as_str) != Some("no")
          && self.configuration.scheme.is_area(tags));
      if !is_area_like {
        continue;
      }

      if let Some((icon_set, priority)) =
        self.configuration.get_icon(self.extractor, tags, &mut processed)
      {
        let labels = TextConstructor::new(&self.configuration.scheme).construct_text(
          tags,
          &mut processed,
          self.configuration.label_mode,
        );
        self.points.push(Point::new(
          icon_set,
          labels,
          tags.clone(),
          processed.clone(),
          center_point,
          f64::from(priority),
          false,
          true,
          self.configuration.show_tooltips,
        ));
      }
    }

    self.add_point_for_line(center_point, tags);
  }

  /// Add an icon at the center point of the way or relation.
  fn add_point_for_line(&mut self, center_point: Vec2, tags: &Tags) {
    let mut processed: BTreeSet<String> = BTreeSet::new();
    if let Some((icon_set, priority)) =
      self.configuration.get_icon(self.extractor, tags, &mut processed)
    {
      let labels = TextConstructor::new(&self.configuration.scheme).construct_text(
        tags,
        &mut processed,
        self.configuration.label_mode,
      );
      self.points.push(Point::new(
        icon_set,
        labels,
        tags.clone(),
        processed,
        center_point,
        f64::from(priority),
        false,
        true,
        self.configuration.show_tooltips,
      ));
    }
  }

  /// Add a figure for the author and time wireframe modes.
  fn draw_special_mode(
    &mut self,
    tags: &Tags,
    inners: &[Vec<OSMNode>],
    outers: &[Vec<OSMNode>],
    color: Color,
  ) {
    let style: std::collections::BTreeMap<String, String> = [
      ("fill".to_string(), "none".to_string()),
      ("stroke".to_string(), color.to_hex()),
      ("stroke-width".to_string(), "1".to_string()),
    ]
    .into();
    self.figures.push(StyledFigure::new(
      tags.clone(),
      inners,
      outers,
      LineStyle { style, parallel_offset: 0.0, priority: 0.0 },
    ));
  }

  fn construct_nodes(&mut self) {
    info!("Constructing nodes...");

    // Sort nodes vertically to draw them from top to bottom.
    let mut nodes: Vec<&OSMNode> = self.osm_data.nodes.values().collect();
    nodes.sort_by(|left, right| right.coordinates.lat.total_cmp(&left.coordinates.lat));
    for node in nodes {
      self.construct_node(node);
    }
  }

  /// Create a new point if needed and add it to the point collection.
  #[allow(clippy::too_many_lines)]
  fn construct_node(&mut self, node: &OSMNode) {
    let tags = &node.tags;

    if tags.is_empty() {
      return;
    }
    if !self.level_filter.check(tags) {
      return;
    }

    let mut processed: BTreeSet<String> = BTreeSet::new();
    let flung = self.flinger.fling(node.coordinates);

    if matches!(self.configuration.drawing_mode, DrawingMode::Author | DrawingMode::Time) {
      let color = match self.configuration.drawing_mode {
        DrawingMode::Author => get_user_color(
          node.metadata.user.as_deref().unwrap_or(""),
          &self.configuration.seed,
        ),
        _ => get_time_color(node.metadata.timestamp, &self.osm_data.time),
      };
      let dot = self.extractor.get_shape(DEFAULT_SMALL_SHAPE_ID).clone();
      let icon_set = IconSet {
        main_icon: Icon::new(vec![ShapeSpecification::new(dot.clone(), color)]),
        extra_icons: Vec::new(),
        default_icon: Some(Icon::new(vec![ShapeSpecification::new(dot, color)])),
        processed: BTreeSet::new(),
      };
      self.points.push(Point::new(
        icon_set,
        Vec::new(),
        tags.clone(),
        processed,
        flung,
        0.0,
        true,
        false,
        self.configuration.show_tooltips,
      ));
      return;
    }

    if matches!(self.configuration.drawing_mode, DrawingMode::White | DrawingMode::Black) {
      let color = match self.configuration.drawing_mode {
        DrawingMode::White => Color::from_hex("#CCCCCC").expect("verified hex"),
        _ => Color::from_hex("#444444").expect("verified hex"),
      };
      let Some((mut icon_set, _)) =
        self.configuration.get_icon(self.extractor, tags, &mut processed)
      else {
        return;
      };
      icon_set.main_icon.recolor(color, None);
      self.points.push(Point::new(
        icon_set,
        Vec::new(),
        tags.clone(),
        processed,
        flung,
        0.0,
        true,
        true,
        self.configuration.show_tooltips,
      ));
      return;
    }

    let Some((icon_set, priority)) =
      self.configuration.get_icon(self.extractor, tags, &mut processed)
    else {
      return;
    };

    let labels = TextConstructor::new(&self.configuration.scheme).construct_text(
      tags,
      &mut processed,
      self.configuration.label_mode,
    );
    self.configuration.scheme.process_ignored(tags, &mut processed);

    if self.configuration.scheme.draw_trees
      && tags.get("natural").map(String::as_str) == Some("tree")
      && (tags.contains_key("diameter_crown") || tags.contains_key("circumference"))
    {
      self.trees.push(Tree::new(tags.clone(), node.coordinates, flung));
      return;
    }

    if self.configuration.scheme.draw_craters
      && tags.get("natural").map(String::as_str) == Some("crater")
      && tags.contains_key("diameter")
    {
      self.craters.push(Crater::new(tags.clone(), node.coordinates, flung));
      return;
    }

    if self.configuration.scheme.draw_directions
      && (tags.contains_key("direction") || tags.contains_key("camera:direction"))
    {
      self.direction_sectors.push(DirectionSector::new(tags.clone(), flung));
    }

    self.points.push(Point::new(
      icon_set,
      labels,
      tags.clone(),
      processed,
      flung,
      f64::from(priority),
      true,
      true,
      self.configuration.show_tooltips,
    ));
  }

  /// All figures sorted for painting: by layer, then by style priority.
  #[must_use]
  pub fn get_sorted_figures(&self) -> Vec<&StyledFigure> {
    let mut figures: Vec<&StyledFigure> = self.figures.iter().collect();
    figures.sort_by(|left, right| {
      left.order_key().partial_cmp(&right.order_key()).unwrap_or(std::cmp::Ordering::Equal)
    });
    figures
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn node(id_: i64, lat: f64, lon: f64) -> OSMNode {
    OSMNode::new(Tags::new(), id_, GeoCoordinate::new(lat, lon))
  }

  fn way(id_: i64, nodes: Vec<OSMNode>) -> OSMWay {
    OSMWay::new(Tags::new(), id_, nodes)
  }

  fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
  }

  #[test]
  fn glue_shared_endpoints_into_ring() {
    let node_1 = node(1, 0.0, 0.0);
    let node_2 = node(2, 0.0, 1.0);
    let node_3 = node(3, 1.0, 1.0);

    let way_1 = way(10, vec![node_1.clone(), node_2.clone()]);
    let way_2 = way(11, vec![node_2.clone(), node_3.clone()]);
    let way_3 = way(12, vec![node_3.clone(), node_1.clone()]);

    let rings = glue(&[&way_1, &way_2, &way_3]);
    assert_eq!(rings.len(), 1);
    assert!(is_cycle(&rings[0]));
    assert_eq!(rings[0].len(), 4);
  }

  #[test]
  fn glue_leaves_open_chains() {
    let way_1 = way(10, vec![node(1, 0.0, 0.0), node(2, 0.0, 1.0)]);
    let way_2 = way(11, vec![node(3, 1.0, 0.0), node(4, 1.0, 1.0)]);
    let rings = glue(&[&way_1, &way_2]);
    assert_eq!(rings.len(), 2);
    assert!(!is_cycle(&rings[0]));
  }

  #[test]
  fn glue_keeps_cycles() {
    let node_1 = node(1, 0.0, 0.0);
    let ring = way(10, vec![node_1.clone(), node(2, 0.0, 1.0), node(3, 1.0, 1.0), node_1]);
    let rings = glue(&[&ring]);
    assert_eq!(rings.len(), 1);
    assert!(is_cycle(&rings[0]));
  }

  #[test]
  fn overground_level_filter() {
    assert!(check_level_overground(&tags(&[("highway", "primary")])));
    assert!(!check_level_overground(&tags(&[("level", "-1")])));
    assert!(!check_level_overground(&tags(&[("tunnel", "yes")])));
    assert!(!check_level_overground(&tags(&[("location", "underground")])));
    assert!(!check_level_overground(&tags(&[("parking", "underground")])));
    // Unparseable levels are ignored.
    assert!(check_level_overground(&tags(&[("level", "ground")])));
  }

  #[test]
  fn numeric_level_filter() {
    assert!(check_level_number(&tags(&[("level", "1;2")]), 2.0));
    assert!(!check_level_number(&tags(&[("level", "1;2")]), 3.0));
    assert!(!check_level_number(&tags(&[("highway", "primary")]), 0.0));
  }

  #[test]
  fn author_colors_are_stable() {
    let color_1 = get_user_color("Alice", "");
    let color_2 = get_user_color("Alice", "");
    assert_eq!(color_1, color_2);
    assert_ne!(color_1, get_user_color("Bob", ""));
    assert_ne!(color_1, get_user_color("Alice", "other-seed"));
    assert_eq!(get_user_color("", ""), Color::BLACK);
  }

  #[test]
  fn time_color_spans_gradient() {
    let mut boundaries: MinMax<DateTime<Utc>> = MinMax::default();
    let early = "2020-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
    let late = "2022-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
    boundaries.update(early);
    boundaries.update(late);

    let early_color = get_time_color(Some(early), &boundaries);
    let late_color = get_time_color(Some(late), &boundaries);
    assert_ne!(early_color, late_color);
    assert_eq!(get_time_color(None, &boundaries), late_color);
  }
}
