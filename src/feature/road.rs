use std::collections::HashMap;
use std::f64::consts::PI;

use log::error;
use svg::node::element::{Circle, Group, Path as SvgPath, Text, TextPath};

use crate::color::Color;
use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{Line, Polyline, Vec2, compute_angle, norm, turn_by_angle};
use crate::osm::reader::{OSMNode, Tagged, Tags};
use crate::scheme::{RoadMatcher, Scheme};

pub const DEFAULT_LANE_WIDTH: f64 = 3.7;

/// Road lane specification.
#[derive(Debug, Clone, Default)]
pub struct Lane {
  /// Width in meters.
  pub width: Option<f64>,
  /// Whether the lane is forward or backward.
  pub is_forward: Option<bool>,
}

impl Lane {
  /// Lane width in pixels; the standard 3.7 m lane is used when unset.
  #[must_use]
  pub fn get_width(&self, scale: f64) -> f64 {
    self.width.unwrap_or(DEFAULT_LANE_WIDTH) * scale
  }
}

/// Straight part of a road, with precomputed perpendicular offsets used for
/// intersection geometry.
#[derive(Debug, Clone)]
pub struct RoadPart {
  pub point_1: Vec2,
  pub point_2: Vec2,
  pub lanes: Vec<Lane>,
  pub width: f64,
  turned: Vec2,
  pub right_vector: Vec2,
  pub left_vector: Vec2,
  pub right_connection: Option<Vec2>,
  pub left_connection: Option<Vec2>,
  pub right_projection: Option<Vec2>,
  pub left_projection: Option<Vec2>,
  pub left_outer: Option<Vec2>,
  pub right_outer: Option<Vec2>,
  pub point_a: Option<Vec2>,
  pub point_middle: Option<Vec2>,
}

impl RoadPart {
  #[must_use]
  pub fn new(point_1: Vec2, point_2: Vec2, lanes: Vec<Lane>, scale: f64) -> Self {
    let width = if lanes.is_empty() {
      1.0
    } else {
      lanes.iter().map(|lane| lane.get_width(scale)).sum()
    };
    let turned = norm(turn_by_angle(point_2 - point_1, PI / 2.0));
    let right_vector = turned * (width / 2.0);
    let left_vector = -turned * (width / 2.0);

    Self {
      point_1,
      point_2,
      lanes,
      width,
      turned,
      right_vector,
      left_vector,
      right_connection: None,
      left_connection: None,
      right_projection: None,
      left_projection: None,
      left_outer: None,
      right_outer: None,
      point_a: None,
      point_middle: None,
    }
  }

  /// Compute the outer corner points from the known connections.
  pub fn update(&mut self) {
    if let Some(left_connection) = self.left_connection {
      self.right_projection = Some(left_connection + self.right_vector - self.left_vector);
    }
    if let Some(right_connection) = self.right_connection {
      self.left_projection = Some(right_connection - self.right_vector + self.left_vector);
    }
    if let (Some(left_connection), Some(right_connection), Some(right_projection), Some(left_projection)) = (
      self.left_connection,
      self.right_connection,
      self.right_projection,
      self.left_projection,
    ) {
      let a = (right_connection - self.point_1).length();
      let b = (right_projection - self.point_1).length();
      if a > b {
        self.right_outer = Some(right_connection);
        self.left_outer = Some(left_projection);
      } else {
        self.right_outer = Some(right_projection);
        self.left_outer = Some(left_connection);
      }
      let point_middle = self.right_outer.expect("just set") - self.right_vector;
      self.point_middle = Some(point_middle);

      let max_distance = 100.0;
      if (point_middle - self.point_1).length() > max_distance {
        let point_a = self.point_1 + norm(point_middle - self.point_1) * max_distance;
        self.point_a = Some(point_a);
        self.right_outer = Some(point_a + self.right_vector);
        self.left_outer = Some(point_a + self.left_vector);
      } else {
        self.point_a = Some(point_middle);
      }
    }
  }

  /// Angle between the part and the x axis.
  #[must_use]
  pub fn get_angle(&self) -> f64 {
    compute_angle(self.point_2 - self.point_1)
  }

  /// Draw the intersection entrance quadrangle.
  #[must_use]
  pub fn draw_entrance(&self) -> Option<SvgPath> {
    let (Some(left_connection), Some(right_connection), Some(right_projection), Some(left_projection)) = (
      self.left_connection,
      self.right_connection,
      self.right_projection,
      self.left_projection,
    ) else {
      return None;
    };
    let commands = format!(
      "M {},{} L {},{} L {},{} L {},{} Z",
      right_projection.x,
      right_projection.y,
      right_connection.x,
      right_connection.y,
      left_projection.x,
      left_projection.y,
      left_connection.x,
      left_connection.y
    );
    Some(SvgPath::new().set("d", commands).set("fill", "#88FF88"))
  }

  /// Draw lane delimiters.
  #[must_use]
  pub fn draw_lanes(&self, scale: f64) -> Vec<SvgPath> {
    let Some(point_middle) = self.point_middle else {
      return Vec::new();
    };
    self
      .lanes
      .iter()
      .map(|lane| {
        let shift = self.right_vector - self.turned * lane.get_width(scale);
        let start = point_middle + shift;
        let end = self.point_2 + shift;
        SvgPath::new()
          .set("d", format!("M {},{} L {},{}", start.x, start.y, end.x, end.y))
          .set("fill", "none")
          .set("stroke", "#FFFFFF")
          .set("stroke-width", 2)
          .set("stroke-dasharray", "7,7")
      })
      .collect()
  }
}

/// An intersection of roads described by its parts; all first points of the
/// parts must coincide.
#[derive(Debug, Clone)]
pub struct Intersection {
  pub parts: Vec<RoadPart>,
}

impl Intersection {
  /// Sort the parts by angle and compute the shared corner of every adjacent
  /// pair as the intersection of their offset parallel lines.
  #[must_use]
  pub fn new(mut parts: Vec<RoadPart>) -> Self {
    parts.sort_by(|left, right| left.get_angle().total_cmp(&right.get_angle()));

    for index in 0..parts.len() {
      let next_index = (index + 1) % parts.len();
      let part_1 = &parts[index];
      let part_2 = &parts[next_index];
      let line_1 = Line::new(
        part_1.point_1 + part_1.right_vector,
        part_1.point_2 + part_1.right_vector,
      );
      let line_2 =
        Line::new(part_2.point_1 + part_2.left_vector, part_2.point_2 + part_2.left_vector);
      let intersection = line_1.get_intersection_point(&line_2);
      parts[index].right_connection = Some(intersection);
      parts[next_index].left_connection = Some(intersection);
      parts[index].update();
      parts[next_index].update();
    }

    for index in 0..parts.len() {
      let next_index = (index + 1) % parts.len();
      parts[index].update();
      parts[next_index].update();

      if parts[index].right_connection.is_none() && parts[next_index].left_connection.is_none() {
        parts[index].left_connection = parts[index].right_projection;
        parts[next_index].right_connection = parts[next_index].left_projection;
        parts[index].left_outer = parts[index].right_projection;
        parts[next_index].right_outer = parts[next_index].left_projection;
      }
      parts[index].update();
      parts[next_index].update();
    }

    Self { parts }
  }

  /// Draw all entrances and the inner intersection area.
  #[must_use]
  pub fn draw(&self) -> Group {
    let mut group = Group::new();
    for part in &self.parts {
      if let Some(entrance) = part.draw_entrance() {
        group = group.add(entrance);
      }
    }

    let corners: Vec<Vec2> = self.parts.iter().filter_map(|part| part.left_connection).collect();
    if corners.len() >= 3 {
      let mut inner_commands = String::new();
      for (index, corner) in corners.iter().enumerate() {
        let command = if index == 0 { "M" } else { "L" };
        inner_commands.push_str(&format!("{command} {},{} ", corner.x, corner.y));
      }
      inner_commands.push('Z');
      group = group.add(SvgPath::new().set("d", inner_commands).set("fill", "#FF8888"));
    }
    group
  }
}

/// Road or track on the map.
#[derive(Debug, Clone)]
pub struct Road {
  pub tags: Tags,
  pub nodes: Vec<OSMNode>,
  pub matcher: RoadMatcher,
  pub line: Polyline,
  pub width: f64,
  pub lanes: Vec<Lane>,
  pub scale: f64,
  pub layer: f64,
  pub placement_offset: f64,
  pub is_transition: bool,
  pub is_area: bool,
  color: Color,
  border_color: Color,
}

impl Tagged for Road {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl Road {
  #[must_use]
  #[allow(
    clippy::cast_sign_loss,
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss
  )]
  pub fn new(
    tags: Tags,
    nodes: Vec<OSMNode>,
    matcher: RoadMatcher,
    flinger: &Flinger,
    scheme: &Scheme,
  ) -> Self {
    let line =
      Polyline::new(nodes.iter().map(|node| flinger.fling(node.coordinates)).collect());
    let scale = flinger.get_scale(Some(nodes[0].coordinates));
    let is_area = scheme.is_area(&tags) && nodes[0] == nodes[nodes.len() - 1];

    let mut width = matcher.default_width;
    let mut lanes: Vec<Lane> = Vec::new();

    if let Some(lane_count) = tags.get("lanes").and_then(|value| value.parse::<usize>().ok()) {
      width = lane_count as f64 * DEFAULT_LANE_WIDTH;
      lanes = vec![Lane::default(); lane_count];
    }

    if let Some(placement) = tags.get("placement")
      && let Some((_, lane_string)) = placement.split_once(':')
      && let Ok(lane_number) = lane_string.parse::<i64>()
    {
      let lane_number = lane_number - 1;
      if lane_number >= 0 && lane_number as usize >= lanes.len() {
        lanes.resize(lane_number as usize + 1, Lane::default());
      }
    }

    if let Some(widths) = tags.get("width:lanes") {
      let widths: Option<Vec<f64>> =
        widths.split('|').map(|part| part.parse::<f64>().ok()).collect();
      if let Some(widths) = widths
        && widths.len() == lanes.len()
      {
        for (lane, lane_width) in lanes.iter_mut().zip(widths) {
          lane.width = Some(lane_width);
        }
      }
    }

    if let Some(number) = tags.get("lanes:forward").and_then(|value| value.parse::<usize>().ok())
    {
      let start = lanes.len().saturating_sub(number);
      for lane in &mut lanes[start..] {
        lane.is_forward = Some(true);
      }
    }
    if let Some(number) = tags.get("lanes:backward").and_then(|value| value.parse::<usize>().ok())
    {
      let end = number.min(lanes.len());
      for lane in &mut lanes[..end] {
        lane.is_forward = Some(false);
      }
    }

    if let Some(explicit) = tags.get("width").and_then(|value| value.parse::<f64>().ok()) {
      width = explicit;
    }

    let layer: f64 =
      tags.get("layer").and_then(|value| value.parse().ok()).unwrap_or_default();

    let mut placement_offset = 0.0;
    let mut is_transition = false;

    if let Some(placement) = tags.get("placement") {
      if placement == "transition" {
        is_transition = true;
      } else if let Some((place, lane_string)) = placement.split_once(':')
        && let Ok(lane_number) = lane_string.parse::<i64>()
      {
        let lane_number = lane_number - 1;
        placement_offset = -width * scale / 2.0;
        if lane_number > 0 {
          placement_offset += lanes[..lane_number as usize]
            .iter()
            .map(|lane| lane.get_width(scale))
            .sum::<f64>();
        } else if lane_number < 0 {
          placement_offset += DEFAULT_LANE_WIDTH * lane_number as f64 * scale;
        }

        // Negative lane numbers index from the right edge.
        let lane_index = if lane_number >= 0 {
          lane_number as usize
        } else {
          (lanes.len() as i64 + lane_number).max(0) as usize
        };
        let lane_width =
          lanes.get(lane_index).map_or(DEFAULT_LANE_WIDTH * scale, |lane| lane.get_width(scale));
        match place {
          "left_of" => {}
          "middle_of" => placement_offset += lane_width * 0.5,
          "right_of" => placement_offset += lane_width,
          _ => error!("Unknown placement `{place}`."),
        }
      }
    }

    let mut color = matcher.color;
    if tags.get("tunnel").is_some_and(|value| value == "yes") {
      color = color.with_luminance((color.luminance() + 0.2).min(1.0));
    }
    let mut border_color = matcher.border_color;
    if tags.get("bridge").is_some_and(|value| value == "yes") {
      border_color = scheme.get_color("bridge_color");
    }
    if tags.get("ford").is_some_and(|value| value == "yes") {
      border_color = scheme.get_color("ford_color");
    }
    if tags.get("embankment").is_some_and(|value| value == "yes") {
      border_color = scheme.get_color("embankment_color");
    }

    Self {
      tags,
      nodes,
      matcher,
      line,
      width,
      lanes,
      scale,
      layer,
      placement_offset,
      is_transition,
      is_area,
      color,
      border_color,
    }
  }

  /// Road main color; tunnels are lightened.
  #[must_use]
  pub fn get_color(&self) -> Color {
    self.color
  }

  /// Road border color; bridges, fords, and embankments override it.
  #[must_use]
  pub fn get_border_color(&self) -> Color {
    self.border_color
  }

  /// Road SVG style attributes for the border or the fill pass.
  #[must_use]
  pub fn get_style(&self, is_border: bool, is_for_stroke: bool) -> Vec<(String, String)> {
    let (color, border_width) =
      if is_border { (self.border_color, 2.0) } else { (self.color, 0.0) };

    let mut extra_width = 0.0;
    if is_border {
      if self.tags.get("bridge").is_some_and(|value| value == "yes") {
        extra_width = 0.5;
      }
      if self.tags.get("ford").is_some_and(|value| value == "yes") {
        extra_width = 2.0;
      }
      if self.tags.get("embankment").is_some_and(|value| value == "yes") {
        extra_width = 4.0;
      }
    }

    let fill = if self.is_area { color.to_hex() } else { "none".to_string() };

    let mut style: Vec<(String, String)> = vec![
      ("fill".to_string(), fill),
      ("stroke".to_string(), color.to_hex()),
      ("stroke-linecap".to_string(), "butt".to_string()),
      ("stroke-linejoin".to_string(), "round".to_string()),
      (
        "stroke-width".to_string(),
        (self.scale * self.width + extra_width + border_width).to_string(),
      ),
    ];
    if is_for_stroke {
      style.retain(|(key, _)| key != "stroke-width");
      style.push(("stroke-width".to_string(), (2.0 + extra_width).to_string()));
    }
    if is_border && self.tags.get("embankment").is_some_and(|value| value == "yes") {
      style.push(("stroke-dasharray".to_string(), "1,3".to_string()));
    }
    if is_border && self.tags.get("tunnel").is_some_and(|value| value == "yes") {
      style.push(("stroke-dasharray".to_string(), "3,3".to_string()));
    }
    style
  }

  /// Draw the road as a simple SVG path.
  #[must_use]
  pub fn draw(&self, is_border: bool) -> Option<SvgPath> {
    let commands = self.line.get_path(self.placement_offset)?;
    let mut path = SvgPath::new().set("d", commands);
    for (key, value) in self.get_style(is_border, false) {
      path = path.set(key, value);
    }
    Some(path)
  }

  /// Draw lane separators as faint parallel lines.
  #[must_use]
  pub fn draw_lanes(&self, color: Color) -> Vec<SvgPath> {
    if self.lanes.len() < 2 {
      return Vec::new();
    }
    #[allow(clippy::cast_precision_loss)]
    let lane_count = self.lanes.len() as f64;
    (1..self.lanes.len())
      .filter_map(|index| {
        #[allow(clippy::cast_precision_loss)]
        let lane_offset = self.scale * (-self.width / 2.0 + index as f64 * self.width / lane_count);
        let commands = self.line.get_path(self.placement_offset + lane_offset)?;
        Some(
          SvgPath::new()
            .set("d", commands)
            .set("fill", "none")
            .set("stroke", color.to_hex())
            .set("stroke-linejoin", "round")
            .set("stroke-width", 1.0)
            .set("opacity", 0.5),
        )
      })
      .collect()
  }

  /// Draw the road name along its path.
  #[must_use]
  pub fn draw_caption(&self, id_prefix: &str) -> Option<(SvgPath, Text)> {
    let name = self.tags.get("name")?;
    let commands = self.line.get_path(self.placement_offset + 3.0)?;
    let path_id = format!("{id_prefix}_caption");
    let path = SvgPath::new().set("d", commands).set("fill", "none").set("id", path_id.clone());
    let text = Text::new("").add(
      TextPath::new(name.as_str())
        .set("href", format!("#{path_id}"))
        .set("method", "align")
        .set("spacing", "exact")
        .set("font-family", "Roboto")
        .set("font-size", 10.0),
    );
    Some((path, text))
  }
}

fn get_curve_points(
  road: &Road,
  center: Vec2,
  road_end: Vec2,
  placement_offset: f64,
  is_end: bool,
) -> [Vec2; 4] {
  let width = road.width / 2.0 * road.scale;
  let mut direction = norm(center - road_end);
  if is_end {
    direction = -direction;
  }
  let left = turn_by_angle(direction, PI / 2.0) * (width + placement_offset);
  let right = turn_by_angle(direction, -PI / 2.0) * (width - placement_offset);
  [road_end + left, center + left, center + right, road_end + right]
}

/// Connection between roads sharing a node.
#[derive(Debug)]
enum Connector {
  /// Same width: a disc at the shared node.
  Simple { road: usize, point: Vec2, min_layer: f64, max_layer: f64 },
  /// Different widths: both roads are shortened and bridged with two cubic
  /// curves.
  Complex { road: usize, curve_1: String, curve_2: String, min_layer: f64, max_layer: f64 },
  /// Three or more incident road ends: stacked discs by priority.
  Intersection { roads: Vec<usize>, point: Vec2, min_layer: f64, max_layer: f64 },
}

impl Connector {
  fn min_layer(&self) -> f64 {
    match self {
      Connector::Simple { min_layer, .. }
      | Connector::Complex { min_layer, .. }
      | Connector::Intersection { min_layer, .. } => *min_layer,
    }
  }

  fn max_layer(&self) -> f64 {
    match self {
      Connector::Simple { max_layer, .. }
      | Connector::Complex { max_layer, .. }
      | Connector::Intersection { max_layer, .. } => *max_layer,
    }
  }
}

/// The whole road network.
#[derive(Debug, Default)]
pub struct Roads {
  pub roads: Vec<Road>,
  /// Node id to (road index, node index within the road).
  nodes: HashMap<i64, Vec<(usize, usize)>>,
}

fn layer_entry<'a>(layers: &'a mut Vec<(f64, Vec<usize>)>, layer: f64) -> &'a mut Vec<usize> {
  if let Some(position) = layers.iter().position(|(known, _)| *known == layer) {
    &mut layers[position].1
  } else {
    layers.push((layer, Vec::new()));
    &mut layers.last_mut().expect("just pushed").1
  }
}

impl Roads {
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.roads.is_empty()
  }

  /// Add a road and update connections.
  pub fn append(&mut self, road: Road) {
    let road_index = self.roads.len();
    for (node_index, node) in road.nodes.iter().enumerate() {
      self.nodes.entry(node.id_).or_default().push((road_index, node_index));
    }
    self.roads.push(road);
  }

  /// Draw the whole road system: per layer, all borders, connector borders,
  /// fills, connector fills, then lane separators.
  #[must_use]
  #[allow(clippy::too_many_lines)]
  pub fn draw(&mut self, flinger: &Flinger, draw_captions: bool) -> Group {
    let mut group = Group::new();
    if self.roads.is_empty() {
      return group;
    }

    let mut layered_roads: Vec<(f64, Vec<usize>)> = Vec::new();
    let mut layered_connectors: Vec<(f64, Vec<usize>)> = Vec::new();
    let mut connectors: Vec<Connector> = Vec::new();

    for (road_index, road) in self.roads.iter().enumerate() {
      if !road.is_transition {
        layer_entry(&mut layered_roads, road.layer).push(road_index);
      }
    }

    // Transition roads are replaced by connectors between their endpoints.
    let transition_connectors: Vec<(usize, [(usize, usize); 2])> = self
      .roads
      .iter()
      .enumerate()
      .filter(|(_, road)| road.is_transition)
      .filter_map(|(road_index, road)| {
        let mut ends: Vec<(usize, usize)> = Vec::new();
        for end in [0, road.nodes.len() - 1] {
          let connections: Vec<(usize, usize)> = self.nodes[&road.nodes[end].id_]
            .iter()
            .copied()
            .filter(|(other, _)| !self.roads[*other].is_transition)
            .collect();
          if connections.len() != 1 {
            return None;
          }
          ends.push(connections[0]);
        }
        Some((road_index, [ends[0], ends[1]]))
      })
      .collect();
    for (road_index, connections) in transition_connectors {
      let layer = self.roads[road_index].layer;
      if let Some(connector) = self.make_complex_connector(connections, flinger, layer, layer) {
        layer_entry(&mut layered_connectors, layer).push(connectors.len());
        connectors.push(connector);
      }
    }

    let mut connected_nodes: Vec<Vec<(usize, usize)>> =
      self.nodes.values().filter(|connected| connected.len() > 1).cloned().collect();
    connected_nodes.sort_by_key(|connected| connected[0]);

    for connected in connected_nodes {
      let connector: Option<Connector> = if connected.len() == 2 {
        let (road_1, index_1) = connected[0];
        let (road_2, index_2) = connected[1];
        let min_layer = self.roads[road_1].layer.min(self.roads[road_2].layer);
        let max_layer = self.roads[road_1].layer.max(self.roads[road_2].layer);
        let is_endpoint = |road: usize, index: usize| {
          index == 0 || index == self.roads[road].nodes.len() - 1
        };
        if (self.roads[road_1].width - self.roads[road_2].width).abs() < f64::EPSILON
          || !is_endpoint(road_1, index_1)
          || !is_endpoint(road_2, index_2)
        {
          let node = &self.roads[road_1].nodes[index_1];
          Some(Connector::Simple {
            road: road_1,
            point: flinger.fling(node.coordinates),
            min_layer,
            max_layer,
          })
        } else if !self.roads[road_1].is_transition && !self.roads[road_2].is_transition {
          self.make_complex_connector(
            [(road_1, index_1), (road_2, index_2)],
            flinger,
            min_layer,
            max_layer,
          )
        } else {
          None
        }
      } else {
        let layers: Vec<f64> =
          connected.iter().map(|(road, _)| self.roads[*road].layer).collect();
        let min_layer = layers.iter().copied().fold(f64::INFINITY, f64::min);
        let max_layer = layers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let (road_1, index_1) = connected[0];
        let node = &self.roads[road_1].nodes[index_1];
        let mut roads: Vec<usize> = connected.iter().map(|(road, _)| *road).collect();
        roads.sort_by(|left, right| {
          self.roads[*left].matcher.priority.total_cmp(&self.roads[*right].matcher.priority)
        });
        Some(Connector::Intersection {
          roads,
          point: flinger.fling(node.coordinates),
          min_layer,
          max_layer,
        })
      };

      if let Some(connector) = connector {
        layer_entry(&mut layered_connectors, connector.min_layer()).push(connectors.len());
        layer_entry(&mut layered_connectors, connector.max_layer()).push(connectors.len());
        connectors.push(connector);
      }
    }

    layered_roads.sort_by(|(left, _), (right, _)| left.total_cmp(right));

    for (layer, mut road_indices) in layered_roads {
      road_indices.sort_by(|left, right| {
        self.roads[*left].matcher.priority.total_cmp(&self.roads[*right].matcher.priority)
      });
      let layer_connectors: Vec<usize> = layered_connectors
        .iter()
        .find(|(known, _)| *known == layer)
        .map(|(_, indices)| indices.clone())
        .unwrap_or_default();

      // Borders.
      for road_index in &road_indices {
        if let Some(path) = self.roads[*road_index].draw(true) {
          group = group.add(path);
        }
      }
      for connector_index in &layer_connectors {
        let connector = &connectors[*connector_index];
        if connector.min_layer() == layer {
          group = self.draw_connector(group, connector, true);
        }
      }

      // Inner parts.
      for road_index in &road_indices {
        if let Some(path) = self.roads[*road_index].draw(false) {
          group = group.add(path);
        }
      }
      for connector_index in &layer_connectors {
        let connector = &connectors[*connector_index];
        if connector.max_layer() == layer {
          group = self.draw_connector(group, connector, false);
        }
      }

      // Lane separators.
      for road_index in &road_indices {
        let road = &self.roads[*road_index];
        for path in road.draw_lanes(road.matcher.border_color) {
          group = group.add(path);
        }
      }
    }

    if draw_captions {
      for (index, road) in self.roads.iter().enumerate() {
        if let Some((path, text)) = road.draw_caption(&format!("road_{index}")) {
          group = group.add(path).add(text);
        }
      }
    }

    group
  }

  /// Shorten both roads by the width difference and bridge them with a
  /// cubic Bézier quadrilateral.
  fn make_complex_connector(
    &mut self,
    connections: [(usize, usize); 2],
    flinger: &Flinger,
    min_layer: f64,
    max_layer: f64,
  ) -> Option<Connector> {
    let [(road_1, index_1), (road_2, index_2)] = connections;
    if self.roads[road_1].line.points.len() < 2 || self.roads[road_2].line.points.len() < 2 {
      return None;
    }
    let length =
      (self.roads[road_2].width - self.roads[road_1].width).abs() * self.roads[road_1].scale;
    self.roads[road_1].line.shorten(index_1, length);
    self.roads[road_2].line.shorten(index_2, length);

    let point_1 = flinger.fling(self.roads[road_1].nodes[index_1].coordinates);
    let point_2 = flinger.fling(self.roads[road_2].nodes[index_2].coordinates);
    let point = (point_1 + point_2) * 0.5;

    let points_1 = get_curve_points(
      &self.roads[road_1],
      point,
      self.roads[road_1].line.points[index_1],
      self.roads[road_1].placement_offset,
      index_1 != 0,
    );
    let points_2 = get_curve_points(
      &self.roads[road_2],
      point,
      self.roads[road_2].line.points[index_2],
      self.roads[road_2].placement_offset,
      index_2 != 0,
    );

    let curve_1 = format!(
      "{},{} C {},{} {},{} {},{}",
      points_1[0].x,
      points_1[0].y,
      points_1[1].x,
      points_1[1].y,
      points_2[1].x,
      points_2[1].y,
      points_2[0].x,
      points_2[0].y
    );
    let curve_2 = format!(
      "{},{} C {},{} {},{} {},{}",
      points_2[3].x,
      points_2[3].y,
      points_2[2].x,
      points_2[2].y,
      points_1[2].x,
      points_1[2].y,
      points_1[3].x,
      points_1[3].y
    );

    Some(Connector::Complex { road: road_1, curve_1, curve_2, min_layer, max_layer })
  }

  fn draw_connector(&self, mut group: Group, connector: &Connector, is_border: bool) -> Group {
    match connector {
      Connector::Simple { road, point, .. } => {
        let road = &self.roads[*road];
        let (radius, fill) = if is_border {
          (road.width * road.scale / 2.0 + 1.0, road.matcher.border_color)
        } else {
          (road.width * road.scale / 2.0, road.get_color())
        };
        group = group.add(
          Circle::new()
            .set("cx", point.x)
            .set("cy", point.y)
            .set("r", radius)
            .set("fill", fill.to_hex()),
        );
      }
      Connector::Complex { road, curve_1, curve_2, .. } => {
        let road = &self.roads[*road];
        if is_border {
          let mut path =
            SvgPath::new().set("d", format!("M {curve_1} M {curve_2}"));
          for (key, value) in road.get_style(true, true) {
            path = path.set(key, value);
          }
          group = group.add(path);
        } else {
          let path = SvgPath::new()
            .set("d", format!("M {curve_1} L {curve_2} Z"))
            .set("fill", road.get_color().to_hex());
          group = group.add(path);
        }
      }
      Connector::Intersection { roads, point, .. } => {
        for road_index in roads {
          let road = &self.roads[*road_index];
          let (radius, fill) = if is_border {
            (road.width * road.scale / 2.0 + 1.0, road.matcher.border_color)
          } else {
            (road.width * road.scale / 2.0, road.matcher.color)
          };
          group = group.add(
            Circle::new()
              .set("cx", point.x)
              .set("cy", point.y)
              .set("r", radius)
              .set("fill", fill.to_hex()),
          );
        }
      }
    }
    group
  }
}
