use log::warn;

use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{Polyline, Vec2};
use crate::osm::reader::{OSMNode, Tagged, Tags};
use crate::scheme::LineStyle;

/// Some figure on the map: a way or an area with optional holes.
#[derive(Debug, Clone)]
pub struct Figure {
  pub tags: Tags,
  pub inners: Vec<Vec<OSMNode>>,
  pub outers: Vec<Vec<OSMNode>>,
}

impl Tagged for Figure {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl Figure {
  /// Construct a figure; when both inner and outer rings are present the
  /// outers are normalized counterclockwise and the inners clockwise, so a
  /// single path shows the holes.
  #[must_use]
  pub fn new(tags: Tags, inners: &[Vec<OSMNode>], outers: &[Vec<OSMNode>]) -> Self {
    if !inners.is_empty() && !outers.is_empty() {
      Self {
        tags,
        inners: inners.iter().map(|ring| make_clockwise(ring)).collect(),
        outers: outers.iter().map(|ring| make_counter_clockwise(ring)).collect(),
      }
    } else {
      Self { tags, inners: inners.to_vec(), outers: outers.to_vec() }
    }
  }

  /// SVG path commands for all rings; degenerate rings contribute nothing,
  /// so the result may lack any `M` command.
  #[must_use]
  pub fn get_path(&self, flinger: &Flinger, offset: Vec2, parallel_offset: f64) -> String {
    let mut path = String::new();
    for ring in self.outers.iter().chain(&self.inners) {
      match get_path(ring, offset, flinger, parallel_offset) {
        Some(commands) => {
          path.push_str(&commands);
          path.push(' ');
        }
        None => warn!("Degenerate ring left no path."),
      }
    }
    path
  }
}

/// Figure with a line style.
#[derive(Debug, Clone)]
pub struct StyledFigure {
  pub figure: Figure,
  pub line_style: LineStyle,
}

impl StyledFigure {
  #[must_use]
  pub fn new(
    tags: Tags,
    inners: &[Vec<OSMNode>],
    outers: &[Vec<OSMNode>],
    line_style: LineStyle,
  ) -> Self {
    Self { figure: Figure::new(tags, inners, outers), line_style }
  }

  #[must_use]
  pub fn get_path(&self, flinger: &Flinger) -> String {
    self.figure.get_path(flinger, Vec2::default(), self.line_style.parallel_offset)
  }

  /// Figure layer value, 0 if not specified or malformed.
  #[must_use]
  pub fn get_layer(&self) -> f64 {
    self.figure.tags.get("layer").and_then(|layer| layer.parse().ok()).unwrap_or(0.0)
  }

  /// Painting order key: figures are sorted by layer, then by style
  /// priority.
  #[must_use]
  pub fn order_key(&self) -> (f64, f64) {
    (self.get_layer(), self.line_style.priority)
  }
}

/// Whether polygon nodes are in clockwise order.
#[must_use]
pub fn is_clockwise(polygon: &[OSMNode]) -> bool {
  let mut count = 0.0;
  for (index, node) in polygon.iter().enumerate() {
    let next = &polygon[(index + 1) % polygon.len()];
    count += (next.coordinates.lat - node.coordinates.lat)
      * (next.coordinates.lon + node.coordinates.lon);
  }
  count >= 0.0
}

#[must_use]
fn make_clockwise(polygon: &[OSMNode]) -> Vec<OSMNode> {
  if is_clockwise(polygon) {
    polygon.to_vec()
  } else {
    polygon.iter().rev().cloned().collect()
  }
}

#[must_use]
fn make_counter_clockwise(polygon: &[OSMNode]) -> Vec<OSMNode> {
  if is_clockwise(polygon) {
    polygon.iter().rev().cloned().collect()
  } else {
    polygon.to_vec()
  }
}

/// Construct SVG path commands from nodes.
fn get_path(
  nodes: &[OSMNode],
  shift: Vec2,
  flinger: &Flinger,
  parallel_offset: f64,
) -> Option<String> {
  Polyline::new(nodes.iter().map(|node| flinger.fling(node.coordinates) + shift).collect())
    .get_path(parallel_offset)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::flinger::TranslateFlinger;
  use crate::geometry::vector::GeoCoordinate;
  use crate::osm::reader::Tags;

  fn node(id_: i64, lat: f64, lon: f64) -> OSMNode {
    OSMNode::new(Tags::new(), id_, GeoCoordinate::new(lat, lon))
  }

  fn square(clockwise: bool) -> Vec<OSMNode> {
    let mut nodes = vec![
      node(1, 0.0, 0.0),
      node(2, 0.0, 1.0),
      node(3, 1.0, 1.0),
      node(4, 1.0, 0.0),
      node(1, 0.0, 0.0),
    ];
    if clockwise {
      nodes.reverse();
    }
    nodes
  }

  fn flinger() -> Flinger {
    Flinger::Translate(TranslateFlinger::new(
      Vec2::new(100.0, 100.0),
      Vec2::new(1.0, 1.0),
      Vec2::default(),
    ))
  }

  #[test]
  fn orientation_detection() {
    assert!(is_clockwise(&square(true)));
    assert!(!is_clockwise(&square(false)));
  }

  #[test]
  fn multipolygon_ring_normalization() {
    let figure = Figure::new(Tags::new(), &[square(false)], &[square(true)]);
    assert!(is_clockwise(&figure.inners[0]));
    assert!(!is_clockwise(&figure.outers[0]));
  }

  #[test]
  fn rings_without_holes_keep_orientation() {
    let figure = Figure::new(Tags::new(), &[], &[square(true)]);
    assert!(is_clockwise(&figure.outers[0]));
  }

  #[test]
  fn path_concatenates_rings() {
    let figure = Figure::new(Tags::new(), &[square(false)], &[square(true)]);
    let path = figure.get_path(&flinger(), Vec2::default(), 0.0);
    assert_eq!(path.matches('M').count(), 2);
    assert_eq!(path.matches('Z').count(), 2);
  }

  #[test]
  fn degenerate_figure_has_no_commands() {
    let figure = Figure::new(Tags::new(), &[], &[vec![node(1, 0.0, 0.0)]]);
    let path = figure.get_path(&flinger(), Vec2::default(), 0.0);
    assert!(!path.contains('M'));
  }
}
