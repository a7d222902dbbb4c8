use std::f64::consts::PI;

use svg::node::element::{Path as SvgPath, RadialGradient, Stop};

use crate::color::Color;
use crate::geometry::vector::Vec2;
use crate::osm::reader::{Tagged, Tags, parse_float};
use crate::scheme::Scheme;

/// Zero angle is the east direction, while directions are counted from the
/// north.
const SHIFT: f64 = -PI / 2.0;
const SMALLEST_ANGLE: f64 = PI / 15.0;
const DEFAULT_ANGLE: f64 = PI / 30.0;

/// 16-point compass rose, in degrees clockwise from north.
const COMPASS_POINTS: [(&str, f64); 16] = [
  ("N", 0.0),
  ("NNE", 22.5),
  ("NE", 45.0),
  ("ENE", 67.5),
  ("E", 90.0),
  ("ESE", 112.5),
  ("SE", 135.0),
  ("SSE", 157.5),
  ("S", 180.0),
  ("SSW", 202.5),
  ("SW", 225.0),
  ("WSW", 247.5),
  ("W", 270.0),
  ("WNW", 292.5),
  ("NW", 315.0),
  ("NNW", 337.5),
];

/// Parse a vector from its text representation: compass points or 360-degree
/// notation, e.g. `NW` or `270`.
#[must_use]
pub fn parse_vector(text: &str) -> Option<Vec2> {
  let degrees = parse_float(text).or_else(|| {
    COMPASS_POINTS
      .iter()
      .find(|(point, _)| *point == text)
      .map(|(_, degrees)| *degrees)
  })?;
  let radians = degrees.to_radians() + SHIFT;
  Some(Vec2::new(radians.cos(), radians.sin()))
}

/// Rotate a 2D vector by the angle in radians (clockwise on the screen
/// plane).
fn rotate(vector: Vec2, angle: f64) -> Vec2 {
  Vec2::new(
    vector.x * angle.cos() + vector.y * angle.sin(),
    -vector.x * angle.sin() + vector.y * angle.cos(),
  )
}

/// Sector described by two vectors.
#[derive(Debug, Clone)]
pub struct Sector {
  pub start: Option<Vec2>,
  pub end: Option<Vec2>,
  main_direction: Option<Vec2>,
}

impl Sector {
  /// Construct a sector from a text representation: either a `start-end`
  /// range (e.g. `70-210`, `N-NW`) or a single direction with a half-angle.
  #[must_use]
  pub fn new(text: &str, angle: Option<f64>) -> Self {
    if text.contains('-') && !text.starts_with('-') {
      let mut parts = text.splitn(2, '-');
      let start = parts.next().and_then(parse_vector);
      let end = parts.next().and_then(parse_vector);
      let main_direction = match (start, end) {
        (Some(start), Some(end)) => Some((start + end) * 0.5),
        _ => None,
      };
      return Self { start, end, main_direction };
    }

    let result_angle = angle
      .map_or(DEFAULT_ANGLE, |angle| SMALLEST_ANGLE.max(angle.to_radians() / 2.0));
    let vector = parse_vector(text);
    Self {
      start: vector.map(|vector| rotate(vector, result_angle)),
      end: vector.map(|vector| rotate(vector, -result_angle)),
      main_direction: vector,
    }
  }

  /// SVG path commands for the arc of the sector, without the leading move.
  #[must_use]
  pub fn draw(&self, center: Vec2, radius: f64) -> Option<String> {
    let (start, end) = match (self.start, self.end) {
      (Some(start), Some(end)) => (center + end * radius, center + start * radius),
      _ => return None,
    };
    Some(format!(
      "L {},{} A {},{} 0 0 0 {},{}",
      start.x, start.y, radius, radius, end.x, end.y
    ))
  }

  /// Whether the main direction of the sector points right; `None` for
  /// vertical directions.
  #[must_use]
  pub fn is_right(&self) -> Option<bool> {
    let main_direction = self.main_direction?;
    if main_direction.x.abs() < 1e-8 {
      return None;
    }
    Some(main_direction.x > 0.0)
  }
}

/// A set of sectors, parsed from a `;`-separated value.
#[derive(Debug, Clone)]
pub struct DirectionSet {
  sectors: Vec<Sector>,
}

impl DirectionSet {
  #[must_use]
  pub fn new(text: &str) -> Self {
    Self { sectors: text.split(';').map(|part| Sector::new(part, None)).collect() }
  }

  /// Arc path fragments for all drawable sectors.
  #[must_use]
  pub fn draw(&self, center: Vec2, radius: f64) -> Vec<String> {
    self.sectors.iter().filter_map(|sector| sector.draw(center, radius)).collect()
  }

  /// Unanimous handedness of the sectors, `None` on a mixed or undecidable
  /// vote.
  #[must_use]
  pub fn is_right(&self) -> Option<bool> {
    let votes: Vec<Option<bool>> = self.sectors.iter().map(Sector::is_right).collect();
    if votes.iter().all(|vote| *vote == Some(true)) {
      return Some(true);
    }
    if votes.iter().all(|vote| *vote == Some(false)) {
      return Some(false);
    }
    None
  }
}

/// Sector around a node that represents a view or camera direction.
#[derive(Debug, Clone)]
pub struct DirectionSector {
  pub tags: Tags,
  pub point: Vec2,
}

impl Tagged for DirectionSector {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl DirectionSector {
  #[must_use]
  pub fn new(tags: Tags, point: Vec2) -> Self {
    Self { tags, point }
  }

  /// Produce gradient definitions and sector paths; gradient identifiers are
  /// derived from `id_prefix`.
  #[must_use]
  pub fn draw(&self, scheme: &Scheme, id_prefix: &str) -> Vec<(RadialGradient, SvgPath)> {
    let mut angle: Option<f64> = None;
    let is_revert_gradient: bool;
    let direction: Option<&str>;
    let direction_radius: f64;
    let direction_color: Color;

    if self.get_tag("man_made") == Some("surveillance") {
      direction = self.get_tag("camera:direction");
      if let Some(value) = self.get_tag("camera:angle") {
        angle = parse_float(value);
      }
      if let Some(value) = self.get_tag("angle") {
        angle = parse_float(value);
      }
      direction_radius = 50.0;
      direction_color = scheme.get_color("direction_camera_color");
      is_revert_gradient = true;
    } else if self.get_tag("traffic_sign") == Some("stop") {
      direction = self.get_tag("direction");
      direction_radius = 25.0;
      direction_color = Color::new(1.0, 0.0, 0.0);
      is_revert_gradient = false;
    } else {
      direction = self.get_tag("direction");
      direction_radius = 50.0;
      direction_color = scheme.get_color("direction_view_color");
      is_revert_gradient = true;
    }

    let Some(direction) = direction else {
      return Vec::new();
    };

    let point = Vec2::new(self.point.x.trunc(), self.point.y.trunc());

    let arcs: Vec<String> = match angle {
      Some(angle) => Sector::new(direction, Some(angle))
        .draw(point, direction_radius)
        .into_iter()
        .collect(),
      None => DirectionSet::new(direction).draw(point, direction_radius),
    };

    arcs
      .into_iter()
      .enumerate()
      .map(|(index, arc)| {
        let gradient_id = format!("{id_prefix}_{index}");
        let gradient = RadialGradient::new()
          .set("id", gradient_id.clone())
          .set("cx", point.x)
          .set("cy", point.y)
          .set("r", direction_radius)
          .set("gradientUnits", "userSpaceOnUse");
        let gradient = if is_revert_gradient {
          gradient
            .add(
              Stop::new()
                .set("offset", 0.0)
                .set("stop-color", direction_color.to_hex())
                .set("stop-opacity", 0.0),
            )
            .add(
              Stop::new()
                .set("offset", 1.0)
                .set("stop-color", direction_color.to_hex())
                .set("stop-opacity", 0.7),
            )
        } else {
          gradient
            .add(
              Stop::new()
                .set("offset", 0.0)
                .set("stop-color", direction_color.to_hex())
                .set("stop-opacity", 0.4),
            )
            .add(
              Stop::new()
                .set("offset", 1.0)
                .set("stop-color", direction_color.to_hex())
                .set("stop-opacity", 0.0),
            )
        };
        let path = SvgPath::new()
          .set(
            "d",
            format!("M {},{} {} L {},{} Z", point.x, point.y, arc, point.x, point.y),
          )
          .set("fill", format!("url(#{gradient_id})"));
        (gradient, path)
      })
      .collect()
  }
}
