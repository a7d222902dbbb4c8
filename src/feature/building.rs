use svg::node::element::Path as SvgPath;

use crate::color::Color;
use crate::figure::Figure;
use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{Segment, Vec2};
use crate::osm::reader::{OSMNode, Tagged, Tags};
use crate::scheme::Scheme;

pub const BUILDING_MINIMAL_HEIGHT: f64 = 8.0;
pub const BUILDING_SCALE: f64 = 0.33;
pub const LEVEL_HEIGHT: f64 = 2.5;
const SHADE_SCALE: f64 = 0.4;

/// Building on the map.
#[derive(Debug, Clone)]
pub struct Building {
  pub figure: Figure,
  pub is_construction: bool,
  pub has_walls: bool,
  pub fill: Color,
  pub stroke: Color,
  pub wall_color: Color,
  /// Shaded wall colors for the lowest 0.25 m and 0.5 m bands.
  pub wall_bottom_color_1: Color,
  pub wall_bottom_color_2: Color,
  /// Wall segments of all rings, sorted back to front.
  pub parts: Vec<Segment>,
  pub height: f64,
  pub min_height: f64,
}

impl Tagged for Building {
  fn tags(&self) -> &Tags {
    &self.figure.tags
  }
}

impl Building {
  #[must_use]
  pub fn new(
    tags: Tags,
    inners: &[Vec<OSMNode>],
    outers: &[Vec<OSMNode>],
    flinger: &Flinger,
    scheme: &Scheme,
  ) -> Self {
    let figure = Figure::new(tags, inners, outers);
    let tags = &figure.tags;

    let is_construction = tags.get("building").is_some_and(|value| value == "construction")
      || tags.get("construction").is_some_and(|value| value == "yes");
    let has_walls = tags.get("building").is_none_or(|value| value != "roof");

    let (fill, stroke) = if is_construction {
      (
        scheme.get_color("building_construction_color"),
        scheme.get_color("building_construction_border_color"),
      )
    } else if let Some(color) = tags.get("roof:colour") {
      let fill = scheme.get_color(color);
      (fill, fill.with_luminance(fill.luminance() * 0.85))
    } else {
      (scheme.get_color("building_color"), scheme.get_color("building_border_color"))
    };

    let mut parts: Vec<Segment> = Vec::new();
    for ring in figure.inners.iter().chain(&figure.outers) {
      for window in ring.windows(2) {
        parts.push(Segment::new(
          flinger.fling(window[0].coordinates),
          flinger.fling(window[1].coordinates),
        ));
      }
    }
    parts.sort_by(|left, right| left.y.total_cmp(&right.y));

    let mut wall_color = if is_construction {
      scheme.get_color("wall_construction_color")
    } else {
      scheme.get_color("wall_color")
    };
    if let Some(material) = tags.get("building:material")
      && let Some(material_color) = scheme.material_colors.get(material)
    {
      wall_color = Color::parse(material_color).unwrap_or(wall_color);
    }
    if let Some(color) = tags.get("building:colour") {
      wall_color = scheme.get_color(color);
    }
    if let Some(color) = tags.get("colour") {
      wall_color = scheme.get_color(color);
    }

    let wall_bottom_color_1 = wall_color.with_luminance(wall_color.luminance() * 0.70);
    let wall_bottom_color_2 = wall_color.with_luminance(wall_color.luminance() * 0.85);

    let mut building = Self {
      figure,
      is_construction,
      has_walls,
      fill,
      stroke,
      wall_color,
      wall_bottom_color_1,
      wall_bottom_color_2,
      parts,
      height: BUILDING_MINIMAL_HEIGHT,
      min_height: 0.0,
    };

    if let Some(levels) = building.get_float("building:levels") {
      building.height = BUILDING_MINIMAL_HEIGHT + levels * LEVEL_HEIGHT;
    }
    if let Some(levels) = building.get_float("building:min_level") {
      building.min_height = BUILDING_MINIMAL_HEIGHT + levels * LEVEL_HEIGHT;
    }
    if let Some(height) = building.get_length("height") {
      building.height = BUILDING_MINIMAL_HEIGHT + height;
    }
    if let Some(height) = building.get_length("min_height") {
      building.min_height = BUILDING_MINIMAL_HEIGHT + height;
    }

    building
  }

  /// Draw the simple flat building shape.
  #[must_use]
  pub fn draw(&self, flinger: &Flinger) -> Option<SvgPath> {
    let commands = self.figure.get_path(flinger, Vec2::default(), 0.0);
    if !commands.contains('M') {
      return None;
    }
    Some(
      SvgPath::new()
        .set("d", commands)
        .set("stroke", self.stroke.to_hex())
        .set("fill", self.fill.to_hex())
        .set("stroke-linejoin", "round"),
    )
  }

  /// Draw the shade cast by the building: the offset outline plus one
  /// quadrangle per wall, extruded along the x axis.
  #[must_use]
  pub fn draw_shade(&self, flinger: &Flinger) -> Vec<SvgPath> {
    let scale = flinger.get_scale(None) * SHADE_SCALE;
    let shift_1 = Vec2::new(scale * self.min_height, 0.0);
    let shift_2 = Vec2::new(scale * self.height, 0.0);

    let commands = self.figure.get_path(flinger, shift_1, 0.0);
    if !commands.contains('M') {
      return Vec::new();
    }

    let shade = |commands: String| {
      SvgPath::new()
        .set("d", commands)
        .set("fill", "#000000")
        .set("stroke", "#000000")
        .set("stroke-width", 1.0)
    };

    let mut paths = vec![shade(commands)];
    for ring in self.figure.inners.iter().chain(&self.figure.outers) {
      for window in ring.windows(2) {
        let flung_1 = flinger.fling(window[0].coordinates);
        let flung_2 = flinger.fling(window[1].coordinates);
        let quad = [flung_1 + shift_1, flung_2 + shift_1, flung_2 + shift_2, flung_1 + shift_2];
        paths.push(shade(format!(
          "M {},{} L {},{} L {},{} L {},{} Z",
          quad[0].x, quad[0].y, quad[1].x, quad[1].y, quad[2].x, quad[2].y, quad[3].x, quad[3].y
        )));
      }
    }
    paths
  }

  /// Draw the building roof shifted up by the full height.
  #[must_use]
  pub fn draw_roof(&self, flinger: &Flinger, scale: f64) -> Option<SvgPath> {
    let commands = self
      .figure
      .get_path(flinger, Vec2::new(0.0, -self.height * scale * BUILDING_SCALE), 0.0);
    if !commands.contains('M') {
      return None;
    }
    let fill = if self.is_construction { "none".to_string() } else { self.fill.to_hex() };
    Some(
      SvgPath::new()
        .set("d", commands)
        .set("stroke", self.stroke.to_hex())
        .set("fill", fill)
        .set("stroke-linejoin", "round"),
    )
  }
}

/// Draw one building wall segment between two height bands as a quadrangle.
///
/// The wall color simulates sunlight from the left: the shading offset is
/// `angle · 0.2 − 0.1` per channel, while the lowest bands reuse the
/// precomputed darkened colors.
#[must_use]
pub fn draw_wall(
  building: &Building,
  segment: Segment,
  height: f64,
  shift_1: Vec2,
  shift_2: Vec2,
) -> SvgPath {
  let color = if building.is_construction {
    let color_part = segment.angle * 0.2;
    Color::new(
      building.wall_color.red + color_part,
      building.wall_color.green + color_part,
      building.wall_color.blue + color_part,
    )
  } else if height <= 0.25 / BUILDING_SCALE {
    building.wall_bottom_color_1
  } else if height <= 0.5 / BUILDING_SCALE {
    building.wall_bottom_color_2
  } else {
    let color_part = segment.angle * 0.2 - 0.1;
    Color::new(
      building.wall_color.red + color_part,
      building.wall_color.green + color_part,
      building.wall_color.blue + color_part,
    )
  };

  let points = [
    segment.point_1 + shift_1,
    segment.point_2 + shift_1,
    segment.point_2 + shift_2,
    segment.point_1 + shift_2,
    segment.point_1 + shift_1,
  ];
  let commands = format!(
    "M {},{} L {},{} L {},{} L {},{} L {},{} Z",
    points[0].x,
    points[0].y,
    points[1].x,
    points[1].y,
    points[2].x,
    points[2].y,
    points[3].x,
    points[3].y,
    points[4].x,
    points[4].y
  );
  SvgPath::new()
    .set("d", commands)
    .set("fill", color.to_hex())
    .set("stroke", color.to_hex())
    .set("stroke-width", 1)
    .set("stroke-linejoin", "round")
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::flinger::TranslateFlinger;
  use crate::geometry::vector::GeoCoordinate;
  use crate::osm::reader::OSMNode;
  use crate::scheme::Scheme;
  use assert_approx_eq::assert_approx_eq;

  const TEST_SCHEME: &str = r##"
colors:
  building_color: "#D8D0C8"
  building_border_color: "#C4C0B8"
  building_construction_color: "#C0B0A0"
  building_construction_border_color: "#A0968C"
  wall_color: "#E8E0D0"
  wall_construction_color: "#D0C8B8"
material_colors:
  brick: "#BB7777"
"##;

  fn scheme() -> Scheme {
    Scheme::from_text(TEST_SCHEME).unwrap()
  }

  fn flinger() -> Flinger {
    Flinger::Translate(TranslateFlinger::new(
      Vec2::new(100.0, 100.0),
      Vec2::new(10.0, 10.0),
      Vec2::default(),
    ))
  }

  fn ring() -> Vec<Vec<OSMNode>> {
    let node = |id_: i64, lat: f64, lon: f64| {
      OSMNode::new(Tags::new(), id_, GeoCoordinate::new(lat, lon))
    };
    vec![vec![
      node(1, 0.0, 0.0),
      node(2, 0.0, 1.0),
      node(3, 1.0, 1.0),
      node(4, 1.0, 0.0),
      node(1, 0.0, 0.0),
    ]]
  }

  fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
  }

  #[test]
  fn default_height_and_colors() {
    let building =
      Building::new(tags(&[("building", "yes")]), &[], &ring(), &flinger(), &scheme());
    assert_approx_eq!(building.height, BUILDING_MINIMAL_HEIGHT);
    assert_approx_eq!(building.min_height, 0.0);
    assert_eq!(building.fill, Color::from_hex("#D8D0C8").unwrap());
    assert_eq!(building.stroke, Color::from_hex("#C4C0B8").unwrap());
    assert!(building.has_walls);
    assert_eq!(building.parts.len(), 4);
  }

  #[test]
  fn height_from_levels() {
    let building = Building::new(
      tags(&[("building", "yes"), ("building:levels", "4")]),
      &[],
      &ring(),
      &flinger(),
      &scheme(),
    );
    assert_approx_eq!(building.height, 8.0 + 4.0 * 2.5);
  }

  #[test]
  fn height_from_tag_overrides_levels() {
    let building = Building::new(
      tags(&[("building", "yes"), ("building:levels", "4"), ("height", "12 m")]),
      &[],
      &ring(),
      &flinger(),
      &scheme(),
    );
    assert_approx_eq!(building.height, 8.0 + 12.0);
  }

  #[test]
  fn construction_building() {
    let building = Building::new(
      tags(&[("building", "construction")]),
      &[],
      &ring(),
      &flinger(),
      &scheme(),
    );
    assert!(building.is_construction);
    assert_eq!(building.fill, Color::from_hex("#C0B0A0").unwrap());
  }

  #[test]
  fn roof_has_no_walls() {
    let building =
      Building::new(tags(&[("building", "roof")]), &[], &ring(), &flinger(), &scheme());
    assert!(!building.has_walls);
  }

  #[test]
  fn material_wall_color() {
    let building = Building::new(
      tags(&[("building", "yes"), ("building:material", "brick")]),
      &[],
      &ring(),
      &flinger(),
      &scheme(),
    );
    assert_eq!(building.wall_color, Color::from_hex("#BB7777").unwrap());
    assert!(building.wall_bottom_color_1.luminance() < building.wall_color.luminance());
  }

  #[test]
  fn flat_drawing() {
    let building =
      Building::new(tags(&[("building", "yes")]), &[], &ring(), &flinger(), &scheme());
    let path = building.draw(&flinger()).unwrap().to_string();
    assert!(path.contains("fill=\"#D8D0C8\""));
    assert!(path.contains("stroke=\"#C4C0B8\""));
  }

  #[test]
  fn shade_covers_walls() {
    let building =
      Building::new(tags(&[("building", "yes")]), &[], &ring(), &flinger(), &scheme());
    // Outline plus one quadrangle per wall segment.
    assert_eq!(building.draw_shade(&flinger()).len(), 5);
  }

  #[test]
  fn wall_bands_use_darkened_colors() {
    let building =
      Building::new(tags(&[("building", "yes")]), &[], &ring(), &flinger(), &scheme());
    let segment = building.parts[0];
    let low = draw_wall(&building, segment, 0.5, Vec2::default(), Vec2::default()).to_string();
    assert!(low.contains(&building.wall_bottom_color_1.to_hex()));
    let band = draw_wall(&building, segment, 1.2, Vec2::default(), Vec2::default()).to_string();
    assert!(band.contains(&building.wall_bottom_color_2.to_hex()));
  }
}
