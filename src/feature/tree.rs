use std::f64::consts::PI;

use svg::node::element::Circle;

use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{GeoCoordinate, Vec2};
use crate::osm::reader::{Tagged, Tags};
use crate::scheme::Scheme;

/// Tree on the map, displayed as crown and trunk circles when their radii
/// are tagged.
#[derive(Debug, Clone)]
pub struct Tree {
  pub tags: Tags,
  pub coordinates: GeoCoordinate,
  pub point: Vec2,
}

impl Tagged for Tree {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl Tree {
  #[must_use]
  pub fn new(tags: Tags, coordinates: GeoCoordinate, point: Vec2) -> Self {
    Self { tags, coordinates, point }
  }

  /// Draw crown and trunk.
  #[must_use]
  pub fn draw(&self, flinger: &Flinger, scheme: &Scheme) -> Vec<Circle> {
    let scale = flinger.get_scale(Some(self.coordinates));

    let radius = self.get_float("diameter_crown").map_or(2.0, |diameter| diameter / 2.0);
    let crown = Circle::new()
      .set("cx", self.point.x)
      .set("cy", self.point.y)
      .set("r", radius * scale)
      .set("fill", scheme.get_color("evergreen_color").to_hex())
      .set("opacity", 0.3);

    let mut circles = vec![crown];
    if let Some(circumference) = self.get_float("circumference") {
      let radius = circumference / 2.0 / PI;
      circles.push(
        Circle::new()
          .set("cx", self.point.x)
          .set("cy", self.point.y)
          .set("r", radius * scale)
          .set("fill", scheme.get_color("trunk_color").to_hex()),
      );
    }
    circles
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::flinger::TranslateFlinger;

  const TEST_SCHEME: &str = r##"
colors:
  evergreen_color: "#688C44"
  trunk_color: "#804000"
"##;

  fn tree(pairs: &[(&str, &str)]) -> Tree {
    let tags: Tags =
      pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    Tree::new(tags, GeoCoordinate::default(), Vec2::new(10.0, 10.0))
  }

  fn flinger() -> Flinger {
    Flinger::Translate(TranslateFlinger::new(
      Vec2::new(100.0, 100.0),
      Vec2::new(1.0, 1.0),
      Vec2::default(),
    ))
  }

  #[test]
  fn crown_only() {
    let scheme = Scheme::from_text(TEST_SCHEME).unwrap();
    let circles = tree(&[("natural", "tree")]).draw(&flinger(), &scheme);
    assert_eq!(circles.len(), 1);
    let rendered = circles[0].to_string();
    assert!(rendered.contains("r=\"2\""));
    assert!(rendered.contains("#688C44"));
  }

  #[test]
  fn trunk_from_circumference() {
    let scheme = Scheme::from_text(TEST_SCHEME).unwrap();
    let circles =
      tree(&[("natural", "tree"), ("circumference", "3.1")]).draw(&flinger(), &scheme);
    assert_eq!(circles.len(), 2);
    assert!(circles[1].to_string().contains("#804000"));
  }
}
