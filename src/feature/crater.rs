use svg::node::element::{Circle, RadialGradient, Stop};

use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{GeoCoordinate, Vec2};
use crate::osm::reader::{Tagged, Tags};

/// Volcano or impact crater on the map, drawn as a radial gradient disc that
/// leaves a ring impression.
#[derive(Debug, Clone)]
pub struct Crater {
  pub tags: Tags,
  pub coordinates: GeoCoordinate,
  pub point: Vec2,
}

impl Tagged for Crater {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl Crater {
  #[must_use]
  pub fn new(tags: Tags, coordinates: GeoCoordinate, point: Vec2) -> Self {
    Self { tags, coordinates, point }
  }

  /// Draw the crater ridge; the gradient identifier is taken from
  /// `id_prefix`.
  #[must_use]
  pub fn draw(&self, flinger: &Flinger, id_prefix: &str) -> Option<(RadialGradient, Circle)> {
    let scale = flinger.get_scale(Some(self.coordinates));
    let radius = self.get_float("diameter")? / 2.0;

    let gradient = RadialGradient::new()
      .set("id", id_prefix.to_string())
      .set("cx", self.point.x)
      .set("cy", self.point.y + radius * scale / 7.0)
      .set("r", radius * scale)
      .set("gradientUnits", "userSpaceOnUse")
      .add(Stop::new().set("offset", 0.0).set("stop-color", "#000000").set("stop-opacity", 0.2))
      .add(Stop::new().set("offset", 0.7).set("stop-color", "#000000").set("stop-opacity", 0.2))
      .add(Stop::new().set("offset", 1.0).set("stop-color", "#000000").set("stop-opacity", 1.0));

    let circle = Circle::new()
      .set("cx", self.point.x)
      .set("cy", self.point.y)
      .set("r", radius * scale)
      .set("fill", format!("url(#{id_prefix})"))
      .set("opacity", 0.2);

    Some((gradient, circle))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::flinger::TranslateFlinger;

  fn flinger() -> Flinger {
    Flinger::Translate(TranslateFlinger::new(
      Vec2::new(100.0, 100.0),
      Vec2::new(1.0, 1.0),
      Vec2::default(),
    ))
  }

  #[test]
  fn crater_gradient() {
    let tags: Tags = [("natural", "crater"), ("diameter", "20")]
      .iter()
      .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
      .collect();
    let crater = Crater::new(tags, GeoCoordinate::default(), Vec2::new(50.0, 50.0));
    let (gradient, circle) = crater.draw(&flinger(), "crater_0").unwrap();
    assert!(gradient.to_string().contains("crater_0"));
    let rendered = circle.to_string();
    assert!(rendered.contains("url(#crater_0)"));
    assert!(rendered.contains("r=\"10\""));
  }

  #[test]
  fn crater_without_diameter_is_skipped() {
    let crater = Crater::new(Tags::new(), GeoCoordinate::default(), Vec2::default());
    assert!(crater.draw(&flinger(), "crater_0").is_none());
  }
}
