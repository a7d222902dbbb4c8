use std::f64::consts::PI;

use crate::geometry::boundary_box::BoundaryBox;
use crate::geometry::vector::{GeoCoordinate, Vec2};

/// Use spherical pseudo-Mercator projection to convert geo coordinates.
///
/// The result is `(x, y)`, where `x` is the longitude in `[-180, 180]` and
/// `y` is a stretched latitude that may take any real value.
#[must_use]
pub fn pseudo_mercator(coordinates: GeoCoordinate) -> Vec2 {
  let y = 180.0 / PI * (PI / 4.0 + coordinates.lat * PI / 360.0).tan().ln();
  Vec2::new(coordinates.lon, y)
}

/// Convert an OSM zoom level to pixels per meter on the equator.
///
/// See <https://wiki.openstreetmap.org/wiki/Zoom_levels>. Any non-negative
/// float zoom level is allowed.
#[must_use]
pub fn osm_zoom_level_to_pixels_per_meter(zoom_level: f64, equator_length: f64) -> f64 {
  2.0_f64.powf(zoom_level) / equator_length * 256.0
}

/// Projection from geographical coordinates onto the pixel plane.
#[derive(Debug, Clone)]
pub enum Flinger {
  Mercator(MercatorFlinger),
  Translate(TranslateFlinger),
}

impl Flinger {
  #[must_use]
  pub fn fling(&self, coordinates: GeoCoordinate) -> Vec2 {
    match self {
      Flinger::Mercator(flinger) => flinger.fling(coordinates),
      Flinger::Translate(flinger) => flinger.fling(coordinates),
    }
  }

  /// Pixels per meter at the given coordinates, defaulting to the center of
  /// the projected area.
  #[must_use]
  pub fn get_scale(&self, coordinates: Option<GeoCoordinate>) -> f64 {
    match self {
      Flinger::Mercator(flinger) => flinger.get_scale(coordinates),
      Flinger::Translate(_) => 1.0,
    }
  }

  /// Resulting image size in pixels.
  #[must_use]
  pub fn size(&self) -> Vec2 {
    match self {
      Flinger::Mercator(flinger) => flinger.size,
      Flinger::Translate(flinger) => flinger.size,
    }
  }
}

/// Convert geographical coordinates into `(x, y)` points on the plane.
#[derive(Debug, Clone)]
pub struct MercatorFlinger {
  geo_boundaries: BoundaryBox,
  ratio: f64,
  pixels_per_meter: f64,
  min_: Vec2,
  pub size: Vec2,
}

impl MercatorFlinger {
  /// Initialize the flinger with a geo boundary box and a zoom level in
  /// OpenStreetMap terminology.
  #[must_use]
  pub fn new(geo_boundaries: BoundaryBox, zoom_level: f64, equator_length: f64) -> Self {
    let ratio = 2.0_f64.powf(zoom_level) * 256.0 / 360.0;
    let size =
      (pseudo_mercator(geo_boundaries.max_()) - pseudo_mercator(geo_boundaries.min_())) * ratio;
    let size = Vec2::new(size.x.trunc(), size.y.trunc());
    let pixels_per_meter = osm_zoom_level_to_pixels_per_meter(zoom_level, equator_length);
    let min_ = pseudo_mercator(geo_boundaries.min_()) * ratio;

    Self { geo_boundaries, ratio, pixels_per_meter, min_, size }
  }

  #[must_use]
  pub fn fling(&self, coordinates: GeoCoordinate) -> Vec2 {
    let result = pseudo_mercator(coordinates) * self.ratio - self.min_;
    // Invert y axis on the coordinate plane.
    Vec2::new(result.x, self.size.y - result.y)
  }

  #[must_use]
  pub fn get_scale(&self, coordinates: Option<GeoCoordinate>) -> f64 {
    let coordinates = coordinates.unwrap_or_else(|| self.geo_boundaries.center());
    let scale_factor = (1.0 / (coordinates.lat / 180.0 * PI).cos()).abs();
    self.pixels_per_meter * scale_factor
  }
}

/// Affine projection `scale · (point + offset)` for synthetic grids.
#[derive(Debug, Clone)]
pub struct TranslateFlinger {
  pub size: Vec2,
  scale: Vec2,
  offset: Vec2,
}

impl TranslateFlinger {
  #[must_use]
  pub fn new(size: Vec2, scale: Vec2, offset: Vec2) -> Self {
    Self { size, scale, offset }
  }

  #[must_use]
  pub fn fling(&self, coordinates: GeoCoordinate) -> Vec2 {
    Vec2::new(
      self.scale.x * (coordinates.lat + self.offset.x),
      self.scale.y * (coordinates.lon + self.offset.y),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  const EARTH_EQUATOR: f64 = 40_075_017.0;

  #[test]
  fn pixels_per_meter_at_zoom_18() {
    assert_approx_eq!(
      osm_zoom_level_to_pixels_per_meter(18.0, EARTH_EQUATOR),
      1.674_581_048_8,
      1e-6
    );
  }

  #[test]
  fn equator_is_not_stretched() {
    let projected = pseudo_mercator(GeoCoordinate::new(0.0, 10.0));
    assert_approx_eq!(projected.x, 10.0);
    assert_approx_eq!(projected.y, 0.0);
  }

  #[test]
  fn corners_map_to_image_corners() {
    let boundary_box = BoundaryBox::new(4.999, 9.999, 5.001, 10.001);
    let flinger =
      Flinger::Mercator(MercatorFlinger::new(boundary_box, 18.0, EARTH_EQUATOR));
    let size = flinger.size();

    let bottom_left = flinger.fling(GeoCoordinate::new(9.999, 4.999));
    assert_approx_eq!(bottom_left.x, 0.0, 1.0);
    assert_approx_eq!(bottom_left.y, size.y, 1.0);

    let top_right = flinger.fling(GeoCoordinate::new(10.001, 5.001));
    assert_approx_eq!(top_right.x, size.x, 1.0);
    assert_approx_eq!(top_right.y, 0.0, 1.0);
  }

  #[test]
  fn scale_grows_with_latitude() {
    let boundary_box = BoundaryBox::new(4.999, 59.999, 5.001, 60.001);
    let flinger = MercatorFlinger::new(boundary_box, 18.0, EARTH_EQUATOR);
    let equator_scale = osm_zoom_level_to_pixels_per_meter(18.0, EARTH_EQUATOR);
    assert_approx_eq!(flinger.get_scale(None), equator_scale * 2.0, 1e-3);
  }

  #[test]
  fn translate_flinger_is_affine() {
    let flinger = TranslateFlinger::new(
      Vec2::new(100.0, 100.0),
      Vec2::new(2.0, 2.0),
      Vec2::new(1.0, 1.0),
    );
    let point = flinger.fling(GeoCoordinate::new(4.0, 9.0));
    assert_approx_eq!(point.x, 10.0);
    assert_approx_eq!(point.y, 20.0);
  }
}
