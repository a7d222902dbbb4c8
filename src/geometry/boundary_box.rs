use std::f64::consts::PI;

use log::error;
use regex::Regex;

use crate::geometry::vector::GeoCoordinate;

/// Maximum boundary box span per axis in degrees; a guard against requests
/// that would cover half a country.
const LATITUDE_MAX_DIFFERENCE: f64 = 0.5;
const LONGITUDE_MAX_DIFFERENCE: f64 = 0.5;

/// Rectangle that limits space on the map.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryBox {
  /// Minimum longitude.
  pub left: f64,
  /// Minimum latitude.
  pub bottom: f64,
  /// Maximum longitude.
  pub right: f64,
  /// Maximum latitude.
  pub top: f64,
}

impl BoundaryBox {
  #[must_use]
  pub const fn new(left: f64, bottom: f64, right: f64, top: f64) -> Self {
    Self { left, bottom, right, top }
  }

  /// Parse the `<left>,<bottom>,<right>,<top>` text representation.
  ///
  /// Note that `left < right` and `bottom < top` are required, and both axes
  /// are limited to 0.5°.
  #[must_use]
  pub fn from_text(boundary_box: &str) -> Option<Self> {
    let boundary_box = boundary_box.replace(' ', "");

    let matcher = Regex::new(
      "^(?P<left>[0-9.-]+),(?P<bottom>[0-9.-]+),(?P<right>[0-9.-]+),(?P<top>[0-9.-]+)$",
    )
    .expect("verified regex");
    let Some(groups) = matcher.captures(&boundary_box) else {
      error!("Invalid boundary box.");
      return None;
    };

    let parse = |name: &str| groups.name(name).and_then(|x| x.as_str().parse::<f64>().ok());
    let (Some(left), Some(bottom), Some(right), Some(top)) =
      (parse("left"), parse("bottom"), parse("right"), parse("top"))
    else {
      error!("Invalid boundary box.");
      return None;
    };

    if left >= right {
      error!("Negative horizontal boundary.");
      return None;
    }
    if bottom >= top {
      error!("Negative vertical boundary.");
      return None;
    }
    if right - left > LONGITUDE_MAX_DIFFERENCE || top - bottom > LATITUDE_MAX_DIFFERENCE {
      error!("Boundary box is too big.");
      return None;
    }

    Some(Self::new(left, bottom, right, top))
  }

  /// Compute a boundary box from its center, a zoom level, and the resulting
  /// image size in pixels.
  #[must_use]
  pub fn from_coordinates(
    coordinates: GeoCoordinate,
    zoom_level: f64,
    width: f64,
    height: f64,
  ) -> Self {
    let lat_rad = coordinates.lat.to_radians();
    let n = 2.0_f64.powf(zoom_level + 8.0);

    let x = ((coordinates.lon + 180.0) / 360.0 * n).floor();
    let left = (x - width / 2.0) / n * 360.0 - 180.0;
    let right = (x + width / 2.0) / n * 360.0 - 180.0;

    let y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    let bottom_radians = ((1.0 - (y + height / 2.0) * 2.0 / n) * PI).sinh().atan();
    let top_radians = ((1.0 - (y - height / 2.0) * 2.0 / n) * PI).sinh().atan();

    Self::new(left, bottom_radians.to_degrees(), right, top_radians.to_degrees())
  }

  /// Minimum coordinates (bottom left).
  #[must_use]
  pub fn min_(&self) -> GeoCoordinate {
    GeoCoordinate::new(self.bottom, self.left)
  }

  /// Maximum coordinates (top right).
  #[must_use]
  pub fn max_(&self) -> GeoCoordinate {
    GeoCoordinate::new(self.top, self.right)
  }

  #[must_use]
  pub fn get_left_top(&self) -> GeoCoordinate {
    GeoCoordinate::new(self.top, self.left)
  }

  #[must_use]
  pub fn get_right_bottom(&self) -> GeoCoordinate {
    GeoCoordinate::new(self.bottom, self.right)
  }

  /// Round the boundaries to three decimal places, extended outward by
  /// 0.001° to avoid edge gaps.
  #[must_use]
  pub fn round(mut self) -> Self {
    self.left = (self.left * 1000.0).round() / 1000.0 - 0.001;
    self.bottom = (self.bottom * 1000.0).round() / 1000.0 - 0.001;
    self.right = (self.right * 1000.0).round() / 1000.0 + 0.001;
    self.top = (self.top * 1000.0).round() / 1000.0 + 0.001;
    self
  }

  #[must_use]
  pub fn center(&self) -> GeoCoordinate {
    GeoCoordinate::new((self.top + self.bottom) / 2.0, (self.left + self.right) / 2.0)
  }

  /// Canonical text representation with coordinates rounded outward to three
  /// decimal places; used as a cache key for downloaded documents.
  #[must_use]
  pub fn get_format(&self) -> String {
    let left = (self.left * 1000.0).floor() / 1000.0;
    let bottom = (self.bottom * 1000.0).floor() / 1000.0;
    let right = (self.right * 1000.0).ceil() / 1000.0;
    let top = (self.top * 1000.0).ceil() / 1000.0;
    format!("{left:.3},{bottom:.3},{right:.3},{top:.3}")
  }

  /// Make the boundary box cover the coordinates.
  pub fn update(&mut self, coordinates: GeoCoordinate) {
    self.left = self.left.min(coordinates.lon);
    self.bottom = self.bottom.min(coordinates.lat);
    self.right = self.right.max(coordinates.lon);
    self.top = self.top.max(coordinates.lat);
  }

  /// Combine with another boundary box.
  pub fn combine(&mut self, other: &BoundaryBox) {
    self.left = self.left.min(other.left);
    self.bottom = self.bottom.min(other.bottom);
    self.right = self.right.max(other.right);
    self.top = self.top.max(other.top);
  }
}
