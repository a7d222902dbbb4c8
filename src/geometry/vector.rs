use std::f64::consts::PI;
use std::fmt::Write;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

const EPSILON: f64 = 1e-8;

/// A geographical coordinate in the WGS84 system.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GeoCoordinate {
  pub lat: f64,
  pub lon: f64,
}

impl GeoCoordinate {
  #[must_use]
  pub const fn new(lat: f64, lon: f64) -> Self {
    Self { lat, lon }
  }
}

/// A point or displacement on the drawing plane.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec2 {
  pub x: f64,
  pub y: f64,
}

impl Vec2 {
  #[must_use]
  pub const fn new(x: f64, y: f64) -> Self {
    Self { x, y }
  }

  #[must_use]
  pub fn length(self) -> f64 {
    self.x.hypot(self.y)
  }

  #[must_use]
  pub fn dot(self, other: Self) -> f64 {
    self.x * other.x + self.y * other.y
  }

  #[must_use]
  pub fn is_close(self, other: Self) -> bool {
    (self.x - other.x).abs() < EPSILON && (self.y - other.y).abs() < EPSILON
  }
}

impl Add for Vec2 {
  type Output = Self;

  fn add(self, rhs: Self) -> Self {
    Self::new(self.x + rhs.x, self.y + rhs.y)
  }
}

impl AddAssign for Vec2 {
  fn add_assign(&mut self, rhs: Self) {
    self.x += rhs.x;
    self.y += rhs.y;
  }
}

impl Sub for Vec2 {
  type Output = Self;

  fn sub(self, rhs: Self) -> Self {
    Self::new(self.x - rhs.x, self.y - rhs.y)
  }
}

impl Mul<f64> for Vec2 {
  type Output = Self;

  fn mul(self, rhs: f64) -> Self {
    Self::new(self.x * rhs, self.y * rhs)
  }
}

impl Neg for Vec2 {
  type Output = Self;

  fn neg(self) -> Self {
    Self::new(-self.x, -self.y)
  }
}

/// Angle between the vector and `(1, 0)`, in `[0, 2π)`.
#[must_use]
pub fn compute_angle(vector: Vec2) -> f64 {
  if vector.x == 0.0 {
    if vector.y > 0.0 {
      return PI / 2.0;
    }
    return PI + PI / 2.0;
  }
  if vector.x < 0.0 {
    return (vector.y / vector.x).atan() + PI;
  }
  if vector.y < 0.0 {
    return (vector.y / vector.x).atan() + 2.0 * PI;
  }
  (vector.y / vector.x).atan()
}

/// Rotate the vector by an angle in radians.
#[must_use]
pub fn turn_by_angle(vector: Vec2, angle: f64) -> Vec2 {
  Vec2::new(
    vector.x * angle.cos() - vector.y * angle.sin(),
    vector.x * angle.sin() + vector.y * angle.cos(),
  )
}

/// Vector with the same direction and length 1. The caller guarantees the
/// input is nonzero.
#[must_use]
pub fn norm(vector: Vec2) -> Vec2 {
  vector * (1.0 / vector.length())
}

/// List of connected points.
#[derive(Debug, Clone)]
pub struct Polyline {
  pub points: Vec<Vec2>,
}

impl Polyline {
  #[must_use]
  pub fn new(points: Vec<Vec2>) -> Self {
    Self { points }
  }

  /// Construct SVG path commands, `None` for degenerate polylines with fewer
  /// than two points.
  ///
  /// A nonzero `parallel_offset` shifts the whole line sideways; if the
  /// offset cannot be computed the untouched path is used instead.
  #[must_use]
  pub fn get_path(&self, parallel_offset: f64) -> Option<String> {
    let offset_points: Option<Vec<Vec2>> = if parallel_offset.abs() < EPSILON {
      None
    } else {
      offset(&self.points, parallel_offset)
    };
    let points: &[Vec2] = offset_points.as_deref().unwrap_or(&self.points);

    if points.len() < 2 {
      return None;
    }

    let mut path = String::from("M ");
    for (index, point) in points.iter().enumerate() {
      if index > 0 {
        path.push_str(" L ");
      }
      let _ = write!(path, "{},{}", point.x, point.y);
    }
    if points[0].is_close(points[points.len() - 1]) {
      path.push_str(" Z");
    }
    Some(path)
  }

  /// Move the endpoint selected by `index` (first or last) toward its
  /// neighbor by `length`.
  pub fn shorten(&mut self, index: usize, length: f64) {
    let neighbor = if index == 0 { 1 } else { self.points.len() - 2 };
    let difference = self.points[neighbor] - self.points[index];
    self.points[index] += norm(difference) * length;
  }
}

/// Shift a point chain sideways by `distance` (to the right of the walking
/// direction), joining adjacent segments at their line intersection.
fn offset(points: &[Vec2], distance: f64) -> Option<Vec<Vec2>> {
  if points.len() < 2 {
    return None;
  }

  let mut shifts: Vec<Vec2> = Vec::with_capacity(points.len() - 1);
  let mut lines: Vec<Line> = Vec::with_capacity(points.len() - 1);
  for window in points.windows(2) {
    let direction = window[1] - window[0];
    if direction.length() < EPSILON {
      return None;
    }
    let shift = turn_by_angle(norm(direction), -PI / 2.0) * distance;
    let mut line = Line::new(window[0], window[1]);
    line.parallel_shift(shift);
    shifts.push(shift);
    lines.push(line);
  }

  let mut result: Vec<Vec2> = Vec::with_capacity(points.len());
  result.push(points[0] + shifts[0]);
  for index in 1..points.len() - 1 {
    if lines[index - 1].is_parallel(&lines[index]) {
      result.push(points[index] + shifts[index]);
    } else {
      result.push(lines[index - 1].get_intersection_point(&lines[index]));
    }
  }
  result.push(points[points.len() - 1] + shifts[shifts.len() - 1]);
  Some(result)
}

/// Infinite line `Ax + By + C = 0`.
#[derive(Debug, Clone, Copy)]
pub struct Line {
  pub a: f64,
  pub b: f64,
  pub c: f64,
}

impl Line {
  #[must_use]
  pub fn new(start: Vec2, end: Vec2) -> Self {
    Self {
      a: start.y - end.y,
      b: end.x - start.x,
      c: start.x * end.y - end.x * start.y,
    }
  }

  pub fn parallel_shift(&mut self, shift: Vec2) {
    self.c -= self.a * shift.x + self.b * shift.y;
  }

  #[must_use]
  pub fn is_parallel(&self, other: &Line) -> bool {
    (other.a * self.b - self.a * other.b).abs() < EPSILON
  }

  /// Intersection point, or the origin for parallel lines.
  #[must_use]
  pub fn get_intersection_point(&self, other: &Line) -> Vec2 {
    let divisor = other.a * self.b - self.a * other.b;
    if divisor == 0.0 {
      return Vec2::default();
    }
    let x = -(self.b * other.c - other.b * self.c) / divisor;
    let y = -(self.a * other.c - other.a * self.c) / (other.b * self.a - self.b * other.a);
    Vec2::new(x, y)
  }
}

/// Closed line segment with precomputed values for wall painting: the
/// midpoint height used for back-to-front ordering and the angle against the
/// vertical used for shading.
#[derive(Debug, Clone, Copy)]
pub struct Segment {
  pub point_1: Vec2,
  pub point_2: Vec2,
  pub y: f64,
  pub angle: f64,
}

impl Segment {
  #[must_use]
  pub fn new(point_1: Vec2, point_2: Vec2) -> Self {
    let y = (point_1.y + point_2.y) / 2.0;
    let mut vector = norm(point_2 - point_1);
    if vector.x > 0.0 {
      vector = -vector;
    }
    let angle = vector.dot(Vec2::new(0.0, 1.0)).acos() / PI;
    Self { point_1, point_2, y, angle }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  #[test]
  fn angles() {
    assert_approx_eq!(compute_angle(Vec2::new(1.0, 0.0)), 0.0);
    assert_approx_eq!(compute_angle(Vec2::new(0.0, 1.0)), PI / 2.0);
    assert_approx_eq!(compute_angle(Vec2::new(-1.0, 0.0)), PI);
    assert_approx_eq!(compute_angle(Vec2::new(0.0, -1.0)), 3.0 * PI / 2.0);
  }

  #[test]
  fn rotation() {
    let turned = turn_by_angle(Vec2::new(1.0, 0.0), PI / 2.0);
    assert_approx_eq!(turned.x, 0.0);
    assert_approx_eq!(turned.y, 1.0);
  }

  #[test]
  fn path_commands() {
    let line = Polyline::new(vec![Vec2::new(0.0, 0.0), Vec2::new(1.0, 2.0)]);
    assert_eq!(line.get_path(0.0).unwrap(), "M 0,0 L 1,2");

    let ring = Polyline::new(vec![
      Vec2::new(0.0, 0.0),
      Vec2::new(1.0, 0.0),
      Vec2::new(1.0, 1.0),
      Vec2::new(0.0, 0.0),
    ]);
    assert!(ring.get_path(0.0).unwrap().ends_with(" Z"));
  }

  #[test]
  fn degenerate_path() {
    assert!(Polyline::new(vec![Vec2::new(1.0, 1.0)]).get_path(0.0).is_none());
    assert!(Polyline::new(vec![]).get_path(0.0).is_none());
  }

  #[test]
  fn offset_shifts_line() {
    let line = Polyline::new(vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]);
    let path = line.get_path(2.0).unwrap();
    // A rightward walk shifted to its right moves down to y = -2.
    assert_ne!(path, line.get_path(0.0).unwrap());
    assert!(path.contains("-2"));
  }

  #[test]
  fn offset_falls_back_on_degenerate_segment() {
    let line = Polyline::new(vec![Vec2::new(0.0, 0.0), Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)]);
    // Zero-length first segment: the offset fails and the raw path is used.
    assert_eq!(line.get_path(3.0).unwrap(), "M 0,0 L 0,0 L 1,0");
  }

  #[test]
  fn shorten_moves_endpoint() {
    let mut line = Polyline::new(vec![Vec2::new(0.0, 0.0), Vec2::new(10.0, 0.0)]);
    line.shorten(0, 4.0);
    assert_approx_eq!(line.points[0].x, 4.0);
    line.shorten(1, 2.0);
    assert_approx_eq!(line.points[1].x, 8.0);
  }

  #[test]
  fn line_intersection() {
    let horizontal = Line::new(Vec2::new(0.0, 1.0), Vec2::new(5.0, 1.0));
    let vertical = Line::new(Vec2::new(2.0, 0.0), Vec2::new(2.0, 5.0));
    assert!(!horizontal.is_parallel(&vertical));
    let point = horizontal.get_intersection_point(&vertical);
    assert_approx_eq!(point.x, 2.0);
    assert_approx_eq!(point.y, 1.0);
  }

  #[test]
  fn segment_order_and_shading() {
    let lower = Segment::new(Vec2::new(0.0, 10.0), Vec2::new(2.0, 10.0));
    let upper = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(2.0, 0.0));
    assert!(upper.y < lower.y);

    let vertical = Segment::new(Vec2::new(0.0, 0.0), Vec2::new(0.0, 5.0));
    assert!(vertical.angle < 0.5);
  }
}
