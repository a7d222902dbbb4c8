use std::collections::BTreeSet;

use clap::ValueEnum;

use crate::color::Color;
use crate::icon::{IconSet, ShapeExtractor};
use crate::osm::reader::Tags;
use crate::scheme::Scheme;

const DARK_BACKGROUND: &str = "#111111";

/// Map drawing mode: normal or one of the wireframe modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum DrawingMode {
  #[default]
  Normal,
  Author,
  Time,
  White,
  Black,
}

/// Label drawing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LabelMode {
  No,
  #[default]
  Main,
  All,
  Address,
}

/// Building drawing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BuildingMode {
  No,
  #[default]
  Flat,
  Isometric,
  IsometricNoParts,
}

/// Immutable map drawing configuration.
pub struct MapConfiguration {
  pub scheme: Scheme,
  pub drawing_mode: DrawingMode,
  pub building_mode: BuildingMode,
  pub label_mode: LabelMode,
  pub zoom_level: f64,
  pub overlap: i32,
  pub level: String,
  pub seed: String,
  pub show_tooltips: bool,
  pub country: String,
  pub ignore_level_matching: bool,
  pub draw_roofs: bool,
  pub show_overlapped: bool,
  pub credit: Option<String>,
  pub show_credit: bool,
  pub draw_background: bool,
}

impl MapConfiguration {
  #[must_use]
  pub fn new(scheme: Scheme, zoom_level: f64) -> Self {
    Self {
      scheme,
      drawing_mode: DrawingMode::default(),
      building_mode: BuildingMode::default(),
      label_mode: LabelMode::default(),
      zoom_level,
      overlap: 12,
      level: "overground".to_string(),
      seed: String::new(),
      show_tooltips: false,
      country: "world".to_string(),
      ignore_level_matching: false,
      draw_roofs: true,
      show_overlapped: false,
      credit: Some("© OpenStreetMap contributors".to_string()),
      show_credit: true,
      draw_background: true,
    }
  }

  /// Whether the drawing mode is one of the special wireframe modes.
  #[must_use]
  pub fn is_wireframe(&self) -> bool {
    self.drawing_mode != DrawingMode::Normal
  }

  /// Background color override based on the drawing mode.
  #[must_use]
  pub fn background_color(&self) -> Option<Color> {
    match self.drawing_mode {
      DrawingMode::Normal | DrawingMode::Black => None,
      _ => Color::from_hex(DARK_BACKGROUND),
    }
  }

  /// Construct an icon set through the scheme with this configuration's
  /// matching parameters.
  #[must_use]
  pub fn get_icon(
    &self,
    extractor: &ShapeExtractor,
    tags: &Tags,
    processed: &mut BTreeSet<String>,
  ) -> Option<(IconSet, i32)> {
    self.scheme.get_icon(
      extractor,
      tags,
      processed,
      Some(&self.country),
      self.zoom_level,
      self.ignore_level_matching,
      self.show_overlapped,
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn wireframe_modes_have_dark_background() {
    let mut configuration = MapConfiguration::new(Scheme::default(), 18.0);
    assert!(!configuration.is_wireframe());
    assert_eq!(configuration.background_color(), None);

    configuration.drawing_mode = DrawingMode::Author;
    assert!(configuration.is_wireframe());
    assert_eq!(configuration.background_color(), Color::from_hex("#111111"));

    configuration.drawing_mode = DrawingMode::Black;
    assert!(configuration.is_wireframe());
    assert_eq!(configuration.background_color(), None);
  }
}
