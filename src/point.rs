use std::collections::BTreeSet;

use log::error;
use svg::node::element::{Group, Text};

use crate::color::Color;
use crate::config::LabelMode;
use crate::geometry::vector::Vec2;
use crate::icon::{Icon, IconSet};
use crate::osm::reader::{Tagged, Tags};
use crate::text::Label;

const DEFAULT_FONT: &str = "Helvetica";

/// Remembers places of the canvas occupied by elements (icons, texts,
/// shapes). Out-of-bounds cells read as occupied.
pub struct Occupied {
  matrix: Vec<bool>,
  width: i64,
  height: i64,
  pub overlap: i32,
}

impl Occupied {
  #[must_use]
  #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  pub fn new(width: f64, height: f64, overlap: i32) -> Self {
    let width = width.max(0.0) as i64;
    let height = height.max(0.0) as i64;
    let Some(size) = usize::try_from(width * height).ok().filter(|size| *size < 1 << 32) else {
      error!(
        "Failed to allocate a matrix required by the overlap algorithm; \
         use a smaller area or overlap 0."
      );
      return Self { matrix: Vec::new(), width: 0, height: 0, overlap };
    };
    Self { matrix: vec![false; size], width, height, overlap }
  }

  /// Whether the point is already occupied by another element.
  #[must_use]
  pub fn check(&self, point: (i64, i64)) -> bool {
    if point.0 >= 0 && point.0 < self.width && point.1 >= 0 && point.1 < self.height {
      #[allow(clippy::cast_sign_loss)]
      return self.matrix[(point.0 * self.height + point.1) as usize];
    }
    true
  }

  /// Register that the point is occupied by an element.
  pub fn register(&mut self, point: (i64, i64)) {
    if point.0 >= 0 && point.0 < self.width && point.1 >= 0 && point.1 < self.height {
      #[allow(clippy::cast_sign_loss)]
      let index = (point.0 * self.height + point.1) as usize;
      self.matrix[index] = true;
    }
  }
}

#[allow(clippy::cast_possible_truncation)]
fn as_cell(point: Vec2) -> (i64, i64) {
  (point.x.trunc() as i64, point.y.trunc() as i64)
}

/// Object on the map with no dimensional attributes; it may have icons and
/// labels.
#[derive(Debug, Clone)]
pub struct Point {
  pub icon_set: IconSet,
  pub labels: Vec<Label>,
  pub tags: Tags,
  pub processed: BTreeSet<String>,
  pub point: Vec2,
  pub priority: f64,
  pub is_for_node: bool,
  pub draw_outline: bool,
  pub add_tooltips: bool,

  y: f64,
  main_icon_painted: bool,
}

impl Tagged for Point {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl Point {
  #[must_use]
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    icon_set: IconSet,
    labels: Vec<Label>,
    tags: Tags,
    processed: BTreeSet<String>,
    point: Vec2,
    priority: f64,
    is_for_node: bool,
    draw_outline: bool,
    add_tooltips: bool,
  ) -> Self {
    Self {
      icon_set,
      labels,
      tags,
      processed,
      point,
      priority,
      is_for_node,
      draw_outline,
      add_tooltips,
      y: 0.0,
      main_icon_painted: false,
    }
  }

  /// Draw the main shape for one node. Default-only icons are not painted.
  #[must_use]
  pub fn draw_main_shapes(&mut self, occupied: &mut Option<Occupied>) -> Vec<Group> {
    let keys_left =
      self.tags.keys().any(|key| !self.processed.contains(key));
    if self.icon_set.main_icon.is_default()
      && self.icon_set.extra_icons.is_empty()
      && (!keys_left || !self.is_for_node)
    {
      return Vec::new();
    }
    if self.icon_set.main_icon.is_default() {
      return Vec::new();
    }

    let position = self.point + Vec2::new(0.0, self.y);
    let main_icon = self.icon_set.main_icon.clone();
    let default_icon = self.icon_set.default_icon.clone();
    let (is_painted, groups) =
      self.draw_point_shape(&main_icon, default_icon.as_ref(), position, occupied, true);
    self.main_icon_painted = is_painted;
    if is_painted {
      self.y += 16.0;
    }
    groups
  }

  /// Draw secondary shapes in a row under the main icon.
  #[must_use]
  pub fn draw_extra_shapes(&mut self, occupied: &mut Option<Occupied>) -> Vec<Group> {
    if self.icon_set.extra_icons.is_empty() || !self.main_icon_painted {
      return Vec::new();
    }

    #[allow(clippy::cast_precision_loss)]
    let icon_count = self.icon_set.extra_icons.len() as f64;
    let mut is_place_for_extra = true;
    if let Some(occupied) = occupied {
      let mut left = -(icon_count - 1.0) * 8.0;
      for _ in &self.icon_set.extra_icons {
        let cell = as_cell(self.point + Vec2::new(left, self.y));
        if occupied.check(cell) {
          is_place_for_extra = false;
          break;
        }
        left += 16.0;
      }
    }

    let mut groups: Vec<Group> = Vec::new();
    if is_place_for_extra {
      let mut left = -(icon_count - 1.0) * 8.0;
      let extra_icons = self.icon_set.extra_icons.clone();
      for icon in &extra_icons {
        let position = self.point + Vec2::new(left, self.y);
        let (_, icon_groups) = self.draw_point_shape(icon, None, position, occupied, false);
        groups.extend(icon_groups);
        left += 16.0;
      }
      self.y += 16.0;
    }
    groups
  }

  /// Draw one combined icon and its outline; a small default icon replaces
  /// the real one when the position is occupied.
  fn draw_point_shape(
    &self,
    icon: &Icon,
    default_icon: Option<&Icon>,
    position: Vec2,
    occupied: &mut Option<Occupied>,
    with_tooltips: bool,
  ) -> (bool, Vec<Group>) {
    // Down-cast floats to integers to make icons pixel-perfect.
    let position = Vec2::new(position.x.trunc(), position.y.trunc());

    let mut icon_to_draw = icon;
    let mut is_painted = true;

    if let Some(occupied) = occupied.as_ref()
      && occupied.check(as_cell(position))
    {
      match default_icon {
        Some(default_icon) => {
          icon_to_draw = default_icon;
          is_painted = false;
        }
        None => return (false, Vec::new()),
      }
    }

    let tags = (self.add_tooltips && with_tooltips).then_some(&self.tags);
    let mut groups: Vec<Group> = Vec::new();
    if self.draw_outline {
      groups.push(icon_to_draw.draw(position, None, true));
    }
    groups.push(icon_to_draw.draw(position, tags, false));

    if let Some(occupied) = occupied.as_mut()
      && is_painted
    {
      let overlap = i64::from(occupied.overlap);
      let cell = as_cell(position);
      for i in -overlap..overlap {
        for j in -overlap..overlap {
          occupied.register((cell.0 + i, cell.1 + j));
        }
      }
    }

    (is_painted, groups)
  }

  /// Draw labels under the icons; colliding labels are dropped, not moved.
  #[must_use]
  pub fn draw_texts(
    &mut self,
    occupied: &mut Option<Occupied>,
    label_mode: LabelMode,
  ) -> Vec<Text> {
    let labels: Vec<Label> = match label_mode {
      LabelMode::Main => self.labels.iter().take(1).cloned().collect(),
      LabelMode::All | LabelMode::Address => self.labels.clone(),
      LabelMode::No => return Vec::new(),
    };

    let mut texts: Vec<Text> = Vec::new();
    for label in labels {
      let text = label.text.replace("&quot;", "\"").replace("&amp;", "&");
      let text: String = if text.chars().count() > 26 {
        format!("{}...", text.chars().take(26).collect::<String>())
      } else {
        text
      };
      let point = self.point + Vec2::new(0.0, self.y + 2.0);
      texts.extend(self.draw_text(
        &text,
        point,
        occupied,
        label.fill,
        label.size,
        label.out_fill,
      ));
    }
    texts
  }

  /// Draw one text with its halo, registering the footprint in the grid.
  fn draw_text(
    &mut self,
    text: &str,
    point: Vec2,
    occupied: &mut Option<Occupied>,
    fill: Color,
    size: f64,
    out_fill: Color,
  ) -> Vec<Text> {
    #[allow(clippy::cast_possible_wrap)]
    let length = text.chars().count() as i64 * 6;

    if let Some(occupied) = occupied.as_mut() {
      let cell = as_cell(point);
      let is_occupied =
        (-length / 2..length / 2).any(|i| occupied.check((cell.0 + i, cell.1 - 4)));
      if is_occupied {
        return Vec::new();
      }
      for i in -length / 2..length / 2 {
        for j in -12..5 {
          occupied.register((cell.0 + i, cell.1 + j));
        }
      }
    }

    let text_element = |stroke: Option<(Color, f64, f64)>| {
      let mut element = Text::new(text)
        .set("x", point.x)
        .set("y", point.y)
        .set("font-size", size)
        .set("text-anchor", "middle")
        .set("font-family", DEFAULT_FONT)
        .set("fill", fill.to_hex())
        .set("stroke-linejoin", "round");
      if let Some((stroke, stroke_width, opacity)) = stroke {
        element = element
          .set("stroke", stroke.to_hex())
          .set("stroke-width", stroke_width)
          .set("opacity", opacity);
      }
      element
    };

    let result = vec![text_element(Some((out_fill, 3.0, 0.5))), text_element(None)];
    self.y += 11.0;
    result
  }
}
