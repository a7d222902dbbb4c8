use log::info;
use svg::Document;
use svg::node::element::{Definitions, Group, Path as SvgPath, Rectangle, Text};

use crate::color::Color;
use crate::config::{BuildingMode, LabelMode, MapConfiguration};
use crate::constructor::Constructor;
use crate::feature::building::{BUILDING_SCALE, draw_wall};
use crate::figure::StyledFigure;
use crate::geometry::flinger::Flinger;
use crate::geometry::vector::{Segment, Vec2};
use crate::point::{Occupied, Point};

/// Figures with at least this style priority are painted above the road
/// network.
const ROAD_PRIORITY: f64 = 40.0;

const PROJECT_NAME: &str = "Mapink";

/// Map drawing: emits the SVG document in painting order.
pub struct Map<'a> {
  flinger: &'a Flinger,
  configuration: &'a MapConfiguration,
  background_color: Color,
}

impl<'a> Map<'a> {
  #[must_use]
  pub fn new(flinger: &'a Flinger, configuration: &'a MapConfiguration) -> Self {
    let background_color = configuration
      .background_color()
      .unwrap_or_else(|| configuration.scheme.get_color("background_color"));
    Self { flinger, configuration, background_color }
  }

  /// Draw the map.
  #[must_use]
  #[allow(clippy::too_many_lines)]
  pub fn draw(&self, constructor: &mut Constructor) -> Document {
    let size = self.flinger.size();
    let mut document = Document::new().set("width", size.x).set("height", size.y);

    if self.configuration.draw_background {
      document = document.add(
        Rectangle::new()
          .set("x", 0.0)
          .set("y", 0.0)
          .set("width", size.x)
          .set("height", size.y)
          .set("fill", self.background_color.to_hex()),
      );
    }

    info!("Drawing ways...");

    let figures: Vec<_> = constructor.get_sorted_figures().into_iter().cloned().collect();

    for figure in figures.iter().filter(|figure| figure.line_style.priority < ROAD_PRIORITY) {
      if let Some(path) = draw_figure(figure, self.flinger) {
        document = document.add(path);
      }
    }

    document = document.add(constructor.roads.draw(self.flinger, false));

    for figure in figures.iter().filter(|figure| figure.line_style.priority >= ROAD_PRIORITY) {
      if let Some(path) = draw_figure(figure, self.flinger) {
        document = document.add(path);
      }
    }

    for tree in &constructor.trees {
      for circle in tree.draw(self.flinger, &self.configuration.scheme) {
        document = document.add(circle);
      }
    }
    for (index, crater) in constructor.craters.iter().enumerate() {
      if let Some((gradient, circle)) = crater.draw(self.flinger, &format!("crater_{index}")) {
        document = document.add(Definitions::new().add(gradient)).add(circle);
      }
    }

    document = self.draw_buildings(document, constructor);

    for (index, direction_sector) in constructor.direction_sectors.iter().enumerate() {
      for (gradient, path) in
        direction_sector.draw(&self.configuration.scheme, &format!("direction_{index}"))
      {
        document = document.add(Definitions::new().add(gradient)).add(path);
      }
    }

    // All other points.

    let mut occupied: Option<Occupied> = if self.configuration.overlap == 0 {
      None
    } else {
      Some(Occupied::new(size.x, size.y, self.configuration.overlap))
    };

    if self.configuration.scheme.draw_nodes {
      let mut points: Vec<Point> = constructor.points.clone();
      points.sort_by(|left, right| {
        right.priority.partial_cmp(&left.priority).unwrap_or(std::cmp::Ordering::Equal)
      });

      info!("Drawing main icons...");
      for point in &mut points {
        for group in point.draw_main_shapes(&mut occupied) {
          document = document.add(group);
        }
      }

      info!("Drawing extra icons...");
      for point in &mut points {
        for group in point.draw_extra_shapes(&mut occupied) {
          document = document.add(group);
        }
      }

      info!("Drawing texts...");
      if !self.configuration.is_wireframe() && self.configuration.label_mode != LabelMode::No {
        for point in &mut points {
          for text in point.draw_texts(&mut occupied, self.configuration.label_mode) {
            document = document.add(text);
          }
        }
      }
    }

    if self.configuration.show_credit {
      document = self.draw_credits(document, size);
    }

    document
  }

  /// Draw buildings: shade, then walls band by band, then roofs.
  fn draw_buildings(&self, mut document: Document, constructor: &Constructor) -> Document {
    match self.configuration.building_mode {
      BuildingMode::No => return document,
      BuildingMode::Flat => {
        for building in &constructor.buildings {
          if let Some(path) = building.draw(self.flinger) {
            document = document.add(path);
          }
        }
        return document;
      }
      BuildingMode::Isometric | BuildingMode::IsometricNoParts => {}
    }

    info!("Drawing buildings...");

    let scale = self.flinger.get_scale(None);
    let mut building_shade = Group::new().set("opacity", 0.1);
    for building in &constructor.buildings {
      for path in building.draw_shade(self.flinger) {
        building_shade = building_shade.add(path);
      }
    }
    document = document.add(building_shade);

    // Walls of all buildings, sorted back to front.
    let mut walls: Vec<(Segment, usize)> = Vec::new();
    for (index, building) in constructor.buildings.iter().enumerate() {
      for part in &building.parts {
        walls.push((*part, index));
      }
    }
    walls.sort_by(|(left, _), (right, _)| left.y.total_cmp(&right.y));

    let mut heights = constructor.heights.clone();
    heights.sort_by(f64::total_cmp);

    let mut previous_height = 0.0;
    for height in heights {
      let shift_1 = Vec2::new(0.0, -previous_height * scale * BUILDING_SCALE);
      let shift_2 = Vec2::new(0.0, -height * scale * BUILDING_SCALE);

      for (wall, building_index) in &walls {
        let building = &constructor.buildings[*building_index];
        if building.height < height || building.min_height >= height || !building.has_walls {
          continue;
        }
        document = document.add(draw_wall(building, *wall, height, shift_1, shift_2));
      }

      if self.configuration.draw_roofs {
        for building in &constructor.buildings {
          if (building.height - height).abs() < f64::EPSILON
            && let Some(roof) = building.draw_roof(self.flinger, scale)
          {
            document = document.add(roof);
          }
        }
      }

      previous_height = height;
    }

    document
  }

  /// Add the rendering credit and the data credit to the bottom right
  /// corner.
  ///
  /// OpenStreetMap requires the credit “© OpenStreetMap contributors”, see
  /// <https://www.openstreetmap.org/copyright>.
  fn draw_credits(&self, mut document: Document, size: Vec2) -> Document {
    let right_margin = 15.0;
    let bottom_margin = 15.0;
    let font_size = 10.0;
    let vertical_spacing = 2.0;

    let text_color = Color::from_hex("#888888").expect("verified hex");
    let outline_color = Color::WHITE;

    let mut credit_list: Vec<(String, Vec2)> = vec![(
      format!("Rendering: {PROJECT_NAME}"),
      Vec2::new(right_margin, bottom_margin),
    )];
    if let Some(credit) = &self.configuration.credit {
      credit_list.push((
        format!("Data: {credit}"),
        Vec2::new(right_margin, bottom_margin + font_size + vertical_spacing),
      ));
    }

    for (text, point) in credit_list {
      let position = size - point;
      for (stroke_width, stroke, opacity) in
        [(3.0, Some(outline_color), 0.7), (1.0, None, 1.0)]
      {
        let mut element = Text::new(text.clone())
          .set("x", position.x)
          .set("y", position.y)
          .set("font-size", font_size)
          .set("text-anchor", "end")
          .set("font-family", "Helvetica")
          .set("fill", text_color.to_hex())
          .set("stroke-linejoin", "round")
          .set("stroke-width", stroke_width)
          .set("opacity", opacity);
        element = match stroke {
          Some(stroke) => element.set("stroke", stroke.to_hex()),
          None => element.set("stroke", "none"),
        };
        document = document.add(element);
      }
    }
    document
  }
}

/// Draw a styled figure, skipping malformed paths without any `M` command.
fn draw_figure(figure: &StyledFigure, flinger: &Flinger) -> Option<SvgPath> {
  let path_commands = figure.get_path(flinger);
  if !path_commands.contains('M') {
    return None;
  }
  let mut path = SvgPath::new().set("d", path_commands);
  for (key, value) in &figure.line_style.style {
    path = path.set(key.as_str(), value.as_str());
  }
  Some(path)
}
