use std::f64::consts::PI;
use std::path::{Path, PathBuf};

use log::info;
use thiserror::Error;

use crate::config::MapConfiguration;
use crate::constructor::Constructor;
use crate::geometry::boundary_box::BoundaryBox;
use crate::geometry::flinger::{Flinger, MercatorFlinger};
use crate::geometry::vector::GeoCoordinate;
use crate::icon::ShapeExtractor;
use crate::osm::getter::{FetchError, OsmFetcher};
use crate::osm::reader::{OSMData, OsmError};
use crate::painter::Map;

/// Slippy tile size in pixels.
pub const TILE_WIDTH: u32 = 256;
pub const TILE_HEIGHT: u32 = 256;

const MAX_ZOOM_LEVEL: i32 = 20;

#[derive(Error, Debug)]
pub enum TileError {
  #[error("invalid zoom level specification `{0}`")]
  InvalidZoomLevel(String),
  #[error("zoom level {0} is too big")]
  ZoomLevelTooBig(i32),
  #[error("wrong zoom level range")]
  WrongZoomLevelRange,
  #[error(transparent)]
  Fetch(#[from] FetchError),
  #[error(transparent)]
  Osm(#[from] OsmError),
  #[error("failed to rasterize SVG: {0}")]
  Raster(String),
  #[error("failed to write tile: {0}")]
  Io(#[from] std::io::Error),
  #[error("failed to split tile image: {0}")]
  Image(#[from] image::ImageError),
}

/// Converts an SVG document into PNG bytes.
pub trait Rasterizer {
  fn rasterize(&self, svg_text: &str) -> Result<Vec<u8>, TileError>;
}

/// Rasterizer backed by resvg.
#[derive(Debug, Default)]
pub struct ResvgRasterizer;

impl Rasterizer for ResvgRasterizer {
  fn rasterize(&self, svg_text: &str) -> Result<Vec<u8>, TileError> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(svg_text.as_bytes(), &options)
      .map_err(|error| TileError::Raster(error.to_string()))?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
      .ok_or_else(|| TileError::Raster("empty image".to_string()))?;
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap.as_mut());
    pixmap.encode_png().map_err(|error| TileError::Raster(error.to_string()))
  }
}

/// OpenStreetMap tile: square bitmap graphics displayed in a grid
/// arrangement to show the map.
///
/// See <https://wiki.openstreetmap.org/wiki/Tiles>.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
  pub x: i64,
  pub y: i64,
  pub zoom_level: i32,
}

impl Tile {
  #[must_use]
  pub const fn new(x: i64, y: i64, zoom_level: i32) -> Self {
    Self { x, y, zoom_level }
  }

  /// Tile containing the coordinates, using the standard slippy map
  /// formulas.
  ///
  /// See <https://wiki.openstreetmap.org/wiki/Slippy_map_tilenames>.
  #[must_use]
  #[allow(clippy::cast_possible_truncation)]
  pub fn from_coordinates(coordinates: GeoCoordinate, zoom_level: i32) -> Self {
    let lat_rad = coordinates.lat.to_radians();
    let scale = 2.0_f64.powi(zoom_level);
    let x = ((coordinates.lon + 180.0) / 360.0 * scale).trunc() as i64;
    let y = ((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * scale).trunc() as i64;
    Self { x, y, zoom_level }
  }

  /// Geo coordinates of the north-west corner of the tile.
  #[must_use]
  #[allow(clippy::cast_precision_loss)]
  pub fn get_coordinates(&self) -> GeoCoordinate {
    let scale = 2.0_f64.powi(self.zoom_level);
    let lon_deg = self.x as f64 / scale * 360.0 - 180.0;
    let lat_rad = (PI * (1.0 - 2.0 * self.y as f64 / scale)).sinh().atan();
    GeoCoordinate::new(lat_rad.to_degrees(), lon_deg)
  }

  /// Geographical boundary box of the tile.
  #[must_use]
  pub fn get_boundary_box(&self) -> BoundaryBox {
    let point_1 = self.get_coordinates();
    let point_2 = Tile::new(self.x + 1, self.y + 1, self.zoom_level).get_coordinates();
    BoundaryBox::new(point_1.lon, point_2.lat, point_2.lon, point_1.lat)
  }

  /// Same as the boundary box, extended outward to avoid edge gaps.
  #[must_use]
  pub fn get_extended_boundary_box(&self) -> BoundaryBox {
    self.get_boundary_box().round()
  }

  /// Load OSM data for the tile through the fetcher.
  pub fn load_osm_data(&self, fetcher: &dyn OsmFetcher) -> Result<OSMData, TileError> {
    let text = fetcher.fetch(&self.get_extended_boundary_box())?;
    let mut osm_data = OSMData::new();
    osm_data.parse_osm_text(&text)?;
    Ok(osm_data)
  }

  /// Tile output SVG file path.
  #[must_use]
  pub fn get_file_name(&self, directory_name: &Path) -> PathBuf {
    directory_name.join(format!("tile_{}_{}_{}.svg", self.zoom_level, self.x, self.y))
  }

  /// Whether the tile PNG is already drawn.
  #[must_use]
  pub fn exists(&self, directory_name: &Path) -> bool {
    self.get_file_name(directory_name).with_extension("png").exists()
  }

  /// Draw the tile to SVG (and PNG when a rasterizer is given), loading OSM
  /// data through the fetcher.
  pub fn draw(
    &self,
    directory_name: &Path,
    fetcher: &dyn OsmFetcher,
    extractor: &ShapeExtractor,
    configuration: &MapConfiguration,
    rasterizer: Option<&dyn Rasterizer>,
  ) -> Result<(), TileError> {
    let osm_data = self.load_osm_data(fetcher)?;
    self.draw_with_osm_data(&osm_data, directory_name, extractor, configuration, rasterizer)
  }

  /// Draw the SVG (and PNG) tile using already loaded OpenStreetMap data.
  pub fn draw_with_osm_data(
    &self,
    osm_data: &OSMData,
    directory_name: &Path,
    extractor: &ShapeExtractor,
    configuration: &MapConfiguration,
    rasterizer: Option<&dyn Rasterizer>,
  ) -> Result<(), TileError> {
    let svg_text = self.render(osm_data, extractor, configuration);

    let output_file_name = self.get_file_name(directory_name);
    std::fs::write(&output_file_name, &svg_text)?;
    info!("Tile is drawn to {}.", output_file_name.display());

    if let Some(rasterizer) = rasterizer {
      let output_path = output_file_name.with_extension("png");
      std::fs::write(&output_path, rasterizer.rasterize(&svg_text)?)?;
      info!("SVG file is rasterized to {}.", output_path.display());
    }
    Ok(())
  }

  /// Run the rendering pipeline over just this tile and return the SVG
  /// text.
  #[must_use]
  pub fn render(
    &self,
    osm_data: &OSMData,
    extractor: &ShapeExtractor,
    configuration: &MapConfiguration,
  ) -> String {
    let flinger = Flinger::Mercator(MercatorFlinger::new(
      self.get_boundary_box(),
      f64::from(self.zoom_level),
      osm_data.equator_length,
    ));

    let mut constructor = Constructor::new(osm_data, &flinger, extractor, configuration);
    constructor.construct();

    let painter = Map::new(&flinger, configuration);
    painter.draw(&mut constructor).to_string()
  }

  /// Subtiles of the tile on a deeper zoom level.
  #[must_use]
  pub fn subdivide(&self, zoom_level: i32) -> Vec<Tile> {
    assert!(zoom_level >= self.zoom_level);

    let scale = 1_i64 << (zoom_level - self.zoom_level);
    let mut tiles: Vec<Tile> = Vec::new();
    for i in 0..scale {
      for j in 0..scale {
        tiles.push(Tile::new(scale * self.x + i, scale * self.y + j, zoom_level));
      }
    }
    tiles
  }
}

/// Collection of tiles covering a boundary box.
#[derive(Debug, Clone)]
pub struct Tiles {
  pub tiles: Vec<Tile>,
  /// Left top tile.
  tile_1: Tile,
  /// Right bottom tile.
  tile_2: Tile,
  zoom_level: i32,
  pub boundary_box: BoundaryBox,
}

impl Tiles {
  /// Create the minimal set of tiles that covers the boundary box.
  #[must_use]
  pub fn from_boundary_box(boundary_box: &BoundaryBox, zoom_level: i32) -> Self {
    let tile_1 = Tile::from_coordinates(boundary_box.get_left_top(), zoom_level);
    let tile_2 = Tile::from_coordinates(boundary_box.get_right_bottom(), zoom_level);

    let mut tiles: Vec<Tile> = Vec::new();
    for x in tile_1.x..=tile_2.x {
      for y in tile_1.y..=tile_2.y {
        tiles.push(Tile::new(x, y, zoom_level));
      }
    }

    let top_left = tile_1.get_coordinates();
    let bottom_right = Tile::new(tile_2.x + 1, tile_2.y + 1, zoom_level).get_coordinates();
    let extended_boundary_box =
      BoundaryBox::new(top_left.lon, bottom_right.lat, bottom_right.lon, top_left.lat).round();

    Self { tiles, tile_1, tile_2, zoom_level, boundary_box: extended_boundary_box }
  }

  /// Load OSM data for the whole grid through the fetcher.
  pub fn load_osm_data(&self, fetcher: &dyn OsmFetcher) -> Result<OSMData, TileError> {
    let text = fetcher.fetch(&self.boundary_box)?;
    let mut osm_data = OSMData::new();
    osm_data.parse_osm_text(&text)?;
    Ok(osm_data)
  }

  /// Whether all tiles are drawn.
  #[must_use]
  pub fn tiles_exist(&self, directory_name: &Path) -> bool {
    self.tiles.iter().all(|tile| tile.exists(directory_name))
  }

  /// Render the whole grid as one SVG document.
  #[must_use]
  pub fn render(
    &self,
    osm_data: &OSMData,
    extractor: &ShapeExtractor,
    configuration: &MapConfiguration,
  ) -> String {
    let top_left = self.tile_1.get_coordinates();
    let bottom_right =
      Tile::new(self.tile_2.x + 1, self.tile_2.y + 1, self.zoom_level).get_coordinates();
    let boundary_box =
      BoundaryBox::new(top_left.lon, bottom_right.lat, bottom_right.lon, top_left.lat);

    let flinger = Flinger::Mercator(MercatorFlinger::new(
      boundary_box,
      f64::from(self.zoom_level),
      osm_data.equator_length,
    ));
    let mut constructor = Constructor::new(osm_data, &flinger, extractor, configuration);
    constructor.construct();

    let painter = Map::new(&flinger, configuration);
    painter.draw(&mut constructor).to_string()
  }

  /// Draw one image with all tiles and split it into separate 256 × 256 PNG
  /// files; this is faster than rendering every tile separately.
  pub fn draw(
    &self,
    directory: &Path,
    osm_data: &OSMData,
    extractor: &ShapeExtractor,
    configuration: &MapConfiguration,
    rasterizer: &dyn Rasterizer,
  ) -> Result<(), TileError> {
    if self.tiles_exist(directory) {
      return Ok(());
    }

    let svg_text = self.render(osm_data, extractor, configuration);
    let png_bytes = rasterizer.rasterize(&svg_text)?;
    let image = image::load_from_memory(&png_bytes)?;

    for tile in &self.tiles {
      #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
      let (x, y) = ((tile.x - self.tile_1.x) as u32, (tile.y - self.tile_1.y) as u32);
      let cropped =
        image.crop_imm(x * TILE_WIDTH, y * TILE_HEIGHT, TILE_WIDTH, TILE_HEIGHT);
      let output_path = tile.get_file_name(directory).with_extension("png");
      cropped.save(&output_path)?;
      info!("Tile {}/{}/{} is created.", tile.zoom_level, tile.x, tile.y);
    }
    Ok(())
  }

  /// Subtiles of all tiles on a deeper zoom level.
  #[must_use]
  pub fn subdivide(&self, zoom_level: i32) -> Self {
    let mut tiles: Vec<Tile> = Vec::new();
    for tile in &self.tiles {
      tiles.extend(tile.subdivide(zoom_level));
    }
    Self {
      tile_1: tiles[0],
      tile_2: tiles[tiles.len() - 1],
      tiles,
      zoom_level,
      boundary_box: self.boundary_box,
    }
  }
}

/// Parse a zoom level specification: singletons (`"17"`), lists
/// (`"16,17,18"`), ranges (`"16-18"`), and mixtures (`"15,16-18,20"`).
pub fn parse_zoom_levels(zoom_level_specification: &str) -> Result<Vec<i32>, TileError> {
  let parse = |zoom_level: &str| -> Result<i32, TileError> {
    let parsed: i32 = zoom_level
      .parse()
      .map_err(|_| TileError::InvalidZoomLevel(zoom_level.to_string()))?;
    if parsed > MAX_ZOOM_LEVEL {
      return Err(TileError::ZoomLevelTooBig(parsed));
    }
    Ok(parsed)
  };

  let mut result: Vec<i32> = Vec::new();
  for part in zoom_level_specification.split(',') {
    if let Some((start, end)) = part.split_once('-') {
      let from_zoom_level = parse(start)?;
      let to_zoom_level = parse(end)?;
      if from_zoom_level > to_zoom_level {
        return Err(TileError::WrongZoomLevelRange);
      }
      result.extend(from_zoom_level..=to_zoom_level);
    } else {
      result.push(parse(part)?);
    }
  }
  Ok(result)
}
