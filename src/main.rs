use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use log::{info, warn};

use mapink::config::{BuildingMode, DrawingMode, LabelMode, MapConfiguration};
use mapink::constructor::Constructor;
use mapink::geometry::boundary_box::BoundaryBox;
use mapink::geometry::flinger::{Flinger, MercatorFlinger};
use mapink::geometry::vector::GeoCoordinate;
use mapink::icon::ShapeExtractor;
use mapink::osm::getter::DirectoryFetcher;
use mapink::osm::reader::OSMData;
use mapink::painter::Map;
use mapink::scheme::Scheme;
use mapink::tile::{Rasterizer, ResvgRasterizer, Tiles, parse_zoom_levels};

const DEFAULT_SIZE: (f64, f64) = (800.0, 600.0);

#[derive(Parser)]
#[command(name = "mapink", about = "OpenStreetMap renderer producing SVG maps and slippy tiles")]
struct Arguments {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Render a map of an area to an SVG file.
  Render(RenderArguments),
  /// Generate slippy map tiles.
  Tiles(TileArguments),
}

#[derive(Args)]
struct AssetArguments {
  /// Scheme file with tags, colors, and tag key specifications.
  #[arg(long)]
  scheme: PathBuf,
  /// SVG file with icon shapes.
  #[arg(long)]
  icons: PathBuf,
  /// JSON file with icon shape descriptions.
  #[arg(long)]
  icons_config: PathBuf,
}

impl AssetArguments {
  fn load_scheme(&self) -> anyhow::Result<Scheme> {
    Scheme::from_file(&self.scheme)
      .with_context(|| format!("failed to load scheme `{}`", self.scheme.display()))
  }

  fn load_extractor(&self) -> anyhow::Result<ShapeExtractor> {
    ShapeExtractor::from_files(&self.icons, &self.icons_config)
      .with_context(|| format!("failed to load icons `{}`", self.icons.display()))
  }
}

#[derive(Args)]
struct DrawingArguments {
  /// Map drawing mode.
  #[arg(long, value_enum, default_value_t = DrawingMode::Normal)]
  mode: DrawingMode,
  /// Building drawing mode.
  #[arg(long, value_enum, default_value_t = BuildingMode::Flat)]
  buildings: BuildingMode,
  /// Label drawing mode.
  #[arg(long, value_enum, default_value_t = LabelMode::Main)]
  label_mode: LabelMode,
  /// Icon overlap radius; 0 disables overlap checking.
  #[arg(long, default_value_t = 12)]
  overlap: i32,
  /// Level filter: `all`, `overground`, `underground`, or a number.
  #[arg(long, default_value = "overground")]
  level: String,
  /// Seed for author mode colors.
  #[arg(long, default_value = "")]
  seed: String,
  /// Add tag tooltips to icons.
  #[arg(long)]
  tooltips: bool,
  /// Country code for location restrictions.
  #[arg(long, default_value = "world")]
  country: String,
  /// Do not check zoom level requirements of matchers.
  #[arg(long)]
  ignore_level_matching: bool,
  /// Do not draw building roofs in isometric mode.
  #[arg(long)]
  no_roofs: bool,
  /// Show small dots for points hidden by other icons.
  #[arg(long)]
  show_overlapped: bool,
  /// Do not draw the credits.
  #[arg(long)]
  hide_credit: bool,
  /// Do not draw the background rectangle.
  #[arg(long)]
  no_background: bool,
}

impl DrawingArguments {
  fn apply(&self, mut configuration: MapConfiguration) -> MapConfiguration {
    configuration.drawing_mode = self.mode;
    configuration.building_mode = self.buildings;
    configuration.label_mode = self.label_mode;
    configuration.overlap = self.overlap;
    configuration.level = self.level.clone();
    configuration.seed = self.seed.clone();
    configuration.show_tooltips = self.tooltips;
    configuration.country = self.country.clone();
    configuration.ignore_level_matching = self.ignore_level_matching;
    configuration.draw_roofs = !self.no_roofs;
    configuration.show_overlapped = self.show_overlapped;
    configuration.show_credit = !self.hide_credit;
    configuration.draw_background = !self.no_background;
    configuration
  }
}

#[derive(Args)]
struct RenderArguments {
  /// Input OSM XML or Overpass JSON files.
  #[arg(long, short)]
  input: Vec<PathBuf>,
  /// Boundary box `<left>,<bottom>,<right>,<top>`.
  #[arg(long, short)]
  boundary_box: Option<String>,
  /// Center coordinates `<latitude>,<longitude>`.
  #[arg(long, short)]
  coordinates: Option<String>,
  /// Image size `<width>,<height>` in pixels, used with coordinates.
  #[arg(long, short)]
  size: Option<String>,
  /// Zoom level in OpenStreetMap terminology.
  #[arg(long, short, default_value_t = 18.0)]
  zoom: f64,
  /// Output SVG file name.
  #[arg(long, short, default_value = "map.svg")]
  output: PathBuf,
  /// Rasterize the result into a PNG file.
  #[arg(long)]
  png: Option<PathBuf>,
  #[command(flatten)]
  assets: AssetArguments,
  #[command(flatten)]
  drawing: DrawingArguments,
}

#[derive(Args)]
struct TileArguments {
  /// Input OSM XML file; its bounds element defines the covered area.
  #[arg(long, short)]
  input: Option<PathBuf>,
  /// Boundary box `<left>,<bottom>,<right>,<top>`, used with a cache of
  /// downloaded documents.
  #[arg(long, short)]
  boundary_box: Option<String>,
  /// Zoom level specification, e.g. `17`, `16-18`, or `15,16-18,20`.
  #[arg(long, short, default_value = "18")]
  zoom: String,
  /// Directory for generated tiles.
  #[arg(long, short, default_value = "tiles")]
  output_directory: PathBuf,
  /// Directory with cached OSM documents.
  #[arg(long)]
  cache: Option<PathBuf>,
  #[command(flatten)]
  assets: AssetArguments,
  #[command(flatten)]
  drawing: DrawingArguments,
}

fn read_osm_data(input: &[PathBuf]) -> anyhow::Result<OSMData> {
  let mut osm_data = OSMData::new();
  for input_file_name in input {
    if !input_file_name.is_file() {
      bail!("no such file: {}", input_file_name.display());
    }
    if input_file_name.extension().is_some_and(|extension| extension == "json") {
      osm_data.parse_overpass_file(input_file_name)?;
    } else {
      osm_data.parse_osm_file(input_file_name)?;
    }
  }
  Ok(osm_data)
}

/// Map rendering entry point.
fn render_map(arguments: &RenderArguments) -> anyhow::Result<()> {
  let configuration = arguments
    .drawing
    .apply(MapConfiguration::new(arguments.assets.load_scheme()?, arguments.zoom));
  let extractor = arguments.assets.load_extractor()?;

  // Compute the boundary box.

  let mut boundary_box: Option<BoundaryBox> = None;

  if let Some(text) = &arguments.boundary_box {
    boundary_box = BoundaryBox::from_text(text);
    if boundary_box.is_none() {
      bail!("invalid boundary box");
    }
    if arguments.coordinates.is_some() {
      warn!("Boundary box is explicitly specified. Coordinates are ignored.");
    }
  } else if let Some(coordinates) = &arguments.coordinates {
    let parts: Vec<f64> =
      coordinates.split([',', '/']).filter_map(|part| part.trim().parse().ok()).collect();
    let [lat, lon] = parts.as_slice() else {
      bail!("wrong coordinates format");
    };
    let (width, height) = match &arguments.size {
      Some(size) => {
        let parts: Vec<f64> =
          size.split(',').filter_map(|part| part.trim().parse().ok()).collect();
        let [width, height] = parts.as_slice() else {
          bail!("wrong size format");
        };
        (*width, *height)
      }
      None => DEFAULT_SIZE,
    };
    boundary_box = Some(BoundaryBox::from_coordinates(
      GeoCoordinate::new(*lat, *lon),
      arguments.zoom,
      width,
      height,
    ));
  }

  if arguments.input.is_empty() {
    bail!("specify either --input, or --boundary-box, or --coordinates");
  }

  // Get OpenStreetMap data.

  let osm_data = read_osm_data(&arguments.input)?;

  let boundary_box = boundary_box
    .or(osm_data.view_box)
    .or(osm_data.boundary_box)
    .context("cannot determine the area to render")?;

  // Render the map.

  let flinger = Flinger::Mercator(MercatorFlinger::new(
    boundary_box,
    arguments.zoom,
    osm_data.equator_length,
  ));

  let mut constructor = Constructor::new(&osm_data, &flinger, &extractor, &configuration);
  constructor.construct();

  let painter = Map::new(&flinger, &configuration);
  let document = painter.draw(&mut constructor).to_string();

  info!("Writing output SVG to {}...", arguments.output.display());
  std::fs::write(&arguments.output, &document)?;

  if let Some(png_path) = &arguments.png {
    std::fs::write(png_path, ResvgRasterizer.rasterize(&document)?)?;
    info!("SVG file is rasterized to {}.", png_path.display());
  }
  Ok(())
}

/// Tile generation entry point.
fn generate_tiles(arguments: &TileArguments) -> anyhow::Result<()> {
  let zoom_levels = parse_zoom_levels(&arguments.zoom)?;
  std::fs::create_dir_all(&arguments.output_directory)?;

  let (osm_data, boundary_box) = if let Some(input) = &arguments.input {
    let osm_data = read_osm_data(std::slice::from_ref(input))?;
    let boundary_box = osm_data
      .view_box
      .with_context(|| format!("failed to parse boundary box from {}", input.display()))?;
    (osm_data, boundary_box)
  } else if let Some(text) = &arguments.boundary_box {
    let boundary_box = BoundaryBox::from_text(text).context("invalid boundary box")?;
    let cache_path = arguments
      .cache
      .clone()
      .or_else(|| dirs::cache_dir().map(|directory| directory.join("mapink")))
      .context("no cache directory")?;
    let fetcher = DirectoryFetcher::new(cache_path);
    let min_zoom_level =
      zoom_levels.iter().copied().min().context("empty zoom level specification")?;
    let tiles = Tiles::from_boundary_box(&boundary_box, min_zoom_level);
    (tiles.load_osm_data(&fetcher)?, boundary_box)
  } else {
    bail!("specify either --input or --boundary-box");
  };

  let extractor = arguments.assets.load_extractor()?;
  let rasterizer = ResvgRasterizer;

  for zoom_level in zoom_levels {
    let configuration = arguments
      .drawing
      .apply(MapConfiguration::new(arguments.assets.load_scheme()?, f64::from(zoom_level)));
    let tiles = Tiles::from_boundary_box(&boundary_box, zoom_level);
    tiles.draw(&arguments.output_directory, &osm_data, &extractor, &configuration, &rasterizer)?;
  }
  Ok(())
}

fn main() -> anyhow::Result<()> {
  env_logger::init();

  let arguments = Arguments::parse();
  match &arguments.command {
    Command::Render(render_arguments) => render_map(render_arguments),
    Command::Tiles(tile_arguments) => generate_tiles(tile_arguments),
  }
}
