use std::path::PathBuf;

use mapink::config::MapConfiguration;
use mapink::geometry::boundary_box::BoundaryBox;
use mapink::icon::ShapeExtractor;
use mapink::osm::getter::{FetchError, OsmFetcher};
use mapink::scheme::Scheme;
use mapink::tile::Tile;

const TEST_SCHEME: &str = r##"
colors:
  background_color: "#EEEEEE"
  default: "#444444"
  tree_color: "#98AC64"
node_icons:
  - tags:
      - tags: {natural: tree}
        shapes: [{shape: tree, color: tree_color}]
"##;

const TEST_ICONS: &str = r#"<svg xmlns="http://www.w3.org/2000/svg">
  <path id="default" d="M 4,4 L 12,12"/>
  <path id="default_small" d="M 6,6 L 10,10"/>
  <path id="tree" d="M 3,13 L 8,3 L 13,13"/>
</svg>"#;

const TEST_ICONS_CONFIGURATION: &str = r#"{
  "default": {"name": "default"},
  "default_small": {"name": "default small"},
  "tree": {"name": "tree"}
}"#;

/// Fetcher that hands out a fixed document and remembers nothing.
struct FixedFetcher {
  document: String,
}

impl OsmFetcher for FixedFetcher {
  fn fetch(&self, _boundary_box: &BoundaryBox) -> Result<String, FetchError> {
    Ok(self.document.clone())
  }
}

struct FailingFetcher;

impl OsmFetcher for FailingFetcher {
  fn fetch(&self, _boundary_box: &BoundaryBox) -> Result<String, FetchError> {
    Err(FetchError::TooManyNodes)
  }
}

fn temporary_directory(name: &str) -> PathBuf {
  let directory = std::env::temp_dir().join(format!("mapink_{}_{}", name, std::process::id()));
  std::fs::create_dir_all(&directory).unwrap();
  directory
}

#[test]
fn tile_is_drawn_through_the_pipeline() {
  let tile = Tile::from_coordinates(mapink::geometry::vector::GeoCoordinate::new(10.0, 5.0), 18);
  let boundary_box = tile.get_boundary_box();
  let (lat, lon) = (boundary_box.center().lat, boundary_box.center().lon);

  let fetcher = FixedFetcher {
    document: format!(
      r#"<osm>
        <node id="1" lat="{lat}" lon="{lon}"><tag k="natural" v="tree"/></node>
      </osm>"#
    ),
  };

  let extractor = ShapeExtractor::from_texts(TEST_ICONS, TEST_ICONS_CONFIGURATION).unwrap();
  let configuration = MapConfiguration::new(Scheme::from_text(TEST_SCHEME).unwrap(), 18.0);

  let directory = temporary_directory("tiles");
  tile.draw(&directory, &fetcher, &extractor, &configuration, None).unwrap();

  let svg_path = tile.get_file_name(&directory);
  let document = std::fs::read_to_string(&svg_path).unwrap();
  assert!(document.starts_with("<svg"));
  assert!(document.contains("M 3,13 L 8,3 L 13,13"));

  std::fs::remove_dir_all(&directory).unwrap();
}

#[test]
fn fetcher_failure_aborts_the_tile() {
  let tile = Tile::new(0, 0, 18);
  let extractor = ShapeExtractor::from_texts(TEST_ICONS, TEST_ICONS_CONFIGURATION).unwrap();
  let configuration = MapConfiguration::new(Scheme::from_text(TEST_SCHEME).unwrap(), 18.0);

  let directory = temporary_directory("failing");
  let result = tile.draw(&directory, &FailingFetcher, &extractor, &configuration, None);
  assert!(result.is_err());

  std::fs::remove_dir_all(&directory).unwrap();
}
