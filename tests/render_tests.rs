use mapink::config::{BuildingMode, MapConfiguration};
use mapink::constructor::Constructor;
use mapink::geometry::boundary_box::BoundaryBox;
use mapink::geometry::flinger::{Flinger, MercatorFlinger};
use mapink::geometry::vector::GeoCoordinate;
use mapink::icon::ShapeExtractor;
use mapink::osm::reader::{EARTH_EQUATOR_LENGTH, OSMData};
use mapink::painter::Map;
use mapink::scheme::Scheme;

const TEST_SCHEME: &str = r##"
colors:
  background_color: "#EEEEEE"
  default: "#444444"
  extra: "#888888"
  tree_color: "#98AC64"
  water_color: "#AACCEE"
  water_border_color: "#2E5E91"
  wood_color: "#B8CC84"
  building_color: "#D8D0C8"
  building_border_color: "#C4C0B8"
  building_construction_color: "#C0B0A0"
  building_construction_border_color: "#A0968C"
  wall_color: "#E8E0D0"
  wall_construction_color: "#D0C8B8"
  evergreen_color: "#688C44"
  trunk_color: "#804000"
  direction_view_color: "#E0E0E0"
  direction_camera_color: "#0088FF"
  road_color: "#FFFFFF"
  text_color: "#444444"
  text_main_color: "#000000"
  text_outline_color: "#FFFFFF"
node_icons:
  - tags:
      - tags: {natural: tree}
        shapes: [{shape: tree, color: tree_color}]
      - tags: {barrier: gate}
        shapes: [barrier_gate]
      - tags: {access: private}
        add_shapes: [lock]
      - tags: {bicycle: "*"}
        add_shapes: [bicycle]
ways:
  - tags: {natural: wood}
    style: {fill: wood_color, stroke: none}
    priority: 21
  - tags: {natural: water}
    style: {fill: water_color, stroke: water_border_color, stroke-width: 1}
    priority: 21
  - tags: {waterway: river}
    style: {fill: none, stroke: water_border_color, stroke-width: 2}
    priority: 45
roads:
  - tags: {highway: primary}
    border_color: "#AA8800"
    color: "#FFDD66"
    default_width: 7
    priority: 50
area_tags:
  - tags: {natural: wood}
"##;

const TEST_ICONS: &str = r##"<svg xmlns="http://www.w3.org/2000/svg">
  <path id="default" d="M 4,4 L 12,12"/>
  <path id="default_small" d="M 6,6 L 10,10"/>
  <path id="tree" d="M 3,13 L 8,3 L 13,13"/>
  <path id="barrier_gate" d="M 1,8 L 15,8"/>
  <path id="lock" d="M 5,5 L 11,11"/>
  <path id="bicycle" d="M 2,12 L 14,12"/>
</svg>"##;

const TEST_ICONS_CONFIGURATION: &str = r#"{
  "default": {"name": "default"},
  "default_small": {"name": "default small"},
  "tree": {"name": "tree"},
  "barrier_gate": {"name": "gate"},
  "lock": {"name": "lock"},
  "bicycle": {"name": "bicycle"}
}"#;

fn extractor() -> ShapeExtractor {
  ShapeExtractor::from_texts(TEST_ICONS, TEST_ICONS_CONFIGURATION).unwrap()
}

fn configuration() -> MapConfiguration {
  MapConfiguration::new(Scheme::from_text(TEST_SCHEME).unwrap(), 18.0)
}

fn boundary_box() -> BoundaryBox {
  BoundaryBox::new(4.999, 9.999, 5.001, 10.001)
}

fn flinger() -> Flinger {
  Flinger::Mercator(MercatorFlinger::new(boundary_box(), 18.0, EARTH_EQUATOR_LENGTH))
}

fn render(osm_data: &OSMData, configuration: &MapConfiguration) -> String {
  let flinger = flinger();
  let extractor = extractor();
  let mut constructor = Constructor::new(osm_data, &flinger, &extractor, configuration);
  constructor.construct();
  let painter = Map::new(&flinger, configuration);
  painter.draw(&mut constructor).to_string()
}

fn parse(text: &str) -> OSMData {
  let mut osm_data = OSMData::new();
  osm_data.parse_osm_text(text).unwrap();
  osm_data
}

#[test]
fn tree_node_is_rendered_with_icon() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="10" lon="5"><tag k="natural" v="tree"/></node>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  // Background rectangle filled with the scheme background color.
  assert!(document.contains("<rect"));
  assert!(document.contains("#EEEEEE"));

  // The tree shape in the tree color, plus its outline pass.
  assert!(document.contains("M 3,13 L 8,3 L 13,13"));
  assert!(document.contains("#98AC64"));
  assert!(document.contains("stroke-width=\"2.2\""));

  // The icon is placed at the projected node position.
  let position = flinger().fling(GeoCoordinate::new(10.0, 5.0));
  let expected = format!("translate({},{})", position.x.trunc(), position.y.trunc());
  assert!(document.contains(&expected));
}

#[test]
fn building_is_rendered_flat() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="9.9995" lon="4.9995"/>
      <node id="2" lat="9.9995" lon="5.0005"/>
      <node id="3" lat="10.0005" lon="5.0005"/>
      <node id="4" lat="10.0005" lon="4.9995"/>
      <way id="10">
        <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
        <tag k="building" v="yes"/>
      </way>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  let building = document
    .split("<path")
    .find(|part| part.contains("fill=\"#D8D0C8\""))
    .expect("building polygon");
  assert!(building.contains("stroke=\"#C4C0B8\""));
  assert!(building.contains('Z'));
}

#[test]
fn multipolygon_water_with_hole_is_one_path() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="9.9993" lon="4.9993"/>
      <node id="2" lat="9.9993" lon="5.0007"/>
      <node id="3" lat="10.0007" lon="5.0007"/>
      <node id="4" lat="10.0007" lon="4.9993"/>
      <node id="5" lat="9.9997" lon="4.9997"/>
      <node id="6" lat="9.9997" lon="5.0003"/>
      <node id="7" lat="10.0003" lon="5.0003"/>
      <node id="8" lat="10.0003" lon="4.9997"/>
      <way id="10"><nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/></way>
      <way id="11"><nd ref="5"/><nd ref="6"/><nd ref="7"/><nd ref="8"/><nd ref="5"/></way>
      <relation id="20">
        <member type="way" ref="10" role="outer"/>
        <member type="way" ref="11" role="inner"/>
        <tag k="natural" v="water"/>
        <tag k="type" v="multipolygon"/>
      </relation>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  let water = document
    .split("<path")
    .find(|part| part.contains("fill=\"#AACCEE\""))
    .expect("water polygon");
  // Outer and inner ring in a single path, relying on ring orientation.
  assert_eq!(water.matches("M ").count(), 2);
  assert_eq!(water.matches('Z').count(), 2);
}

#[test]
fn primary_road_has_border_below_fill() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="10" lon="4.9995"/>
      <node id="2" lat="10" lon="5.0005"/>
      <way id="10">
        <nd ref="1"/><nd ref="2"/>
        <tag k="highway" v="primary"/>
      </way>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  let border_position = document.find("#AA8800").expect("road border");
  let fill_position = document.find("#FFDD66").expect("road fill");
  assert!(border_position < fill_position);

  // The border stroke is wider than the fill stroke.
  let stroke_width = |position: usize| -> f64 {
    let rest = &document[position..];
    let start = rest.find("stroke-width=\"").expect("stroke width") + 14;
    rest[start..].split('"').next().unwrap().parse().unwrap()
  };
  assert!(stroke_width(border_position) > stroke_width(fill_position));
}

#[test]
fn overlapping_icons_fall_back_to_default_dot() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="10" lon="5"><tag k="barrier" v="gate"/></node>
      <node id="2" lat="10" lon="5.00001"><tag k="barrier" v="gate"/></node>
    </osm>"#,
  );
  let mut configuration = configuration();
  configuration.overlap = 14;
  configuration.show_overlapped = true;
  let document = render(&osm_data, &configuration);

  // The first gate icon wins: outline pass plus the icon itself.
  assert_eq!(document.matches("M 1,8 L 15,8").count(), 2);
  // The second point is painted as the small default dot.
  assert_eq!(document.matches("M 6,6 L 10,10").count(), 2);
}

#[test]
fn occluded_point_is_dropped_without_default_icon() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="10" lon="5"><tag k="barrier" v="gate"/></node>
      <node id="2" lat="10" lon="5.00001"><tag k="barrier" v="gate"/></node>
    </osm>"#,
  );
  let mut configuration = configuration();
  configuration.overlap = 14;
  let document = render(&osm_data, &configuration);

  assert_eq!(document.matches("M 1,8 L 15,8").count(), 2);
  assert_eq!(document.matches("M 6,6 L 10,10").count(), 0);
}

#[test]
fn river_is_painted_above_wood() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="9.9995" lon="4.9995"/>
      <node id="2" lat="9.9995" lon="5.0005"/>
      <node id="3" lat="10.0005" lon="5.0005"/>
      <way id="10">
        <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="1"/>
        <tag k="natural" v="wood"/>
      </way>
      <way id="11">
        <nd ref="1"/><nd ref="2"/><nd ref="3"/>
        <tag k="waterway" v="river"/>
      </way>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  let wood_position = document.find("#B8CC84").expect("wood fill");
  let river_position = document.find("stroke=\"#2E5E91\"").expect("river stroke");
  assert!(wood_position < river_position);
}

#[test]
fn empty_map_still_has_background_and_credits() {
  let osm_data = OSMData::new();
  let document = render(&osm_data, &configuration());

  assert!(document.contains("<rect"));
  assert!(document.contains("Rendering: Mapink"));
  assert!(document.contains("Data: © OpenStreetMap contributors"));
}

#[test]
fn isometric_buildings_have_shade_walls_and_roofs() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="9.9995" lon="4.9995"/>
      <node id="2" lat="9.9995" lon="5.0005"/>
      <node id="3" lat="10.0005" lon="5.0005"/>
      <node id="4" lat="10.0005" lon="4.9995"/>
      <way id="10">
        <nd ref="1"/><nd ref="2"/><nd ref="3"/><nd ref="4"/><nd ref="1"/>
        <tag k="building" v="yes"/>
        <tag k="building:levels" v="3"/>
      </way>
    </osm>"#,
  );
  let mut configuration = configuration();
  configuration.building_mode = BuildingMode::Isometric;
  let document = render(&osm_data, &configuration);

  // The shade group at 0.1 opacity.
  assert!(document.contains("opacity=\"0.1\""));
  // The roof keeps the flat building colors.
  assert!(document.contains("fill=\"#D8D0C8\""));
  // Walls are painted under the roof.
  assert!(document.matches("stroke-linejoin=\"round\"").count() > 4);
}

#[test]
fn direction_sector_uses_radial_gradient() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="10" lon="5">
        <tag k="tourism" v="viewpoint"/>
        <tag k="direction" v="90"/>
      </node>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  assert!(document.contains("<radialGradient"));
  assert!(document.contains("url(#direction_0)"));
  assert!(document.contains("#E0E0E0"));
}

#[test]
fn labels_are_rendered_with_halo() {
  let osm_data = parse(
    r#"<osm>
      <node id="1" lat="10" lon="5">
        <tag k="barrier" v="gate"/>
        <tag k="name" v="Garden Gate"/>
      </node>
    </osm>"#,
  );
  let document = render(&osm_data, &configuration());

  // Halo pass and fill pass.
  assert_eq!(document.matches(">Garden Gate</text>").count(), 2);
  assert!(document.contains("text-anchor=\"middle\""));
}
