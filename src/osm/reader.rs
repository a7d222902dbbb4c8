use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, Utc};
use log::warn;
use regex::Regex;
use thiserror::Error;

use crate::geometry::boundary_box::BoundaryBox;
use crate::geometry::vector::GeoCoordinate;

/// OpenStreetMap tags: a string-to-string mapping with stable iteration
/// order.
pub type Tags = BTreeMap<String, String>;

const OSM_TIME_PATTERN: &str = "%Y-%m-%dT%H:%M:%SZ";

pub const EARTH_EQUATOR_LENGTH: f64 = 40_075_017.0;

static METERS_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new("^(?P<value>\\d*\\.?\\d*)\\s*m$").expect("verified regex"));
static KILOMETERS_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new("^(?P<value>\\d*\\.?\\d*)\\s*km$").expect("verified regex"));
static MILES_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new("^(?P<value>\\d*\\.?\\d*)\\s*mi$").expect("verified regex"));

#[derive(Error, Debug)]
pub enum OsmError {
  #[error("node with duplicate id {0}")]
  DuplicateNode(i64),
  #[error("way with duplicate id {0}")]
  DuplicateWay(i64),
  #[error("relation with duplicate id {0}")]
  DuplicateRelation(i64),
  #[error("malformed OSM document: {0}")]
  Malformed(String),
  #[error("failed to read OSM document: {0}")]
  Io(#[from] std::io::Error),
}

/// Parse the string representation of a float or integer value.
#[must_use]
pub fn parse_float(string: &str) -> Option<f64> {
  string.parse::<f64>().ok()
}

/// Parse the string representation of a level sequence value.
#[must_use]
pub fn parse_levels(string: &str) -> Vec<f64> {
  let result: Option<Vec<f64>> = string
    .replace(',', ".")
    .split(';')
    .map(|part| part.parse::<f64>().ok())
    .collect();
  result.unwrap_or_else(|| {
    warn!("Cannot parse level description from `{string}`.");
    Vec::new()
  })
}

/// Something with tags.
pub trait Tagged {
  fn tags(&self) -> &Tags;

  /// Tag value, or `None` if it doesn't exist.
  fn get_tag(&self, key: &str) -> Option<&str> {
    self.tags().get(key).map(String::as_str)
  }

  /// Parse a float from the tag value.
  fn get_float(&self, key: &str) -> Option<f64> {
    self.tags().get(key).and_then(|value| parse_float(value))
  }

  /// Length in meters: a bare number, `N m`, `N km`, or `N mi`.
  fn get_length(&self, key: &str) -> Option<f64> {
    let value = self.tags().get(key)?;

    if let Some(float_value) = parse_float(value) {
      return Some(float_value);
    }

    for (pattern, ratio) in [
      (&*METERS_PATTERN, 1.0),
      (&*KILOMETERS_PATTERN, 1000.0),
      (&*MILES_PATTERN, 1609.344),
    ] {
      if let Some(groups) = pattern.captures(value)
        && let Some(float_value) = parse_float(&groups["value"])
      {
        return Some(float_value * ratio);
      }
    }

    None
  }
}

/// Minimum and maximum of a series of values.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MinMax<T> {
  pub min_: Option<T>,
  pub max_: Option<T>,
}

impl<T: PartialOrd + Copy> MinMax<T> {
  pub fn update(&mut self, value: T) {
    if self.min_.is_none_or(|current| value < current) {
      self.min_ = Some(value);
    }
    if self.max_.is_none_or(|current| value > current) {
      self.max_ = Some(value);
    }
  }

  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.min_ == self.max_
  }
}

/// Optional authorship attributes shared by nodes, ways, and relations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementMetadata {
  pub visible: Option<String>,
  pub changeset: Option<String>,
  pub timestamp: Option<DateTime<Utc>>,
  pub user: Option<String>,
  pub uid: Option<String>,
}

impl ElementMetadata {
  fn from_xml(element: &roxmltree::Node) -> Self {
    let attribute = |name: &str| element.attribute(name).map(str::to_string);
    Self {
      visible: attribute("visible"),
      changeset: attribute("changeset"),
      timestamp: element.attribute("timestamp").and_then(parse_timestamp),
      user: attribute("user"),
      uid: attribute("uid"),
    }
  }
}

fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
  match NaiveDateTime::parse_from_str(value, OSM_TIME_PATTERN) {
    Ok(timestamp) => Some(timestamp.and_utc()),
    Err(_) => {
      warn!("Cannot parse timestamp `{value}`.");
      None
    }
  }
}

/// OpenStreetMap node, see <https://wiki.openstreetmap.org/wiki/Node>.
#[derive(Debug, Clone)]
pub struct OSMNode {
  pub tags: Tags,
  pub id_: i64,
  pub coordinates: GeoCoordinate,
  pub metadata: ElementMetadata,
}

impl OSMNode {
  #[must_use]
  pub fn new(tags: Tags, id_: i64, coordinates: GeoCoordinate) -> Self {
    Self { tags, id_, coordinates, metadata: ElementMetadata::default() }
  }

  fn get_boundary_box(&self) -> BoundaryBox {
    BoundaryBox::new(
      self.coordinates.lon,
      self.coordinates.lat,
      self.coordinates.lon,
      self.coordinates.lat,
    )
  }
}

impl Tagged for OSMNode {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

impl PartialEq for OSMNode {
  fn eq(&self, other: &Self) -> bool {
    self.id_ == other.id_
      && self.coordinates == other.coordinates
      && self.metadata == other.metadata
  }
}

/// OpenStreetMap way, see <https://wiki.openstreetmap.org/wiki/Way>.
#[derive(Debug, Clone, PartialEq)]
pub struct OSMWay {
  pub tags: Tags,
  pub id_: i64,
  pub nodes: Vec<OSMNode>,
  pub metadata: ElementMetadata,
}

impl OSMWay {
  #[must_use]
  pub fn new(tags: Tags, id_: i64, nodes: Vec<OSMNode>) -> Self {
    Self { tags, id_, nodes, metadata: ElementMetadata::default() }
  }

  /// Whether the way is a cycle or an area boundary.
  #[must_use]
  pub fn is_cycle(&self) -> bool {
    self.nodes[0] == self.nodes[self.nodes.len() - 1]
  }
}

impl Tagged for OSMWay {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

/// Member of an OpenStreetMap relation.
#[derive(Debug, Clone, PartialEq)]
pub struct OSMMember {
  pub type_: String,
  pub ref_: i64,
  pub role: String,
}

/// OpenStreetMap relation, see
/// <https://wiki.openstreetmap.org/wiki/Relation>.
#[derive(Debug, Clone, PartialEq)]
pub struct OSMRelation {
  pub tags: Tags,
  pub id_: i64,
  pub members: Vec<OSMMember>,
  pub metadata: ElementMetadata,
}

impl Tagged for OSMRelation {
  fn tags(&self) -> &Tags {
    &self.tags
  }
}

/// The whole OpenStreetMap information about nodes, ways, and relations.
#[derive(Debug, Default)]
pub struct OSMData {
  pub nodes: BTreeMap<i64, OSMNode>,
  pub ways: BTreeMap<i64, OSMWay>,
  pub relations: BTreeMap<i64, OSMRelation>,

  pub authors: BTreeSet<String>,
  pub time: MinMax<DateTime<Utc>>,
  /// Boundary box from an explicit `<bounds>` element.
  pub view_box: Option<BoundaryBox>,
  /// Boundary box enclosing all nodes.
  pub boundary_box: Option<BoundaryBox>,
  pub equator_length: f64,
}

impl OSMData {
  #[must_use]
  pub fn new() -> Self {
    Self { equator_length: EARTH_EQUATOR_LENGTH, ..Self::default() }
  }

  /// Add a node and update map parameters.
  pub fn add_node(&mut self, node: OSMNode) -> Result<(), OsmError> {
    if let Some(present) = self.nodes.get(&node.id_) {
      if *present != node {
        return Err(OsmError::DuplicateNode(node.id_));
      }
      return Ok(());
    }
    if let Some(user) = &node.metadata.user {
      self.authors.insert(user.clone());
    }
    if let Some(timestamp) = node.metadata.timestamp {
      self.time.update(timestamp);
    }
    match &mut self.boundary_box {
      Some(boundary_box) => boundary_box.update(node.coordinates),
      None => self.boundary_box = Some(node.get_boundary_box()),
    }
    self.nodes.insert(node.id_, node);
    Ok(())
  }

  /// Add a way and update map parameters.
  pub fn add_way(&mut self, way: OSMWay) -> Result<(), OsmError> {
    if let Some(present) = self.ways.get(&way.id_) {
      if *present != way {
        return Err(OsmError::DuplicateWay(way.id_));
      }
      return Ok(());
    }
    if let Some(user) = &way.metadata.user {
      self.authors.insert(user.clone());
    }
    if let Some(timestamp) = way.metadata.timestamp {
      self.time.update(timestamp);
    }
    self.ways.insert(way.id_, way);
    Ok(())
  }

  /// Add a relation.
  pub fn add_relation(&mut self, relation: OSMRelation) -> Result<(), OsmError> {
    if let Some(present) = self.relations.get(&relation.id_) {
      if *present != relation {
        return Err(OsmError::DuplicateRelation(relation.id_));
      }
      return Ok(());
    }
    self.relations.insert(relation.id_, relation);
    Ok(())
  }

  /// Parse an OSM XML file, see
  /// <https://wiki.openstreetmap.org/wiki/OSM_XML>.
  pub fn parse_osm_file(&mut self, file_name: &Path) -> Result<(), OsmError> {
    let text = std::fs::read_to_string(file_name)?;
    self.parse_osm_text(&text)
  }

  /// Parse OSM XML data from its text representation.
  pub fn parse_osm_text(&mut self, text: &str) -> Result<(), OsmError> {
    let document = roxmltree::Document::parse(text)
      .map_err(|error| OsmError::Malformed(error.to_string()))?;

    for element in document.root_element().children().filter(roxmltree::Node::is_element) {
      match element.tag_name().name() {
        "bounds" => self.parse_bounds(&element)?,
        "object" => self.parse_object(&element)?,
        "node" => {
          let node = parse_node_xml(&element)?;
          self.add_node(node)?;
        }
        "way" => {
          let way = parse_way_xml(&element, &self.nodes)?;
          self.add_way(way)?;
        }
        "relation" => {
          let relation = parse_relation_xml(&element)?;
          self.add_relation(relation)?;
        }
        _ => {}
      }
    }
    Ok(())
  }

  /// Parse a JSON structure extracted from the Overpass API, see
  /// <https://wiki.openstreetmap.org/wiki/Overpass_API>.
  pub fn parse_overpass_file(&mut self, file_name: &Path) -> Result<(), OsmError> {
    let text = std::fs::read_to_string(file_name)?;
    self.parse_overpass_text(&text)
  }

  /// Parse Overpass JSON from its text representation; elements are
  /// processed in three passes (nodes, ways, relations).
  pub fn parse_overpass_text(&mut self, text: &str) -> Result<(), OsmError> {
    let structure: serde_json::Value = serde_json::from_str(text)
      .map_err(|error| OsmError::Malformed(error.to_string()))?;
    let elements = structure["elements"]
      .as_array()
      .ok_or_else(|| OsmError::Malformed("`elements` array expected".to_string()))?;

    let element_type =
      |element: &serde_json::Value| element["type"].as_str().unwrap_or_default().to_string();

    for element in elements.iter().filter(|element| element_type(element) == "node") {
      let node = parse_node_json(element)?;
      match &mut self.view_box {
        Some(view_box) => view_box.update(node.coordinates),
        None => self.view_box = Some(node.get_boundary_box()),
      }
      self.add_node(node)?;
    }
    for element in elements.iter().filter(|element| element_type(element) == "way") {
      let way = parse_way_json(element, &self.nodes)?;
      self.add_way(way)?;
    }
    for element in elements.iter().filter(|element| element_type(element) == "relation") {
      let relation = parse_relation_json(element)?;
      self.add_relation(relation)?;
    }
    Ok(())
  }

  /// Parse the view box from a `<bounds>` element.
  fn parse_bounds(&mut self, element: &roxmltree::Node) -> Result<(), OsmError> {
    let attribute = |name: &str| -> Result<f64, OsmError> {
      element
        .attribute(name)
        .and_then(parse_float)
        .ok_or_else(|| OsmError::Malformed(format!("bad `{name}` in `bounds`")))
    };
    let boundary_box = BoundaryBox::new(
      attribute("minlon")?,
      attribute("minlat")?,
      attribute("maxlon")?,
      attribute("maxlat")?,
    );
    match &mut self.view_box {
      Some(view_box) => view_box.combine(&boundary_box),
      None => self.view_box = Some(boundary_box),
    }
    Ok(())
  }

  /// Parse celestial body properties from an `<object>` element.
  fn parse_object(&mut self, element: &roxmltree::Node) -> Result<(), OsmError> {
    self.equator_length = element
      .attribute("equator")
      .and_then(parse_float)
      .ok_or_else(|| OsmError::Malformed("bad `equator` in `object`".to_string()))?;
    Ok(())
  }
}

fn parse_tags_xml(element: &roxmltree::Node) -> Tags {
  element
    .children()
    .filter(|child| child.tag_name().name() == "tag")
    .filter_map(|child| {
      Some((child.attribute("k")?.to_string(), child.attribute("v")?.to_string()))
    })
    .collect()
}

fn parse_id(element: &roxmltree::Node) -> Result<i64, OsmError> {
  element
    .attribute("id")
    .and_then(|id| id.parse::<i64>().ok())
    .ok_or_else(|| OsmError::Malformed(format!("bad id in `{}`", element.tag_name().name())))
}

fn parse_node_xml(element: &roxmltree::Node) -> Result<OSMNode, OsmError> {
  let id_ = parse_id(element)?;
  let coordinate = |name: &str| -> Result<f64, OsmError> {
    element
      .attribute(name)
      .and_then(parse_float)
      .ok_or_else(|| OsmError::Malformed(format!("bad `{name}` in node {id_}")))
  };
  Ok(OSMNode {
    tags: parse_tags_xml(element),
    id_,
    coordinates: GeoCoordinate::new(coordinate("lat")?, coordinate("lon")?),
    metadata: ElementMetadata::from_xml(element),
  })
}

fn parse_way_xml(
  element: &roxmltree::Node,
  nodes: &BTreeMap<i64, OSMNode>,
) -> Result<OSMWay, OsmError> {
  let id_ = parse_id(element)?;
  let mut way_nodes: Vec<OSMNode> = Vec::new();
  for child in element.children().filter(|child| child.tag_name().name() == "nd") {
    let ref_: i64 = child
      .attribute("ref")
      .and_then(|value| value.parse().ok())
      .ok_or_else(|| OsmError::Malformed(format!("bad `ref` in way {id_}")))?;
    let node = nodes
      .get(&ref_)
      .ok_or_else(|| OsmError::Malformed(format!("way {id_} references unknown node {ref_}")))?;
    way_nodes.push(node.clone());
  }
  Ok(OSMWay {
    tags: parse_tags_xml(element),
    id_,
    nodes: way_nodes,
    metadata: ElementMetadata::from_xml(element),
  })
}

fn parse_relation_xml(element: &roxmltree::Node) -> Result<OSMRelation, OsmError> {
  let id_ = parse_id(element)?;
  let mut members: Vec<OSMMember> = Vec::new();
  for child in element.children().filter(|child| child.tag_name().name() == "member") {
    let attribute = |name: &str| -> Result<&str, OsmError> {
      child
        .attribute(name)
        .ok_or_else(|| OsmError::Malformed(format!("bad member in relation {id_}")))
    };
    members.push(OSMMember {
      type_: attribute("type")?.to_string(),
      ref_: attribute("ref")?
        .parse()
        .map_err(|_| OsmError::Malformed(format!("bad member ref in relation {id_}")))?,
      role: attribute("role")?.to_string(),
    });
  }
  Ok(OSMRelation {
    tags: parse_tags_xml(element),
    id_,
    members,
    metadata: ElementMetadata::from_xml(element),
  })
}

fn parse_tags_json(element: &serde_json::Value) -> Tags {
  element["tags"]
    .as_object()
    .map(|tags| {
      tags
        .iter()
        .filter_map(|(key, value)| Some((key.clone(), value.as_str()?.to_string())))
        .collect()
    })
    .unwrap_or_default()
}

fn parse_id_json(element: &serde_json::Value) -> Result<i64, OsmError> {
  element["id"].as_i64().ok_or_else(|| OsmError::Malformed("bad element id".to_string()))
}

fn parse_node_json(element: &serde_json::Value) -> Result<OSMNode, OsmError> {
  let id_ = parse_id_json(element)?;
  let coordinate = |name: &str| -> Result<f64, OsmError> {
    element[name]
      .as_f64()
      .ok_or_else(|| OsmError::Malformed(format!("bad `{name}` in node {id_}")))
  };
  Ok(OSMNode::new(
    parse_tags_json(element),
    id_,
    GeoCoordinate::new(coordinate("lat")?, coordinate("lon")?),
  ))
}

fn parse_way_json(
  element: &serde_json::Value,
  nodes: &BTreeMap<i64, OSMNode>,
) -> Result<OSMWay, OsmError> {
  let id_ = parse_id_json(element)?;
  let refs = element["nodes"]
    .as_array()
    .ok_or_else(|| OsmError::Malformed(format!("bad `nodes` in way {id_}")))?;
  let mut way_nodes: Vec<OSMNode> = Vec::new();
  for ref_ in refs {
    let ref_ = ref_
      .as_i64()
      .ok_or_else(|| OsmError::Malformed(format!("bad node ref in way {id_}")))?;
    let node = nodes
      .get(&ref_)
      .ok_or_else(|| OsmError::Malformed(format!("way {id_} references unknown node {ref_}")))?;
    way_nodes.push(node.clone());
  }
  Ok(OSMWay::new(parse_tags_json(element), id_, way_nodes))
}

fn parse_relation_json(element: &serde_json::Value) -> Result<OSMRelation, OsmError> {
  let id_ = parse_id_json(element)?;
  let members = element["members"]
    .as_array()
    .ok_or_else(|| OsmError::Malformed(format!("bad `members` in relation {id_}")))?
    .iter()
    .filter_map(|member| {
      Some(OSMMember {
        type_: member["type"].as_str()?.to_string(),
        ref_: member["ref"].as_i64()?,
        role: member["role"].as_str()?.to_string(),
      })
    })
    .collect();
  Ok(OSMRelation {
    tags: parse_tags_json(element),
    id_,
    members,
    metadata: ElementMetadata::default(),
  })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tagged(pairs: &[(&str, &str)]) -> OSMNode {
    let tags: Tags =
      pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect();
    OSMNode::new(tags, 1, GeoCoordinate::default())
  }

  #[test]
  fn length_parsing() {
    assert_eq!(tagged(&[("height", "50m")]).get_length("height"), Some(50.0));
    assert_eq!(tagged(&[("height", "50km")]).get_length("height"), Some(50_000.0));
    assert_eq!(tagged(&[("height", "1mi")]).get_length("height"), Some(1609.344));
    assert_eq!(tagged(&[("height", "20")]).get_length("height"), Some(20.0));
    assert_eq!(tagged(&[("height", ".m")]).get_length("height"), None);
    assert_eq!(tagged(&[]).get_length("height"), None);
  }

  #[test]
  fn level_parsing() {
    assert_eq!(parse_levels("1;2"), vec![1.0, 2.0]);
    assert_eq!(parse_levels("-0,5"), vec![-0.5]);
    assert_eq!(parse_levels("nothing"), Vec::<f64>::new());
  }

  #[test]
  fn parse_osm_document() {
    let mut data = OSMData::new();
    data
      .parse_osm_text(
        r#"<osm>
          <bounds minlat="9.999" minlon="4.999" maxlat="10.001" maxlon="5.001"/>
          <node id="1" lat="10" lon="5" user="a" timestamp="2021-06-01T10:00:00Z">
            <tag k="natural" v="tree"/>
          </node>
          <node id="2" lat="10.0005" lon="5.0005"/>
          <way id="3">
            <nd ref="1"/>
            <nd ref="2"/>
            <tag k="highway" v="primary"/>
          </way>
          <relation id="4">
            <member type="way" ref="3" role="outer"/>
            <tag k="type" v="multipolygon"/>
          </relation>
        </osm>"#,
      )
      .unwrap();

    assert_eq!(data.nodes.len(), 2);
    assert_eq!(data.nodes[&1].get_tag("natural"), Some("tree"));
    assert_eq!(data.ways[&3].nodes.len(), 2);
    assert_eq!(data.relations[&4].members[0].ref_, 3);
    assert_eq!(data.view_box, Some(BoundaryBox::new(4.999, 9.999, 5.001, 10.001)));
    assert!(data.authors.contains("a"));
    assert!(data.time.min_.is_some());
  }

  #[test]
  fn duplicate_id_with_different_content_fails() {
    let mut data = OSMData::new();
    data.add_node(OSMNode::new(Tags::new(), 1, GeoCoordinate::new(1.0, 1.0))).unwrap();
    assert!(data.add_node(OSMNode::new(Tags::new(), 1, GeoCoordinate::new(1.0, 1.0))).is_ok());
    assert!(data.add_node(OSMNode::new(Tags::new(), 1, GeoCoordinate::new(2.0, 1.0))).is_err());
  }

  #[test]
  fn parse_overpass_document() {
    let mut data = OSMData::new();
    data
      .parse_overpass_text(
        r#"{"elements": [
          {"type": "node", "id": 1, "lat": 10.0, "lon": 5.0},
          {"type": "node", "id": 2, "lat": 10.1, "lon": 5.1,
           "tags": {"name": "A"}},
          {"type": "way", "id": 3, "nodes": [1, 2]}
        ]}"#,
      )
      .unwrap();
    assert_eq!(data.nodes.len(), 2);
    assert_eq!(data.ways[&3].nodes[1].get_tag("name"), Some("A"));
    assert!(data.view_box.is_some());
  }

  #[test]
  fn cycle_detection() {
    let node_1 = OSMNode::new(Tags::new(), 1, GeoCoordinate::new(0.0, 0.0));
    let node_2 = OSMNode::new(Tags::new(), 2, GeoCoordinate::new(0.0, 1.0));
    let open = OSMWay::new(Tags::new(), 10, vec![node_1.clone(), node_2.clone()]);
    assert!(!open.is_cycle());
    let closed = OSMWay::new(Tags::new(), 11, vec![node_1.clone(), node_2, node_1]);
    assert!(closed.is_cycle());
  }
}
