use std::collections::BTreeSet;

use crate::color::Color;
use crate::config::LabelMode;
use crate::osm::reader::Tags;
use crate::scheme::Scheme;

pub const DEFAULT_FONT_SIZE: f64 = 10.0;

/// Text label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
  pub text: String,
  pub fill: Color,
  pub out_fill: Color,
  pub size: f64,
}

/// Format a voltage value to a more human-readable form: whole kilovolts
/// when the value is a multiple of 1000.
fn format_voltage(value: &str) -> String {
  if let Ok(int_value) = value.parse::<i64>() {
    if int_value % 1000 == 0 {
      return format!("{} kV", int_value / 1000);
    }
    return format!("{value} V");
  }
  value.to_string()
}

fn format_frequency(value: &str) -> String {
  format!("{value} ")
}

/// Construct address text from the tags: the house number always, plus
/// postcode, country, city, and street in address label mode.
fn get_address(tags: &Tags, processed: &mut BTreeSet<String>, label_mode: LabelMode) -> Vec<String> {
  let mut address: Vec<String> = Vec::new();

  let mut tag_names: Vec<&str> = vec!["housenumber"];
  if label_mode == LabelMode::Address {
    tag_names.extend(["postcode", "country", "city", "street"]);
  }

  for tag_name in tag_names {
    let key = format!("addr:{tag_name}");
    if let Some(value) = tags.get(&key) {
      address.push(value.clone());
      processed.insert(key);
    }
  }

  address
}

/// Constructs map labels out of OpenStreetMap tags.
pub struct TextConstructor<'a> {
  scheme: &'a Scheme,
  default_color: Color,
  main_color: Color,
  default_out_color: Color,
}

impl<'a> TextConstructor<'a> {
  #[must_use]
  pub fn new(scheme: &'a Scheme) -> Self {
    Self {
      scheme,
      default_color: scheme.get_color("text_color"),
      main_color: scheme.get_color("text_main_color"),
      default_out_color: scheme.get_color("text_outline_color"),
    }
  }

  fn label(&self, text: String, size: f64) -> Label {
    Label { text, fill: self.default_color, out_fill: self.default_out_color, size }
  }

  /// Labels for voltage and frequency values.
  fn get_text(&self, tags: &Tags, processed: &mut BTreeSet<String>) -> Vec<Label> {
    let mut texts: Vec<Label> = Vec::new();
    let mut values: Vec<String> = Vec::new();

    if let Some(value) = tags.get("voltage:primary") {
      values.push(value.clone());
      processed.insert("voltage:primary".to_string());
    }
    if let Some(value) = tags.get("voltage:secondary") {
      values.push(value.clone());
      processed.insert("voltage:secondary".to_string());
    }
    if let Some(value) = tags.get("voltage") {
      values = value.split(';').map(str::to_string).collect();
      processed.insert("voltage".to_string());
    }
    if !values.is_empty() {
      let text =
        values.iter().map(|value| format_voltage(value)).collect::<Vec<_>>().join(", ");
      texts.push(self.label(text, DEFAULT_FONT_SIZE));
    }

    if let Some(value) = tags.get("frequency") {
      let text =
        value.split(';').map(format_frequency).collect::<Vec<_>>().join(", ");
      texts.push(self.label(text, DEFAULT_FONT_SIZE));
      processed.insert("frequency".to_string());
    }

    texts
  }

  /// Construct the list of labels from OSM tags, topmost first.
  #[must_use]
  #[allow(clippy::too_many_lines)]
  pub fn construct_text(
    &self,
    tags: &Tags,
    processed: &mut BTreeSet<String>,
    label_mode: LabelMode,
  ) -> Vec<Label> {
    let mut texts: Vec<Label> = Vec::new();

    let mut name: Option<String> = None;
    let mut alternative_name: Option<String> = None;

    if let Some(value) = tags.get("name") {
      name = Some(value.clone());
      processed.insert("name".to_string());
    } else if let Some(value) = tags.get("name:en") {
      name = Some(value.clone());
      processed.insert("name:en".to_string());
    } else if let Some(value) = tags.get("ref") {
      name = Some(value.clone());
      processed.insert("ref".to_string());
    }

    if let Some(value) = tags.get("alt_name") {
      alternative_name = Some(value.clone());
      processed.insert("alt_name".to_string());
    }
    if let Some(value) = tags.get("old_name") {
      let old_name = format!("ex {value}");
      alternative_name = Some(match alternative_name {
        Some(present) => format!("{present}, {old_name}"),
        None => old_name,
      });
    }

    let address = get_address(tags, processed, label_mode);

    if let Some(name) = name {
      texts.push(Label {
        text: name,
        fill: self.main_color,
        out_fill: self.default_out_color,
        size: DEFAULT_FONT_SIZE,
      });
    }
    if let Some(alternative_name) = alternative_name {
      texts.push(self.label(format!("({alternative_name})"), DEFAULT_FONT_SIZE));
    }
    if !address.is_empty() {
      texts.push(self.label(address.join(", "), DEFAULT_FONT_SIZE));
    }

    if label_mode == LabelMode::Main {
      return texts;
    }

    texts.extend(self.get_text(tags, processed));

    if let Some(value) = tags.get("route_ref") {
      texts.push(self.label(value.replace(';', " "), DEFAULT_FONT_SIZE));
      processed.insert("route_ref".to_string());
    }
    if let Some(value) = tags.get("cladr:code") {
      texts.push(self.label(value.clone(), 7.0));
      processed.insert("cladr:code".to_string());
    }
    if let Some(value) = tags.get("website") {
      let mut link = value.as_str();
      link = link.strip_prefix("http://").unwrap_or(link);
      link = link.strip_prefix("https://").unwrap_or(link);
      link = link.strip_prefix("www.").unwrap_or(link);
      link = link.strip_suffix('/').unwrap_or(link);
      let mut link = link.chars().take(25).collect::<String>();
      if value.len() > 25 {
        link.push_str("...");
      }
      texts.push(Label {
        text: link,
        fill: Color::from_hex("#000088").expect("verified hex"),
        out_fill: self.default_out_color,
        size: DEFAULT_FONT_SIZE,
      });
      processed.insert("website".to_string());
    }
    if let Some(value) = tags.get("phone") {
      texts.push(Label {
        text: value.clone(),
        fill: Color::from_hex("#444444").expect("verified hex"),
        out_fill: self.default_out_color,
        size: DEFAULT_FONT_SIZE,
      });
      processed.insert("phone".to_string());
    }
    if let Some(value) = tags.get("height") {
      texts.push(self.label(format!("\u{2195} {value} m"), DEFAULT_FONT_SIZE));
      processed.insert("height".to_string());
    }

    for (key, value) in tags {
      if self.scheme.is_writable(key, value) && !processed.contains(key) {
        texts.push(self.label(value.clone(), DEFAULT_FONT_SIZE));
      }
    }
    texts
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TEST_SCHEME: &str = r##"
colors:
  text_color: "#444444"
  text_main_color: "#000000"
  text_outline_color: "#FFFFFF"
keys_to_write: [description]
"##;

  fn tags(pairs: &[(&str, &str)]) -> Tags {
    pairs.iter().map(|(key, value)| ((*key).to_string(), (*value).to_string())).collect()
  }

  fn construct(pairs: &[(&str, &str)], label_mode: LabelMode) -> Vec<Label> {
    let scheme = Scheme::from_text(TEST_SCHEME).unwrap();
    let constructor = TextConstructor::new(&scheme);
    let mut processed = BTreeSet::new();
    constructor.construct_text(&tags(pairs), &mut processed, label_mode)
  }

  #[test]
  fn name_is_main_label() {
    let labels = construct(&[("name", "Big Ben")], LabelMode::Main);
    assert_eq!(labels.len(), 1);
    assert_eq!(labels[0].text, "Big Ben");
    assert_eq!(labels[0].fill, Color::BLACK);
  }

  #[test]
  fn name_fallbacks() {
    assert_eq!(construct(&[("name:en", "Tower")], LabelMode::Main)[0].text, "Tower");
    assert_eq!(construct(&[("ref", "A1")], LabelMode::Main)[0].text, "A1");
  }

  #[test]
  fn alternative_names_in_parentheses() {
    let labels = construct(
      &[("name", "New"), ("alt_name", "Other"), ("old_name", "Old")],
      LabelMode::Main,
    );
    assert_eq!(labels[1].text, "(Other, ex Old)");
  }

  #[test]
  fn house_number_always_written() {
    let labels = construct(&[("addr:housenumber", "13")], LabelMode::Main);
    assert_eq!(labels[0].text, "13");
  }

  #[test]
  fn address_mode_includes_street() {
    let labels = construct(
      &[("addr:housenumber", "13"), ("addr:street", "Main Street")],
      LabelMode::Address,
    );
    assert_eq!(labels[0].text, "13, Main Street");
  }

  #[test]
  fn main_mode_stops_after_address() {
    let labels = construct(&[("name", "A"), ("voltage", "110000")], LabelMode::Main);
    assert_eq!(labels.len(), 1);
  }

  #[test]
  fn voltage_formatting() {
    let labels = construct(&[("voltage", "110000")], LabelMode::All);
    assert_eq!(labels[0].text, "110 kV");
    let labels = construct(&[("voltage", "450")], LabelMode::All);
    assert_eq!(labels[0].text, "450 V");
  }

  #[test]
  fn website_is_stripped_and_blue() {
    let labels =
      construct(&[("website", "https://www.example.com/path/")], LabelMode::All);
    assert_eq!(labels[0].text, "example.com/path");
    assert_eq!(labels[0].fill, Color::from_hex("#000088").unwrap());
  }

  #[test]
  fn long_website_is_truncated() {
    let labels = construct(
      &[("website", "https://www.a-very-long-domain-name-indeed.example.org/")],
      LabelMode::All,
    );
    assert!(labels[0].text.ends_with("..."));
    assert_eq!(labels[0].text.len(), 28);
  }

  #[test]
  fn height_label() {
    let labels = construct(&[("height", "45")], LabelMode::All);
    assert_eq!(labels[0].text, "\u{2195} 45 m");
  }

  #[test]
  fn writable_keys_are_appended() {
    let labels = construct(&[("description", "note")], LabelMode::All);
    assert_eq!(labels[0].text, "note");
  }

  #[test]
  fn route_ref_replaces_semicolons() {
    let labels = construct(&[("route_ref", "1;2;3")], LabelMode::All);
    assert_eq!(labels[0].text, "1 2 3");
  }
}
