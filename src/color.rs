use std::fmt;

/// An RGB color with components in `[0, 1]`.
///
/// Supports the small set of operations the renderer needs: hex parsing and
/// formatting, HSL-based luminance adjustment for shading, and gradient
/// sampling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
  pub red: f64,
  pub green: f64,
  pub blue: f64,
}

/// CSS color names understood by scheme files and tag values.
const NAMED_COLORS: &[(&str, &str)] = &[
  ("black", "#000000"),
  ("white", "#FFFFFF"),
  ("red", "#FF0000"),
  ("green", "#008000"),
  ("blue", "#0000FF"),
  ("yellow", "#FFFF00"),
  ("orange", "#FFA500"),
  ("brown", "#A52A2A"),
  ("grey", "#808080"),
  ("gray", "#808080"),
  ("purple", "#800080"),
  ("pink", "#FFC0CB"),
  ("silver", "#C0C0C0"),
  ("maroon", "#800000"),
  ("beige", "#F5F5DC"),
];

impl Color {
  pub const BLACK: Color = Color { red: 0.0, green: 0.0, blue: 0.0 };
  pub const WHITE: Color = Color { red: 1.0, green: 1.0, blue: 1.0 };

  #[must_use]
  pub fn new(red: f64, green: f64, blue: f64) -> Self {
    Self {
      red: red.clamp(0.0, 1.0),
      green: green.clamp(0.0, 1.0),
      blue: blue.clamp(0.0, 1.0),
    }
  }

  /// Parse a hex representation, with or without `#`, in short or long form.
  #[must_use]
  pub fn from_hex(text: &str) -> Option<Self> {
    let text = text.trim_start_matches('#');
    let expand = |value: u8| f64::from(value) / 255.0;
    match text.len() {
      3 => {
        let mut components = [0.0; 3];
        for (index, character) in text.chars().enumerate() {
          let value = u8::from_str_radix(&character.to_string(), 16).ok()?;
          components[index] = expand(value * 16 + value);
        }
        Some(Self { red: components[0], green: components[1], blue: components[2] })
      }
      6 => {
        let red = u8::from_str_radix(&text[0..2], 16).ok()?;
        let green = u8::from_str_radix(&text[2..4], 16).ok()?;
        let blue = u8::from_str_radix(&text[4..6], 16).ok()?;
        Some(Self { red: expand(red), green: expand(green), blue: expand(blue) })
      }
      _ => None,
    }
  }

  /// Parse a hex string or a CSS color name.
  #[must_use]
  pub fn parse(text: &str) -> Option<Self> {
    if text.starts_with('#') {
      return Self::from_hex(text);
    }
    let lower = text.to_lowercase();
    NAMED_COLORS
      .iter()
      .find(|(name, _)| *name == lower)
      .and_then(|(_, hex)| Self::from_hex(hex))
      .or_else(|| Self::from_hex(text))
  }

  #[must_use]
  pub fn to_hex(self) -> String {
    let channel = |value: f64| (value * 255.0).round().clamp(0.0, 255.0) as u8;
    format!(
      "#{:02X}{:02X}{:02X}",
      channel(self.red),
      channel(self.green),
      channel(self.blue)
    )
  }

  /// HSL lightness component.
  #[must_use]
  pub fn luminance(self) -> f64 {
    let max = self.red.max(self.green).max(self.blue);
    let min = self.red.min(self.green).min(self.blue);
    (max + min) / 2.0
  }

  /// Return the same hue and saturation with the given HSL lightness.
  #[must_use]
  pub fn with_luminance(self, luminance: f64) -> Self {
    let (hue, saturation, _) = self.to_hsl();
    Self::from_hsl(hue, saturation, luminance.clamp(0.0, 1.0))
  }

  fn to_hsl(self) -> (f64, f64, f64) {
    let max = self.red.max(self.green).max(self.blue);
    let min = self.red.min(self.green).min(self.blue);
    let lightness = (max + min) / 2.0;
    if (max - min).abs() < f64::EPSILON {
      return (0.0, 0.0, lightness);
    }
    let delta = max - min;
    let saturation = if lightness > 0.5 {
      delta / (2.0 - max - min)
    } else {
      delta / (max + min)
    };
    let hue = if (max - self.red).abs() < f64::EPSILON {
      let shift = if self.green < self.blue { 6.0 } else { 0.0 };
      (self.green - self.blue) / delta + shift
    } else if (max - self.green).abs() < f64::EPSILON {
      (self.blue - self.red) / delta + 2.0
    } else {
      (self.red - self.green) / delta + 4.0
    } / 6.0;
    (hue, saturation, lightness)
  }

  fn from_hsl(hue: f64, saturation: f64, lightness: f64) -> Self {
    if saturation.abs() < f64::EPSILON {
      return Self { red: lightness, green: lightness, blue: lightness };
    }
    let q = if lightness < 0.5 {
      lightness * (1.0 + saturation)
    } else {
      lightness + saturation - lightness * saturation
    };
    let p = 2.0 * lightness - q;
    let channel = |mut t: f64| {
      if t < 0.0 {
        t += 1.0;
      }
      if t > 1.0 {
        t -= 1.0;
      }
      if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
      } else if t < 0.5 {
        q
      } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
      } else {
        p
      }
    };
    Self {
      red: channel(hue + 1.0 / 3.0),
      green: channel(hue),
      blue: channel(hue - 1.0 / 3.0),
    }
  }
}

impl fmt::Display for Color {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(formatter, "{}", self.to_hex())
  }
}

/// Whether the color is bright enough to get a black outline instead of a
/// white one.
#[must_use]
pub fn is_bright(color: Color) -> bool {
  0.2126 * color.red + 0.7152 * color.green + 0.0722 * color.blue > 0.78125
}

/// Sample a color scale at a position in `[0, 1]`.
///
/// The scale gets a black sentinel appended so that a coefficient of exactly
/// 1.0 still interpolates inside the last segment.
#[must_use]
pub fn get_gradient_color(coefficient: f64, colors: &[Color]) -> Color {
  let color_length = colors.len() - 1;
  let coefficient = coefficient.clamp(0.0, 1.0);
  #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
  let index = (coefficient * color_length as f64) as usize;
  #[allow(clippy::cast_precision_loss)]
  let remainder =
    (coefficient - index as f64 / color_length as f64) * color_length as f64;
  let from = colors[index];
  let to = if index + 1 < colors.len() { colors[index + 1] } else { Color::BLACK };
  Color::new(
    from.red + remainder * (to.red - from.red),
    from.green + remainder * (to.green - from.green),
    from.blue + remainder * (to.blue - from.blue),
  )
}

#[cfg(test)]
mod tests {
  use super::*;
  use assert_approx_eq::assert_approx_eq;

  #[test]
  fn hex_round_trip() {
    let color = Color::from_hex("#98AC64").unwrap();
    assert_eq!(color.to_hex(), "#98AC64");
    assert_eq!(Color::from_hex("abc").unwrap().to_hex(), "#AABBCC");
    assert!(Color::from_hex("#12345").is_none());
  }

  #[test]
  fn named_colors() {
    assert_eq!(Color::parse("black").unwrap(), Color::BLACK);
    assert_eq!(Color::parse("white").unwrap(), Color::WHITE);
    assert!(Color::parse("not-a-color").is_none());
  }

  #[test]
  fn brightness() {
    assert!(is_bright(Color::WHITE));
    assert!(!is_bright(Color::BLACK));
    assert!(!is_bright(Color::from_hex("#0000FF").unwrap()));
    assert!(is_bright(Color::from_hex("#FFFF00").unwrap()));
  }

  #[test]
  fn luminance_scaling() {
    let color = Color::from_hex("#D8D0C8").unwrap();
    let darker = color.with_luminance(color.luminance() * 0.85);
    assert!(darker.luminance() < color.luminance());
    assert_approx_eq!(darker.luminance(), color.luminance() * 0.85, 1e-9);
  }

  #[test]
  fn gradient_endpoints() {
    let scale = [Color::BLACK, Color::WHITE];
    assert_eq!(get_gradient_color(0.0, &scale), Color::BLACK);
    let middle = get_gradient_color(0.5, &scale);
    assert_approx_eq!(middle.red, 0.5, 1e-9);
    let clamped = get_gradient_color(2.0, &scale);
    assert!(clamped.red <= 1.0);
  }
}
