use image::Rgb;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Basic color names used to label extracted palette entries.
const NAMED_COLORS: &[(&str, [u8; 3])] = &[
    ("Black", [0, 0, 0]),
    ("White", [255, 255, 255]),
    ("Gray", [128, 128, 128]),
    ("Silver", [192, 192, 192]),
    ("Red", [255, 0, 0]),
    ("Maroon", [128, 0, 0]),
    ("Orange", [255, 165, 0]),
    ("Brown", [139, 69, 19]),
    ("Yellow", [255, 255, 0]),
    ("Olive", [128, 128, 0]),
    ("Lime", [0, 255, 0]),
    ("Green", [0, 128, 0]),
    ("Teal", [0, 128, 128]),
    ("Cyan", [0, 255, 255]),
    ("Sky Blue", [135, 206, 235]),
    ("Blue", [0, 0, 255]),
    ("Navy", [0, 0, 128]),
    ("Purple", [128, 0, 128]),
    ("Magenta", [255, 0, 255]),
    ("Pink", [255, 192, 203]),
    ("Beige", [245, 245, 220]),
];

/// A representative color of a photo, as shown in the palette strip.
///
/// Only `rgb` takes part in color matching. `hex`, `name` and `percentage`
/// are display data and are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DominantColor {
    pub rgb: [u8; 3],
    pub hex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub percentage: f32,
}

impl DominantColor {
    pub fn new(rgb: [u8; 3]) -> Self {
        Self {
            rgb,
            hex: to_hex(rgb),
            name: None,
            percentage: 0.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_percentage(mut self, percentage: f32) -> Self {
        self.percentage = percentage;
        self
    }

    pub fn as_rgb(&self) -> Rgb<u8> {
        Rgb(self.rgb)
    }

    /// Caption shown under the highlight, e.g. `#ff0000 Red (12.5%)`.
    pub fn caption(&self) -> String {
        match &self.name {
            Some(name) => format!("{} {} ({:.1}%)", self.hex, name, self.percentage),
            None => format!("{} ({:.1}%)", self.hex, self.percentage),
        }
    }
}

impl fmt::Display for DominantColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.caption())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid color `{0}`")]
pub struct ParseColorError(pub String);

impl FromStr for DominantColor {
    type Err = ParseColorError;

    /// Accepts `#rgb`, `#rrggbb` (the `#` is optional) or `r,g,b`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let rgb = if trimmed.contains(',') {
            parse_triplet(trimmed)
        } else {
            parse_hex(trimmed)
        }
        .ok_or_else(|| ParseColorError(s.to_string()))?;
        Ok(Self::new(rgb))
    }
}

pub fn to_hex(rgb: [u8; 3]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2])
}

pub fn parse_hex(s: &str) -> Option<[u8; 3]> {
    let digits = s.strip_prefix('#').unwrap_or(s);
    if !digits.is_ascii() {
        return None;
    }
    match digits.len() {
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in digits.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 17;
            }
            Some(out)
        }
        6 => {
            let r = u8::from_str_radix(&digits[0..2], 16).ok()?;
            let g = u8::from_str_radix(&digits[2..4], 16).ok()?;
            let b = u8::from_str_radix(&digits[4..6], 16).ok()?;
            Some([r, g, b])
        }
        _ => None,
    }
}

fn parse_triplet(s: &str) -> Option<[u8; 3]> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return None;
    }
    let r = parts[0].parse().ok()?;
    let g = parts[1].parse().ok()?;
    let b = parts[2].parse().ok()?;
    Some([r, g, b])
}

/// Squared Euclidean distance in RGB space.
#[inline]
pub fn distance_sq(a: [u8; 3], b: [u8; 3]) -> u32 {
    let dr = a[0] as i32 - b[0] as i32;
    let dg = a[1] as i32 - b[1] as i32;
    let db = a[2] as i32 - b[2] as i32;
    (dr * dr + dg * dg + db * db) as u32
}

pub fn nearest_color_name(rgb: [u8; 3]) -> &'static str {
    let mut best = NAMED_COLORS[0].0;
    let mut best_d = u32::MAX;
    for &(name, candidate) in NAMED_COLORS {
        let d = distance_sq(rgb, candidate);
        if d < best_d {
            best_d = d;
            best = name;
        }
    }
    best
}

/// Rec. 709 luminance
#[inline]
pub fn rgb_to_luma(r: u8, g: u8, b: u8) -> f32 {
    0.2126 * r as f32 + 0.7152 * g as f32 + 0.0722 * b as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex_forms() {
        assert_eq!(parse_hex("#ff0000"), Some([255, 0, 0]));
        assert_eq!(parse_hex("00FF7f"), Some([0, 255, 127]));
        assert_eq!(parse_hex("#0f0"), Some([0, 255, 0]));
        assert_eq!(parse_hex("#12345"), None);
        assert_eq!(parse_hex("#gg0000"), None);
    }

    #[test]
    fn test_from_str_accepts_triplet() {
        let color: DominantColor = "10, 20,30".parse().unwrap();
        assert_eq!(color.rgb, [10, 20, 30]);
        assert_eq!(color.hex, "#0a141e");
        assert!("1,2".parse::<DominantColor>().is_err());
        assert!("300,0,0".parse::<DominantColor>().is_err());
    }

    #[test]
    fn test_caption_with_and_without_name() {
        let color = DominantColor::new([255, 0, 0]).with_percentage(12.5);
        assert_eq!(color.caption(), "#ff0000 (12.5%)");
        let named = color.with_name("Red");
        assert_eq!(named.caption(), "#ff0000 Red (12.5%)");
    }

    #[test]
    fn test_descriptor_json_shape() {
        let json = r##"{"rgb":[12,34,56],"hex":"#0c2238","percentage":3.25}"##;
        let color: DominantColor = serde_json::from_str(json).unwrap();
        assert_eq!(color.rgb, [12, 34, 56]);
        assert_eq!(color.name, None);
        assert_eq!(color.percentage, 3.25);

        let out = serde_json::to_value(&color.with_name("Navy")).unwrap();
        assert_eq!(out["name"], "Navy");
    }

    #[test]
    fn test_nearest_color_name() {
        assert_eq!(nearest_color_name([250, 5, 5]), "Red");
        assert_eq!(nearest_color_name([3, 3, 3]), "Black");
        assert_eq!(nearest_color_name([0, 0, 140]), "Navy");
    }
}
