//! Hex colour parsing and sRGB helpers shared by the synthesizer and the garment materials.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 8-bit sRGB triplet as written in `#rrggbb` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid hex colour '{0}': expected #rgb or #rrggbb")]
pub struct ParseColorError(pub String);

impl HexColor {
    pub const BLACK: Self = Self::new(0x00, 0x00, 0x00);
    pub const WHITE: Self = Self::new(0xff, 0xff, 0xff);
    /// Default ink for new text elements.
    pub const INK: Self = Self::new(0x12, 0x12, 0x12);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Linear-light RGB, suitable for material factors.
    pub fn to_linear(self) -> [f32; 3] {
        [
            srgb_to_linear(self.r as f32 / 255.0),
            srgb_to_linear(self.g as f32 / 255.0),
            srgb_to_linear(self.b as f32 / 255.0),
        ]
    }

    /// Relative luminance with BT.709 weights over linearized channels.
    pub fn relative_luminance(self) -> f32 {
        let [r, g, b] = self.to_linear();
        0.2126 * r + 0.7152 * g + 0.0722 * b
    }
}

impl FromStr for HexColor {
    type Err = ParseColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);
        let err = || ParseColorError(value.to_string());
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(err());
        }
        match digits.len() {
            3 => {
                let mut channels = [0u8; 3];
                for (slot, c) in channels.iter_mut().zip(digits.chars()) {
                    let nibble = c.to_digit(16).ok_or_else(err)? as u8;
                    *slot = nibble * 17;
                }
                Ok(Self::new(channels[0], channels[1], channels[2]))
            }
            6 => {
                let channel = |range: std::ops::Range<usize>| {
                    u8::from_str_radix(&digits[range], 16).map_err(|_| err())
                };
                Ok(Self::new(channel(0..2)?, channel(2..4)?, channel(4..6)?))
            }
            _ => Err(err()),
        }
    }
}

impl TryFrom<String> for HexColor {
    type Error = ParseColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HexColor> for String {
    fn from(value: HexColor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

pub fn srgb_to_linear(channel: f32) -> f32 {
    if channel <= 0.04045 {
        channel / 12.92
    } else {
        ((channel + 0.055) / 1.055).powf(2.4)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_long_and_short_forms() {
        assert_eq!("#d9d9d9".parse::<HexColor>().unwrap(), HexColor::new(0xd9, 0xd9, 0xd9));
        assert_eq!("FFF".parse::<HexColor>().unwrap(), HexColor::WHITE);
        assert_eq!("#121212".parse::<HexColor>().unwrap(), HexColor::INK);
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#zzzzzz".parse::<HexColor>().is_err());
    }

    #[test]
    fn luminance_extremes() {
        assert!((HexColor::WHITE.relative_luminance() - 1.0).abs() < 1e-5);
        assert_eq!(HexColor::BLACK.relative_luminance(), 0.0);
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_string(&HexColor::new(0x0a, 0xb0, 0xff)).unwrap();
        assert_eq!(json, "\"#0ab0ff\"");
        let back: HexColor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, HexColor::new(0x0a, 0xb0, 0xff));
    }
}
