use std::fmt;

use serde::{Serialize, Serializer};

/// An RGB colour, rendered as `rgb(r, g, b)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Standard palette entry for SGR 30–37 / 40–47
    pub fn standard(offset: u32) -> Option<Self> {
        STANDARD.get(offset as usize).copied()
    }

    /// Bright palette entry for SGR 90–97 / 100–107
    pub fn bright(offset: u32) -> Option<Self> {
        BRIGHT.get(offset as usize).copied()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl From<Color> for ratatui::style::Color {
    fn from(c: Color) -> Self {
        ratatui::style::Color::Rgb(c.r, c.g, c.b)
    }
}

const STANDARD: [Color; 8] = [
    Color::rgb(0, 0, 0),       // Black
    Color::rgb(170, 0, 0),     // Red
    Color::rgb(0, 170, 0),     // Green
    Color::rgb(170, 85, 0),    // Yellow
    Color::rgb(0, 0, 170),     // Blue
    Color::rgb(170, 0, 170),   // Magenta
    Color::rgb(0, 170, 170),   // Cyan
    Color::rgb(170, 170, 170), // White
];

const BRIGHT: [Color; 8] = [
    Color::rgb(85, 85, 85),    // Gray
    Color::rgb(255, 85, 85),   // Red
    Color::rgb(85, 255, 85),   // Green
    Color::rgb(255, 255, 85),  // Yellow
    Color::rgb(85, 85, 255),   // Blue
    Color::rgb(255, 85, 255),  // Magenta
    Color::rgb(85, 255, 255),  // Cyan
    Color::rgb(255, 255, 255), // White
];

/// xterm channel levels for the 6x6x6 cube
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// Look up an entry of the 256-colour palette
///
/// Returns `None` for indices outside 0..=255.
pub fn lookup_256(index: u32) -> Option<Color> {
    match index {
        0..=7 => Color::standard(index),
        8..=15 => Color::bright(index - 8),
        16..=231 => {
            let x = (index - 16) as usize;
            Some(Color::rgb(
                CUBE_LEVELS[x / 36],
                CUBE_LEVELS[(x / 6) % 6],
                CUBE_LEVELS[x % 6],
            ))
        }
        232..=255 => {
            let v = (8 + 10 * (index - 232)) as u8;
            Some(Color::rgb(v, v, v))
        }
        _ => None,
    }
}

/// Direct 24-bit colour from three codes, each within 0..=255
pub(crate) fn lookup_rgb(r: Option<u32>, g: Option<u32>, b: Option<u32>) -> Option<Color> {
    let channel = |c: Option<u32>| c.and_then(|v| u8::try_from(v).ok());
    Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?))
}
