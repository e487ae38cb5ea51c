//! Colour parsing, theme palettes and the angular sector blend.

use glam::Vec3;
use std::f32::consts::PI;

use crate::error::PaletteError;

/// Parse `#rrggbb` or `#rgb` (leading `#` optional) into RGB in [0, 1]
pub fn parse_hex(hex: &str) -> Result<Vec3, PaletteError> {
    let digits = hex.trim().trim_start_matches('#');
    let invalid = || PaletteError::InvalidHex(hex.to_string());

    if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(invalid());
    }

    let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
    let (r, g, b) = match digits.len() {
        6 => (
            channel(&digits[0..2])?,
            channel(&digits[2..4])?,
            channel(&digits[4..6])?,
        ),
        // #rgb expands each nibble: f -> ff
        3 => (
            channel(&digits[0..1])? * 17,
            channel(&digits[1..2])? * 17,
            channel(&digits[2..3])? * 17,
        ),
        _ => return Err(invalid()),
    };

    Ok(Vec3::new(r as f32, g as f32, b as f32) / 255.0)
}

/// Ordered, non-empty list of colours particles are tinted from
#[derive(Debug, Clone, PartialEq)]
pub struct ThemePalette {
    colors: Vec<Vec3>,
}

impl ThemePalette {
    /// Create a palette; empty input is rejected
    pub fn new(colors: Vec<Vec3>) -> Result<Self, PaletteError> {
        if colors.is_empty() {
            return Err(PaletteError::Empty);
        }
        Ok(Self { colors })
    }

    /// Single-colour palette
    pub fn solid(color: Vec3) -> Self {
        Self {
            colors: vec![color],
        }
    }

    /// Parse a list of hex strings
    pub fn from_hex<S: AsRef<str>>(hexes: &[S]) -> Result<Self, PaletteError> {
        let colors = hexes
            .iter()
            .map(|h| parse_hex(h.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(colors)
    }

    /// Parse a list of hex strings, substituting the default theme's first
    /// colour when the list is empty or unparsable
    pub fn from_hex_or_default<S: AsRef<str>>(hexes: &[S]) -> Self {
        match Self::from_hex(hexes) {
            Ok(palette) => palette,
            Err(e) => {
                log::warn!("{}; falling back to a single-colour palette", e);
                Self::solid(DEFAULT_COLOR)
            }
        }
    }

    pub fn colors(&self) -> &[Vec3] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Blend for a normalized angle `a` in [0, 1]
    ///
    /// Sector `floor(a * K)` blends toward sector `(s + 1) mod K` by the
    /// fractional part of `a * K`. `a = 1` wraps onto sector 0.
    pub fn blend(&self, normalized_angle: f32) -> Vec3 {
        let k = self.colors.len();
        if k == 1 {
            return self.colors[0];
        }
        let scaled = normalized_angle * k as f32;
        let floor = scaled.floor();
        let sector = (floor.max(0.0) as usize) % k;
        let next = (sector + 1) % k;
        let phase = scaled - floor;

        self.colors[sector] * (1.0 - phase) + self.colors[next] * phase
    }

    /// Colour for a point, from its angle in the XZ plane
    pub fn color_at(&self, position: Vec3) -> Vec3 {
        self.blend(normalized_xz_angle(position))
    }
}

impl Default for ThemePalette {
    fn default() -> Self {
        Theme::default_theme().palette()
    }
}

/// Map the XZ-plane angle of a point onto [0, 1]
pub fn normalized_xz_angle(position: Vec3) -> f32 {
    let angle = position.z.atan2(position.x);
    (angle + PI) / (2.0 * PI)
}

/// First colour of the default theme (#aaaaff)
const DEFAULT_COLOR: Vec3 = Vec3::new(170.0 / 255.0, 170.0 / 255.0, 1.0);

/// Named colour theme
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub key: &'static str,
    pub colors: &'static [&'static str],
}

pub const THEMES: &[Theme] = &[
    Theme {
        key: "default",
        colors: &["#aaaaff", "#ffaaaa", "#aaffaa", "#aaffff", "#ffaaff"],
    },
    Theme {
        key: "catppuccin",
        colors: &["#cba6f7", "#b4befe", "#89dceb", "#a6e3a1", "#fab387"],
    },
    Theme {
        key: "tokyonight",
        colors: &["#7aa2f7", "#bb9af7", "#9ece6a", "#e0af68", "#f7768e"],
    },
    Theme {
        key: "poimandres",
        colors: &["#add7ff", "#5de4c7", "#fffac2", "#d0679d"],
    },
    Theme {
        key: "eldritch",
        colors: &["#5D3A9B", "#4E878C", "#3A6B35", "#8C271E"],
    },
    Theme {
        key: "halcyon",
        colors: &["#94e2d5", "#f5c2e7", "#cba6f7", "#fab387"],
    },
];

impl Theme {
    /// Look up a theme by key (case-insensitive)
    pub fn by_key(key: &str) -> Result<Theme, PaletteError> {
        THEMES
            .iter()
            .find(|t| t.key.eq_ignore_ascii_case(key))
            .copied()
            .ok_or_else(|| PaletteError::UnknownTheme(key.to_string()))
    }

    pub fn default_theme() -> Theme {
        THEMES[0]
    }

    /// The theme's colours as a palette (theme tables are always valid)
    pub fn palette(&self) -> ThemePalette {
        ThemePalette::from_hex_or_default(self.colors)
    }

    /// Base orb colour for this theme (its first colour)
    pub fn primary_hex(&self) -> &'static str {
        self.colors[0]
    }
}
