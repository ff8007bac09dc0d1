//! Plain paint value types used by style properties.
//!
//! These are deliberately lightweight: the engine stores and hands them out,
//! the rendering layer interprets them. Cursor values come from the
//! `cursor-icon` crate rather than a local enum.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// An RGBA color with components in the 0.0-1.0 range.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    /// Create a new color from RGBA components (0.0-1.0 range).
    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque color from RGB components.
    #[inline]
    pub const fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    /// Create an opaque color from 8-bit RGB components.
    #[inline]
    pub fn from_rgb8(r: u8, g: u8, b: u8) -> Self {
        Self::from_rgb(r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0)
    }

    /// Create a color from 8-bit RGBA components (0-255 range).
    #[inline]
    pub fn from_rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self::new(
            r as f32 / 255.0,
            g as f32 / 255.0,
            b as f32 / 255.0,
            a as f32 / 255.0,
        )
    }

    /// Create a color from a hex string (e.g., "#FF0000" or "#FF0000FF").
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim_start_matches('#');
        let len = hex.len();

        if len != 6 && len != 8 {
            return None;
        }

        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        let a = if len == 8 {
            u8::from_str_radix(&hex[6..8], 16).ok()?
        } else {
            255
        };

        Some(Self::from_rgba8(r, g, b, a))
    }

    /// Format as a hex string: `#rrggbb`, or `#rrggbbaa` when not opaque.
    pub fn to_hex(self) -> String {
        let to8 = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        if self.a >= 1.0 {
            format!("#{:02x}{:02x}{:02x}", to8(self.r), to8(self.g), to8(self.b))
        } else {
            format!(
                "#{:02x}{:02x}{:02x}{:02x}",
                to8(self.r),
                to8(self.g),
                to8(self.b),
                to8(self.a)
            )
        }
    }

    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const BLACK: Self = Self::from_rgb(0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::from_rgb(1.0, 1.0, 1.0);
    pub const GRAY: Self = Self::from_rgb(0.5, 0.5, 0.5);
    pub const LIGHT_GRAY: Self = Self::from_rgb(0.75, 0.75, 0.75);
}

/// A font request: family plus size and the usual style flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Font {
    pub family: String,
    pub point_size: f32,
    /// CSS-style weight: 400 regular, 700 bold.
    pub weight: u16,
    pub italic: bool,
    pub underline: bool,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "Sans".to_string(),
            point_size: 12.0,
            weight: 400,
            italic: false,
            underline: false,
        }
    }
}

impl Font {
    /// Create a regular font with the given family and size.
    pub fn new(family: impl Into<String>, point_size: f32) -> Self {
        Self {
            family: family.into(),
            point_size,
            ..Default::default()
        }
    }

    /// Return a bold variant of this font.
    pub fn bold(mut self) -> Self {
        self.weight = 700;
        self
    }
}

/// Line style of a [`Pen`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PenStyle {
    /// Nothing is drawn.
    NoPen,
    #[default]
    Solid,
    Dash,
    Dot,
    DashDot,
}

impl PenStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            PenStyle::NoPen => "none",
            PenStyle::Solid => "solid",
            PenStyle::Dash => "dash",
            PenStyle::Dot => "dot",
            PenStyle::DashDot => "dashDot",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "none" => Some(PenStyle::NoPen),
            "solid" => Some(PenStyle::Solid),
            "dash" => Some(PenStyle::Dash),
            "dot" => Some(PenStyle::Dot),
            "dashDot" => Some(PenStyle::DashDot),
            _ => None,
        }
    }
}

/// A stroking pen: color, width and line style.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pen {
    pub color: Color,
    pub width: u32,
    pub style: PenStyle,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: Color::BLACK,
            width: 1,
            style: PenStyle::Solid,
        }
    }
}

impl Pen {
    pub fn new(color: Color, width: u32, style: PenStyle) -> Self {
        Self {
            color,
            width,
            style,
        }
    }

    /// A pen that draws nothing.
    pub fn none() -> Self {
        Self {
            color: Color::TRANSPARENT,
            width: 0,
            style: PenStyle::NoPen,
        }
    }
}

/// An integer point, used for pixel offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// A cheap, shareable RGBA pixel buffer.
///
/// Cloning a pixmap clones the handle, not the pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl Pixmap {
    /// Create a pixmap from raw RGBA bytes (`width * height * 4` bytes).
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert_eq!(data.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            data: data.into(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
