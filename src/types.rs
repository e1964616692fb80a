//! Shared boundary types for the story player.
//!
//! This module defines the two visual contracts:
//! - Content → Surface: `Look` (the closed style set a line may carry)
//! - Rasterizer → Terminal: `Cell` grids drawn by the player

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Shared style primitives
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Color {
    Named(NamedColor),
    Rgb { r: u8, g: u8, b: u8 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamedColor {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
}

/// Orange has no ANSI name; used for accents and tally controls.
pub const ORANGE: Color = Color::Rgb { r: 255, g: 107, b: 53 };
/// Purple used for secondary accents.
pub const PURPLE: Color = Color::Rgb { r: 168, g: 85, b: 247 };

/// Border palette cycled through by chaotic comic grids.
pub const PANEL_PALETTE: [Color; 5] = [
    ORANGE,
    PURPLE,
    Color::Rgb { r: 74, g: 222, b: 128 },
    Color::Rgb { r: 251, g: 191, b: 36 },
    Color::Rgb { r: 239, g: 68, b: 68 },
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Style {
    pub fg: Option<Color>,
    pub bg: Option<Color>,
    pub bold: bool,
    pub dim: bool,
    pub italic: bool,
    pub crossed: bool,
    pub reverse: bool,
}

impl Style {
    pub fn is_default(&self) -> bool {
        *self == Style::default()
    }

    pub fn fg(color: Color) -> Self {
        Style {
            fg: Some(color),
            ..Default::default()
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn dim(mut self) -> Self {
        self.dim = true;
        self
    }
}

// ---------------------------------------------------------------------------
// Line looks (closed style set authored in content)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Size {
    Small,
    #[default]
    Normal,
    Big,
    Huge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accent {
    Red,
    Green,
    Gold,
    Orange,
}

impl Accent {
    pub fn color(self) -> Color {
        match self {
            Accent::Red => Color::Named(NamedColor::Red),
            Accent::Green => Color::Named(NamedColor::Green),
            Accent::Gold => Color::Named(NamedColor::Yellow),
            Accent::Orange => ORANGE,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Look {
    pub size: Size,
    pub accent: Option<Accent>,
    pub glow: bool,
    pub bold: bool,
}

impl Look {
    pub fn big() -> Self {
        Look {
            size: Size::Big,
            ..Default::default()
        }
    }

    pub fn accented(size: Size, accent: Accent) -> Self {
        Look {
            size,
            accent: Some(accent),
            ..Default::default()
        }
    }

    /// Terminal approximation: small text is dim, big/huge/glow/bold are bold.
    pub fn to_style(&self) -> Style {
        Style {
            fg: self.accent.map(Accent::color),
            dim: self.size == Size::Small,
            bold: self.bold || self.glow || matches!(self.size, Size::Big | Size::Huge),
            ..Default::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Rasterizer → Terminal boundary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    pub ch: char,
    pub style: Style,
}

impl Default for Cell {
    fn default() -> Self {
        Cell {
            ch: ' ',
            style: Style::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerminalContract {
    pub width: u16,
    pub height: u16,
}

pub type Grid = Vec<Vec<Cell>>;

/// Right half of a double-width glyph. The player skips it when printing.
pub const WIDE_TAIL: char = '\0';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellChange {
    pub x: u16,
    pub y: u16,
    pub cell: Cell,
}
