use std::str::FromStr;

use clap::ValueEnum;
use ratatui::style::Color;

/// Selectable color schemes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ThemeName {
    /// Terminal's own ANSI colors
    #[default]
    Default,
    /// Green CRT phosphor
    Phosphor,
    /// Amber monochrome CRT
    Amber,
    /// Black and white
    HighContrast,
}

/// Theme configuration for the TUI
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub grid_active: Color,
    pub grid_inactive: Color,
    pub grid_cursor: Color,
    pub track_label: Color,
    pub meter: Color,
    pub muted: Color,
    pub border: Color,
    pub highlight: Color,
    pub dimmed: Color,
    /// Whether sound rows use the kit's colors or the theme's label color
    pub kit_colors: bool,
}

impl Theme {
    /// Color for a sound row label
    pub fn sound_color(&self, tag: &str) -> Color {
        if !self.kit_colors {
            return self.track_label;
        }
        Color::from_str(tag).unwrap_or(self.track_label)
    }

    fn mono(fg: Color, dim: Color, faint: Color, bright: Color) -> Self {
        Self {
            bg: Color::Black,
            fg,
            grid_active: fg,
            grid_inactive: faint,
            grid_cursor: bright,
            track_label: fg,
            meter: fg,
            muted: dim,
            border: dim,
            highlight: bright,
            dimmed: faint,
            kit_colors: false,
        }
    }
}

impl From<ThemeName> for Theme {
    fn from(name: ThemeName) -> Self {
        match name {
            ThemeName::Default => Self {
                bg: Color::Reset,
                fg: Color::Reset,
                grid_active: Color::Green,
                grid_inactive: Color::DarkGray,
                grid_cursor: Color::Yellow,
                track_label: Color::Cyan,
                meter: Color::Green,
                muted: Color::Red,
                border: Color::White,
                highlight: Color::Magenta,
                dimmed: Color::DarkGray,
                kit_colors: true,
            },
            ThemeName::Phosphor => Self::mono(
                Color::Rgb(0, 255, 0),
                Color::Rgb(0, 160, 0),
                Color::Rgb(0, 70, 0),
                Color::Rgb(180, 255, 180),
            ),
            ThemeName::Amber => Self::mono(
                Color::Rgb(255, 176, 0),
                Color::Rgb(180, 125, 0),
                Color::Rgb(70, 48, 0),
                Color::Rgb(255, 220, 150),
            ),
            ThemeName::HighContrast => Self::mono(
                Color::White,
                Color::Rgb(200, 200, 200),
                Color::Rgb(70, 70, 70),
                Color::White,
            ),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::from(ThemeName::Default)
    }
}
