//! Preview rendering: displayable handles for blobs, and the background shown
//! behind the transparent result

use crate::{
    config::AppConfig,
    error::{AppError, Result},
    object_url::{ObjectUrl, ObjectUrlStore},
    types::{Blob, ImageFile},
};
use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Opaque sRGB color, written as `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::rgb(0x00, 0x00, 0x00);

    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rgb` or `#rrggbb` (case-insensitive)
    pub fn parse(value: &str) -> Result<Self> {
        let invalid = || AppError::invalid_config(format!("invalid color {:?}, expected #rrggbb", value));
        let hex = value.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |s: &str| u8::from_str_radix(s, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::rgb(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                let expand = |i: usize| channel(&hex[i..=i]).map(|v| v * 17);
                Ok(Self::rgb(expand(0)?, expand(1)?, expand(2)?))
            },
            _ => Err(invalid()),
        }
    }

    fn to_rgba(self) -> Rgba<u8> {
        Rgba([self.r, self.g, self.b, 255])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Color {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// The background toggle buttons, in display order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackgroundToggle {
    #[default]
    Checkerboard,
    White,
    Black,
    Custom,
}

impl BackgroundToggle {
    pub const ALL: [Self; 4] = [Self::Checkerboard, Self::White, Self::Black, Self::Custom];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Checkerboard => "checkerboard",
            Self::White => "white",
            Self::Black => "black",
            Self::Custom => "custom",
        }
    }
}

impl FromStr for BackgroundToggle {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|toggle| toggle.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                AppError::invalid_config(format!(
                    "unknown background {:?} (expected checkerboard, white, black or custom)",
                    s
                ))
            })
    }
}

/// A resolved background: the active toggle plus, for custom, its color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackgroundChoice {
    Checkerboard,
    White,
    Black,
    Custom(Color),
}

/// What the preview surface currently paints behind the result image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SurfaceStyle {
    /// Tiled transparency pattern
    pub checkerboard: bool,
    /// Solid fill color
    pub fill: Option<Color>,
}

impl SurfaceStyle {
    #[must_use]
    pub fn for_choice(choice: BackgroundChoice) -> Self {
        match choice {
            BackgroundChoice::Checkerboard => Self {
                checkerboard: true,
                fill: None,
            },
            BackgroundChoice::White => Self::solid(Color::WHITE),
            BackgroundChoice::Black => Self::solid(Color::BLACK),
            BackgroundChoice::Custom(color) => Self::solid(color),
        }
    }

    fn solid(color: Color) -> Self {
        Self {
            checkerboard: false,
            fill: Some(color),
        }
    }
}

/// Background controls of the result preview
///
/// Exactly one toggle is active. The custom color picker keeps its value across
/// toggles and resets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSurface {
    active: BackgroundToggle,
    custom_color: Color,
    style: SurfaceStyle,
}

impl PreviewSurface {
    #[must_use]
    pub fn new(custom_color: Color) -> Self {
        Self {
            active: BackgroundToggle::Checkerboard,
            custom_color,
            style: SurfaceStyle::for_choice(BackgroundChoice::Checkerboard),
        }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self::new(config.custom_color()?))
    }

    /// Activate a toggle and apply its background
    pub fn select(&mut self, toggle: BackgroundToggle) -> SurfaceStyle {
        self.active = toggle;
        self.apply();
        self.style
    }

    /// Update the color picker value
    ///
    /// Re-applies immediately when the custom toggle is active.
    pub fn set_custom_color(&mut self, color: Color) {
        self.custom_color = color;
        if self.active == BackgroundToggle::Custom {
            self.apply();
        }
    }

    /// Back to the checkerboard, first toggle active
    pub fn reset(&mut self) {
        self.select(BackgroundToggle::Checkerboard);
    }

    fn apply(&mut self) {
        self.style = SurfaceStyle::for_choice(self.choice());
    }

    #[must_use]
    pub fn choice(&self) -> BackgroundChoice {
        match self.active {
            BackgroundToggle::Checkerboard => BackgroundChoice::Checkerboard,
            BackgroundToggle::White => BackgroundChoice::White,
            BackgroundToggle::Black => BackgroundChoice::Black,
            BackgroundToggle::Custom => BackgroundChoice::Custom(self.custom_color),
        }
    }

    #[must_use]
    pub fn active(&self) -> BackgroundToggle {
        self.active
    }

    /// Color shown in the custom swatch
    #[must_use]
    pub fn custom_color(&self) -> Color {
        self.custom_color
    }

    #[must_use]
    pub fn style(&self) -> SurfaceStyle {
        self.style
    }
}

/// Checkerboard geometry and colors used when flattening a preview
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckerboardPattern {
    pub tile: u32,
    pub light: Color,
    pub dark: Color,
}

impl CheckerboardPattern {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            tile: config.checkerboard_tile.max(1),
            light: Color::parse(&config.checkerboard_light)?,
            dark: Color::parse(&config.checkerboard_dark)?,
        })
    }

    fn color_at(&self, x: u32, y: u32) -> Color {
        if ((x / self.tile) + (y / self.tile)) % 2 == 0 {
            self.light
        } else {
            self.dark
        }
    }
}

/// Converts blobs into displayable handles and flattens previews
#[derive(Debug, Clone)]
pub struct PreviewRenderer {
    urls: ObjectUrlStore,
}

impl PreviewRenderer {
    #[must_use]
    pub fn new(urls: ObjectUrlStore) -> Self {
        Self { urls }
    }

    /// Handle for the original input; the caller releases it
    #[must_use]
    pub fn show_original(&self, file: &ImageFile) -> ObjectUrl {
        self.urls.create(file.blob())
    }

    /// Handle for the processed result; the caller releases it
    #[must_use]
    pub fn show_result(&self, result: &Blob) -> ObjectUrl {
        self.urls.create(result)
    }

    /// Paint `result` over the background described by `style`
    ///
    /// Source-over alpha blending; the output is fully opaque. A style with
    /// neither checkerboard nor fill leaves the image unchanged.
    #[must_use]
    pub fn composite(
        result: &RgbaImage,
        style: &SurfaceStyle,
        pattern: &CheckerboardPattern,
    ) -> RgbaImage {
        let background = |x: u32, y: u32| -> Option<Color> {
            if style.checkerboard {
                Some(pattern.color_at(x, y))
            } else {
                style.fill
            }
        };

        let (width, height) = result.dimensions();
        RgbaImage::from_fn(width, height, |x, y| {
            let pixel = *result.get_pixel(x, y);
            match background(x, y) {
                Some(color) => blend_over(pixel, color.to_rgba()),
                None => pixel,
            }
        })
    }

    /// Decode a result blob and flatten it for display
    pub fn composite_blob(
        result: &Blob,
        style: &SurfaceStyle,
        pattern: &CheckerboardPattern,
    ) -> Result<RgbaImage> {
        let image = result.decode_rgba()?;
        Ok(Self::composite(&image, style, pattern))
    }
}

fn blend_over(src: Rgba<u8>, dst: Rgba<u8>) -> Rgba<u8> {
    let alpha = u32::from(src[3]);
    let mix = |s: u8, d: u8| -> u8 {
        ((u32::from(s) * alpha + u32::from(d) * (255 - alpha) + 127) / 255) as u8
    };
    Rgba([mix(src[0], dst[0]), mix(src[1], dst[1]), mix(src[2], dst[2]), 255])
}
