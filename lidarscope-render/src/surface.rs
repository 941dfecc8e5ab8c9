//! The drawing capability the renderers target

use image::RgbaImage;
use lidarscope_core::CanvasSize;
use serde::{Deserialize, Serialize};

/// An sRGB colour with straight alpha
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub const fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Colour from hue (degrees), saturation and lightness (both 0..=1)
    pub fn from_hsl(hue: f32, saturation: f32, lightness: f32) -> Self {
        let h = hue.rem_euclid(360.0) / 60.0;
        let s = saturation.clamp(0.0, 1.0);
        let l = lightness.clamp(0.0, 1.0);

        let chroma = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (chroma, x, 0.0),
            1 => (x, chroma, 0.0),
            2 => (0.0, chroma, x),
            3 => (0.0, x, chroma),
            4 => (x, 0.0, chroma),
            _ => (chroma, 0.0, x),
        };
        let m = l - chroma / 2.0;
        let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(channel(r), channel(g), channel(b))
    }

    /// Linear interpolation between two colours
    pub fn lerp(self, other: Color, t: f32) -> Self {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Self::rgba(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Color::rgb(r, g, b)
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(color: Color) -> Self {
        image::Rgba([color.r, color.g, color.b, color.a])
    }
}

/// A 2-D drawing target with pixel dimensions.
///
/// The renderers never assume a particular windowing API; a host wraps its
/// canvas in this trait. Coordinates are in pixels with `y` growing downward.
/// Implementations clip anything that falls outside the surface.
pub trait DrawSurface {
    /// Current pixel dimensions
    fn canvas_size(&self) -> CanvasSize;

    /// Fill the whole surface with `color`, replacing what was there
    fn clear(&mut self, color: Color);

    /// Fill one circle of `radius` around each centre, all in `color`.
    ///
    /// This is a single batched draw call.
    fn fill_circles(&mut self, centers: &[(f32, f32)], radius: f32, color: Color);

    /// Stroke connected line segments through `points`
    fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color);

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, color: Color) {
        self.stroke_polyline(&[from, to], width, color);
    }

    fn stroke_circle(&mut self, center: (f32, f32), radius: f32, width: f32, color: Color);

    /// Draw `text` with its baseline starting at `position`
    fn fill_text(&mut self, text: &str, position: (f32, f32), color: Color);

    /// Composite `image` over the surface with its top-left corner at the origin
    fn draw_image(&mut self, image: &RgbaImage);
}
