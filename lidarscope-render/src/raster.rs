//! Software raster surface backed by an RGBA image
//!
//! Used as the off-screen target for the grid cache and for headless
//! rendering. Primitives are rasterized with `embedded-graphics` and
//! alpha-blended into the image.

use embedded_graphics::{
    mono_font::{ascii::FONT_6X10, MonoTextStyle},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Circle, Line, PrimitiveStyle},
    text::Text,
};
use image::{Rgba, RgbaImage};
use lidarscope_core::{CanvasSize, Error, Result, ScreenRect};

use crate::surface::{Color, DrawSurface};

/// An RGBA image that can be drawn on
#[derive(Debug, Clone, PartialEq)]
pub struct RasterSurface {
    image: RgbaImage,
}

impl RasterSurface {
    /// A fully transparent surface
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
        }
    }

    pub fn with_size(size: CanvasSize) -> Self {
        Self::new(size.width, size.height)
    }

    /// Wrap raw RGBA bytes, row-major
    pub fn from_rgba(width: u32, height: u32, pixels: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        let actual = pixels.len();
        RgbaImage::from_raw(width, height, pixels)
            .map(|image| Self { image })
            .ok_or_else(|| Error::InvalidData(format!("expected {expected} bytes for {width}x{height}, got {actual}")))
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Color> {
        (x < self.image.width() && y < self.image.height()).then(|| {
            let Rgba([r, g, b, a]) = *self.image.get_pixel(x, y);
            Color::rgba(r, g, b, a)
        })
    }

    /// Number of pixels that are not fully transparent
    pub fn covered_pixels(&self) -> usize {
        self.image.pixels().filter(|p| p.0[3] != 0).count()
    }

    fn target(&mut self, alpha: u8) -> BlendTarget<'_> {
        BlendTarget {
            image: &mut self.image,
            alpha,
        }
    }
}

impl DrawSurface for RasterSurface {
    fn canvas_size(&self) -> CanvasSize {
        CanvasSize::new(self.image.width(), self.image.height())
    }

    fn clear(&mut self, color: Color) {
        let fill: Rgba<u8> = color.into();
        for pixel in self.image.pixels_mut() {
            *pixel = fill;
        }
    }

    fn fill_circles(&mut self, centers: &[(f32, f32)], radius: f32, color: Color) {
        let Some(diameter) = diameter(radius).filter(|_| color.a != 0) else {
            return;
        };
        let visible = self.canvas_size().screen_rect(radius);
        let style = PrimitiveStyle::with_fill(eg_color(color));
        let mut target = self.target(color.a);
        for &center in centers.iter().filter(|&&(x, y)| visible.contains(x, y)) {
            let _ = Circle::with_center(eg_point(center), diameter)
                .into_styled(style)
                .draw(&mut target);
        }
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color) {
        if points.len() < 2 || color.a == 0 {
            return;
        }
        // Clip first so far-away vertices never get rasterized pixel by pixel
        let clip = self.canvas_size().screen_rect(width.max(1.0));
        let style = PrimitiveStyle::with_stroke(eg_color(color), stroke_width(width));
        let mut target = self.target(color.a);
        for pair in points.windows(2) {
            if let Some((from, to)) = clip_segment(pair[0], pair[1], &clip) {
                let _ = Line::new(eg_point(from), eg_point(to))
                    .into_styled(style)
                    .draw(&mut target);
            }
        }
    }

    fn stroke_circle(&mut self, center: (f32, f32), radius: f32, width: f32, color: Color) {
        let Some(diameter) = diameter(radius).filter(|_| color.a != 0) else {
            return;
        };
        let style = PrimitiveStyle::with_stroke(eg_color(color), stroke_width(width));
        let _ = Circle::with_center(eg_point(center), diameter)
            .into_styled(style)
            .draw(&mut self.target(color.a));
    }

    fn fill_text(&mut self, text: &str, position: (f32, f32), color: Color) {
        if color.a == 0 {
            return;
        }
        let style = MonoTextStyle::new(&FONT_6X10, eg_color(color));
        let _ = Text::new(text, eg_point(position), style).draw(&mut self.target(color.a));
    }

    fn draw_image(&mut self, image: &RgbaImage) {
        let width = self.image.width().min(image.width());
        let height = self.image.height().min(image.height());
        for y in 0..height {
            for x in 0..width {
                let Rgba([r, g, b, a]) = *image.get_pixel(x, y);
                if a != 0 {
                    blend(self.image.get_pixel_mut(x, y), [r, g, b], a);
                }
            }
        }
    }
}

/// `embedded-graphics` view of the image that blends every pixel at a fixed alpha
struct BlendTarget<'a> {
    image: &'a mut RgbaImage,
    alpha: u8,
}

impl DrawTarget for BlendTarget<'_> {
    type Color = Rgb888;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        let (width, height) = self.image.dimensions();
        for Pixel(point, color) in pixels {
            if point.x < 0 || point.y < 0 || point.x as u32 >= width || point.y as u32 >= height {
                continue;
            }
            let pixel = self.image.get_pixel_mut(point.x as u32, point.y as u32);
            blend(pixel, [color.r(), color.g(), color.b()], self.alpha);
        }
        Ok(())
    }
}

impl OriginDimensions for BlendTarget<'_> {
    fn size(&self) -> Size {
        Size::new(self.image.width(), self.image.height())
    }
}

/// Source-over compositing of a straight-alpha colour
fn blend(dst: &mut Rgba<u8>, src: [u8; 3], alpha: u8) {
    if alpha == 255 {
        *dst = Rgba([src[0], src[1], src[2], 255]);
        return;
    }
    let a = alpha as u32;
    let dst_a = dst.0[3] as u32;
    // output alpha scaled by 255
    let out_a = a * 255 + dst_a * (255 - a);
    if out_a == 0 {
        return;
    }
    for i in 0..3 {
        let mixed = src[i] as u32 * a * 255 + dst.0[i] as u32 * dst_a * (255 - a);
        dst.0[i] = ((mixed + out_a / 2) / out_a) as u8;
    }
    dst.0[3] = ((out_a + 127) / 255) as u8;
}

/// Liang-Barsky clipping of a segment against a rectangle.
///
/// Computed in `f64` so that very long segments keep pixel precision.
fn clip_segment(from: (f32, f32), to: (f32, f32), rect: &ScreenRect) -> Option<((f32, f32), (f32, f32))> {
    if ![from.0, from.1, to.0, to.1].iter().all(|v| v.is_finite()) {
        return None;
    }
    let (x0, y0) = (from.0 as f64, from.1 as f64);
    let dx = to.0 as f64 - x0;
    let dy = to.1 as f64 - y0;
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;

    for (p, q) in [
        (-dx, x0 - rect.min_x as f64),
        (dx, rect.max_x as f64 - x0),
        (-dy, y0 - rect.min_y as f64),
        (dy, rect.max_y as f64 - y0),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }

    let at = |t: f64| ((x0 + t * dx) as f32, (y0 + t * dy) as f32);
    Some((at(t0), at(t1)))
}

fn diameter(radius: f32) -> Option<u32> {
    (radius.is_finite() && radius > 0.0).then(|| (radius * 2.0).round().max(1.0) as u32)
}

fn eg_color(color: Color) -> Rgb888 {
    Rgb888::new(color.r, color.g, color.b)
}

fn eg_point((x, y): (f32, f32)) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

fn stroke_width(width: f32) -> u32 {
    width.round().max(1.0) as u32
}
