//! Point colouring modes

use lidarscope_core::Point3D;
use serde::{Deserialize, Serialize};

use crate::surface::Color;

/// Number of discrete colours a continuous mode is quantised to
pub const COLOR_LEVELS: u32 = 32;

/// Vertical angle range mapped onto the colour ramp, degrees
const VERTICAL_ANGLE_MIN: f32 = -15.0;
const VERTICAL_ANGLE_SPAN: f32 = 30.0;

/// Colours for `channel mod 8`
pub const CHANNEL_PALETTE: [Color; 8] = [
    Color::rgb(230, 25, 75),
    Color::rgb(60, 180, 75),
    Color::rgb(0, 130, 200),
    Color::rgb(255, 225, 25),
    Color::rgb(245, 130, 48),
    Color::rgb(145, 30, 180),
    Color::rgb(70, 240, 240),
    Color::rgb(240, 50, 230),
];

const INTENSITY_LOW: Color = Color::rgb(0, 80, 0);
const INTENSITY_HIGH: Color = Color::rgb(255, 255, 0);

/// Which attribute drives a point's colour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    /// Near points blue, far points red
    #[default]
    Distance,
    Channel,
    Intensity,
    VerticalAngle,
}

/// Maps points to quantised colour keys for one batch of points.
///
/// Keys are small integers so points sharing a colour can be grouped and
/// drawn together.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    mode: ColorMode,
    min_distance: f32,
    max_distance: f32,
}

impl ColorScale {
    pub fn new(mode: ColorMode, points: &[Point3D]) -> Self {
        let (min_distance, max_distance) = if needs_distance_range(mode) {
            distance_range(points)
        } else {
            (0.0, 0.0)
        };
        Self {
            mode,
            min_distance,
            max_distance,
        }
    }

    pub fn mode(&self) -> ColorMode {
        self.mode
    }

    /// Quantised colour key for `point`
    pub fn key(&self, point: &Point3D) -> u32 {
        match self.mode {
            ColorMode::Distance => quantize(self.normalized_distance(point.distance)),
            ColorMode::Channel => point.channel % CHANNEL_PALETTE.len() as u32,
            ColorMode::Intensity => match point.intensity {
                Some(intensity) => quantize(intensity as f32 / 255.0),
                None => quantize(1.0 - self.normalized_distance(point.distance)),
            },
            ColorMode::VerticalAngle => {
                quantize((point.vertical_angle - VERTICAL_ANGLE_MIN) / VERTICAL_ANGLE_SPAN)
            }
        }
    }

    /// Colour for a key produced by [`ColorScale::key`]
    pub fn color(&self, key: u32) -> Color {
        let t = key.min(COLOR_LEVELS - 1) as f32 / (COLOR_LEVELS - 1) as f32;
        match self.mode {
            ColorMode::Distance => Color::from_hsl(240.0 * (1.0 - t), 1.0, 0.5),
            ColorMode::Channel => CHANNEL_PALETTE[key as usize % CHANNEL_PALETTE.len()],
            ColorMode::Intensity => INTENSITY_LOW.lerp(INTENSITY_HIGH, t),
            ColorMode::VerticalAngle => Color::from_hsl(270.0 * (1.0 - t), 1.0, 0.5),
        }
    }

    pub fn color_of(&self, point: &Point3D) -> Color {
        self.color(self.key(point))
    }

    fn normalized_distance(&self, distance: f32) -> f32 {
        let range = self.max_distance - self.min_distance;
        if range > 0.0 && distance.is_finite() {
            ((distance - self.min_distance) / range).clamp(0.0, 1.0)
        } else {
            0.0
        }
    }
}

fn needs_distance_range(mode: ColorMode) -> bool {
    matches!(mode, ColorMode::Distance | ColorMode::Intensity)
}

fn distance_range(points: &[Point3D]) -> (f32, f32) {
    points
        .iter()
        .map(|p| p.distance)
        .filter(|d| d.is_finite())
        .fold(None, |range: Option<(f32, f32)>, d| match range {
            Some((min, max)) => Some((min.min(d), max.max(d))),
            None => Some((d, d)),
        })
        .unwrap_or((0.0, 0.0))
}

fn quantize(t: f32) -> u32 {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    (t * (COLOR_LEVELS - 1) as f32).round() as u32
}
