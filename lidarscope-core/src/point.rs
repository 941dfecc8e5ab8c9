//! Point types and related functionality

use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// A 3D point with floating point coordinates
pub type Point3f = Point3<f32>;

/// A 3D vector with floating point components
pub type Vector3f = Vector3<f32>;

/// A single sensor return converted to world space.
///
/// World axes: `+y` is the sensor's forward direction, `+x` is to its right
/// and `+z` is up. All lengths are metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3D {
    pub position: Point3f,
    /// Radial distance reported by the sensor
    pub distance: f32,
    /// Source layer of the return
    pub channel: u32,
    /// Ordinal of the return within its scan line
    pub point_index: u32,
    /// Elevation of the source layer, in degrees
    pub vertical_angle: f32,
    /// Detection strength (0-255), when the sensor reports one
    #[serde(default)]
    pub intensity: Option<u8>,
}

impl Point3D {
    /// Create a point from cartesian coordinates; the distance is the
    /// magnitude of the position vector.
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        let position = Point3f::new(x, y, z);
        Self {
            position,
            distance: position.coords.norm(),
            channel: 0,
            point_index: 0,
            vertical_angle: 0.0,
            intensity: None,
        }
    }

    /// Create a point from a range measurement.
    ///
    /// `azimuth` is measured from the forward (`+y`) axis towards `+x`,
    /// `elevation` from the horizontal plane towards `+z`; both in degrees.
    pub fn from_spherical(
        distance: f32,
        azimuth: f32,
        elevation: f32,
        channel: u32,
        point_index: u32,
    ) -> Self {
        let (sin_az, cos_az) = azimuth.to_radians().sin_cos();
        let (sin_el, cos_el) = elevation.to_radians().sin_cos();
        let horizontal = distance * cos_el;

        Self {
            position: Point3f::new(horizontal * sin_az, horizontal * cos_az, distance * sin_el),
            distance,
            channel,
            point_index,
            vertical_angle: elevation,
            intensity: None,
        }
    }

    /// Builder-style setter for the channel
    pub fn with_channel(mut self, channel: u32) -> Self {
        self.channel = channel;
        self
    }

    /// Builder-style setter for the point index
    pub fn with_index(mut self, point_index: u32) -> Self {
        self.point_index = point_index;
        self
    }

    /// Builder-style setter for the detection intensity
    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = Some(intensity);
        self
    }

    pub fn x(&self) -> f32 {
        self.position.x
    }

    pub fn y(&self) -> f32 {
        self.position.y
    }

    pub fn z(&self) -> f32 {
        self.position.z
    }

    /// Whether every numeric field can be used for rendering
    pub fn is_finite(&self) -> bool {
        self.position.iter().all(|c| c.is_finite())
            && self.distance.is_finite()
            && self.vertical_angle.is_finite()
    }
}

/// Result of projecting a point onto the screen.
///
/// Only valid for the frame it was computed in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub screen_x: f32,
    pub screen_y: f32,
    /// Distance along the view axis after the camera stand-off is applied
    pub depth: f32,
    /// Pixels per world unit at this depth
    pub scale: f32,
}

impl ScreenPoint {
    /// Whether the point lies inside `canvas` grown by `margin` pixels on every side
    pub fn is_within(&self, canvas: CanvasSize, margin: f32) -> bool {
        self.screen_x >= -margin
            && self.screen_y >= -margin
            && self.screen_x <= canvas.width as f32 + margin
            && self.screen_y <= canvas.height as f32 + margin
    }
}

/// Pixel dimensions of a drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Centre of the canvas before panning
    pub fn center(&self) -> (f32, f32) {
        (self.width as f32 / 2.0, self.height as f32 / 2.0)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Screen-space rectangle of the canvas grown by `margin`
    pub fn screen_rect(&self, margin: f32) -> ScreenRect {
        ScreenRect {
            min_x: -margin,
            min_y: -margin,
            max_x: self.width as f32 + margin,
            max_y: self.height as f32 + margin,
        }
    }
}

/// Axis-aligned rectangle in screen pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl ScreenRect {
    /// Bounding box of a set of screen points; `None` when empty
    pub fn bounding(points: impl IntoIterator<Item = (f32, f32)>) -> Option<Self> {
        let mut iter = points.into_iter();
        let (x, y) = iter.next()?;
        let mut rect = Self { min_x: x, min_y: y, max_x: x, max_y: y };
        for (x, y) in iter {
            rect.min_x = rect.min_x.min(x);
            rect.min_y = rect.min_y.min(y);
            rect.max_x = rect.max_x.max(x);
            rect.max_y = rect.max_y.max(y);
        }
        Some(rect)
    }

    pub fn intersects(&self, other: &ScreenRect) -> bool {
        self.min_x <= other.max_x
            && self.max_x >= other.min_x
            && self.min_y <= other.max_y
            && self.max_y >= other.min_y
    }
}

/// Axis-aligned rectangle on the world `z = 0` plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldRect {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl WorldRect {
    pub fn new(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> Self {
        Self { min_x, min_y, max_x, max_y }
    }

    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Whether the segment's bounding box overlaps this rectangle
    pub fn overlaps_segment(&self, from: (f32, f32), to: (f32, f32)) -> bool {
        from.0.min(to.0) <= self.max_x
            && from.0.max(to.0) >= self.min_x
            && from.1.min(to.1) <= self.max_y
            && from.1.max(to.1) >= self.min_y
    }

    /// Whether a circle centred on the origin with `radius` overlaps this rectangle
    pub fn overlaps_origin_circle(&self, radius: f32) -> bool {
        let nearest_x = 0.0_f32.clamp(self.min_x, self.max_x);
        let nearest_y = 0.0_f32.clamp(self.min_y, self.max_y);
        let nearest = nearest_x.hypot(nearest_y);

        let far_x = self.min_x.abs().max(self.max_x.abs());
        let far_y = self.min_y.abs().max(self.max_y.abs());
        let farthest = far_x.hypot(far_y);

        nearest <= radius && radius <= farthest
    }
}
