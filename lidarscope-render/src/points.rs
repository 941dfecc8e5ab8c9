//! Point cloud rendering
//!
//! Points are projected, culled against the canvas and grouped by colour so
//! that each colour costs a single draw call.

use std::collections::BTreeMap;

use lidarscope_core::{CameraPose, Point3D, Projection};

use crate::color::{ColorMode, ColorScale};
use crate::surface::{Color, DrawSurface};

/// Points projected further than this outside the canvas are culled, pixels
pub const CULL_MARGIN_PX: f32 = 100.0;

/// Smallest radius a point is drawn with, pixels
pub const MIN_POINT_RADIUS: f32 = 0.75;

/// Largest radius a point is drawn with, pixels
pub const MAX_POINT_RADIUS: f32 = 32.0;

/// Keep every n-th return while the camera is being dragged.
///
/// Zoomed-in views keep more detail since fewer points are on screen.
pub fn lod_stride(zoom: f32) -> u32 {
    if zoom > 5.0 {
        1
    } else if zoom > 2.0 {
        2
    } else {
        4
    }
}

/// On-screen radius for a configured point size at `zoom`
pub fn point_radius(point_size: f32, zoom: f32) -> f32 {
    let radius = point_size * zoom.max(0.0).sqrt() / 2.0;
    if radius.is_finite() {
        radius.clamp(MIN_POINT_RADIUS, MAX_POINT_RADIUS)
    } else {
        MIN_POINT_RADIUS
    }
}

/// Counters from one [`PointRenderer::render`] call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointRenderStats {
    /// Points handed to the renderer
    pub input: usize,
    /// Points left after level-of-detail filtering
    pub considered: usize,
    pub drawn: usize,
    /// Behind the near plane or outside the canvas margin
    pub culled: usize,
    /// Non-finite coordinates
    pub skipped: usize,
    /// Draw calls issued
    pub batches: usize,
}

impl PointRenderStats {
    /// Fraction of considered points that were culled
    pub fn culling_ratio(&self) -> f32 {
        if self.considered == 0 {
            0.0
        } else {
            self.culled as f32 / self.considered as f32
        }
    }
}

/// Draws point clouds onto a [`DrawSurface`]
#[derive(Debug, Clone)]
pub struct PointRenderer {
    /// Single colour used while level of detail is active
    pub lod_color: Color,
}

impl Default for PointRenderer {
    fn default() -> Self {
        Self {
            lod_color: Color::rgb(170, 200, 230),
        }
    }
}

impl PointRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lod_color(lod_color: Color) -> Self {
        Self { lod_color }
    }

    /// Render `points` as seen from `camera`.
    ///
    /// With `reduced_quality` set, only every [`lod_stride`]-th return is
    /// kept and all points share [`PointRenderer::lod_color`].
    pub fn render<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        points: &[Point3D],
        camera: &CameraPose,
        color_mode: ColorMode,
        point_size: f32,
        reduced_quality: bool,
    ) -> PointRenderStats {
        let mut stats = PointRenderStats {
            input: points.len(),
            ..Default::default()
        };
        let canvas = surface.canvas_size();
        if points.is_empty() || canvas.is_empty() {
            return stats;
        }

        let scale = (!reduced_quality).then(|| ColorScale::new(color_mode, points));
        let stride = if reduced_quality { lod_stride(camera.zoom) } else { 1 };
        let projection = Projection::new(camera, canvas);

        let mut batches: BTreeMap<u32, Vec<(f32, f32)>> = BTreeMap::new();
        for point in points.iter().filter(|p| p.point_index % stride == 0) {
            stats.considered += 1;
            if !point.is_finite() {
                stats.skipped += 1;
                continue;
            }
            let Some(screen) = projection
                .project_data(&point.position)
                .filter(|s| s.is_within(canvas, CULL_MARGIN_PX))
            else {
                stats.culled += 1;
                continue;
            };
            let key = scale.as_ref().map_or(0, |scale| scale.key(point));
            batches.entry(key).or_default().push((screen.screen_x, screen.screen_y));
        }

        let radius = point_radius(point_size, camera.zoom);
        for (key, centers) in &batches {
            let color = match &scale {
                Some(scale) => scale.color(*key),
                None => self.lod_color,
            };
            surface.fill_circles(centers, radius, color);
            stats.drawn += centers.len();
            stats.batches += 1;
        }

        if stats.skipped > 0 {
            log::debug!("skipped {} points with non-finite coordinates", stats.skipped);
        }
        log::trace!(
            "points: {} in, {} drawn, {} culled, {} batches",
            stats.input,
            stats.drawn,
            stats.culled,
            stats.batches
        );
        stats
    }
}
