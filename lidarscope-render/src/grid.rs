//! Ground grid, range rings and field-of-view spokes
//!
//! Everything here lies on the `z = 0` plane and is drawn with the grid near
//! plane, so it stays visible from viewpoints where data points would already
//! be clipped. The output is meant to be cached, since it only depends on the
//! camera and the grid parameters.

use lidarscope_core::{screen_bounds, CameraPose, Point3f, Projection, ScreenRect, WorldRect};
use serde::{Deserialize, Serialize};

use crate::points::CULL_MARGIN_PX;
use crate::surface::{Color, DrawSurface};

/// Straight lines are split into this many pieces before projection
pub const LINE_SEGMENTS: usize = 16;

/// Sides of the polygon approximating a range ring
pub const RING_SIDES: usize = 36;

/// Upper bound on grid lines on each side of the origin
pub const MAX_LINES_PER_SIDE: usize = 100;

/// Grid spacing actually drawn at `zoom`: doubled past zoom 5, quadrupled past zoom 10
pub fn effective_step(step: f32, zoom: f32) -> f32 {
    if zoom > 10.0 {
        step * 4.0
    } else if zoom > 5.0 {
        step * 2.0
    } else {
        step
    }
}

/// What the grid covers. Also the key the grid cache is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridParams {
    /// Spacing of lines and rings, metres
    pub step: f32,
    /// Half-width of the grid square and radius of the outermost ring, metres
    pub extent: f32,
    /// Sensor horizontal field of view, degrees
    pub hfov: f32,
}

impl Default for GridParams {
    fn default() -> Self {
        Self {
            step: 5.0,
            extent: 50.0,
            hfov: 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridStyle {
    pub line_color: Color,
    pub ring_color: Color,
    pub spoke_color: Color,
    pub fov_color: Color,
    pub label_color: Color,
    pub line_width: f32,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            line_color: Color::rgb(50, 50, 55),
            ring_color: Color::rgb(75, 75, 85),
            spoke_color: Color::rgb(90, 90, 100),
            fov_color: Color::rgb(0, 150, 90),
            label_color: Color::rgb(150, 150, 160),
            line_width: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GridRenderStats {
    /// Lines, rings and spokes that produced at least one draw call
    pub drawn: usize,
    pub culled: usize,
}

#[derive(Debug, Clone, Default)]
pub struct GridRenderer {
    pub style: GridStyle,
}

impl GridRenderer {
    pub fn new(style: GridStyle) -> Self {
        Self { style }
    }

    pub fn render<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        camera: &CameraPose,
        params: &GridParams,
    ) -> GridRenderStats {
        let mut stats = GridRenderStats::default();
        let canvas = surface.canvas_size();
        let Some(step) = line_spacing(params, camera.zoom) else {
            log::debug!("grid skipped: step {} extent {}", params.step, params.extent);
            return stats;
        };
        if canvas.is_empty() {
            return stats;
        }

        let projection = Projection::new(camera, canvas);
        let clip = canvas.screen_rect(0.0);
        // Only a top-down view keeps the ground plane at a uniform depth
        let bounds = (!camera.is_tilted())
            .then(|| screen_bounds(canvas, camera.pan_x, camera.pan_y, camera.zoom, CULL_MARGIN_PX));

        let mut painter = Painter {
            surface,
            projection: &projection,
            clip,
            bounds,
            width: self.style.line_width,
            stats: &mut stats,
        };

        let extent = params.extent;
        let count = (extent / step).floor() as i32;
        for i in -count..=count {
            let v = i as f32 * step;
            painter.segment((-extent, v), (extent, v), self.style.line_color);
            painter.segment((v, -extent), (v, extent), self.style.line_color);
        }

        for i in 1..=count {
            let radius = i as f32 * step;
            if painter.ring(radius, self.style.ring_color) {
                painter.label(radius, self.style.label_color);
            }
        }

        for azimuth in [0.0, 90.0, 180.0, 270.0] {
            painter.spoke(azimuth, extent, self.style.spoke_color);
        }
        if params.hfov.is_finite() && params.hfov > 0.0 && params.hfov < 360.0 {
            painter.spoke(-params.hfov / 2.0, extent, self.style.fov_color);
            painter.spoke(params.hfov / 2.0, extent, self.style.fov_color);
        }

        log::trace!("grid: {} drawn, {} culled, step {step}", stats.drawn, stats.culled);
        stats
    }
}

/// Spacing to draw with, coarsened until the line count stays bounded
fn line_spacing(params: &GridParams, zoom: f32) -> Option<f32> {
    let mut step = effective_step(params.step, zoom);
    if !(step.is_finite() && params.extent.is_finite()) || step <= 0.0 || params.extent <= 0.0 {
        return None;
    }
    while params.extent / step > MAX_LINES_PER_SIDE as f32 {
        step *= 2.0;
    }
    Some(step)
}

/// Evenly spaced points from `from` to `to`, both included
pub(crate) fn subdivide(from: Point3f, to: Point3f, segments: usize) -> Vec<Point3f> {
    let segments = segments.max(1);
    (0..=segments)
        .map(|i| from + (to - from) * (i as f32 / segments as f32))
        .collect()
}

/// Project a world-space path and stroke its visible parts.
///
/// The path is broken wherever a vertex falls behind the grid near plane, and
/// each remaining run is only drawn when its screen bounding box touches
/// `clip`. Returns whether anything was drawn.
pub(crate) fn stroke_world_path<S: DrawSurface + ?Sized>(
    surface: &mut S,
    projection: &Projection,
    path: &[Point3f],
    clip: &ScreenRect,
    width: f32,
    color: Color,
) -> bool {
    let mut drawn = false;
    let mut run = Vec::with_capacity(path.len());
    for point in path {
        match projection.project_grid(point) {
            Some(screen) => run.push((screen.screen_x, screen.screen_y)),
            None => drawn |= flush_run(surface, &mut run, clip, width, color),
        }
    }
    drawn |= flush_run(surface, &mut run, clip, width, color);
    drawn
}

fn flush_run<S: DrawSurface + ?Sized>(
    surface: &mut S,
    run: &mut Vec<(f32, f32)>,
    clip: &ScreenRect,
    width: f32,
    color: Color,
) -> bool {
    let visible = run.len() >= 2
        && ScreenRect::bounding(run.iter().copied()).is_some_and(|bounds| bounds.intersects(clip));
    if visible {
        surface.stroke_polyline(run, width, color);
    }
    run.clear();
    visible
}

struct Painter<'a, S: DrawSurface + ?Sized> {
    surface: &'a mut S,
    projection: &'a Projection,
    clip: ScreenRect,
    bounds: Option<WorldRect>,
    width: f32,
    stats: &'a mut GridRenderStats,
}

impl<S: DrawSurface + ?Sized> Painter<'_, S> {
    fn count(&mut self, drawn: bool) -> bool {
        if drawn {
            self.stats.drawn += 1;
        } else {
            self.stats.culled += 1;
        }
        drawn
    }

    fn segment(&mut self, from: (f32, f32), to: (f32, f32), color: Color) -> bool {
        if self.bounds.is_some_and(|b| !b.overlaps_segment(from, to)) {
            return self.count(false);
        }
        let path = subdivide(
            Point3f::new(from.0, from.1, 0.0),
            Point3f::new(to.0, to.1, 0.0),
            LINE_SEGMENTS,
        );
        let drawn = stroke_world_path(self.surface, self.projection, &path, &self.clip, self.width, color);
        self.count(drawn)
    }

    fn spoke(&mut self, azimuth: f32, length: f32, color: Color) -> bool {
        let (sin, cos) = azimuth.to_radians().sin_cos();
        self.segment((0.0, 0.0), (length * sin, length * cos), color)
    }

    fn ring(&mut self, radius: f32, color: Color) -> bool {
        if let Some(bounds) = self.bounds {
            if !bounds.overlaps_origin_circle(radius) || !self.ring_on_screen(radius) {
                return self.count(false);
            }
        }
        let path: Vec<Point3f> = (0..=RING_SIDES)
            .map(|i| {
                let angle = i as f32 / RING_SIDES as f32 * std::f32::consts::TAU;
                Point3f::new(radius * angle.cos(), radius * angle.sin(), 0.0)
            })
            .collect();
        let drawn = stroke_world_path(self.surface, self.projection, &path, &self.clip, self.width, color);
        self.count(drawn)
    }

    /// Whether the projected ring crosses the canvas; top-down views only
    fn ring_on_screen(&self, radius: f32) -> bool {
        let Some(center) = self.projection.project_grid(&Point3f::origin()) else {
            return false;
        };
        let (cx, cy) = (center.screen_x, center.screen_y);
        let radius_px = radius * self.projection.base_scale();

        let nearest_x = cx.clamp(self.clip.min_x, self.clip.max_x);
        let nearest_y = cy.clamp(self.clip.min_y, self.clip.max_y);
        let nearest = (cx - nearest_x).hypot(cy - nearest_y);

        let far_x = (cx - self.clip.min_x).abs().max((cx - self.clip.max_x).abs());
        let far_y = (cy - self.clip.min_y).abs().max((cy - self.clip.max_y).abs());
        let farthest = far_x.hypot(far_y);

        nearest <= radius_px && radius_px <= farthest
    }

    /// Distance label where the ring crosses the forward axis
    fn label(&mut self, radius: f32, color: Color) {
        let Some(screen) = self.projection.project_grid(&Point3f::new(0.0, radius, 0.0)) else {
            return;
        };
        if screen.is_within(self.surface.canvas_size(), 0.0) {
            self.surface
                .fill_text(&distance_label(radius), (screen.screen_x + 4.0, screen.screen_y - 4.0), color);
        }
    }
}

fn distance_label(radius: f32) -> String {
    if (radius - radius.round()).abs() < 1e-3 {
        format!("{:.0}m", radius)
    } else {
        format!("{:.1}m", radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raster::RasterSurface;
    use crate::recording::{DrawCall, RecordingSurface};

    #[test]
    fn test_effective_step() {
        assert_eq!(effective_step(5.0, 1.0), 5.0);
        assert_eq!(effective_step(5.0, 5.0), 5.0);
        assert_eq!(effective_step(5.0, 6.0), 10.0);
        assert_eq!(effective_step(5.0, 10.5), 20.0);
    }

    #[test]
    fn test_line_count_is_bounded() {
        let params = GridParams {
            step: 0.01,
            ..Default::default()
        };
        let step = line_spacing(&params, 1.0).unwrap();
        assert!(params.extent / step <= MAX_LINES_PER_SIDE as f32);

        let broken = GridParams {
            step: 0.0,
            ..Default::default()
        };
        assert_eq!(line_spacing(&broken, 1.0), None);
    }

    #[test]
    fn test_top_down_grid() {
        let mut surface = RecordingSurface::new(800, 600);
        let stats = GridRenderer::default().render(&mut surface, &CameraPose::default(), &GridParams::default());

        // 21 vertical lines, 15 of 21 horizontal lines, 10 rings, 6 spokes
        assert_eq!(stats.drawn, 21 + 15 + 10 + 6);
        assert_eq!(stats.culled, 6);
        assert_eq!(surface.polylines(), stats.drawn);
        assert_eq!(surface.texts(), vec!["5m", "10m", "15m", "20m", "25m", "30m", "35m"]);
    }

    #[test]
    fn test_zoomed_in_culls_far_lines() {
        let mut surface = RecordingSurface::new(800, 600);
        let camera = CameraPose::top_down(20.0);
        let stats = GridRenderer::default().render(&mut surface, &camera, &GridParams::default());

        // step widens to 20 m; only the axes lines and spokes are in view
        assert_eq!(stats.drawn, 2 + 6);
        assert!(stats.culled >= 8);
    }

    #[test]
    fn test_tilted_view_draws() {
        let mut surface = RecordingSurface::new(800, 600);
        let camera = CameraPose::top_down(1.0).with_rotation(1.4, 0.0, 0.3);
        let stats = GridRenderer::default().render(&mut surface, &camera, &GridParams::default());
        assert!(stats.drawn > 0);
        assert!(surface.polylines() >= stats.drawn);
    }

    #[test]
    fn test_path_is_cut_at_near_plane() {
        let camera = CameraPose::top_down(1.0).with_rotation(1.4, 0.0, 0.0);
        let canvas = lidarscope_core::CanvasSize::new(800, 600);
        let projection = Projection::new(&camera, canvas);
        let path = subdivide(Point3f::new(0.0, -200.0, 0.0), Point3f::new(0.0, 200.0, 0.0), 16);

        let mut surface = RecordingSurface::new(800, 600);
        let drawn = stroke_world_path(&mut surface, &projection, &path, &canvas.screen_rect(0.0), 1.0, Color::WHITE);
        assert!(drawn);
        match &surface.calls()[0] {
            // five of the seventeen vertices fall behind the near plane
            DrawCall::Polyline { points, .. } => assert_eq!(points.len(), 12),
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn test_subdivide_endpoints() {
        let path = subdivide(Point3f::new(-1.0, 0.0, 0.0), Point3f::new(1.0, 0.0, 0.0), 4);
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Point3f::new(-1.0, 0.0, 0.0));
        assert_eq!(path[2], Point3f::new(0.0, 0.0, 0.0));
        assert_eq!(path[4], Point3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_renders_into_raster() {
        let mut surface = RasterSurface::new(200, 150);
        let stats = GridRenderer::default().render(&mut surface, &CameraPose::default(), &GridParams::default());
        assert!(stats.drawn > 0);
        assert!(surface.covered_pixels() > 0);
    }

    #[test]
    fn test_distance_label() {
        assert_eq!(distance_label(15.0), "15m");
        assert_eq!(distance_label(2.5), "2.5m");
    }
}
