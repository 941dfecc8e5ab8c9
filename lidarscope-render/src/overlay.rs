//! Camera axes and pick marker overlays

use lidarscope_core::{CameraPose, EulerRotation, Point3f, Projection, Vector3f};
use serde::{Deserialize, Serialize};

use crate::grid::{stroke_world_path, subdivide, LINE_SEGMENTS};
use crate::surface::{Color, DrawSurface};

/// Length of the world axes drawn at the sensor origin, metres
pub const WORLD_AXIS_LENGTH: f32 = 5.0;

/// Half-length of the orientation gizmo axes, pixels
const GIZMO_LENGTH: f32 = 25.0;
/// Distance of the gizmo centre from the bottom-left corner, pixels
const GIZMO_INSET: f32 = 40.0;

const MARKER_ARM: f32 = 8.0;
const MARKER_RADIUS: f32 = 6.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub x_axis: Color,
    pub y_axis: Color,
    pub z_axis: Color,
    pub marker: Color,
    pub text: Color,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            x_axis: Color::rgb(230, 60, 60),
            y_axis: Color::rgb(60, 200, 80),
            z_axis: Color::rgb(70, 120, 240),
            marker: Color::rgb(255, 200, 0),
            text: Color::rgb(230, 230, 230),
        }
    }
}

/// A picked world position shown on top of the frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickMarker {
    pub position: Point3f,
}

impl PickMarker {
    pub fn new(position: Point3f) -> Self {
        Self { position }
    }

    pub fn label(&self) -> String {
        // avoid printing "-0.00"
        let tidy = |v: f32| if v.abs() < 0.005 { 0.0 } else { v };
        format!("({:.2}, {:.2})", tidy(self.position.x), tidy(self.position.y))
    }
}

#[derive(Debug, Clone, Default)]
pub struct OverlayRenderer {
    pub style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    /// World X/Y/Z axes at the sensor origin, in perspective.
    ///
    /// Returns how many axes were at least partly visible.
    pub fn draw_world_axes<S: DrawSurface + ?Sized>(&self, surface: &mut S, camera: &CameraPose) -> usize {
        let canvas = surface.canvas_size();
        let projection = Projection::new(camera, canvas);
        let clip = canvas.screen_rect(0.0);
        let origin = Point3f::origin();

        let mut visible = 0;
        for (direction, color, name) in self.axes() {
            let tip = origin + direction * WORLD_AXIS_LENGTH;
            let path = subdivide(origin, tip, LINE_SEGMENTS);
            if !stroke_world_path(surface, &projection, &path, &clip, 2.0, color) {
                continue;
            }
            visible += 1;
            if let Some(end) = projection.project_grid(&tip) {
                surface.fill_text(name, (end.screen_x + 3.0, end.screen_y - 3.0), color);
            }
        }
        visible
    }

    /// Orientation gizmo in the bottom-left corner.
    ///
    /// Shows the camera rotation only; it ignores zoom, pan and perspective.
    pub fn draw_orientation_gizmo<S: DrawSurface + ?Sized>(&self, surface: &mut S, camera: &CameraPose) {
        let canvas = surface.canvas_size();
        if canvas.is_empty() {
            return;
        }
        let rotation = EulerRotation::new(camera.rotation_x, camera.rotation_y, camera.rotation_z);
        let center = (GIZMO_INSET, canvas.height as f32 - GIZMO_INSET);

        for (direction, color, name) in self.axes() {
            let rotated = rotation.apply(&Point3f::from(direction));
            let end = (
                center.0 + rotated.x * GIZMO_LENGTH,
                center.1 - rotated.y * GIZMO_LENGTH,
            );
            surface.stroke_line(center, end, 2.0, color);
            surface.fill_text(name, (end.0 + 2.0, end.1 - 2.0), color);
        }
    }

    /// Crosshair, circle and coordinate label at the picked position.
    ///
    /// Returns `false` when the position is not visible from `camera`.
    pub fn draw_pick_marker<S: DrawSurface + ?Sized>(
        &self,
        surface: &mut S,
        camera: &CameraPose,
        marker: &PickMarker,
    ) -> bool {
        let canvas = surface.canvas_size();
        let Some(screen) = Projection::new(camera, canvas)
            .project_grid(&marker.position)
            .filter(|s| s.is_within(canvas, 0.0))
        else {
            return false;
        };
        let (x, y) = (screen.screen_x, screen.screen_y);
        let color = self.style.marker;

        surface.stroke_line((x - MARKER_ARM, y), (x + MARKER_ARM, y), 1.5, color);
        surface.stroke_line((x, y - MARKER_ARM), (x, y + MARKER_ARM), 1.5, color);
        surface.stroke_circle((x, y), MARKER_RADIUS, 1.5, color);
        surface.fill_text(&marker.label(), (x + MARKER_ARM + 4.0, y - MARKER_ARM), self.style.text);
        true
    }

    fn axes(&self) -> [(Vector3f, Color, &'static str); 3] {
        [
            (Vector3f::x(), self.style.x_axis, "X"),
            (Vector3f::y(), self.style.y_axis, "Y"),
            (Vector3f::z(), self.style.z_axis, "Z"),
        ]
    }
}
