//! Software projection pipeline
//!
//! Points are rotated by the camera's Euler angles, pushed in front of the
//! viewer by a fixed stand-off distance and perspective-divided onto the
//! screen. Screen `y` grows downward while world `y` grows forward, so the
//! projected `y` is inverted.
//!
//! There is no depth buffer: anything whose depth falls at or below the near
//! plane is simply not drawn. Data points and reference geometry use
//! different near planes.

use crate::camera::CameraPose;
use crate::point::{CanvasSize, Point3f, ScreenPoint, WorldRect};

/// Perspective constant `K` in `scale = zoom * K / depth`
pub const PROJECTION_CONSTANT: f32 = 800.0;

/// Distance added along the view axis to place the scene in front of the viewer
pub const CAMERA_DISTANCE: f32 = 100.0;

/// Depth at or below which data points are discarded
pub const DATA_NEAR_PLANE: f32 = 50.0;

/// Depth at or below which grid and axis primitives are discarded
pub const GRID_NEAR_PLANE: f32 = 10.0;

/// Largest re-projection error (pixels) accepted for an inverse-projection candidate
pub const PICK_TOLERANCE_PX: f32 = 2.0;

/// Largest re-projection error (pixels) accepted from the brute-force search
pub const SEARCH_TOLERANCE_PX: f32 = 4.0;

const SEARCH_HALF_EXTENT: f32 = 200.0;
const SEARCH_STEP: f32 = 2.0;
const SEARCH_MAX_REFINEMENTS: usize = 8;
const DEPTH_REFINE_ITERATIONS: usize = 4;

/// Precomputed sine/cosine pairs for a Z-Y-X rotation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerRotation {
    x: Option<(f32, f32)>,
    y: Option<(f32, f32)>,
    z: Option<(f32, f32)>,
}

impl EulerRotation {
    /// Axes whose angle is exactly zero are skipped when applying
    pub fn new(rx: f32, ry: f32, rz: f32) -> Self {
        let pair = |angle: f32| (angle != 0.0).then(|| angle.sin_cos());
        Self {
            x: pair(rx),
            y: pair(ry),
            z: pair(rz),
        }
    }

    pub fn apply(&self, point: &Point3f) -> Point3f {
        let (mut x, mut y, mut z) = (point.x, point.y, point.z);

        if let Some((s, c)) = self.z {
            (x, y) = (x * c - y * s, x * s + y * c);
        }
        if let Some((s, c)) = self.y {
            (x, z) = (x * c + z * s, -x * s + z * c);
        }
        if let Some((s, c)) = self.x {
            (y, z) = (y * c - z * s, y * s + z * c);
        }

        Point3f::new(x, y, z)
    }

    /// Undo [`EulerRotation::apply`]: X, then Y, then Z with negated angles
    pub fn apply_inverse(&self, point: &Point3f) -> Point3f {
        let (mut x, mut y, mut z) = (point.x, point.y, point.z);

        if let Some((s, c)) = self.x {
            (y, z) = (y * c + z * s, -y * s + z * c);
        }
        if let Some((s, c)) = self.y {
            (x, z) = (x * c - z * s, x * s + z * c);
        }
        if let Some((s, c)) = self.z {
            (x, y) = (x * c + y * s, -x * s + y * c);
        }

        Point3f::new(x, y, z)
    }
}

/// Rotate about Z, then Y, then X
pub fn rotate(point: &Point3f, rx: f32, ry: f32, rz: f32) -> Point3f {
    EulerRotation::new(rx, ry, rz).apply(point)
}

/// Inverse of [`rotate`] for the same angles
pub fn rotate_inverse(point: &Point3f, rx: f32, ry: f32, rz: f32) -> Point3f {
    EulerRotation::new(rx, ry, rz).apply_inverse(point)
}

/// Project a single point.
///
/// Returns `None` when the depth after the `z_offset` stand-off is at or below
/// `near_plane`.
#[allow(clippy::too_many_arguments)]
pub fn project(
    point: &Point3f,
    center_x: f32,
    center_y: f32,
    zoom: f32,
    rx: f32,
    ry: f32,
    rz: f32,
    z_offset: f32,
    near_plane: f32,
) -> Option<ScreenPoint> {
    let rotated = rotate(point, rx, ry, rz);
    perspective(&rotated, center_x, center_y, zoom, z_offset, near_plane)
}

fn perspective(
    rotated: &Point3f,
    center_x: f32,
    center_y: f32,
    zoom: f32,
    z_offset: f32,
    near_plane: f32,
) -> Option<ScreenPoint> {
    let depth = rotated.z + z_offset;
    if depth.is_nan() || depth <= near_plane {
        return None;
    }

    let scale = zoom * PROJECTION_CONSTANT / depth;
    Some(ScreenPoint {
        screen_x: center_x + rotated.x * scale,
        screen_y: center_y - rotated.y * scale,
        depth,
        scale,
    })
}

/// Camera and canvas parameters bundled for projecting many points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub center_x: f32,
    pub center_y: f32,
    pub zoom: f32,
    pub z_offset: f32,
    rotation: EulerRotation,
}

impl Projection {
    /// Projection for `camera` on a canvas of `canvas` pixels.
    ///
    /// The projection centre is the canvas centre shifted by the camera pan.
    pub fn new(camera: &CameraPose, canvas: CanvasSize) -> Self {
        let (cx, cy) = canvas.center();
        Self {
            center_x: cx + camera.pan_x,
            center_y: cy + camera.pan_y,
            zoom: camera.zoom,
            z_offset: CAMERA_DISTANCE,
            rotation: EulerRotation::new(camera.rotation_x, camera.rotation_y, camera.rotation_z),
        }
    }

    pub fn rotation(&self) -> &EulerRotation {
        &self.rotation
    }

    pub fn project(&self, point: &Point3f, near_plane: f32) -> Option<ScreenPoint> {
        let rotated = self.rotation.apply(point);
        perspective(&rotated, self.center_x, self.center_y, self.zoom, self.z_offset, near_plane)
    }

    /// Project with the near plane used for data points
    pub fn project_data(&self, point: &Point3f) -> Option<ScreenPoint> {
        self.project(point, DATA_NEAR_PLANE)
    }

    /// Project with the near plane used for grid and axis primitives
    pub fn project_grid(&self, point: &Point3f) -> Option<ScreenPoint> {
        self.project(point, GRID_NEAR_PLANE)
    }

    /// Pixels per world unit at the stand-off depth
    pub fn base_scale(&self) -> f32 {
        self.zoom * PROJECTION_CONSTANT / self.z_offset
    }

    fn reprojection_error(&self, candidate: &Point3f, screen_x: f32, screen_y: f32) -> Option<f32> {
        if !candidate.iter().all(|c| c.is_finite()) {
            return None;
        }
        let projected = self.project_grid(candidate)?;
        Some((projected.screen_x - screen_x).hypot(projected.screen_y - screen_y))
    }
}

/// Approximate world coordinate on the `z = 0` plane under a screen position.
///
/// The forward transform composes rotation, stand-off and perspective in an
/// order that has no convenient closed-form inverse, so this is a heuristic:
///
/// 1. an analytic candidate that assumes the point sits at the stand-off depth;
/// 2. correction candidates (opposite axis order, Z rotation only, the
///    analytic candidate refined with its re-projected depth, and the point
///    where the pixel's view ray meets the ground);
/// 3. every candidate is re-projected and scored by pixel error, and the best
///    one is kept if it is within [`PICK_TOLERANCE_PX`];
/// 4. otherwise a coarse grid search over a bounded square, refined around
///    the best cell until a step spans less than a pixel, accepted within
///    [`SEARCH_TOLERANCE_PX`].
///
/// Returns `None` when nothing re-projects close enough.
pub fn inverse_project(
    screen_x: f32,
    screen_y: f32,
    canvas: CanvasSize,
    camera: &CameraPose,
) -> Option<Point3f> {
    if canvas.is_empty() || !screen_x.is_finite() || !screen_y.is_finite() {
        return None;
    }

    let projection = Projection::new(camera, canvas);
    let base_scale = projection.base_scale();
    let unprojected = Point3f::new(
        (screen_x - projection.center_x) / base_scale,
        -(screen_y - projection.center_y) / base_scale,
        0.0,
    );
    let (rx, ry, rz) = (camera.rotation_x, camera.rotation_y, camera.rotation_z);

    let direct = on_ground(projection.rotation().apply_inverse(&unprojected));
    let mut candidates = vec![
        direct,
        on_ground(rotate(&unprojected, -rx, -ry, -rz)),
        on_ground(rotate(&unprojected, 0.0, 0.0, -rz)),
    ];

    let mut refined = direct;
    for _ in 0..DEPTH_REFINE_ITERATIONS {
        let Some(projected) = projection.project_grid(&refined) else {
            break;
        };
        let rotated = projection.rotation().apply(&refined);
        let corrected = Point3f::new(
            (screen_x - projection.center_x) / projected.scale,
            -(screen_y - projection.center_y) / projected.scale,
            rotated.z,
        );
        refined = on_ground(projection.rotation().apply_inverse(&corrected));
        candidates.push(refined);
    }
    candidates.extend(ray_ground_intersection(&projection, screen_x, screen_y));

    let best = candidates
        .into_iter()
        .filter_map(|c| projection.reprojection_error(&c, screen_x, screen_y).map(|e| (c, e)))
        .min_by(|a, b| a.1.total_cmp(&b.1));

    if let Some((candidate, error)) = best {
        if error <= PICK_TOLERANCE_PX {
            return Some(candidate);
        }
        log::trace!("inverse projection candidates missed by {error:.2}px, searching");
    }

    grid_search(&projection, screen_x, screen_y)
        .filter(|&(_, error)| error <= SEARCH_TOLERANCE_PX)
        .map(|(candidate, _)| candidate)
}

fn on_ground(point: Point3f) -> Point3f {
    Point3f::new(point.x, point.y, 0.0)
}

/// Where the view ray through a pixel crosses `z = 0`.
///
/// In camera space the ray is `origin + depth * direction`; both are rotated
/// back to world space, where the crossing is linear in `depth`. `None` when
/// the ray runs parallel to the ground or meets it in front of the near plane.
fn ray_ground_intersection(projection: &Projection, screen_x: f32, screen_y: f32) -> Option<Point3f> {
    let focal = projection.zoom * PROJECTION_CONSTANT;
    let direction = Point3f::new(
        (screen_x - projection.center_x) / focal,
        -(screen_y - projection.center_y) / focal,
        1.0,
    );
    let origin = Point3f::new(0.0, 0.0, -projection.z_offset);

    let origin = projection.rotation().apply_inverse(&origin);
    let direction = projection.rotation().apply_inverse(&direction);
    if direction.z.abs() <= f32::EPSILON {
        return None;
    }

    let depth = -origin.z / direction.z;
    if !depth.is_finite() || depth <= GRID_NEAR_PLANE {
        return None;
    }
    Some(on_ground(origin + direction.coords * depth))
}

fn grid_search(projection: &Projection, screen_x: f32, screen_y: f32) -> Option<(Point3f, f32)> {
    let mut best = search_square(projection, screen_x, screen_y, (0.0, 0.0), SEARCH_HALF_EXTENT, SEARCH_STEP)?;
    let mut step = SEARCH_STEP;
    for _ in 0..SEARCH_MAX_REFINEMENTS {
        if step * projection.base_scale() < 1.0 {
            break;
        }
        let half = step;
        step /= 10.0;
        if let Some(found) = search_square(projection, screen_x, screen_y, (best.0.x, best.0.y), half, step) {
            if found.1 < best.1 {
                best = found;
            }
        }
    }
    Some(best)
}

fn search_square(
    projection: &Projection,
    screen_x: f32,
    screen_y: f32,
    center: (f32, f32),
    half_extent: f32,
    step: f32,
) -> Option<(Point3f, f32)> {
    let cells = (half_extent / step).round() as i32;
    let mut best: Option<(Point3f, f32)> = None;

    for i in -cells..=cells {
        for j in -cells..=cells {
            let candidate = Point3f::new(center.0 + i as f32 * step, center.1 + j as f32 * step, 0.0);
            let Some(error) = projection.reprojection_error(&candidate, screen_x, screen_y) else {
                continue;
            };
            if best.map_or(true, |(_, e)| error < e) {
                best = Some((candidate, error));
            }
        }
    }
    best
}

/// Coarse world rectangle that contains everything a top-down camera can
/// show on `canvas`, grown by `margin` pixels.
///
/// The rectangle is centred on the origin and large enough to stay valid for
/// any rotation about Z. It is only meaningful for geometry on the `z = 0`
/// plane while the camera is not tilted.
pub fn screen_bounds(canvas: CanvasSize, pan_x: f32, pan_y: f32, zoom: f32, margin: f32) -> WorldRect {
    let scale = zoom * PROJECTION_CONSTANT / CAMERA_DISTANCE;
    let half_width = canvas.width as f32 / 2.0 + margin;
    let half_height = canvas.height as f32 / 2.0 + margin;
    let reach = (pan_x.hypot(pan_y) + half_width.hypot(half_height)) / scale;
    WorldRect::new(-reach, -reach, reach, reach)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const ANGLES: [f32; 7] = [0.0, 0.01, -0.3, 0.7, 1.5, -2.4, 3.1];

    fn assert_points_eq(a: &Point3f, b: &Point3f, epsilon: f32) {
        assert_relative_eq!(a.x, b.x, epsilon = epsilon);
        assert_relative_eq!(a.y, b.y, epsilon = epsilon);
        assert_relative_eq!(a.z, b.z, epsilon = epsilon);
    }

    #[test]
    fn test_rotate_then_inverse_reconstructs() {
        let points = [
            Point3f::new(1.0, 2.0, 3.0),
            Point3f::new(-12.5, 0.25, 4.0),
            Point3f::new(0.0, -40.0, -2.0),
        ];
        for p in &points {
            for &rx in &ANGLES {
                for &ry in &ANGLES {
                    for &rz in &ANGLES {
                        let back = rotate_inverse(&rotate(p, rx, ry, rz), rx, ry, rz);
                        assert_points_eq(&back, p, 1e-3);
                    }
                }
            }
        }
    }

    #[test]
    fn test_rotate_axis_order() {
        // Z first: +x becomes +y, then X tilts +y into +z
        let p = rotate(&Point3f::new(1.0, 0.0, 0.0), std::f32::consts::FRAC_PI_2, 0.0, std::f32::consts::FRAC_PI_2);
        assert_points_eq(&p, &Point3f::new(0.0, 0.0, 1.0), 1e-6);
    }

    #[test]
    fn test_rotate_small_increments_accumulate() {
        let p = Point3f::new(3.0, -1.0, 2.0);
        let mut stepped = p;
        for _ in 0..10 {
            stepped = rotate(&stepped, 0.0, 0.0, 0.05);
        }
        assert_points_eq(&stepped, &rotate(&p, 0.0, 0.0, 0.5), 1e-4);
    }

    #[test]
    fn test_zero_angles_are_identity() {
        let p = Point3f::new(4.0, 5.0, 6.0);
        assert_eq!(rotate(&p, 0.0, 0.0, 0.0), p);
    }

    #[test]
    fn test_depth_decreases_behind_stand_off() {
        let mut last_depth = f32::INFINITY;
        for step in 0..8 {
            let z = -(step as f32) * 5.0;
            let projected = project(&Point3f::new(1.0, 1.0, z), 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, CAMERA_DISTANCE, DATA_NEAR_PLANE)
                .expect("visible");
            assert!(projected.depth < last_depth);
            last_depth = projected.depth;
        }
    }

    #[test]
    fn test_near_plane_cutoff() {
        // depth exactly at the near plane is not visible
        let at_plane = Point3f::new(0.0, 0.0, DATA_NEAR_PLANE - CAMERA_DISTANCE);
        assert!(project(&at_plane, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, CAMERA_DISTANCE, DATA_NEAR_PLANE).is_none());

        // the grid near plane is more permissive
        assert!(project(&at_plane, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, CAMERA_DISTANCE, GRID_NEAR_PLANE).is_some());

        let behind = Point3f::new(0.0, 0.0, -CAMERA_DISTANCE - 1.0);
        assert!(project(&behind, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, CAMERA_DISTANCE, GRID_NEAR_PLANE).is_none());
    }

    #[test]
    fn test_screen_offset_scales_linearly_with_zoom() {
        let p = Point3f::new(3.0, -2.0, 1.0);
        let base = project(&p, 400.0, 300.0, 1.0, 0.2, 0.1, 0.3, CAMERA_DISTANCE, DATA_NEAR_PLANE).unwrap();
        for zoom in [0.5_f32, 2.0, 7.5] {
            let zoomed = project(&p, 400.0, 300.0, zoom, 0.2, 0.1, 0.3, CAMERA_DISTANCE, DATA_NEAR_PLANE).unwrap();
            assert_relative_eq!(zoomed.screen_x - 400.0, (base.screen_x - 400.0) * zoom, epsilon = 1e-3);
            assert_relative_eq!(zoomed.screen_y - 300.0, (base.screen_y - 300.0) * zoom, epsilon = 1e-3);
            assert_relative_eq!(zoomed.depth, base.depth);
        }
    }

    #[test]
    fn test_screen_y_is_inverted() {
        let projected = project(&Point3f::new(0.0, 10.0, 0.0), 100.0, 100.0, 1.0, 0.0, 0.0, 0.0, CAMERA_DISTANCE, DATA_NEAR_PLANE).unwrap();
        assert!(projected.screen_y < 100.0);
        assert_relative_eq!(projected.screen_x, 100.0);
    }

    #[test]
    fn test_projection_struct_matches_free_function() {
        let camera = CameraPose::top_down(1.7).with_rotation(0.4, -0.2, 1.1).with_pan(15.0, -8.0);
        let canvas = CanvasSize::new(640, 480);
        let projection = Projection::new(&camera, canvas);
        let p = Point3f::new(7.0, 12.0, 0.5);

        let a = projection.project_data(&p).unwrap();
        let b = project(&p, 320.0 + 15.0, 240.0 - 8.0, 1.7, 0.4, -0.2, 1.1, CAMERA_DISTANCE, DATA_NEAR_PLANE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_pick_at_canvas_center_is_origin() {
        let canvas = CanvasSize::new(800, 600);
        let picked = inverse_project(400.0, 300.0, canvas, &CameraPose::default()).unwrap();
        assert_relative_eq!(picked.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(picked.y, 0.0, epsilon = 1e-3);
        assert_eq!(picked.z, 0.0);
    }

    #[test]
    fn test_pick_reprojects_under_rotation() {
        let canvas = CanvasSize::new(800, 600);
        let camera = CameraPose::top_down(1.5).with_rotation(0.35, 0.0, 0.8).with_pan(-30.0, 20.0);
        let projection = Projection::new(&camera, canvas);
        let target = Point3f::new(12.0, -7.0, 0.0);
        let screen = projection.project_grid(&target).unwrap();

        let picked = inverse_project(screen.screen_x, screen.screen_y, canvas, &camera).unwrap();
        let reprojected = projection.project_grid(&picked).unwrap();
        let error = (reprojected.screen_x - screen.screen_x).hypot(reprojected.screen_y - screen.screen_y);
        assert!(error <= SEARCH_TOLERANCE_PX, "error {error}");
        assert_relative_eq!(picked.x, target.x, epsilon = 0.5);
        assert_relative_eq!(picked.y, target.y, epsilon = 0.5);
    }

    #[test]
    fn test_pick_on_untilted_camera_is_exact() {
        let canvas = CanvasSize::new(1000, 700);
        let camera = CameraPose::top_down(2.0).with_rotation(0.0, 0.0, -0.6).with_pan(40.0, 0.0);
        let projection = Projection::new(&camera, canvas);
        let target = Point3f::new(-3.0, 9.0, 0.0);
        let screen = projection.project_grid(&target).unwrap();

        let picked = inverse_project(screen.screen_x, screen.screen_y, canvas, &camera).unwrap();
        assert_relative_eq!(picked.x, target.x, epsilon = 1e-3);
        assert_relative_eq!(picked.y, target.y, epsilon = 1e-3);
    }

    #[test]
    fn test_pick_tilted_camera_at_high_zoom() {
        let canvas = CanvasSize::new(800, 600);
        for zoom in [60.0_f32, 100.0] {
            for rx in [0.8_f32, 1.2] {
                let camera = CameraPose::top_down(zoom).with_rotation(rx, 0.0, 0.3);
                let projection = Projection::new(&camera, canvas);
                let mut tested = 0;

                for i in 0..20 {
                    for j in 0..15 {
                        let (sx, sy) = (20.0 + i as f32 * 40.0, 20.0 + j as f32 * 40.0);
                        let Some(hit) = ray_ground_intersection(&projection, sx, sy) else {
                            continue;
                        };
                        if hit.x.abs() > 150.0 || hit.y.abs() > 150.0 {
                            continue;
                        }
                        tested += 1;

                        let picked = inverse_project(sx, sy, canvas, &camera)
                            .unwrap_or_else(|| panic!("zoom {zoom} rx {rx}: no pick at ({sx}, {sy})"));
                        assert_eq!(picked.z, 0.0);
                        let reprojected = projection.project_grid(&picked).unwrap();
                        let error = (reprojected.screen_x - sx).hypot(reprojected.screen_y - sy);
                        assert!(error <= SEARCH_TOLERANCE_PX, "zoom {zoom} rx {rx} ({sx}, {sy}): error {error}");
                    }
                }
                assert!(tested > 200, "zoom {zoom} rx {rx}: only {tested} pixels hit the ground");
            }
        }

        // a small target near the origin under the steepest tilt
        let camera = CameraPose::top_down(100.0).with_rotation(1.2, 0.0, 0.3);
        let projection = Projection::new(&camera, canvas);
        let target = Point3f::new(0.05, 0.05, 0.0);
        let screen = projection.project_grid(&target).unwrap();
        let picked = inverse_project(screen.screen_x, screen.screen_y, canvas, &camera).unwrap();
        assert_relative_eq!(picked.x, target.x, epsilon = 1e-3);
        assert_relative_eq!(picked.y, target.y, epsilon = 1e-3);
    }

    #[test]
    fn test_ray_parallel_to_ground_has_no_hit() {
        let canvas = CanvasSize::new(800, 600);
        let camera = CameraPose::default().with_rotation(std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        let projection = Projection::new(&camera, canvas);
        // the centre ray of an edge-on camera skims the ground
        assert!(ray_ground_intersection(&projection, 400.0, 300.0).is_none());
    }

    #[test]
    fn test_pick_miss_returns_none() {
        // Looking edge-on at the ground plane: nothing maps to a pixel far above the horizon
        let canvas = CanvasSize::new(800, 600);
        let camera = CameraPose::default().with_rotation(std::f32::consts::FRAC_PI_2, 0.0, 0.0);
        assert!(inverse_project(400.0, -5000.0, canvas, &camera).is_none());
        assert!(inverse_project(f32::NAN, 0.0, canvas, &camera).is_none());
        assert!(inverse_project(0.0, 0.0, CanvasSize::new(0, 0), &camera).is_none());
    }

    #[test]
    fn test_screen_bounds_contains_visible_ground() {
        let canvas = CanvasSize::new(800, 600);
        let camera = CameraPose::top_down(0.5).with_rotation(0.0, 0.0, 0.9).with_pan(120.0, -60.0);
        let rect = screen_bounds(canvas, camera.pan_x, camera.pan_y, camera.zoom, 0.0);

        for (sx, sy) in [(0.0, 0.0), (800.0, 0.0), (0.0, 600.0), (800.0, 600.0), (400.0, 300.0)] {
            let world = inverse_project(sx, sy, canvas, &camera).unwrap();
            assert!(rect.contains(world.x, world.y), "{world:?} outside {rect:?}");
        }
    }

    #[test]
    fn test_screen_bounds_shrinks_with_zoom() {
        let canvas = CanvasSize::new(800, 600);
        let wide = screen_bounds(canvas, 0.0, 0.0, 1.0, 100.0);
        let narrow = screen_bounds(canvas, 0.0, 0.0, 4.0, 100.0);
        assert_relative_eq!(narrow.max_x * 4.0, wide.max_x, epsilon = 1e-3);
    }
}
