//! Camera state for the software projection

use serde::{Deserialize, Serialize};

/// Smallest zoom the camera accepts
pub const MIN_ZOOM: f32 = 0.05;

/// Largest zoom the camera accepts
pub const MAX_ZOOM: f32 = 100.0;

/// Clamp a zoom value into `[MIN_ZOOM, MAX_ZOOM]`
pub fn clamp_zoom(zoom: f32) -> f32 {
    if zoom.is_nan() {
        return 1.0;
    }
    zoom.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// Orientation, zoom and pan of the view.
///
/// Rotations are radians about the world axes and are applied Z, then Y,
/// then X. Pan is in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub rotation_x: f32,
    pub rotation_y: f32,
    pub rotation_z: f32,
    pub zoom: f32,
    pub pan_x: f32,
    pub pan_y: f32,
}

impl CameraPose {
    /// Looking straight down at the sensor origin, unpanned
    pub fn top_down(zoom: f32) -> Self {
        Self {
            rotation_x: 0.0,
            rotation_y: 0.0,
            rotation_z: 0.0,
            zoom: clamp_zoom(zoom),
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }

    pub fn with_rotation(mut self, rotation_x: f32, rotation_y: f32, rotation_z: f32) -> Self {
        self.rotation_x = rotation_x;
        self.rotation_y = rotation_y;
        self.rotation_z = rotation_z;
        self
    }

    pub fn with_pan(mut self, pan_x: f32, pan_y: f32) -> Self {
        self.pan_x = pan_x;
        self.pan_y = pan_y;
        self
    }

    /// Whether the view axis is tilted away from straight down
    pub fn is_tilted(&self) -> bool {
        self.rotation_x != 0.0 || self.rotation_y != 0.0
    }

    fn sanitized(mut self) -> Self {
        self.zoom = clamp_zoom(self.zoom);
        self
    }
}

impl Default for CameraPose {
    fn default() -> Self {
        Self::top_down(1.0)
    }
}

/// A copy of the camera that can be restored later
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraSnapshot {
    pub pose: CameraPose,
    pub top_view_locked: bool,
}

/// Mutable camera owned by the viewer.
///
/// The zoom is kept inside `[MIN_ZOOM, MAX_ZOOM]` by every mutator.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraState {
    pose: CameraPose,
    initial: CameraPose,
    top_view_zoom: f32,
    top_view_locked: bool,
}

impl CameraState {
    /// Create a camera that starts (and resets to) `initial`
    pub fn new(initial: CameraPose) -> Self {
        let initial = initial.sanitized();
        Self {
            pose: initial,
            initial,
            top_view_zoom: 1.0,
            top_view_locked: false,
        }
    }

    /// Zoom used by [`CameraState::set_top_view`]
    pub fn with_top_view_zoom(mut self, zoom: f32) -> Self {
        self.top_view_zoom = clamp_zoom(zoom);
        self
    }

    pub fn pose(&self) -> &CameraPose {
        &self.pose
    }

    pub fn initial_pose(&self) -> &CameraPose {
        &self.initial
    }

    pub fn zoom(&self) -> f32 {
        self.pose.zoom
    }

    pub fn is_top_view_locked(&self) -> bool {
        self.top_view_locked
    }

    /// Rotate by the given deltas. Ignored while the top view is locked.
    ///
    /// Returns whether the camera changed.
    pub fn apply_rotation_delta(&mut self, dx: f32, dy: f32, dz: f32) -> bool {
        if self.top_view_locked || !(dx.is_finite() && dy.is_finite() && dz.is_finite()) {
            return false;
        }
        self.pose.rotation_x += dx;
        self.pose.rotation_y += dy;
        self.pose.rotation_z += dz;
        dx != 0.0 || dy != 0.0 || dz != 0.0
    }

    /// Pan by a screen-space offset
    pub fn apply_pan_delta(&mut self, dx: f32, dy: f32) -> bool {
        if !(dx.is_finite() && dy.is_finite()) {
            return false;
        }
        self.pose.pan_x += dx;
        self.pose.pan_y += dy;
        dx != 0.0 || dy != 0.0
    }

    /// Multiply the zoom by `factor`, then clamp.
    ///
    /// Non-finite or non-positive factors are ignored.
    pub fn apply_zoom_factor(&mut self, factor: f32) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let previous = self.pose.zoom;
        self.pose.zoom = clamp_zoom(previous * factor);
        self.pose.zoom != previous
    }

    pub fn set_zoom(&mut self, zoom: f32) {
        self.pose.zoom = clamp_zoom(zoom);
    }

    /// Restore the construction-time pose and unlock the top view
    pub fn reset(&mut self) {
        self.pose = self.initial;
        self.top_view_locked = false;
    }

    pub fn snapshot(&self) -> CameraSnapshot {
        CameraSnapshot {
            pose: self.pose,
            top_view_locked: self.top_view_locked,
        }
    }

    pub fn restore(&mut self, snapshot: CameraSnapshot) {
        self.pose = snapshot.pose.sanitized();
        self.top_view_locked = snapshot.top_view_locked;
    }

    /// Zero the rotation, force the canonical top-down pan and zoom, and lock
    /// rotation until [`CameraState::exit_top_view`].
    pub fn set_top_view(&mut self) {
        self.pose = CameraPose::top_down(self.top_view_zoom);
        self.top_view_locked = true;
    }

    /// Unlock rotation. The pose is left as is; pair with
    /// [`CameraState::restore`] to return to an earlier view.
    pub fn exit_top_view(&mut self) {
        self.top_view_locked = false;
    }
}

impl Default for CameraState {
    fn default() -> Self {
        Self::new(CameraPose::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zoom_clamps_exactly_at_bounds() {
        let mut camera = CameraState::default();
        camera.apply_zoom_factor(0.001);
        assert_eq!(camera.zoom(), MIN_ZOOM);

        camera.apply_zoom_factor(1.0e6);
        assert_eq!(camera.zoom(), MAX_ZOOM);

        camera.apply_zoom_factor(10.0);
        assert_eq!(camera.zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_invalid_zoom_factor_ignored() {
        let mut camera = CameraState::default();
        assert!(!camera.apply_zoom_factor(0.0));
        assert!(!camera.apply_zoom_factor(-2.0));
        assert!(!camera.apply_zoom_factor(f32::NAN));
        assert_eq!(camera.zoom(), 1.0);
    }

    #[test]
    fn test_construction_clamps_zoom() {
        let camera = CameraState::new(CameraPose::top_down(500.0));
        assert_eq!(camera.zoom(), MAX_ZOOM);
    }

    #[test]
    fn test_rotation_ignored_while_locked() {
        let mut camera = CameraState::default();
        camera.set_top_view();
        assert!(!camera.apply_rotation_delta(0.3, 0.2, 0.1));
        assert_eq!(camera.pose().rotation_x, 0.0);

        // pan and zoom still work in the locked view
        assert!(camera.apply_pan_delta(5.0, -5.0));
        assert!(camera.apply_zoom_factor(2.0));

        camera.exit_top_view();
        assert!(camera.apply_rotation_delta(0.3, 0.0, 0.0));
        assert_eq!(camera.pose().rotation_x, 0.3);
    }

    #[test]
    fn test_top_view_forces_canonical_pose() {
        let mut camera = CameraState::new(CameraPose::default().with_rotation(0.5, 0.1, 0.2))
            .with_top_view_zoom(2.0);
        camera.apply_pan_delta(40.0, 12.0);
        camera.set_top_view();
        assert_eq!(*camera.pose(), CameraPose::top_down(2.0));
        assert!(camera.is_top_view_locked());
    }

    #[test]
    fn test_snapshot_restore_roundtrip() {
        let mut camera = CameraState::default();
        camera.apply_rotation_delta(0.4, -0.2, 1.0);
        camera.apply_pan_delta(10.0, 20.0);
        let saved = camera.snapshot();

        camera.set_top_view();
        camera.exit_top_view();
        assert_ne!(camera.snapshot(), saved);

        camera.restore(saved);
        assert_eq!(camera.snapshot(), saved);
    }

    #[test]
    fn test_reset_restores_initial_pose() {
        let initial = CameraPose::top_down(3.0).with_rotation(0.7, 0.0, 0.0);
        let mut camera = CameraState::new(initial);
        camera.apply_rotation_delta(0.1, 0.1, 0.1);
        camera.apply_zoom_factor(4.0);
        camera.set_top_view();

        camera.reset();
        assert_eq!(*camera.pose(), initial);
        assert!(!camera.is_top_view_locked());
    }
}
