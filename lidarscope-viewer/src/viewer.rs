//! The interactive viewer
//!
//! [`Viewer`] ties camera state, input handling, frame pacing and the
//! renderers together. A host feeds it pointer/key events and calls
//! [`Viewer::render`] whenever a new frame of points arrives or the view
//! changed.

use std::time::Duration;

use instant::Instant;
use lidarscope_core::{CameraPose, CameraSnapshot, CameraState, CanvasSize, Point3D, Point3f, Result};
use lidarscope_render::{
    DrawSurface, GridRenderStats, GridRenderer, OverlayRenderer, PickMarker, PointRenderStats, PointRenderer,
    RasterSurface,
};

use crate::config::{RenderSettings, ViewerConfig};
use crate::governor::{PerformanceGovernor, PerformanceReport};
use crate::input::{InputHandler, InputSink, InteractionMode, Key, PointerEvent};

/// Receives ground positions picked with a plain primary click
pub trait PickListener {
    fn coordinate_picked(&mut self, position: Point3f);
}

impl<F: FnMut(Point3f)> PickListener for F {
    fn coordinate_picked(&mut self, position: Point3f) {
        self(position)
    }
}

/// What happened while drawing one frame
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    pub points: PointRenderStats,
    /// Grid counters; only present when the grid cache was rebuilt this frame
    pub grid: Option<GridRenderStats>,
    pub grid_rebuilt: bool,
    /// Points were thinned out because the camera is being dragged
    pub reduced_quality: bool,
    pub pick_visible: bool,
    pub render_time: Duration,
}

/// Everything the input handler may act on
struct ViewState {
    config: ViewerConfig,
    camera: CameraState,
    governor: PerformanceGovernor,
    point_renderer: PointRenderer,
    grid_renderer: GridRenderer,
    overlay: OverlayRenderer,
    canvas: CanvasSize,
    interacting: bool,
    pick: Option<PickMarker>,
    listener: Option<Box<dyn PickListener>>,
    annotation_return: Option<CameraSnapshot>,
    last_points: PointRenderStats,
    active: bool,
}

impl ViewState {
    fn draw_grid<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        pose: &CameraPose,
        settings: &RenderSettings,
        stats: &mut FrameStats,
    ) {
        let canvas = surface.canvas_size();
        if canvas.is_empty() {
            return;
        }
        let params = settings.grid_params(self.config.grid_extent);
        if self.governor.should_invalidate(pose, canvas, &params) {
            let mut layer = RasterSurface::with_size(canvas);
            stats.grid = Some(self.grid_renderer.render(&mut layer, pose, &params));
            stats.grid_rebuilt = true;
            self.governor.store_grid(layer, *pose, params);
        }
        if let Some(image) = self.governor.grid_image() {
            surface.draw_image(image);
        }
    }
}

impl InputSink for ViewState {
    fn camera(&self) -> CameraPose {
        *self.camera.pose()
    }

    fn canvas_size(&self) -> CanvasSize {
        self.canvas
    }

    fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
        self.camera.apply_rotation_delta(dx, dy, dz);
    }

    fn pan(&mut self, dx: f32, dy: f32) {
        self.camera.apply_pan_delta(dx, dy);
    }

    fn zoom(&mut self, factor: f32) {
        self.camera.apply_zoom_factor(factor);
    }

    fn reset_view(&mut self) {
        self.camera.reset();
        self.annotation_return = None;
    }

    fn toggle_top_view(&mut self) {
        if self.camera.is_top_view_locked() {
            self.camera.exit_top_view();
        } else {
            self.camera.set_top_view();
        }
    }

    fn interaction_changed(&mut self, active: bool) {
        self.interacting = active;
    }

    fn coordinate_picked(&mut self, position: Point3f) {
        log::debug!("picked ({:.2}, {:.2})", position.x, position.y);
        self.pick = Some(PickMarker::new(position));
        if let Some(listener) = self.listener.as_mut() {
            listener.coordinate_picked(position);
        }
    }
}

/// Interactive point cloud viewer drawing onto any [`DrawSurface`].
///
/// After [`Viewer::shutdown`] every call is a silent no-op.
pub struct Viewer {
    input: InputHandler,
    state: ViewState,
}

impl Viewer {
    pub fn new(config: ViewerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: ViewerConfig) -> Self {
        let camera = CameraState::new(config.initial_pose()).with_top_view_zoom(config.top_view_zoom);
        Self {
            input: InputHandler::new(config.snap_to_grid),
            state: ViewState {
                camera,
                governor: PerformanceGovernor::new(config.target_fps),
                point_renderer: PointRenderer::with_lod_color(config.lod_color),
                grid_renderer: GridRenderer::new(config.grid_style),
                overlay: OverlayRenderer::new(config.overlay_style),
                canvas: config.canvas_size.unwrap_or_default(),
                interacting: false,
                pick: None,
                listener: None,
                annotation_return: None,
                last_points: PointRenderStats::default(),
                active: true,
                config,
            },
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.state.config
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Render a frame now, subject to the frame gate
    pub fn render<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        points: &[Point3D],
        settings: &RenderSettings,
    ) -> Option<FrameStats> {
        self.render_at(surface, points, settings, Instant::now())
    }

    /// Render a frame as if the current time were `now`.
    ///
    /// Returns `None` when the viewer is shut down or the frame gate rejects
    /// the frame; the surface is left untouched in that case.
    pub fn render_at<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        points: &[Point3D],
        settings: &RenderSettings,
        now: Instant,
    ) -> Option<FrameStats> {
        let state = &mut self.state;
        if !state.active || !state.governor.can_render(now) {
            return None;
        }
        let started = Instant::now();
        state.canvas = surface.canvas_size();
        let pose = *state.camera.pose();
        let mut stats = FrameStats::default();

        surface.clear(state.config.background);
        if settings.show_grid {
            state.draw_grid(surface, &pose, settings, &mut stats);
        }

        stats.reduced_quality = state.config.lod_enabled && state.interacting;
        stats.points = state.point_renderer.render(
            surface,
            points,
            &pose,
            settings.color_mode,
            settings.point_size,
            stats.reduced_quality,
        );

        if settings.show_axes {
            state.overlay.draw_world_axes(surface, &pose);
            state.overlay.draw_orientation_gizmo(surface, &pose);
        }
        if let Some(marker) = &state.pick {
            stats.pick_visible = state.overlay.draw_pick_marker(surface, &pose, marker);
        }

        stats.render_time = started.elapsed();
        state.governor.record_render_time(stats.render_time);
        state.last_points = stats.points;
        Some(stats)
    }

    pub fn reset_camera(&mut self) {
        if self.state.active {
            self.state.reset_view();
        }
    }

    pub fn camera_state(&self) -> CameraSnapshot {
        self.state.camera.snapshot()
    }

    pub fn camera(&self) -> &CameraPose {
        self.state.camera.pose()
    }

    pub fn set_camera_state(&mut self, snapshot: CameraSnapshot) {
        if self.state.active {
            self.state.camera.restore(snapshot);
        }
    }

    pub fn set_top_view(&mut self) {
        if self.state.active {
            self.state.camera.set_top_view();
        }
    }

    pub fn exit_top_view(&mut self) {
        if self.state.active {
            self.state.camera.exit_top_view();
        }
    }

    /// Remember the current view and switch to the locked top view
    pub fn enter_annotation_mode(&mut self) {
        let state = &mut self.state;
        if !state.active {
            return;
        }
        if state.annotation_return.is_none() {
            state.annotation_return = Some(state.camera.snapshot());
        }
        state.camera.set_top_view();
    }

    /// Leave the top view and return to the view remembered on entry
    pub fn exit_annotation_mode(&mut self) {
        let state = &mut self.state;
        if !state.active {
            return;
        }
        if let Some(snapshot) = state.annotation_return.take() {
            state.camera.exit_top_view();
            state.camera.restore(snapshot);
        }
    }

    pub fn is_annotating(&self) -> bool {
        self.state.annotation_return.is_some()
    }

    pub fn set_pick_listener(&mut self, listener: impl PickListener + 'static) {
        if self.state.active {
            self.state.listener = Some(Box::new(listener));
        }
    }

    /// Position of the pick marker, if one is shown
    pub fn pick(&self) -> Option<Point3f> {
        self.state.pick.map(|marker| marker.position)
    }

    pub fn clear_pick(&mut self) {
        self.state.pick = None;
    }

    pub fn interaction_mode(&self) -> InteractionMode {
        self.input.mode()
    }

    pub fn is_interacting(&self) -> bool {
        self.state.interacting
    }

    pub fn governor(&self) -> &PerformanceGovernor {
        &self.state.governor
    }

    pub fn performance_report(&self, settings: &RenderSettings) -> PerformanceReport {
        self.state
            .governor
            .report(&self.state.last_points, settings, self.state.config.grid_extent)
    }

    /// Stop rendering and drop the pick listener, grid cache and marker
    pub fn shutdown(&mut self) {
        let state = &mut self.state;
        if !state.active {
            return;
        }
        state.active = false;
        state.listener = None;
        state.pick = None;
        state.interacting = false;
        state.governor.invalidate_grid();
        log::debug!("viewer shut down");
    }

    /// Display size of the canvas in client pixels, and its size in canvas pixels
    pub fn set_display_metrics(&mut self, css_width: f32, css_height: f32, canvas: CanvasSize) {
        if !self.state.active {
            return;
        }
        self.input.set_display_metrics(css_width, css_height);
        if !canvas.is_empty() {
            self.state.canvas = canvas;
        }
    }

    pub fn pointer_down(&mut self, event: PointerEvent) {
        if self.state.active {
            self.input.pointer_down(event, &mut self.state);
        }
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.state.active {
            self.input.pointer_move(x, y, &mut self.state);
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent) {
        if self.state.active {
            self.input.pointer_up(event, &mut self.state);
        }
    }

    pub fn pointer_cancel(&mut self) {
        if self.state.active {
            self.input.pointer_cancel(&mut self.state);
        }
    }

    pub fn wheel(&mut self, notches: f32) {
        if self.state.active {
            self.input.wheel(notches, &mut self.state);
        }
    }

    /// Returns whether the key was used
    pub fn key_down(&mut self, key: Key) -> bool {
        self.state.active && self.input.key_down(key, &mut self.state)
    }

    pub fn key_up(&mut self, key: Key) -> bool {
        self.state.active && self.input.key_up(key)
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::build(ViewerConfig::default())
    }
}
