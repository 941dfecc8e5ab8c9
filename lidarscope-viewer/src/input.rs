//! Pointer and keyboard handling
//!
//! [`InputHandler`] turns raw pointer and key events into camera deltas and
//! coordinate picks. It owns no camera itself: everything it decides is
//! forwarded to an [`InputSink`].

use lidarscope_core::{inverse_project, CameraPose, CanvasSize, Point3f};

/// Radians of rotation per pixel of drag
pub const ROTATION_SENSITIVITY: f32 = 0.01;
/// Pan pixels per pixel of drag
pub const PAN_SENSITIVITY: f32 = 1.0;
/// A press that moves at most this far before release is a click, canvas pixels
pub const CLICK_SLOP_PX: f32 = 3.0;
/// Picks this close to an integer grid point snap onto it, metres
pub const SNAP_DISTANCE: f32 = 0.3;
/// Zoom factor per wheel notch
pub const WHEEL_ZOOM_STEP: f32 = 1.1;
/// Rotation per arrow key press, radians
pub const KEY_ROTATION_STEP: f32 = 0.05;

/// What a drag currently does to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Idle,
    Rotating,
    Panning,
    ZRotating,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Primary,
    Middle,
    Secondary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub control: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        control: false,
    };
    pub const SHIFT: Modifiers = Modifiers {
        shift: true,
        control: false,
    };
    pub const CONTROL: Modifiers = Modifiers {
        shift: false,
        control: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.shift && !self.control
    }

    fn union(self, other: Modifiers) -> Modifiers {
        Modifiers {
            shift: self.shift || other.shift,
            control: self.control || other.control,
        }
    }
}

/// A pointer press or release in client (CSS) pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub button: PointerButton,
    pub modifiers: Modifiers,
}

impl PointerEvent {
    pub fn new(x: f32, y: f32, button: PointerButton) -> Self {
        Self {
            x,
            y,
            button,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn primary(x: f32, y: f32) -> Self {
        Self::new(x, y, PointerButton::Primary)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Shift,
    Control,
    Character(char),
}

/// Receiver of everything the input handler decides.
///
/// The viewer implements this; tests substitute a recorder.
pub trait InputSink {
    /// Camera the next pick is resolved against
    fn camera(&self) -> CameraPose;

    /// Canvas size in pixels of the last rendered frame
    fn canvas_size(&self) -> CanvasSize;

    fn rotate(&mut self, dx: f32, dy: f32, dz: f32);

    fn pan(&mut self, dx: f32, dy: f32);

    fn zoom(&mut self, factor: f32);

    fn reset_view(&mut self);

    fn toggle_top_view(&mut self);

    /// Raised on the first delta of a drag and cleared on release
    fn interaction_changed(&mut self, active: bool);

    fn coordinate_picked(&mut self, position: Point3f);
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Press {
    x: f32,
    y: f32,
    button: PointerButton,
    modifiers: Modifiers,
}

/// Pointer and keyboard state machine
#[derive(Debug, Clone, Default)]
pub struct InputHandler {
    mode: InteractionMode,
    press: Option<Press>,
    last: (f32, f32),
    dragging: bool,
    active: bool,
    held: Modifiers,
    css_size: Option<(f32, f32)>,
    snap_to_grid: bool,
}

impl InputHandler {
    pub fn new(snap_to_grid: bool) -> Self {
        Self {
            snap_to_grid,
            ..Default::default()
        }
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn is_interacting(&self) -> bool {
        self.active
    }

    pub fn set_snap_to_grid(&mut self, snap: bool) {
        self.snap_to_grid = snap;
    }

    /// Size the canvas is displayed at, in client pixels.
    ///
    /// Client coordinates are scaled by `canvas_px / css_px` on each axis.
    pub fn set_display_metrics(&mut self, css_width: f32, css_height: f32) {
        self.css_size = (css_width.is_finite() && css_height.is_finite() && css_width > 0.0 && css_height > 0.0)
            .then_some((css_width, css_height));
    }

    pub fn pointer_down(&mut self, event: PointerEvent, sink: &mut dyn InputSink) {
        let modifiers = event.modifiers.union(self.held);
        self.mode = match (event.button, modifiers) {
            (PointerButton::Primary, Modifiers { control: true, .. }) => InteractionMode::ZRotating,
            (PointerButton::Primary, Modifiers { shift: true, .. }) => InteractionMode::Panning,
            (PointerButton::Primary, _) => InteractionMode::Rotating,
            (PointerButton::Middle | PointerButton::Secondary, _) => InteractionMode::Panning,
        };

        let (x, y) = self.to_canvas(event.x, event.y, sink.canvas_size());
        self.press = Some(Press {
            x,
            y,
            button: event.button,
            modifiers,
        });
        self.last = (x, y);
        self.dragging = false;
        log::trace!("pointer down: {:?}", self.mode);
    }

    pub fn pointer_move(&mut self, x: f32, y: f32, sink: &mut dyn InputSink) {
        let Some(press) = self.press else {
            return;
        };
        let (x, y) = self.to_canvas(x, y, sink.canvas_size());
        if !self.dragging {
            if (x - press.x).hypot(y - press.y) <= CLICK_SLOP_PX {
                return;
            }
            self.dragging = true;
        }

        let dx = x - self.last.0;
        let dy = y - self.last.1;
        self.last = (x, y);
        if dx == 0.0 && dy == 0.0 {
            return;
        }

        if !self.active {
            self.active = true;
            sink.interaction_changed(true);
        }

        match self.mode {
            InteractionMode::Rotating => {
                sink.rotate(dy * ROTATION_SENSITIVITY, dx * ROTATION_SENSITIVITY, 0.0)
            }
            InteractionMode::ZRotating => sink.rotate(0.0, 0.0, dx * ROTATION_SENSITIVITY),
            InteractionMode::Panning => sink.pan(dx * PAN_SENSITIVITY, dy * PAN_SENSITIVITY),
            InteractionMode::Idle => {}
        }
    }

    pub fn pointer_up(&mut self, event: PointerEvent, sink: &mut dyn InputSink) {
        let press = self.press.take();
        let was_drag = self.dragging;
        self.finish(sink);

        let Some(press) = press else {
            return;
        };
        if was_drag || press.button != PointerButton::Primary || !press.modifiers.is_empty() {
            return;
        }

        let canvas = sink.canvas_size();
        if canvas.is_empty() {
            log::debug!("pick ignored: canvas size not known yet");
            return;
        }
        let (x, y) = self.to_canvas(event.x, event.y, canvas);
        match inverse_project(x, y, canvas, &sink.camera()) {
            Some(position) => sink.coordinate_picked(self.snap(position)),
            None => log::debug!("no ground position under ({x:.1}, {y:.1})"),
        }
    }

    /// Abandon any press without treating it as a click
    pub fn pointer_cancel(&mut self, sink: &mut dyn InputSink) {
        self.press = None;
        self.finish(sink);
    }

    /// Wheel zoom; positive `notches` zoom out
    pub fn wheel(&mut self, notches: f32, sink: &mut dyn InputSink) {
        if notches.is_finite() && notches != 0.0 {
            sink.zoom(WHEEL_ZOOM_STEP.powf(-notches));
        }
    }

    /// Returns whether the key was used
    pub fn key_down(&mut self, key: Key, sink: &mut dyn InputSink) -> bool {
        match key {
            Key::Shift => self.held.shift = true,
            Key::Control => self.held.control = true,
            Key::ArrowLeft => sink.rotate(0.0, 0.0, -KEY_ROTATION_STEP),
            Key::ArrowRight => sink.rotate(0.0, 0.0, KEY_ROTATION_STEP),
            Key::ArrowUp => sink.rotate(-KEY_ROTATION_STEP, 0.0, 0.0),
            Key::ArrowDown => sink.rotate(KEY_ROTATION_STEP, 0.0, 0.0),
            Key::Character('+' | '=') => sink.zoom(WHEEL_ZOOM_STEP),
            Key::Character('-' | '_') => sink.zoom(1.0 / WHEEL_ZOOM_STEP),
            Key::Character('r' | 'R') => sink.reset_view(),
            Key::Character('t' | 'T') => sink.toggle_top_view(),
            Key::Character(_) => return false,
        }
        true
    }

    pub fn key_up(&mut self, key: Key) -> bool {
        match key {
            Key::Shift => self.held.shift = false,
            Key::Control => self.held.control = false,
            _ => return false,
        }
        true
    }

    fn finish(&mut self, sink: &mut dyn InputSink) {
        self.mode = InteractionMode::Idle;
        self.dragging = false;
        if self.active {
            self.active = false;
            sink.interaction_changed(false);
        }
    }

    fn to_canvas(&self, x: f32, y: f32, canvas: CanvasSize) -> (f32, f32) {
        match self.css_size {
            Some((css_width, css_height)) if !canvas.is_empty() => (
                x * canvas.width as f32 / css_width,
                y * canvas.height as f32 / css_height,
            ),
            _ => (x, y),
        }
    }

    fn snap(&self, position: Point3f) -> Point3f {
        if !self.snap_to_grid {
            return position;
        }
        let snapped = Point3f::new(position.x.round(), position.y.round(), 0.0);
        if (position.x - snapped.x).hypot(position.y - snapped.y) <= SNAP_DISTANCE {
            snapped
        } else {
            position
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Rotate(f32, f32, f32),
        Pan(f32, f32),
        Zoom(f32),
        Reset,
        ToggleTopView,
        Interaction(bool),
        Picked(Point3f),
    }

    struct Recorder {
        camera: CameraPose,
        canvas: CanvasSize,
        calls: Vec<Call>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                camera: CameraPose::default(),
                canvas: CanvasSize::new(800, 600),
                calls: Vec::new(),
            }
        }
    }

    impl InputSink for Recorder {
        fn camera(&self) -> CameraPose {
            self.camera
        }
        fn canvas_size(&self) -> CanvasSize {
            self.canvas
        }
        fn rotate(&mut self, dx: f32, dy: f32, dz: f32) {
            self.calls.push(Call::Rotate(dx, dy, dz));
        }
        fn pan(&mut self, dx: f32, dy: f32) {
            self.calls.push(Call::Pan(dx, dy));
        }
        fn zoom(&mut self, factor: f32) {
            self.calls.push(Call::Zoom(factor));
        }
        fn reset_view(&mut self) {
            self.calls.push(Call::Reset);
        }
        fn toggle_top_view(&mut self) {
            self.calls.push(Call::ToggleTopView);
        }
        fn interaction_changed(&mut self, active: bool) {
            self.calls.push(Call::Interaction(active));
        }
        fn coordinate_picked(&mut self, position: Point3f) {
            self.calls.push(Call::Picked(position));
        }
    }

    #[test]
    fn test_mode_selection() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        let cases = [
            (PointerEvent::primary(0.0, 0.0), InteractionMode::Rotating),
            (PointerEvent::primary(0.0, 0.0).with_modifiers(Modifiers::SHIFT), InteractionMode::Panning),
            (PointerEvent::primary(0.0, 0.0).with_modifiers(Modifiers::CONTROL), InteractionMode::ZRotating),
            (PointerEvent::new(0.0, 0.0, PointerButton::Middle), InteractionMode::Panning),
            (PointerEvent::new(0.0, 0.0, PointerButton::Secondary), InteractionMode::Panning),
        ];
        for (event, expected) in cases {
            input.pointer_down(event, &mut sink);
            assert_eq!(input.mode(), expected);
            input.pointer_up(event, &mut sink);
            assert_eq!(input.mode(), InteractionMode::Idle);
        }
    }

    #[test]
    fn test_drag_rotates_and_flags_interaction() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        input.pointer_down(PointerEvent::primary(100.0, 100.0), &mut sink);
        input.pointer_move(102.0, 100.0, &mut sink);
        assert!(sink.calls.is_empty());

        input.pointer_move(110.0, 105.0, &mut sink);
        input.pointer_move(120.0, 105.0, &mut sink);
        assert!(input.is_interacting());
        assert_eq!(sink.calls[0], Call::Interaction(true));
        let Call::Rotate(rx, ry, rz) = sink.calls[1] else {
            panic!("expected rotation, got {:?}", sink.calls[1]);
        };
        assert_relative_eq!(rx, 0.05);
        assert_relative_eq!(ry, 0.1);
        assert_eq!(rz, 0.0);

        input.pointer_up(PointerEvent::primary(120.0, 105.0), &mut sink);
        assert_eq!(sink.calls.last(), Some(&Call::Interaction(false)));
        assert!(!sink.calls.iter().any(|c| matches!(c, Call::Picked(_))));
    }

    #[test]
    fn test_key_modifiers_turn_drag_into_pan() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        assert!(input.key_down(Key::Shift, &mut sink));
        input.pointer_down(PointerEvent::primary(0.0, 0.0), &mut sink);
        assert_eq!(input.mode(), InteractionMode::Panning);
        input.pointer_move(10.0, -4.0, &mut sink);
        assert_eq!(sink.calls[1], Call::Pan(10.0, -4.0));
        input.pointer_up(PointerEvent::primary(10.0, -4.0), &mut sink);

        assert!(input.key_up(Key::Shift));
        input.pointer_down(PointerEvent::primary(0.0, 0.0), &mut sink);
        assert_eq!(input.mode(), InteractionMode::Rotating);
    }

    #[test]
    fn test_click_picks_canvas_center() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        input.pointer_down(PointerEvent::primary(400.0, 300.0), &mut sink);
        input.pointer_move(401.0, 301.0, &mut sink);
        input.pointer_up(PointerEvent::primary(400.0, 300.0), &mut sink);

        let [Call::Picked(position)] = sink.calls.as_slice() else {
            panic!("expected a single pick, got {:?}", sink.calls);
        };
        assert_relative_eq!(position.x, 0.0, epsilon = 1e-3);
        assert_relative_eq!(position.y, 0.0, epsilon = 1e-3);
    }

    #[test]
    fn test_modified_click_does_not_pick() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        let event = PointerEvent::primary(400.0, 300.0).with_modifiers(Modifiers::SHIFT);
        input.pointer_down(event, &mut sink);
        input.pointer_up(event, &mut sink);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_display_scaling_and_snap() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::new(true);
        input.set_display_metrics(400.0, 300.0);

        // 1.2 m right of the origin is 9.6 canvas pixels, 4.8 client pixels
        let event = PointerEvent::primary(204.8, 150.0);
        input.pointer_down(event, &mut sink);
        input.pointer_up(event, &mut sink);

        let [Call::Picked(position)] = sink.calls.as_slice() else {
            panic!("expected a single pick, got {:?}", sink.calls);
        };
        assert_eq!(*position, Point3f::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_snap_respects_distance() {
        let input = InputHandler::new(true);
        assert_eq!(input.snap(Point3f::new(2.25, -0.9, 0.0)), Point3f::new(2.0, -1.0, 0.0));
        let far = Point3f::new(2.5, 0.5, 0.0);
        assert_eq!(input.snap(far), far);
        assert_eq!(InputHandler::new(false).snap(Point3f::new(2.1, 0.0, 0.0)), Point3f::new(2.1, 0.0, 0.0));
    }

    #[test]
    fn test_wheel_and_keys() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        input.wheel(1.0, &mut sink);
        input.wheel(-2.0, &mut sink);
        input.wheel(f32::NAN, &mut sink);
        assert_eq!(sink.calls.len(), 2);
        let Call::Zoom(out) = sink.calls[0] else { panic!() };
        let Call::Zoom(zoom_in) = sink.calls[1] else { panic!() };
        assert_relative_eq!(out, 1.0 / 1.1, epsilon = 1e-5);
        assert_relative_eq!(zoom_in, 1.21, epsilon = 1e-5);

        sink.calls.clear();
        assert!(input.key_down(Key::ArrowRight, &mut sink));
        assert!(input.key_down(Key::Character('r'), &mut sink));
        assert!(input.key_down(Key::Character('t'), &mut sink));
        assert!(!input.key_down(Key::Character('q'), &mut sink));
        assert_eq!(
            sink.calls,
            vec![Call::Rotate(0.0, 0.0, KEY_ROTATION_STEP), Call::Reset, Call::ToggleTopView]
        );
    }

    #[test]
    fn test_cancel_clears_interaction() {
        let mut sink = Recorder::new();
        let mut input = InputHandler::default();
        input.pointer_down(PointerEvent::new(0.0, 0.0, PointerButton::Middle), &mut sink);
        input.pointer_move(20.0, 0.0, &mut sink);
        input.pointer_cancel(&mut sink);
        assert_eq!(input.mode(), InteractionMode::Idle);
        assert!(!input.is_interacting());
        assert_eq!(sink.calls.last(), Some(&Call::Interaction(false)));
    }
}
