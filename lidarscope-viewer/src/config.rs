//! Viewer configuration

use lidarscope_core::{clamp_zoom, CameraPose, CanvasSize, Error, Result};
use lidarscope_render::{Color, ColorMode, GridParams, GridStyle, OverlayStyle};
use serde::{Deserialize, Serialize};

use crate::governor::DEFAULT_TARGET_FPS;

/// Settings fixed for the lifetime of a viewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Upper bound on rendered frames per second
    pub target_fps: f32,
    /// Camera used at start-up and restored by reset
    pub initial_camera: CameraPose,
    /// Zoom used by the top view
    pub top_view_zoom: f32,
    /// Snap picks onto the nearest whole-metre grid point
    pub snap_to_grid: bool,
    /// Half-width of the ground grid, metres
    pub grid_extent: f32,
    /// Thin out points while the camera is being dragged
    pub lod_enabled: bool,
    pub background: Color,
    pub lod_color: Color,
    pub grid_style: GridStyle,
    pub overlay_style: OverlayStyle,
    /// Canvas assumed for picks that arrive before the first frame or
    /// display metrics. Without it such picks are ignored.
    pub canvas_size: Option<CanvasSize>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            initial_camera: CameraPose::default(),
            top_view_zoom: 1.0,
            snap_to_grid: true,
            grid_extent: 50.0,
            lod_enabled: true,
            background: Color::rgb(12, 12, 16),
            lod_color: Color::rgb(170, 200, 230),
            grid_style: GridStyle::default(),
            overlay_style: OverlayStyle::default(),
            canvas_size: None,
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a JSON configuration; missing fields take defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        positive("target_fps", self.target_fps)?;
        positive("top_view_zoom", self.top_view_zoom)?;
        positive("grid_extent", self.grid_extent)?;
        positive("initial_camera.zoom", self.initial_camera.zoom)?;
        let camera = &self.initial_camera;
        for (name, value) in [
            ("initial_camera.rotation_x", camera.rotation_x),
            ("initial_camera.rotation_y", camera.rotation_y),
            ("initial_camera.rotation_z", camera.rotation_z),
            ("initial_camera.pan_x", camera.pan_x),
            ("initial_camera.pan_y", camera.pan_y),
        ] {
            if !value.is_finite() {
                return Err(Error::InvalidConfig(format!("{name} must be finite, got {value}")));
            }
        }
        Ok(())
    }

    /// Initial camera with its zoom clamped into range
    pub fn initial_pose(&self) -> CameraPose {
        CameraPose {
            zoom: clamp_zoom(self.initial_camera.zoom),
            ..self.initial_camera
        }
    }
}

/// Per-frame rendering choices a host may change at any time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub color_mode: ColorMode,
    /// Point diameter at zoom 1, pixels
    pub point_size: f32,
    pub show_grid: bool,
    pub show_axes: bool,
    /// Grid line and range ring spacing, metres
    pub grid_step: f32,
    /// Sensor horizontal field of view, degrees
    pub hfov: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            color_mode: ColorMode::Distance,
            point_size: 2.0,
            show_grid: true,
            show_axes: true,
            grid_step: 5.0,
            hfov: 100.0,
        }
    }
}

impl RenderSettings {
    pub fn grid_params(&self, extent: f32) -> GridParams {
        GridParams {
            step: self.grid_step,
            extent,
            hfov: self.hfov,
        }
    }
}

fn positive(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!("{name} must be positive, got {value}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        assert!(ViewerConfig::default().validate().is_ok());
        assert_eq!(ViewerConfig::default().target_fps, 20.0);
    }

    #[test]
    fn test_from_json_fills_defaults() {
        let config = ViewerConfig::from_json(r#"{ "target_fps": 30, "snap_to_grid": false }"#).unwrap();
        assert_eq!(config.target_fps, 30.0);
        assert!(!config.snap_to_grid);
        assert_eq!(config.grid_extent, 50.0);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            ViewerConfig::from_json(r#"{ "target_fps": 0 }"#),
            Err(Error::InvalidConfig(_))
        ));
        assert!(matches!(ViewerConfig::from_json("not json"), Err(Error::InvalidConfig(_))));

        let mut config = ViewerConfig::default();
        config.initial_camera.pan_x = f32::INFINITY;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_initial_pose_clamps_zoom() {
        let mut config = ViewerConfig::default();
        config.initial_camera.zoom = 500.0;
        assert_eq!(config.initial_pose().zoom, 100.0);
    }

    #[test]
    fn test_render_settings_json() {
        let settings: RenderSettings =
            serde_json::from_str(r#"{ "color_mode": "channel", "point_size": 3.5 }"#).unwrap();
        assert_eq!(settings.color_mode, ColorMode::Channel);
        assert_eq!(settings.point_size, 3.5);
        assert!(settings.show_grid);
        assert_eq!(settings.grid_params(20.0).extent, 20.0);
    }
}
