//! Frame pacing, frame statistics and the cached grid layer
//!
//! The governor decides whether a frame may be rendered now, keeps a rolling
//! window of frame timings, owns the off-screen grid image and reports
//! advisory tuning hints. It never changes settings on its own.

use std::collections::VecDeque;
use std::time::Duration;

use instant::Instant;
use lidarscope_core::{CameraPose, CanvasSize, Point3D};
use lidarscope_render::{effective_step, GridParams, PointRenderStats, RasterSurface};
use serde::{Deserialize, Serialize};

use crate::config::RenderSettings;

pub const DEFAULT_TARGET_FPS: f32 = 20.0;

/// Number of frames kept for the rolling statistics
pub const FRAME_WINDOW: usize = 60;

/// Camera changes up to these amounts reuse the cached grid
pub const ROTATION_THRESHOLD: f32 = 0.05;
pub const ZOOM_THRESHOLD: f32 = 0.1;
pub const PAN_THRESHOLD: f32 = 10.0;

/// Point count above which dragging is expected to stutter
const HEAVY_POINT_COUNT: usize = 50_000;
/// Grid lines per side above which the grid is considered dense
const DENSE_GRID_LINES: f32 = 20.0;
const MEMORY_BUDGET_BYTES: usize = 64 * 1024 * 1024;

/// Off-screen grid image and the view it was drawn for
#[derive(Debug, Clone)]
pub struct GridCache {
    surface: RasterSurface,
    camera: CameraPose,
    params: GridParams,
}

impl GridCache {
    pub fn surface(&self) -> &RasterSurface {
        &self.surface
    }

    pub fn camera(&self) -> &CameraPose {
        &self.camera
    }

    pub fn params(&self) -> &GridParams {
        &self.params
    }

    pub fn canvas_size(&self) -> CanvasSize {
        let image = self.surface.image();
        CanvasSize::new(image.width(), image.height())
    }

    pub fn size_bytes(&self) -> usize {
        self.surface.image().as_raw().len()
    }

    /// Whether the image can stand in for a grid drawn at `camera`
    pub fn is_valid_for(&self, camera: &CameraPose, canvas: CanvasSize, params: &GridParams) -> bool {
        let cached = &self.camera;
        self.canvas_size() == canvas
            && self.params == *params
            && effective_step(params.step, cached.zoom) == effective_step(params.step, camera.zoom)
            && (camera.rotation_x - cached.rotation_x).abs() <= ROTATION_THRESHOLD
            && (camera.rotation_y - cached.rotation_y).abs() <= ROTATION_THRESHOLD
            && (camera.rotation_z - cached.rotation_z).abs() <= ROTATION_THRESHOLD
            && (camera.zoom - cached.zoom).abs() <= ZOOM_THRESHOLD
            && (camera.pan_x - cached.pan_x).abs() <= PAN_THRESHOLD
            && (camera.pan_y - cached.pan_y).abs() <= PAN_THRESHOLD
    }
}

/// Advisory suggestion for hosts struggling to keep up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TuningHint {
    ReducePointSize,
    ReduceGridDensity,
    LowerLevelOfDetail,
    ReduceMemory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub fps: f32,
    pub average_frame_ms: f32,
    /// Fraction of considered points culled in the last frame
    pub culling_ratio: f32,
    pub estimated_memory_bytes: usize,
    pub hints: Vec<TuningHint>,
}

#[derive(Debug, Clone)]
pub struct PerformanceGovernor {
    target_fps: f32,
    min_frame_interval: Duration,
    last_frame: Option<Instant>,
    frame_intervals: VecDeque<Duration>,
    render_times: VecDeque<Duration>,
    grid_cache: Option<GridCache>,
    grid_rebuilds: u64,
}

impl Default for PerformanceGovernor {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET_FPS)
    }
}

impl PerformanceGovernor {
    /// Governor capping output at `target_fps`; invalid rates fall back to the default
    pub fn new(target_fps: f32) -> Self {
        let target_fps = if target_fps.is_finite() && target_fps > 0.0 {
            target_fps
        } else {
            DEFAULT_TARGET_FPS
        };
        Self {
            target_fps,
            min_frame_interval: Duration::from_micros((1_000_000.0 / target_fps).round() as u64),
            last_frame: None,
            frame_intervals: VecDeque::with_capacity(FRAME_WINDOW),
            render_times: VecDeque::with_capacity(FRAME_WINDOW),
            grid_cache: None,
            grid_rebuilds: 0,
        }
    }

    pub fn target_fps(&self) -> f32 {
        self.target_fps
    }

    pub fn min_frame_interval(&self) -> Duration {
        self.min_frame_interval
    }

    /// Frame gate. Accepting a frame records the interval since the previous one.
    pub fn can_render(&mut self, now: Instant) -> bool {
        if let Some(last) = self.last_frame {
            let elapsed = now.saturating_duration_since(last);
            if elapsed < self.min_frame_interval {
                return false;
            }
            push_sample(&mut self.frame_intervals, elapsed);
        }
        self.last_frame = Some(now);
        true
    }

    /// Record how long an accepted frame took to draw
    pub fn record_render_time(&mut self, duration: Duration) {
        push_sample(&mut self.render_times, duration);
    }

    /// Frames per second over the rolling window; 0 before two frames were accepted
    pub fn fps(&self) -> f32 {
        match mean(&self.frame_intervals) {
            Some(interval) if !interval.is_zero() => 1.0 / interval.as_secs_f32(),
            _ => 0.0,
        }
    }

    /// Mean time spent drawing a frame over the rolling window
    pub fn average_frame_time(&self) -> Duration {
        mean(&self.render_times).unwrap_or_default()
    }

    pub fn should_invalidate(&self, camera: &CameraPose, canvas: CanvasSize, params: &GridParams) -> bool {
        match &self.grid_cache {
            Some(cache) => !cache.is_valid_for(camera, canvas, params),
            None => true,
        }
    }

    pub fn store_grid(&mut self, surface: RasterSurface, camera: CameraPose, params: GridParams) {
        self.grid_rebuilds += 1;
        log::debug!(
            "grid cache rebuilt ({}x{}, rebuild #{})",
            surface.image().width(),
            surface.image().height(),
            self.grid_rebuilds
        );
        self.grid_cache = Some(GridCache {
            surface,
            camera,
            params,
        });
    }

    pub fn grid_cache(&self) -> Option<&GridCache> {
        self.grid_cache.as_ref()
    }

    pub fn grid_image(&self) -> Option<&image::RgbaImage> {
        self.grid_cache.as_ref().map(|cache| cache.surface.image())
    }

    pub fn invalidate_grid(&mut self) {
        self.grid_cache = None;
    }

    pub fn grid_rebuilds(&self) -> u64 {
        self.grid_rebuilds
    }

    /// Summarise the rolling statistics and the last frame's point counts
    pub fn report(&self, points: &PointRenderStats, settings: &RenderSettings, grid_extent: f32) -> PerformanceReport {
        let estimated_memory_bytes = points.input * std::mem::size_of::<Point3D>()
            + self.grid_cache.as_ref().map_or(0, GridCache::size_bytes);

        let fps = self.fps();
        let struggling = fps > 0.0 && fps < self.target_fps * 0.75;
        let mut hints = Vec::new();
        if struggling {
            if settings.point_size > 2.0 {
                hints.push(TuningHint::ReducePointSize);
            }
            if settings.show_grid && settings.grid_step > 0.0 && grid_extent / settings.grid_step > DENSE_GRID_LINES {
                hints.push(TuningHint::ReduceGridDensity);
            }
            if points.considered > HEAVY_POINT_COUNT {
                hints.push(TuningHint::LowerLevelOfDetail);
            }
        }
        if estimated_memory_bytes > MEMORY_BUDGET_BYTES {
            hints.push(TuningHint::ReduceMemory);
        }

        PerformanceReport {
            fps,
            average_frame_ms: self.average_frame_time().as_secs_f32() * 1000.0,
            culling_ratio: points.culling_ratio(),
            estimated_memory_bytes,
            hints,
        }
    }
}

fn push_sample(window: &mut VecDeque<Duration>, sample: Duration) {
    if window.len() == FRAME_WINDOW {
        window.pop_front();
    }
    window.push_back(sample);
}

fn mean(window: &VecDeque<Duration>) -> Option<Duration> {
    let count = u32::try_from(window.len()).ok().filter(|&n| n > 0)?;
    Some(window.iter().sum::<Duration>() / count)
}
