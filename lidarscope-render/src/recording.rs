//! A drawing surface that records calls instead of drawing
//!
//! Useful for asserting how many batches a renderer issued without
//! inspecting pixels.

use image::RgbaImage;
use lidarscope_core::CanvasSize;

use crate::surface::{Color, DrawSurface};

/// One recorded call on a [`RecordingSurface`]
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    Clear(Color),
    FillCircles { count: usize, radius: f32, color: Color },
    Polyline { points: Vec<(f32, f32)>, width: f32, color: Color },
    Circle { center: (f32, f32), radius: f32, color: Color },
    Text { text: String, position: (f32, f32), color: Color },
    Image { width: u32, height: u32 },
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    size: CanvasSize,
    calls: Vec<DrawCall>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            size: CanvasSize::new(width, height),
            calls: Vec::new(),
        }
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of `fill_circles` batches
    pub fn circle_batches(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::FillCircles { .. }))
            .count()
    }

    /// Total circles across all batches
    pub fn circles_drawn(&self) -> usize {
        self.calls
            .iter()
            .map(|call| match call {
                DrawCall::FillCircles { count, .. } => *count,
                _ => 0,
            })
            .sum()
    }

    pub fn polylines(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Polyline { .. }))
            .count()
    }

    pub fn texts(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                DrawCall::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn images_drawn(&self) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, DrawCall::Image { .. }))
            .count()
    }
}

impl DrawSurface for RecordingSurface {
    fn canvas_size(&self) -> CanvasSize {
        self.size
    }

    fn clear(&mut self, color: Color) {
        self.calls.push(DrawCall::Clear(color));
    }

    fn fill_circles(&mut self, centers: &[(f32, f32)], radius: f32, color: Color) {
        self.calls.push(DrawCall::FillCircles {
            count: centers.len(),
            radius,
            color,
        });
    }

    fn stroke_polyline(&mut self, points: &[(f32, f32)], width: f32, color: Color) {
        self.calls.push(DrawCall::Polyline {
            points: points.to_vec(),
            width,
            color,
        });
    }

    fn stroke_circle(&mut self, center: (f32, f32), radius: f32, _width: f32, color: Color) {
        self.calls.push(DrawCall::Circle { center, radius, color });
    }

    fn fill_text(&mut self, text: &str, position: (f32, f32), color: Color) {
        self.calls.push(DrawCall::Text {
            text: text.to_string(),
            position,
            color,
        });
    }

    fn draw_image(&mut self, image: &RgbaImage) {
        self.calls.push(DrawCall::Image {
            width: image.width(),
            height: image.height(),
        });
    }
}
