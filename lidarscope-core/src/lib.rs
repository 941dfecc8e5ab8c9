//! Core data structures and projection math for lidarscope
//!
//! This crate provides the fundamental types for turning range-sensor returns
//! into an interactive 2-D view: points, camera state, the software
//! projection pipeline and conversion of decoded channel records.

pub mod point;
pub mod camera;
pub mod transform;
pub mod scan;
pub mod error;

pub use point::*;
pub use camera::*;
pub use transform::*;
pub use scan::*;
pub use error::*;

/// Re-export commonly used types from nalgebra
pub use nalgebra::{Point3, Vector2, Vector3};
