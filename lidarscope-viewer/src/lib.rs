//! Interactive viewing for lidarscope
//!
//! This crate turns the renderers into an interactive viewer:
//! - Pointer and keyboard input driving the camera
//! - Frame pacing, rolling frame statistics and tuning hints
//! - A cached off-screen grid layer
//! - Coordinate picking with an optional listener

pub mod config;
pub mod governor;
pub mod input;
pub mod viewer;

pub use config::*;
pub use governor::*;
pub use input::*;
pub use viewer::*;
