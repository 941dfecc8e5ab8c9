//! Software rendering for lidarscope
//!
//! This crate draws projected point clouds and reference geometry onto any
//! 2-D surface that implements [`DrawSurface`]:
//! - Point rendering with per-colour batching, culling and level of detail
//! - Grid, range ring and field-of-view rendering for the cached background
//! - Camera axes and pick marker overlays
//! - A software raster surface for off-screen caching and headless output

pub mod surface;
pub mod raster;
pub mod recording;
pub mod color;
pub mod points;
pub mod grid;
pub mod overlay;

pub use surface::*;
pub use raster::*;
pub use recording::*;
pub use color::*;
pub use points::*;
pub use grid::*;
pub use overlay::*;
