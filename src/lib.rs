//! # lidarscope
//!
//! Interactive viewing of live LiDAR point clouds without a 3-D graphics API.
//!
//! This is the umbrella crate that provides convenient access to all lidarscope
//! functionality. You can use this crate to get everything in one place, or use
//! individual crates for more granular control over dependencies.
//!
//! ## Features
//!
//! - **Core**: Points, camera state, projection and channel record conversion
//! - **Render**: Point, grid and overlay rendering onto any 2-D drawing surface
//! - **Viewer**: Input handling, frame pacing, grid caching and picking
//!
//! ## Quick Start
//!
//! ```rust
//! use lidarscope::prelude::*;
//!
//! let record = ChannelRecord::new(0, 100.0, 0.0, vec![10.0; 4]).with_hresolution(25.0);
//! let points = points_from_records(&[record]);
//!
//! let mut viewer = Viewer::default();
//! let mut surface = RasterSurface::new(320, 240);
//! let stats = viewer.render(&mut surface, &points, &RenderSettings::default());
//! assert_eq!(stats.map(|s| s.points.drawn), Some(4));
//! ```
//!
//! ## Feature Flags
//!
//! - `default`: Enables render and viewer
//! - `render`: Software rendering
//! - `viewer`: The interactive viewer (implies `render`)

// Re-export core functionality
pub use lidarscope_core::*;

// Re-export sub-crates
#[cfg(feature = "render")]
pub use lidarscope_render as render;

#[cfg(feature = "viewer")]
pub use lidarscope_viewer as viewer;

/// Convenient imports for common use cases
pub mod prelude {
    pub use lidarscope_core::*;

    #[cfg(feature = "render")]
    pub use lidarscope_render::*;

    #[cfg(feature = "viewer")]
    pub use lidarscope_viewer::*;
}
