//! chartwell - a GPU chart engine for interactive 3D data visualization.
//!
//! This crate renders point clouds and force-directed graphs with wgpu,
//! drives an orbiting camera from pointer and touch input, and resolves
//! screen coordinates back to data through an id-encoded pick buffer.
//! Hosts inject a frame scheduler and receive frames on demand, so the
//! engine renders only while something moves.

pub mod camera;
pub mod chart;
pub mod data;
pub mod error;
pub mod frame;
pub mod gpu;
pub mod layout;
pub mod math;
pub mod orbit;
pub mod picking;
pub mod series;
pub mod theme;

pub use camera::Camera;
pub use chart::{Chart, ChartOptions, DataPoint};
pub use data::{ChartData, GraphLink, GraphNode, PointDatum, Series, SeriesData};
pub use error::{RenderError, RenderResult};
pub use frame::{FrameHandle, FrameLoop, FrameScheduler, ManualScheduler};
pub use gpu::GpuContext;
pub use layout::{ForceLayout, LayoutEdge, LayoutNode, LayoutOptions};
pub use orbit::{OrbitControls, OrbitOptions, PointerButton};
pub use series::{RenderContext, SeriesHit, SeriesRegistry, SeriesRenderer};
pub use theme::Theme;
