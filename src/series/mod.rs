//! Series renderer contract and the registry that binds series types to
//! renderer implementations
//!
//! A chart draws each series through a [`SeriesRenderer`]: `prepare`
//! rebuilds GPU state from new data, `render` draws the visual pass,
//! `render_pick` draws id colors for GPU picking, and `hit_test` answers
//! screen-space queries without the GPU. Renderers are created through a
//! [`SeriesRegistry`] owned by the host, so tests can swap in doubles and
//! applications can add their own series types without touching globals.

mod graph;
mod points;

pub use graph::GraphRenderer;
pub use points::PointsRenderer;

use crate::camera::Camera;
use crate::data::Series;
use crate::error::{RenderError, RenderResult};
use crate::gpu::GpuContext;
use crate::theme::Theme;

/// Everything a renderer needs to build pipelines and record draw calls.
pub struct RenderContext<'a> {
    pub gpu: &'a GpuContext,

    /// Layout of the shared globals uniform at group 0
    pub globals_layout: &'a wgpu::BindGroupLayout,

    /// Bind group carrying the current frame's globals
    pub globals_bind_group: &'a wgpu::BindGroup,

    /// Color format of the visual target
    pub target_format: wgpu::TextureFormat,

    /// Color format of the pick target
    pub pick_format: wgpu::TextureFormat,

    pub camera: &'a Camera,
    pub theme: &'a Theme,

    /// Device pixels per logical pixel; targets are sized in device
    /// pixels while the camera viewport stays logical
    pub pixel_ratio: f32,

    /// Entry animation progress in [0, 1]; 1 once the chart is fully in
    pub progress: f32,

    /// First pick id assigned to this series; datum `i` encodes as
    /// `pick_base + i`
    pub pick_base: u32,
}

/// A datum matched by a hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesHit {
    /// Index of the datum within its series
    pub index: usize,

    /// Label carried from the input data, when present
    pub label: Option<String>,

    /// Screen-space distance from the query point in logical pixels
    pub distance: f32,
}

/// Renderer for one series of one chart.
///
/// Implementations keep their GPU resources internal; the chart only
/// sequences calls. `render` may advance per-frame state (the graph
/// renderer steps its layout there), and `needs_loop` tells the frame
/// loop whether more frames are coming.
pub trait SeriesRenderer {
    /// Rebuild GPU-side and retained state from new input data.
    fn prepare(&mut self, ctx: &RenderContext<'_>, series: &Series) -> RenderResult<()>;

    /// Record draw calls for the visual pass.
    fn render(&mut self, ctx: &RenderContext<'_>, pass: &mut wgpu::RenderPass<'_>);

    /// Record draw calls for the pick pass. Renderers that opt out of
    /// GPU picking leave this empty.
    fn render_pick(&mut self, _ctx: &RenderContext<'_>, _pass: &mut wgpu::RenderPass<'_>) {}

    /// Nearest datum to a screen coordinate, or `None` when nothing is
    /// within reach. Runs on the CPU so it works without a device.
    fn hit_test(&self, camera: &Camera, x: f32, y: f32) -> Option<SeriesHit>;

    /// Describe a datum by index, for resolving decoded pick ids.
    fn datum_at(&self, index: usize) -> Option<SeriesHit>;

    /// Release retained GPU resources.
    fn dispose(&mut self);

    /// Whether this series still needs animation frames.
    fn needs_loop(&self) -> bool {
        false
    }
}

/// Factory producing a fresh renderer for a series type.
pub type RendererFactory = Box<dyn Fn() -> Box<dyn SeriesRenderer>>;

/// Registry of series types.
///
/// Owned by the embedding application and passed to each chart, never a
/// process-wide singleton. Registering a kind that already exists
/// replaces the earlier factory.
pub struct SeriesRegistry {
    factories: Vec<(String, RendererFactory)>,
}

impl Default for SeriesRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl SeriesRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            factories: Vec::new(),
        }
    }

    /// Create a registry with the built-in series types registered
    ///
    /// Currently registers:
    /// - `points`: 3D scatter billboards ([`PointsRenderer`])
    /// - `graph`: force-directed node-link graph ([`GraphRenderer`])
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register("points", Box::new(|| Box::new(PointsRenderer::new())));
        registry.register("graph", Box::new(|| Box::new(GraphRenderer::new())));
        registry
    }

    /// Register a factory for a series kind, replacing any existing one.
    pub fn register(&mut self, kind: &str, factory: RendererFactory) {
        self.factories.retain(|(k, _)| k != kind);
        self.factories.push((kind.to_string(), factory));
    }

    /// Whether a kind is registered
    pub fn contains(&self, kind: &str) -> bool {
        self.factories.iter().any(|(k, _)| k == kind)
    }

    /// Instantiate a renderer for a series kind.
    pub fn create(&self, kind: &str) -> RenderResult<Box<dyn SeriesRenderer>> {
        self.factories
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, factory)| factory())
            .ok_or_else(|| RenderError::UnknownSeries(kind.to_string()))
    }

    /// Registered kinds in registration order
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.iter().map(|(k, _)| k.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Mock renderer for registry tests
    struct MockRenderer;

    impl SeriesRenderer for MockRenderer {
        fn prepare(&mut self, _ctx: &RenderContext<'_>, _series: &Series) -> RenderResult<()> {
            Ok(())
        }

        fn render(&mut self, _ctx: &RenderContext<'_>, _pass: &mut wgpu::RenderPass<'_>) {}

        fn hit_test(&self, _camera: &Camera, _x: f32, _y: f32) -> Option<SeriesHit> {
            None
        }

        fn datum_at(&self, _index: usize) -> Option<SeriesHit> {
            None
        }

        fn dispose(&mut self) {}

        fn needs_loop(&self) -> bool {
            true
        }
    }

    #[test]
    fn defaults_cover_builtin_kinds() {
        let registry = SeriesRegistry::with_defaults();
        assert!(registry.contains("points"));
        assert!(registry.contains("graph"));
        assert!(registry.create("points").is_ok());
        assert!(registry.create("graph").is_ok());
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let registry = SeriesRegistry::with_defaults();
        match registry.create("heatmap") {
            Err(RenderError::UnknownSeries(kind)) => assert_eq!(kind, "heatmap"),
            other => panic!("expected unknown series error, got {:?}", other.is_ok()),
        }
    }

    #[test]
    fn custom_kind_can_be_registered() {
        let mut registry = SeriesRegistry::new();
        assert!(!registry.contains("sparkline"));

        registry.register("sparkline", Box::new(|| Box::new(MockRenderer)));
        assert!(registry.contains("sparkline"));
        assert!(registry.create("sparkline").is_ok());
    }

    #[test]
    fn re_registering_replaces_the_factory() {
        let mut registry = SeriesRegistry::with_defaults();
        registry.register("points", Box::new(|| Box::new(MockRenderer)));

        // Still exactly one entry for the kind, now the mock.
        assert_eq!(registry.kinds().iter().filter(|k| **k == "points").count(), 1);
        let renderer = registry.create("points").unwrap();
        assert!(renderer.needs_loop());
    }

    #[test]
    fn separate_registries_are_independent() {
        let mut a = SeriesRegistry::with_defaults();
        let b = SeriesRegistry::with_defaults();

        a.register("points", Box::new(|| Box::new(MockRenderer)));

        assert!(a.create("points").unwrap().needs_loop());
        assert!(!b.create("points").unwrap().needs_loop());
    }
}
