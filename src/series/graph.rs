//! Force-directed graph renderer
//!
//! Wraps a [`ForceLayout`] and draws its nodes as instanced circles and
//! its edges as lines, all in screen space. The simulation advances
//! inside `render`, a few physics steps per frame, until the iteration
//! budget is spent; `needs_loop` keeps the frame loop alive until then.
//!
//! Data updates that keep the same nodes and links leave positions
//! untouched. Changing only spring rest lengths keeps positions but
//! restarts the iteration budget; adding or removing nodes or links
//! rebuilds the layout from scratch.

use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};

use bytemuck::{Pod, Zeroable};

use crate::camera::Camera;
use crate::data::{GraphLink, GraphNode, Series, SeriesData};
use crate::error::RenderResult;
use crate::gpu::{DEPTH_FORMAT, VertexLayout, shaders};
use crate::layout::{ForceLayout, LayoutEdge, LayoutOptions};
use crate::picking::id_to_color_f32;
use crate::series::{RenderContext, SeriesHit, SeriesRenderer};
use crate::theme::Theme;

/// Spring rest length for links that do not specify one, in pixels.
const DEFAULT_REST_LENGTH: f32 = 100.0;

/// Extra pixels around a node that still count as a hit.
const HIT_SLACK: f32 = 4.0;

/// Per-instance data for one node circle, locations 0-3
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct NodeInstance {
    position: [f32; 2],
    radius: f32,
    color: [f32; 4],
    pick_color: [f32; 4],
}

/// Per-instance data for one edge line, locations 0-2
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct EdgeInstance {
    start: [f32; 2],
    end: [f32; 2],
    color: [f32; 4],
}

/// Styling and label resolved per node at prepare time
#[derive(Debug, Clone)]
struct NodeMeta {
    label: Option<String>,
    radius: f32,
    color: [f32; 4],
    pick_color: [f32; 4],
}

/// Resolve link endpoint ids to node indices.
///
/// Links whose endpoints are missing from the node list are dropped;
/// partial data renders the nodes it can instead of failing the series.
fn resolve_links(nodes: &[GraphNode], links: &[GraphLink]) -> Vec<LayoutEdge> {
    let index_of: HashMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(i, node)| (node.id.as_str(), i))
        .collect();

    links
        .iter()
        .filter_map(|link| {
            let source = index_of.get(link.source.as_str()).copied();
            let target = index_of.get(link.target.as_str()).copied();
            match (source, target) {
                (Some(source), Some(target)) => Some(LayoutEdge {
                    source,
                    target,
                    rest_length: link.rest_length.unwrap_or(DEFAULT_REST_LENGTH),
                }),
                _ => {
                    tracing::debug!(
                        source = %link.source,
                        target = %link.target,
                        "dropping link with unresolved endpoint"
                    );
                    None
                }
            }
        })
        .collect()
}

/// Hash of node ids and link endpoint pairs. Styling changes do not
/// affect it; adding, removing, or re-ordering nodes or links does.
fn structure_hash(nodes: &[GraphNode], edges: &[LayoutEdge]) -> u64 {
    let mut hasher = DefaultHasher::new();
    nodes.len().hash(&mut hasher);
    for node in nodes {
        node.id.hash(&mut hasher);
    }
    for edge in edges {
        edge.source.hash(&mut hasher);
        edge.target.hash(&mut hasher);
    }
    hasher.finish()
}

/// Structure hash extended with spring rest lengths.
fn spring_hash(nodes: &[GraphNode], edges: &[LayoutEdge]) -> u64 {
    let mut hasher = DefaultHasher::new();
    structure_hash(nodes, edges).hash(&mut hasher);
    for edge in edges {
        edge.rest_length.to_bits().hash(&mut hasher);
    }
    hasher.finish()
}

/// Renderer for the built-in `graph` series type.
pub struct GraphRenderer {
    layout: ForceLayout,
    structure: u64,
    springs: u64,
    meta: Vec<NodeMeta>,
    pick_base: u32,

    node_pipeline: Option<wgpu::RenderPipeline>,
    node_pick_pipeline: Option<wgpu::RenderPipeline>,
    edge_pipeline: Option<wgpu::RenderPipeline>,
    node_instances: Option<wgpu::Buffer>,
    edge_instances: Option<wgpu::Buffer>,
}

impl Default for GraphRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphRenderer {
    pub fn new() -> Self {
        Self::with_options(LayoutOptions::default())
    }

    /// Create a renderer with custom physics constants.
    pub fn with_options(options: LayoutOptions) -> Self {
        Self {
            layout: ForceLayout::new(options),
            structure: 0,
            springs: 0,
            meta: Vec::new(),
            pick_base: 0,
            node_pipeline: None,
            node_pick_pipeline: None,
            edge_pipeline: None,
            node_instances: None,
            edge_instances: None,
        }
    }

    /// Simulation state, for inspection
    pub fn layout(&self) -> &ForceLayout {
        &self.layout
    }

    /// Rebuild retained state from input data.
    ///
    /// CPU-only; decides between full rebuild, reheat, and leaving the
    /// simulation alone based on what actually changed.
    fn sync_data(&mut self, theme: &Theme, pick_base: u32, series: &Series, bounds: [f32; 2]) {
        let SeriesData::Graph { nodes, links } = &series.data else {
            self.meta.clear();
            self.layout.rebuild(0, Vec::new());
            return;
        };

        self.layout.set_bounds(bounds[0], bounds[1]);

        let edges = resolve_links(nodes, links);
        let structure = structure_hash(nodes, edges.as_slice());
        let springs = spring_hash(nodes, edges.as_slice());

        if structure != self.structure {
            self.layout.rebuild(nodes.len(), edges);
            tracing::debug!(nodes = nodes.len(), "graph structure changed, layout rebuilt");
        } else if springs != self.springs {
            // Same nodes and links, new rest lengths: keep positions and
            // let the simulation re-relax.
            self.layout.edges = edges;
            self.layout.reheat();
        }
        self.structure = structure;
        self.springs = springs;
        self.pick_base = pick_base;

        self.meta = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| NodeMeta {
                label: node.label.clone(),
                radius: node.size.unwrap_or(theme.node_radius),
                color: node.color.unwrap_or(theme.node_color),
                pick_color: id_to_color_f32(pick_base + i as u32),
            })
            .collect();

        for (node, meta) in self.layout.nodes.iter_mut().zip(&self.meta) {
            node.radius = meta.radius;
        }
    }

    fn ensure_pipelines(&mut self, ctx: &RenderContext<'_>) -> RenderResult<()> {
        if self.node_pipeline.is_some() {
            return Ok(());
        }

        let device = ctx.gpu.device();
        let node_shader = ctx
            .gpu
            .create_shader("graph nodes", &shaders::graph_node_shader())?;
        let edge_shader = ctx
            .gpu
            .create_shader("graph edges", &shaders::graph_edge_shader())?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("graph pipeline layout"),
            bind_group_layouts: &[ctx.globals_layout],
            push_constant_ranges: &[],
        });

        let node_layout = VertexLayout::new(&[(0, 2), (1, 1), (2, 4), (3, 4)]);
        let edge_layout = VertexLayout::new(&[(0, 2), (1, 2), (2, 4)]);

        let node_pipeline = |entry: &str, format: wgpu::TextureFormat, blend| {
            device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("graph node pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &node_shader,
                    entry_point: Some("vs_node"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[node_layout.buffer_layout(wgpu::VertexStepMode::Instance)],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &node_shader,
                    entry_point: Some(entry),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format,
                        blend,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleStrip,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: true,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            })
        };

        self.node_pipeline = Some(node_pipeline(
            "fs_node",
            ctx.target_format,
            Some(wgpu::BlendState::ALPHA_BLENDING),
        ));
        self.node_pick_pipeline = Some(node_pipeline("fs_node_pick", ctx.pick_format, None));

        self.edge_pipeline = Some(device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("graph edge pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &edge_shader,
                    entry_point: Some("vs_edge"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[edge_layout.buffer_layout(wgpu::VertexStepMode::Instance)],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &edge_shader,
                    entry_point: Some("fs_edge"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.target_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::LineList,
                    ..Default::default()
                },
                depth_stencil: Some(wgpu::DepthStencilState {
                    format: DEPTH_FORMAT,
                    depth_write_enabled: false,
                    depth_compare: wgpu::CompareFunction::LessEqual,
                    stencil: wgpu::StencilState::default(),
                    bias: wgpu::DepthBiasState::default(),
                }),
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
                cache: None,
            },
        ));

        Ok(())
    }

    /// Current node instance values from layout positions and metadata.
    fn node_instance_data(&self) -> Vec<NodeInstance> {
        self.layout
            .nodes
            .iter()
            .zip(&self.meta)
            .map(|(node, meta)| NodeInstance {
                position: [node.x, node.y],
                radius: meta.radius,
                color: meta.color,
                pick_color: meta.pick_color,
            })
            .collect()
    }

    fn edge_instance_data(&self, theme: &Theme) -> Vec<EdgeInstance> {
        self.layout
            .edges
            .iter()
            .map(|edge| {
                let s = &self.layout.nodes[edge.source];
                let t = &self.layout.nodes[edge.target];
                EdgeInstance {
                    start: [s.x, s.y],
                    end: [t.x, t.y],
                    color: theme.edge_color,
                }
            })
            .collect()
    }

    /// Advance the simulation and push fresh positions to the GPU.
    fn step_and_upload(&mut self, ctx: &RenderContext<'_>) {
        let viewport = ctx.camera.viewport();
        self.layout.set_bounds(viewport[0], viewport[1]);

        if !self.layout.is_settled() {
            self.layout.tick();
        }

        if let Some(buffer) = &self.node_instances {
            let data = self.node_instance_data();
            ctx.gpu
                .queue()
                .write_buffer(buffer, 0, bytemuck::cast_slice(&data));
        }
        if let Some(buffer) = &self.edge_instances {
            let data = self.edge_instance_data(ctx.theme);
            ctx.gpu
                .queue()
                .write_buffer(buffer, 0, bytemuck::cast_slice(&data));
        }
    }
}

impl SeriesRenderer for GraphRenderer {
    fn prepare(&mut self, ctx: &RenderContext<'_>, series: &Series) -> RenderResult<()> {
        let viewport = ctx.camera.viewport();
        self.sync_data(ctx.theme, ctx.pick_base, series, viewport);
        self.ensure_pipelines(ctx)?;

        let device = ctx.gpu.device();
        let node_count = self.layout.nodes.len();
        let edge_count = self.layout.edges.len();

        self.node_instances = (node_count > 0).then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("graph node instances"),
                size: (node_count * std::mem::size_of::<NodeInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });
        self.edge_instances = (edge_count > 0).then(|| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("graph edge instances"),
                size: (edge_count * std::mem::size_of::<EdgeInstance>()) as u64,
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
        });

        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>, pass: &mut wgpu::RenderPass<'_>) {
        self.step_and_upload(ctx);

        pass.set_bind_group(0, ctx.globals_bind_group, &[]);

        // Edges under nodes
        if let (Some(pipeline), Some(instances)) = (&self.edge_pipeline, &self.edge_instances) {
            pass.set_pipeline(pipeline);
            pass.set_vertex_buffer(0, instances.slice(..));
            pass.draw(0..2, 0..self.layout.edges.len() as u32);
        }
        if let (Some(pipeline), Some(instances)) = (&self.node_pipeline, &self.node_instances) {
            pass.set_pipeline(pipeline);
            pass.set_vertex_buffer(0, instances.slice(..));
            pass.draw(0..4, 0..self.layout.nodes.len() as u32);
        }
    }

    fn render_pick(&mut self, ctx: &RenderContext<'_>, pass: &mut wgpu::RenderPass<'_>) {
        // Only nodes carry pick ids; edges are not hit-testable.
        let (Some(pipeline), Some(instances)) = (&self.node_pick_pipeline, &self.node_instances)
        else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, ctx.globals_bind_group, &[]);
        pass.set_vertex_buffer(0, instances.slice(..));
        pass.draw(0..4, 0..self.layout.nodes.len() as u32);
    }

    fn hit_test(&self, _camera: &Camera, x: f32, y: f32) -> Option<SeriesHit> {
        // Layout positions are already in logical screen pixels.
        let mut best: Option<SeriesHit> = None;

        for (i, (node, meta)) in self.layout.nodes.iter().zip(&self.meta).enumerate() {
            let dx = node.x - x;
            let dy = node.y - y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance > meta.radius + HIT_SLACK {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(SeriesHit {
                    index: i,
                    label: meta.label.clone(),
                    distance,
                });
            }
        }

        best
    }

    fn datum_at(&self, index: usize) -> Option<SeriesHit> {
        self.meta.get(index).map(|meta| SeriesHit {
            index,
            label: meta.label.clone(),
            distance: 0.0,
        })
    }

    fn dispose(&mut self) {
        self.node_pipeline = None;
        self.node_pick_pipeline = None;
        self.edge_pipeline = None;
        self.node_instances = None;
        self.edge_instances = None;
        self.meta.clear();
    }

    fn needs_loop(&self) -> bool {
        !self.layout.is_settled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph_series(nodes: Vec<GraphNode>, links: Vec<GraphLink>) -> Series {
        Series::from_data(SeriesData::Graph { nodes, links })
    }

    fn two_node_series(rest: f32) -> Series {
        let mut link = GraphLink::new("a", "b");
        link.rest_length = Some(rest);
        graph_series(
            vec![GraphNode::new("a"), GraphNode::new("b")],
            vec![link],
        )
    }

    #[test]
    fn links_resolve_to_indices() {
        let nodes = vec![GraphNode::new("a"), GraphNode::new("b"), GraphNode::new("c")];
        let links = vec![GraphLink::new("c", "a"), GraphLink::new("b", "c")];

        let edges = resolve_links(&nodes, &links);
        assert_eq!(edges.len(), 2);
        assert_eq!((edges[0].source, edges[0].target), (2, 0));
        assert_eq!((edges[1].source, edges[1].target), (1, 2));
        assert_eq!(edges[0].rest_length, DEFAULT_REST_LENGTH);
    }

    #[test]
    fn dangling_links_are_dropped() {
        let nodes = vec![GraphNode::new("a")];
        let links = vec![
            GraphLink::new("a", "ghost"),
            GraphLink::new("ghost", "a"),
            GraphLink::new("a", "a"),
        ];
        let edges = resolve_links(&nodes, &links);
        assert_eq!(edges.len(), 1);
    }

    #[test]
    fn styling_changes_preserve_positions() {
        let mut renderer = GraphRenderer::new();
        let theme = Theme::default();
        let bounds = [800.0, 600.0];

        renderer.sync_data(&theme, 0, &two_node_series(100.0), bounds);
        let before: Vec<(f32, f32)> = renderer
            .layout
            .nodes
            .iter()
            .map(|n| (n.x, n.y))
            .collect();

        // Same topology, different color: positions and budget untouched.
        let mut series = two_node_series(100.0);
        if let SeriesData::Graph { nodes, .. } = &mut series.data {
            nodes[0].color = Some([1.0, 0.0, 0.0, 1.0]);
        }
        renderer.sync_data(&theme, 0, &series, bounds);

        let after: Vec<(f32, f32)> = renderer
            .layout
            .nodes
            .iter()
            .map(|n| (n.x, n.y))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn rest_length_change_reheats_without_moving_nodes() {
        let mut renderer = GraphRenderer::new();
        let theme = Theme::default();
        let bounds = [800.0, 600.0];

        renderer.sync_data(&theme, 0, &two_node_series(100.0), bounds);
        renderer.layout.run_to_settled();
        assert!(renderer.layout.is_settled());
        let before: Vec<(f32, f32)> = renderer
            .layout
            .nodes
            .iter()
            .map(|n| (n.x, n.y))
            .collect();

        renderer.sync_data(&theme, 0, &two_node_series(150.0), bounds);

        let after: Vec<(f32, f32)> = renderer
            .layout
            .nodes
            .iter()
            .map(|n| (n.x, n.y))
            .collect();
        assert_eq!(before, after);
        assert!(!renderer.layout.is_settled());
        assert_eq!(renderer.layout.edges[0].rest_length, 150.0);
    }

    #[test]
    fn topology_change_rebuilds_the_layout() {
        let mut renderer = GraphRenderer::new();
        let theme = Theme::default();
        let bounds = [800.0, 600.0];

        renderer.sync_data(&theme, 0, &two_node_series(100.0), bounds);
        assert_eq!(renderer.layout.nodes.len(), 2);

        let series = graph_series(
            vec![
                GraphNode::new("a"),
                GraphNode::new("b"),
                GraphNode::new("c"),
            ],
            vec![GraphLink::new("a", "b"), GraphLink::new("b", "c")],
        );
        renderer.sync_data(&theme, 0, &series, bounds);

        assert_eq!(renderer.layout.nodes.len(), 3);
        assert_eq!(renderer.layout.edges.len(), 2);
        assert!(!renderer.layout.is_settled());
    }

    #[test]
    fn hit_test_matches_a_node_under_the_cursor() {
        let mut renderer = GraphRenderer::new();
        let theme = Theme::default();

        let mut nodes = vec![GraphNode::new("a"), GraphNode::new("b")];
        nodes[0].label = Some("Alpha".to_string());
        renderer.sync_data(&theme, 0, &graph_series(nodes, vec![]), [800.0, 600.0]);

        // Pin node positions for a deterministic query.
        renderer.layout.nodes[0].x = 100.0;
        renderer.layout.nodes[0].y = 100.0;
        renderer.layout.nodes[1].x = 400.0;
        renderer.layout.nodes[1].y = 400.0;

        let camera = Camera::new(800.0, 600.0);
        let hit = renderer.hit_test(&camera, 102.0, 101.0).unwrap();
        assert_eq!(hit.index, 0);
        assert_eq!(hit.label.as_deref(), Some("Alpha"));

        assert!(renderer.hit_test(&camera, 250.0, 250.0).is_none());
    }

    #[test]
    fn needs_loop_until_settled() {
        let mut renderer = GraphRenderer::new();
        let theme = Theme::default();

        renderer.sync_data(&theme, 0, &two_node_series(100.0), [800.0, 600.0]);
        assert!(renderer.needs_loop());

        renderer.layout.run_to_settled();
        assert!(!renderer.needs_loop());
    }

    #[test]
    fn node_sizes_come_from_data_or_theme() {
        let mut renderer = GraphRenderer::new();
        let theme = Theme::default();

        let mut nodes = vec![GraphNode::new("a"), GraphNode::new("b")];
        nodes[1].size = Some(20.0);
        renderer.sync_data(&theme, 0, &graph_series(nodes, vec![]), [800.0, 600.0]);

        assert_eq!(renderer.meta[0].radius, theme.node_radius);
        assert_eq!(renderer.meta[1].radius, 20.0);
        assert_eq!(renderer.layout.nodes[1].radius, 20.0);
    }
}
