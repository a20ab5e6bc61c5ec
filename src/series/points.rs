//! Instanced billboard renderer for 3D point series
//!
//! Each datum is one instance of a screen-facing quad; the fragment
//! shader masks it to a circle. Points keep a constant pixel size under
//! perspective, and the same instance buffer feeds both the visual and
//! the pick pipeline.

use bytemuck::{Pod, Zeroable};
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::data::{Series, SeriesData};
use crate::error::RenderResult;
use crate::gpu::{DEPTH_FORMAT, VertexLayout, shaders};
use crate::math::Vec3;
use crate::picking::id_to_color_f32;
use crate::series::{RenderContext, SeriesHit, SeriesRenderer};
use crate::theme::Theme;

/// Smallest radius a point responds to hit tests with, in pixels.
const MIN_HIT_RADIUS: f32 = 6.0;

/// Per-instance vertex data, matching the point shader's locations 0-3
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct PointInstance {
    position: [f32; 3],
    size: f32,
    color: [f32; 4],
    pick_color: [f32; 4],
}

/// Datum retained for CPU-side hit testing
#[derive(Debug, Clone)]
struct RetainedPoint {
    position: Vec3,
    size: f32,
    label: Option<String>,
}

/// Renderer for the built-in `points` series type.
pub struct PointsRenderer {
    pipeline: Option<wgpu::RenderPipeline>,
    pick_pipeline: Option<wgpu::RenderPipeline>,
    instances: Option<wgpu::Buffer>,
    instance_count: u32,
    instance_data: Vec<PointInstance>,
    points: Vec<RetainedPoint>,
}

impl Default for PointsRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl PointsRenderer {
    pub fn new() -> Self {
        Self {
            pipeline: None,
            pick_pipeline: None,
            instances: None,
            instance_count: 0,
            instance_data: Vec::new(),
            points: Vec::new(),
        }
    }

    /// Rebuild retained data and instance values from input data.
    ///
    /// CPU-only so hit testing can be exercised without a device.
    fn sync_data(&mut self, theme: &Theme, pick_base: u32, series: &Series) {
        self.points.clear();
        self.instance_data.clear();

        let SeriesData::Points { points } = &series.data else {
            return;
        };

        self.points.reserve(points.len());
        self.instance_data.reserve(points.len());

        for (i, datum) in points.iter().enumerate() {
            let size = datum.size.unwrap_or(theme.point_size);
            let color = datum.color.unwrap_or(theme.point_color);

            self.points.push(RetainedPoint {
                position: datum.position,
                size,
                label: datum.label.clone(),
            });
            self.instance_data.push(PointInstance {
                position: datum.position,
                size,
                color,
                pick_color: id_to_color_f32(pick_base + i as u32),
            });
        }
    }

    fn ensure_pipelines(&mut self, ctx: &RenderContext<'_>) -> RenderResult<()> {
        if self.pipeline.is_some() {
            return Ok(());
        }

        let device = ctx.gpu.device();
        let shader = ctx.gpu.create_shader("points", &shaders::point_shader())?;

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("points pipeline layout"),
            bind_group_layouts: &[ctx.globals_layout],
            push_constant_ranges: &[],
        });

        let instance_layout = VertexLayout::new(&[(0, 3), (1, 1), (2, 4), (3, 4)]);

        self.pipeline = Some(device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("points pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_point"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[instance_layout.buffer_layout(wgpu::VertexStepMode::Instance)],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_point"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.target_format,
                        blend: Some(wgpu::BlendState::ALPHA_BLENDING),
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
            },
        ));

        // Pick pipeline: id colors, blending off so ids arrive unaltered.
        self.pick_pipeline = Some(device.create_render_pipeline(
            &wgpu::RenderPipelineDescriptor {
                label: Some("points pick pipeline"),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &shader,
                    entry_point: Some("vs_point"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: &[instance_layout.buffer_layout(wgpu::VertexStepMode::Instance)],
                },
                fragment: Some(wgpu::FragmentState {
                    module: &shader,
                    entry_point: Some("fs_point_pick"),
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: ctx.pick_format,
                        blend: None,
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
            },
        ));

        Ok(())
    }
}

impl SeriesRenderer for PointsRenderer {
    fn prepare(&mut self, ctx: &RenderContext<'_>, series: &Series) -> RenderResult<()> {
        self.sync_data(ctx.theme, ctx.pick_base, series);
        self.ensure_pipelines(ctx)?;

        if self.instance_data.is_empty() {
            self.instances = None;
            self.instance_count = 0;
            return Ok(());
        }

        self.instances = Some(ctx.gpu.device().create_buffer_init(
            &wgpu::util::BufferInitDescriptor {
                label: Some("point instances"),
                contents: bytemuck::cast_slice(&self.instance_data),
                usage: wgpu::BufferUsages::VERTEX,
            },
        ));
        self.instance_count = self.instance_data.len() as u32;

        Ok(())
    }

    fn render(&mut self, ctx: &RenderContext<'_>, pass: &mut wgpu::RenderPass<'_>) {
        let (Some(pipeline), Some(instances)) = (&self.pipeline, &self.instances) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, ctx.globals_bind_group, &[]);
        pass.set_vertex_buffer(0, instances.slice(..));
        pass.draw(0..4, 0..self.instance_count);
    }

    fn render_pick(&mut self, ctx: &RenderContext<'_>, pass: &mut wgpu::RenderPass<'_>) {
        let (Some(pipeline), Some(instances)) = (&self.pick_pipeline, &self.instances) else {
            return;
        };
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, ctx.globals_bind_group, &[]);
        pass.set_vertex_buffer(0, instances.slice(..));
        pass.draw(0..4, 0..self.instance_count);
    }

    fn hit_test(&self, camera: &Camera, x: f32, y: f32) -> Option<SeriesHit> {
        let mut best: Option<SeriesHit> = None;

        for (i, point) in self.points.iter().enumerate() {
            let Some(screen) = camera.world_to_screen(point.position) else {
                continue;
            };
            let dx = screen[0] - x;
            let dy = screen[1] - y;
            let distance = (dx * dx + dy * dy).sqrt();
            if distance > point.size.max(MIN_HIT_RADIUS) {
                continue;
            }
            if best.as_ref().is_none_or(|b| distance < b.distance) {
                best = Some(SeriesHit {
                    index: i,
                    label: point.label.clone(),
                    distance,
                });
            }
        }

        best
    }

    fn datum_at(&self, index: usize) -> Option<SeriesHit> {
        self.points.get(index).map(|point| SeriesHit {
            index,
            label: point.label.clone(),
            distance: 0.0,
        })
    }

    fn dispose(&mut self) {
        self.pipeline = None;
        self.pick_pipeline = None;
        self.instances = None;
        self.instance_count = 0;
        self.instance_data.clear();
        self.points.clear();
    }
}
