//! WGSL render shaders for the built-in series types
//!
//! Contains vertex and fragment shaders for 3D point billboards and for
//! the 2D force-graph nodes and edges. Every module shares the `Globals`
//! uniform block; pick pipelines reuse the vertex shaders and swap in a
//! fragment entry point that writes the encoded pick color.

use bytemuck::{Pod, Zeroable};

/// CPU-side layout of the `Globals` uniform block.
///
/// Field order and padding must match the WGSL declaration in
/// [`GLOBALS_UNIFORMS`].
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Globals {
    /// Combined projection × view matrix, column-major
    pub proj_view: [f32; 16],
    /// Canvas size in logical pixels
    pub viewport: [f32; 2],
    /// Entry animation progress in [0, 1]
    pub progress: f32,
    pub _pad: f32,
}

/// Globals uniform struct used by all render shaders
pub const GLOBALS_UNIFORMS: &str = r#"
struct Globals {
    proj_view: mat4x4<f32>,
    viewport: vec2<f32>,
    progress: f32,
    _pad: f32,
}

@group(0) @binding(0) var<uniform> globals: Globals;
"#;

/// Point shader for instanced billboard quads
///
/// Each instance is one data point; the quad corner comes from the vertex
/// index (triangle strip order). Points keep a constant pixel size under
/// perspective because the corner offset is scaled by clip w before the
/// divide.
pub const POINT_SHADER: &str = r#"
struct PointInstance {
    @location(0) world_pos: vec3<f32>,
    @location(1) size: f32,
    @location(2) color: vec4<f32>,
    @location(3) pick_color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) pick_color: vec4<f32>,
}

@vertex
fn vs_point(
    @builtin(vertex_index) vertex_idx: u32,
    instance: PointInstance,
) -> VertexOutput {
    var out: VertexOutput;

    // Quad corner in [-1, 1] from the vertex index
    let corner = vec2<f32>(
        f32(vertex_idx & 1u) * 2.0 - 1.0,
        f32((vertex_idx >> 1u) & 1u) * 2.0 - 1.0,
    );

    let clip = globals.proj_view * vec4<f32>(instance.world_pos, 1.0);

    // Entry animation grows points from zero
    let radius = instance.size * globals.progress;
    let offset = corner * radius * 2.0 / globals.viewport * clip.w;

    out.clip_position = vec4<f32>(clip.xy + offset, clip.zw);
    out.uv = corner;
    out.color = instance.color;
    out.pick_color = instance.pick_color;

    return out;
}

struct FragmentInput {
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) pick_color: vec4<f32>,
}

@fragment
fn fs_point(in: FragmentInput) -> @location(0) vec4<f32> {
    // Circular mask inside the quad
    if (dot(in.uv, in.uv) > 1.0) {
        discard;
    }
    return in.color;
}

@fragment
fn fs_point_pick(in: FragmentInput) -> @location(0) vec4<f32> {
    if (dot(in.uv, in.uv) > 1.0) {
        discard;
    }
    return in.pick_color;
}
"#;

/// Graph node shader for instanced 2D circles
///
/// The force layout runs in screen space, so node positions arrive in
/// pixels and are mapped straight to NDC (pixel y grows downward).
pub const GRAPH_NODE_SHADER: &str = r#"
struct NodeInstance {
    @location(0) position: vec2<f32>,
    @location(1) radius: f32,
    @location(2) color: vec4<f32>,
    @location(3) pick_color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) pick_color: vec4<f32>,
}

@vertex
fn vs_node(
    @builtin(vertex_index) vertex_idx: u32,
    instance: NodeInstance,
) -> VertexOutput {
    var out: VertexOutput;

    let corner = vec2<f32>(
        f32(vertex_idx & 1u) * 2.0 - 1.0,
        f32((vertex_idx >> 1u) & 1u) * 2.0 - 1.0,
    );

    let radius = instance.radius * globals.progress;
    let pos = instance.position + corner * radius;

    // Pixel coordinates to NDC with the y axis flipped
    let ndc = vec2<f32>(
        pos.x / globals.viewport.x * 2.0 - 1.0,
        1.0 - pos.y / globals.viewport.y * 2.0,
    );

    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    out.uv = corner;
    out.color = instance.color;
    out.pick_color = instance.pick_color;

    return out;
}

struct FragmentInput {
    @location(0) uv: vec2<f32>,
    @location(1) color: vec4<f32>,
    @location(2) pick_color: vec4<f32>,
}

@fragment
fn fs_node(in: FragmentInput) -> @location(0) vec4<f32> {
    if (dot(in.uv, in.uv) > 1.0) {
        discard;
    }
    return in.color;
}

@fragment
fn fs_node_pick(in: FragmentInput) -> @location(0) vec4<f32> {
    if (dot(in.uv, in.uv) > 1.0) {
        discard;
    }
    return in.pick_color;
}
"#;

/// Graph edge shader for line rendering
///
/// Each edge instance provides start and end positions in pixels.
/// Vertex index 0 = start, vertex index 1 = end.
pub const GRAPH_EDGE_SHADER: &str = r#"
struct EdgeInstance {
    @location(0) start: vec2<f32>,
    @location(1) end: vec2<f32>,
    @location(2) color: vec4<f32>,
}

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) color: vec4<f32>,
}

@vertex
fn vs_edge(
    @builtin(vertex_index) vertex_idx: u32,
    instance: EdgeInstance,
) -> VertexOutput {
    var out: VertexOutput;

    var pos: vec2<f32>;
    if (vertex_idx == 0u) {
        pos = instance.start;
    } else {
        pos = instance.end;
    }

    let ndc = vec2<f32>(
        pos.x / globals.viewport.x * 2.0 - 1.0,
        1.0 - pos.y / globals.viewport.y * 2.0,
    );

    out.clip_position = vec4<f32>(ndc, 0.0, 1.0);
    out.color = instance.color;

    return out;
}

struct FragmentInput {
    @location(0) color: vec4<f32>,
}

@fragment
fn fs_edge(in: FragmentInput) -> @location(0) vec4<f32> {
    return in.color;
}
"#;

/// Get the complete point shader source
pub fn point_shader() -> String {
    format!("{GLOBALS_UNIFORMS}\n{POINT_SHADER}")
}

/// Get the complete graph node shader source
pub fn graph_node_shader() -> String {
    format!("{GLOBALS_UNIFORMS}\n{GRAPH_NODE_SHADER}")
}

/// Get the complete graph edge shader source
pub fn graph_edge_shader() -> String {
    format!("{GLOBALS_UNIFORMS}\n{GRAPH_EDGE_SHADER}")
}

/// Bind group layout for the shared `Globals` uniform at group 0, binding 0.
pub fn globals_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("globals layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}
