//! Vertex/index buffer upload and attribute layout helpers

use wgpu::util::DeviceExt;

/// An uploaded mesh: one vertex buffer plus one index buffer.
///
/// The index element type is chosen from the vertex count. Meshes with at
/// most 65535 vertices use 16-bit indices; anything larger switches to
/// 32-bit so indices cannot wrap around silently.
pub struct MeshBuffer {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_format: wgpu::IndexFormat,
    index_count: u32,
    vertex_count: u32,
}

impl MeshBuffer {
    /// Upload vertex and index data to the device.
    pub fn new<V: bytemuck::Pod>(
        device: &wgpu::Device,
        label: &str,
        vertices: &[V],
        indices: &[u32],
    ) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&format!("{label} vertices")),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let (index_buffer, index_format) = if vertices.len() <= u16::MAX as usize {
            let narrow: Vec<u16> = indices.iter().map(|&i| i as u16).collect();
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indices")),
                contents: bytemuck::cast_slice(&narrow),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, wgpu::IndexFormat::Uint16)
        } else {
            let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&format!("{label} indices")),
                contents: bytemuck::cast_slice(indices),
                usage: wgpu::BufferUsages::INDEX,
            });
            (buffer, wgpu::IndexFormat::Uint32)
        };

        Self {
            vertex_buffer,
            index_buffer,
            index_format,
            index_count: indices.len() as u32,
            vertex_count: vertices.len() as u32,
        }
    }

    /// Bind this mesh to slot 0 of a render pass.
    pub fn bind(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), self.index_format);
    }

    /// Number of indices in the mesh
    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Number of vertices in the mesh
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Element type of the index buffer
    pub fn index_format(&self) -> wgpu::IndexFormat {
        self.index_format
    }
}

/// A tightly packed float vertex layout computed from
/// `(shader_location, component_count)` pairs.
///
/// Offsets and the overall stride are derived from the declaration order,
/// so a layout declared as `[(0, 3), (1, 4)]` is a 28-byte vertex with a
/// `vec3<f32>` at offset 0 and a `vec4<f32>` at offset 12.
pub struct VertexLayout {
    attributes: Vec<wgpu::VertexAttribute>,
    stride: u64,
}

impl VertexLayout {
    /// Build a layout from `(shader_location, component_count)` pairs.
    ///
    /// Component counts must be 1 through 4; anything else is a programming
    /// error in the caller's vertex declaration.
    pub fn new(fields: &[(u32, u32)]) -> Self {
        let mut attributes = Vec::with_capacity(fields.len());
        let mut offset = 0u64;

        for &(location, components) in fields {
            attributes.push(wgpu::VertexAttribute {
                format: float_format(components),
                offset,
                shader_location: location,
            });
            offset += u64::from(components) * 4;
        }

        Self {
            attributes,
            stride: offset,
        }
    }

    /// Total byte stride of one vertex
    pub fn stride(&self) -> u64 {
        self.stride
    }

    /// Borrow as the wgpu descriptor with the given step mode.
    pub fn buffer_layout(&self, step_mode: wgpu::VertexStepMode) -> wgpu::VertexBufferLayout<'_> {
        wgpu::VertexBufferLayout {
            array_stride: self.stride,
            step_mode,
            attributes: &self.attributes,
        }
    }
}

fn float_format(components: u32) -> wgpu::VertexFormat {
    match components {
        1 => wgpu::VertexFormat::Float32,
        2 => wgpu::VertexFormat::Float32x2,
        3 => wgpu::VertexFormat::Float32x3,
        4 => wgpu::VertexFormat::Float32x4,
        n => panic!("unsupported component count: {n}"),
    }
}
