//! Offscreen render target with color and depth attachments

/// Depth format shared by every pipeline that renders into a [`RenderTarget`].
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// An offscreen framebuffer: color texture, depth texture, and a staging
/// buffer for CPU readback.
///
/// Both the visual target and the pick target are instances of this type;
/// they differ only in color format and clear color.
pub struct RenderTarget {
    label: String,
    color: wgpu::Texture,
    color_view: wgpu::TextureView,
    depth_view: wgpu::TextureView,
    staging: wgpu::Buffer,
    pixel_staging: wgpu::Buffer,
    format: wgpu::TextureFormat,
    width: u32,
    height: u32,
}

impl RenderTarget {
    /// Allocate attachments at the given pixel dimensions.
    pub fn new(
        device: &wgpu::Device,
        label: &str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Self {
        let (color, color_view, depth_view, staging) =
            create_attachments(device, label, width, height, format);

        let pixel_staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{label} pixel staging")),
            size: 4,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Self {
            label: label.to_string(),
            color,
            color_view,
            depth_view,
            staging,
            pixel_staging,
            format,
            width,
            height,
        }
    }

    /// Reallocate attachments at new dimensions.
    ///
    /// A zero dimension leaves the target untouched; a zero-sized
    /// attachment would make every later read or draw invalid. Resizing to
    /// the current size is also a no-op.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if width == self.width && height == self.height {
            return;
        }

        let (color, color_view, depth_view, staging) =
            create_attachments(device, &self.label, width, height, self.format);
        self.color = color;
        self.color_view = color_view;
        self.depth_view = depth_view;
        self.staging = staging;
        self.width = width;
        self.height = height;
    }

    /// Begin a render pass that clears both attachments.
    pub fn begin_pass<'a>(
        &self,
        encoder: &'a mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'a> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some(&self.label),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations {
                    load: wgpu::LoadOp::Clear(1.0),
                    store: wgpu::StoreOp::Store,
                }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    /// Read the full color attachment back to the CPU.
    ///
    /// Blocks until the GPU has finished and returns tightly packed RGBA
    /// data (width × height × 4 bytes), row padding stripped.
    pub fn read_pixels(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Vec<u8> {
        // Rows in the staging buffer are padded to COPY_BYTES_PER_ROW_ALIGNMENT.
        let unpadded_bytes_per_row = self.width * 4;
        let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
        let padded_bytes_per_row = unpadded_bytes_per_row.div_ceil(align) * align;

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("readback encoder"),
        });

        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );

        queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().unwrap();

        let data = buffer_slice.get_mapped_range();

        let mut pixels = Vec::with_capacity((self.width * self.height * 4) as usize);
        for y in 0..self.height {
            let start = (y * padded_bytes_per_row) as usize;
            let end = start + unpadded_bytes_per_row as usize;
            pixels.extend_from_slice(&data[start..end]);
        }

        drop(data);
        self.staging.unmap();

        pixels
    }

    /// Read a single pixel of the color attachment.
    ///
    /// Returns `None` when the coordinate lies outside the attachment.
    pub fn read_pixel(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        x: u32,
        y: u32,
    ) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("pixel readback encoder"),
        });

        // Single-row copies do not require an aligned bytes_per_row.
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.color,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.pixel_staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: None,
                    rows_per_image: None,
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );

        queue.submit(std::iter::once(encoder.finish()));

        let buffer_slice = self.pixel_staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        buffer_slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        rx.recv().unwrap().unwrap();

        let data = buffer_slice.get_mapped_range();
        let pixel = [data[0], data[1], data[2], data[3]];
        drop(data);
        self.pixel_staging.unmap();

        Some(pixel)
    }

    /// Color format of the target
    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    /// Width in pixels
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels
    pub fn height(&self) -> u32 {
        self.height
    }
}

fn create_attachments(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::TextureView, wgpu::Buffer) {
    let size = wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    };

    let color = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let color_view = color.create_view(&wgpu::TextureViewDescriptor::default());

    let depth = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(&format!("{label} depth")),
        size,
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let depth_view = depth.create_view(&wgpu::TextureViewDescriptor::default());

    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    let padded_bytes_per_row = (width * 4).div_ceil(align) * align;
    let staging = device.create_buffer(&wgpu::BufferDescriptor {
        label: Some(&format!("{label} staging")),
        size: u64::from(padded_bytes_per_row) * u64::from(height),
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    });

    (color, color_view, depth_view, staging)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_context;

    #[test]
    fn fresh_target_reads_back_zeroed() {
        let Some(ctx) = test_context() else { return };
        let target = RenderTarget::new(
            ctx.device(),
            "test",
            64,
            48,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        let pixels = target.read_pixels(ctx.device(), ctx.queue());
        assert_eq!(pixels.len(), 64 * 48 * 4);
        assert!(pixels.iter().all(|&b| b == 0));
    }

    #[test]
    fn clear_color_round_trips() {
        let Some(ctx) = test_context() else { return };
        let target = RenderTarget::new(
            ctx.device(),
            "test",
            16,
            16,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let _pass = target.begin_pass(
                &mut encoder,
                wgpu::Color {
                    r: 1.0,
                    g: 0.0,
                    b: 0.0,
                    a: 1.0,
                },
            );
        }
        ctx.queue().submit(std::iter::once(encoder.finish()));

        let pixel = target.read_pixel(ctx.device(), ctx.queue(), 8, 8);
        assert_eq!(pixel, Some([255, 0, 0, 255]));
    }

    #[test]
    fn resize_with_zero_dimension_is_a_no_op() {
        let Some(ctx) = test_context() else { return };
        let mut target = RenderTarget::new(
            ctx.device(),
            "test",
            64,
            48,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        target.resize(ctx.device(), 0, 300);
        assert_eq!((target.width(), target.height()), (64, 48));

        target.resize(ctx.device(), 300, 0);
        assert_eq!((target.width(), target.height()), (64, 48));

        // Prior attachments still work after the rejected resize.
        let pixels = target.read_pixels(ctx.device(), ctx.queue());
        assert_eq!(pixels.len(), 64 * 48 * 4);
    }

    #[test]
    fn resize_reallocates_attachments() {
        let Some(ctx) = test_context() else { return };
        let mut target = RenderTarget::new(
            ctx.device(),
            "test",
            64,
            48,
            wgpu::TextureFormat::Rgba8Unorm,
        );

        target.resize(ctx.device(), 100, 80);
        assert_eq!((target.width(), target.height()), (100, 80));

        let pixels = target.read_pixels(ctx.device(), ctx.queue());
        assert_eq!(pixels.len(), 100 * 80 * 4);
    }

    #[test]
    fn out_of_bounds_pixel_read_returns_none() {
        let Some(ctx) = test_context() else { return };
        let target = RenderTarget::new(
            ctx.device(),
            "test",
            32,
            32,
            wgpu::TextureFormat::Rgba8Unorm,
        );
        assert_eq!(target.read_pixel(ctx.device(), ctx.queue(), 32, 0), None);
        assert_eq!(target.read_pixel(ctx.device(), ctx.queue(), 0, 32), None);
    }
}
