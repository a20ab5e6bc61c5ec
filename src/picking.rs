//! GPU picking: encode object ids as colors, render them offscreen, read
//! one pixel back
//!
//! Hit-testing complex or overlapping geometry by CPU intersection is
//! expensive; instead the scene is re-rendered into an offscreen target
//! with every drawable colored by its id, and `pick` reads a single pixel.
//! Blending must stay disabled in pick pipelines and the target must be a
//! non-sRGB format, otherwise the id bytes come back altered.

use crate::gpu::RenderTarget;

/// Largest encodable pick id (24 bits across three color channels).
pub const MAX_PICK_ID: u32 = 0x00FF_FFFF;

/// Encode an id into an RGBA color, one byte per channel.
///
/// The id occupies red (lowest byte), green, and blue; alpha is always
/// 255 so a cleared pixel (alpha 0) is distinguishable from id 0.
#[inline]
pub fn id_to_color(id: u32) -> [u8; 4] {
    [
        (id & 0xFF) as u8,
        ((id >> 8) & 0xFF) as u8,
        ((id >> 16) & 0xFF) as u8,
        255,
    ]
}

/// Encoded pick color as normalized floats for instance buffers.
#[inline]
pub fn id_to_color_f32(id: u32) -> [f32; 4] {
    let [r, g, b, a] = id_to_color(id);
    [
        f32::from(r) / 255.0,
        f32::from(g) / 255.0,
        f32::from(b) / 255.0,
        f32::from(a) / 255.0,
    ]
}

/// Decode a pixel back into a pick id.
///
/// A fully transparent pixel is the background and decodes to `None`.
#[inline]
pub fn color_to_id(color: [u8; 4]) -> Option<u32> {
    if color[3] == 0 {
        return None;
    }
    Some(u32::from(color[0]) + u32::from(color[1]) * 256 + u32::from(color[2]) * 65536)
}

/// Offscreen framebuffer holding the most recent id render.
///
/// Sized in device pixels. The color format is plain `Rgba8Unorm`; an
/// sRGB view would gamma-encode the id bytes on write.
pub struct PickBuffer {
    target: RenderTarget,
    pixel_ratio: f32,
}

impl PickBuffer {
    /// Color format pick pipelines must render into.
    pub const FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

    /// Allocate a pick buffer for a canvas of `width` × `height` logical
    /// pixels at the given device pixel ratio.
    pub fn new(device: &wgpu::Device, width: u32, height: u32, pixel_ratio: f32) -> Self {
        let (dw, dh) = device_dims(width, height, pixel_ratio);
        Self {
            target: RenderTarget::new(device, "pick buffer", dw.max(1), dh.max(1), Self::FORMAT),
            pixel_ratio,
        }
    }

    /// Begin the id render pass, clearing to transparent black.
    ///
    /// Transparent black is the no-hit background: alpha 0 decodes to
    /// `None` no matter what ends up in the color channels.
    pub fn begin<'a>(&self, encoder: &'a mut wgpu::CommandEncoder) -> wgpu::RenderPass<'a> {
        self.target.begin_pass(encoder, wgpu::Color::TRANSPARENT)
    }

    /// Update the device pixel ratio used for sizing and coordinate
    /// scaling. Takes effect at the next `resize`.
    pub fn set_pixel_ratio(&mut self, pixel_ratio: f32) {
        if pixel_ratio > 0.0 {
            self.pixel_ratio = pixel_ratio;
        }
    }

    /// Reallocate at new logical dimensions.
    ///
    /// A zero dimension is ignored and the previous attachment stays
    /// valid, so callers may forward window events without filtering.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        let (dw, dh) = device_dims(width, height, self.pixel_ratio);
        self.target.resize(device, dw, dh);
    }

    /// Read the id under a logical-pixel coordinate.
    ///
    /// The coordinate is scaled by the device pixel ratio before the
    /// readback. Out-of-range coordinates and background pixels both
    /// yield `None`.
    pub fn pick(
        &self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        x: f32,
        y: f32,
    ) -> Option<u32> {
        if x < 0.0 || y < 0.0 {
            return None;
        }
        let px = (x * self.pixel_ratio).round() as u32;
        let py = (y * self.pixel_ratio).round() as u32;

        let pixel = self.target.read_pixel(device, queue, px, py)?;
        color_to_id(pixel)
    }

    /// Device-pixel width of the buffer
    pub fn width(&self) -> u32 {
        self.target.width()
    }

    /// Device-pixel height of the buffer
    pub fn height(&self) -> u32 {
        self.target.height()
    }
}

fn device_dims(width: u32, height: u32, pixel_ratio: f32) -> (u32, u32) {
    (
        (width as f32 * pixel_ratio).round() as u32,
        (height as f32 * pixel_ratio).round() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::test_context;

    #[test]
    fn id_encoding_round_trips_for_every_id() {
        for id in 0..=MAX_PICK_ID {
            let color = id_to_color(id);
            assert_eq!(color[3], 255);
            assert_eq!(color_to_id(color), Some(id));
        }
    }

    #[test]
    fn known_encodings() {
        assert_eq!(id_to_color(0), [0, 0, 0, 255]);
        assert_eq!(id_to_color(255), [255, 0, 0, 255]);
        assert_eq!(id_to_color(256), [0, 1, 0, 255]);
        assert_eq!(id_to_color(65536), [0, 0, 1, 255]);
        assert_eq!(id_to_color(MAX_PICK_ID), [255, 255, 255, 255]);
    }

    #[test]
    fn transparent_pixel_is_no_hit() {
        assert_eq!(color_to_id([0, 0, 0, 0]), None);
        // Color channels are irrelevant once alpha is zero.
        assert_eq!(color_to_id([17, 34, 51, 0]), None);
    }

    #[test]
    fn float_encoding_survives_quantization() {
        for id in [0, 1, 255, 256, 65535, 65536, 1_000_000, MAX_PICK_ID] {
            let f = id_to_color_f32(id);
            let back = [
                (f[0] * 255.0).round() as u8,
                (f[1] * 255.0).round() as u8,
                (f[2] * 255.0).round() as u8,
                (f[3] * 255.0).round() as u8,
            ];
            assert_eq!(color_to_id(back), Some(id));
        }
    }

    #[test]
    fn cleared_buffer_picks_nothing() {
        let Some(ctx) = test_context() else { return };
        let buffer = PickBuffer::new(ctx.device(), 64, 48, 1.0);

        let mut encoder = ctx
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
        {
            let _pass = buffer.begin(&mut encoder);
        }
        ctx.queue().submit(std::iter::once(encoder.finish()));

        assert_eq!(buffer.pick(ctx.device(), ctx.queue(), 32.0, 24.0), None);
    }

    #[test]
    fn zero_dimension_resize_is_a_no_op() {
        let Some(ctx) = test_context() else { return };
        let mut buffer = PickBuffer::new(ctx.device(), 64, 48, 1.0);

        buffer.resize(ctx.device(), 0, 300);
        assert_eq!((buffer.width(), buffer.height()), (64, 48));

        buffer.resize(ctx.device(), 300, 0);
        assert_eq!((buffer.width(), buffer.height()), (64, 48));

        // Still usable after the rejected resize.
        assert_eq!(buffer.pick(ctx.device(), ctx.queue(), 1.0, 1.0), None);
    }

    #[test]
    fn pixel_ratio_scales_the_attachment() {
        let Some(ctx) = test_context() else { return };
        let buffer = PickBuffer::new(ctx.device(), 100, 50, 2.0);
        assert_eq!((buffer.width(), buffer.height()), (200, 100));
    }

    #[test]
    fn negative_coordinates_pick_nothing() {
        let Some(ctx) = test_context() else { return };
        let buffer = PickBuffer::new(ctx.device(), 32, 32, 1.0);
        assert_eq!(buffer.pick(ctx.device(), ctx.queue(), -1.0, 5.0), None);
        assert_eq!(buffer.pick(ctx.device(), ctx.queue(), 5.0, -0.5), None);
    }
}
