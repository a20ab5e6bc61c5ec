//! Chart facade: the host-facing surface of the engine
//!
//! A [`Chart`] owns the camera, orbit controls, render targets, and one
//! renderer per series, and sequences them through the injected frame
//! scheduler. Input events and data updates mutate state and mark the
//! scene dirty; the host then delivers frames via [`Chart::on_frame`],
//! which advances animation, renders when anything changed, and keeps
//! the loop armed only while motion remains.

use bytemuck::bytes_of;

use crate::camera::Camera;
use crate::data::{ChartData, SeriesData};
use crate::error::{RenderError, RenderResult};
use crate::frame::{FrameLoop, FrameScheduler};
use crate::gpu::{GpuContext, RenderTarget, shaders};
use crate::math::Vec3;
use crate::orbit::{OrbitControls, OrbitOptions, PointerButton};
use crate::picking::PickBuffer;
use crate::series::{RenderContext, SeriesHit, SeriesRegistry, SeriesRenderer};
use crate::theme::Theme;

/// Color format of the visual target.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// Construction-time chart configuration.
#[derive(Debug, Clone)]
pub struct ChartOptions {
    /// Canvas width in logical pixels
    pub width: u32,
    /// Canvas height in logical pixels
    pub height: u32,
    /// Device pixels per logical pixel
    pub pixel_ratio: f32,
    pub theme: Theme,
    pub orbit: OrbitOptions,
    /// Entry animation length in milliseconds; 0 disables it
    pub enter_duration_ms: f64,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl ChartOptions {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            pixel_ratio: 1.0,
            theme: Theme::default(),
            orbit: OrbitOptions::default(),
            enter_duration_ms: 500.0,
        }
    }

    /// Set the device pixel ratio
    pub fn with_pixel_ratio(mut self, pixel_ratio: f32) -> Self {
        self.pixel_ratio = pixel_ratio.max(0.1);
        self
    }

    /// Set the theme
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Set the orbit controller options
    pub fn with_orbit(mut self, orbit: OrbitOptions) -> Self {
        self.orbit = orbit;
        self
    }

    /// Set the entry animation length (0 disables it)
    pub fn with_enter_duration(mut self, ms: f64) -> Self {
        self.enter_duration_ms = ms.max(0.0);
        self
    }
}

/// A datum resolved by [`Chart::data_at_point`].
#[derive(Debug, Clone, PartialEq)]
pub struct DataPoint {
    /// Index of the series in the last `update` payload
    pub series: usize,
    /// Index of the datum within that series
    pub index: usize,
    /// Label from the input data, when present
    pub label: Option<String>,
}

struct SeriesSlot {
    kind: String,
    renderer: Box<dyn SeriesRenderer>,
    pick_base: u32,
    count: u32,
}

/// Renderer chosen for one incoming series: an existing slot (by index)
/// whose retained state carries over, or a fresh registry build.
enum SlotSource {
    Existing(usize),
    Fresh(Box<dyn SeriesRenderer>),
}

/// One chart instance: camera, interaction, series, targets, frame loop.
pub struct Chart {
    gpu: GpuContext,
    options: ChartOptions,
    registry: SeriesRegistry,

    camera: Camera,
    orbit: OrbitControls,

    target: RenderTarget,
    pick: PickBuffer,
    globals_buffer: wgpu::Buffer,
    globals_layout: wgpu::BindGroupLayout,
    globals_bind_group: wgpu::BindGroup,

    slots: Vec<SeriesSlot>,
    frame_loop: FrameLoop,

    enter_pending: bool,
    enter_start: Option<f64>,
    last_progress: f32,
    destroyed: bool,
}

impl Chart {
    /// Create a chart over an acquired GPU context.
    ///
    /// The registry decides which series kinds this chart can draw and
    /// the scheduler connects it to the host's frame source.
    pub fn new(
        gpu: GpuContext,
        registry: SeriesRegistry,
        scheduler: Box<dyn FrameScheduler>,
        options: ChartOptions,
    ) -> Self {
        let device = gpu.device();

        let camera = Camera::new(options.width as f32, options.height as f32);
        let orbit = OrbitControls::new(options.orbit.clone());

        let (dw, dh) = (
            ((options.width as f32) * options.pixel_ratio).round() as u32,
            ((options.height as f32) * options.pixel_ratio).round() as u32,
        );
        let target = RenderTarget::new(device, "chart target", dw.max(1), dh.max(1), TARGET_FORMAT);
        let pick = PickBuffer::new(device, options.width, options.height, options.pixel_ratio);

        let globals_layout = shaders::globals_layout(device);
        let globals_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("globals"),
            size: std::mem::size_of::<shaders::Globals>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let globals_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("globals bind group"),
            layout: &globals_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: globals_buffer.as_entire_binding(),
            }],
        });

        Self {
            gpu,
            options,
            registry,
            camera,
            orbit,
            target,
            pick,
            globals_buffer,
            globals_layout,
            globals_bind_group,
            slots: Vec::new(),
            frame_loop: FrameLoop::new(scheduler),
            enter_pending: false,
            enter_start: None,
            last_progress: 1.0,
            destroyed: false,
        }
    }

    /// Current camera state
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Orbit controller state
    pub fn orbit(&self) -> &OrbitControls {
        &self.orbit
    }

    /// Whether `destroy` has been called
    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Whether a frame request is outstanding
    pub fn is_loop_armed(&self) -> bool {
        self.frame_loop.is_armed()
    }

    // ===== Host API =====

    /// Replace the chart's data.
    ///
    /// Renderers are kept across updates when the series kind is
    /// unchanged, so a graph whose topology did not change keeps its
    /// layout positions. A rejected payload (unknown series kind, or a
    /// renderer that fails to prepare) returns the error with the
    /// previous scene left in place.
    pub fn update(&mut self, data: &ChartData) -> RenderResult<()> {
        if self.destroyed {
            return Err(RenderError::Destroyed);
        }

        // Validate the payload before touching any state.
        for series in &data.series {
            let kind = series.data.kind();
            if !self.registry.contains(kind) {
                return Err(RenderError::UnknownSeries(kind.to_string()));
            }
        }

        // Pair every series with a renderer: the first unclaimed slot of
        // the same kind is reused so its retained state survives, the
        // rest come fresh from the registry. Pick-id bases are cumulative
        // datum counts across the payload.
        let mut claimed = vec![false; self.slots.len()];
        let mut sources = Vec::with_capacity(data.series.len());
        let mut bases = Vec::with_capacity(data.series.len());
        let mut counts = Vec::with_capacity(data.series.len());
        let mut next_base = 0u32;

        for series in &data.series {
            let kind = series.data.kind();
            let count = match &series.data {
                SeriesData::Points { points } => points.len(),
                SeriesData::Graph { nodes, .. } => nodes.len(),
            } as u32;
            bases.push(next_base);
            counts.push(count);
            next_base += count;

            let existing = self
                .slots
                .iter()
                .enumerate()
                .find(|(i, slot)| !claimed[*i] && slot.kind == kind)
                .map(|(i, _)| i);
            sources.push(match existing {
                Some(i) => {
                    claimed[i] = true;
                    SlotSource::Existing(i)
                }
                None => SlotSource::Fresh(self.registry.create(kind)?),
            });
        }

        // Prepare while the old slot list is still whole, so an error
        // from any renderer hands the previous scene back. The context
        // borrows individual fields here: renderers still inside
        // `self.slots` need `&mut` access at the same time.
        for (i, series) in data.series.iter().enumerate() {
            let ctx = RenderContext {
                gpu: &self.gpu,
                globals_layout: &self.globals_layout,
                globals_bind_group: &self.globals_bind_group,
                target_format: TARGET_FORMAT,
                pick_format: PickBuffer::FORMAT,
                camera: &self.camera,
                theme: &self.options.theme,
                pixel_ratio: self.options.pixel_ratio,
                progress: self.last_progress,
                pick_base: bases[i],
            };
            match &mut sources[i] {
                SlotSource::Existing(slot) => {
                    let slot = *slot;
                    self.slots[slot].renderer.prepare(&ctx, series)?;
                }
                SlotSource::Fresh(renderer) => renderer.prepare(&ctx, series)?,
            }
        }

        // Everything prepared; swap the slot list and dispose leftovers.
        let first_data = self.slots.is_empty();
        let mut old_slots: Vec<Option<SeriesSlot>> =
            std::mem::take(&mut self.slots).into_iter().map(Some).collect();
        let mut new_slots = Vec::with_capacity(data.series.len());
        for (i, (source, series)) in sources.into_iter().zip(&data.series).enumerate() {
            let renderer = match source {
                SlotSource::Existing(slot) => old_slots[slot].take().map(|s| s.renderer),
                SlotSource::Fresh(renderer) => Some(renderer),
            };
            if let Some(renderer) = renderer {
                new_slots.push(SeriesSlot {
                    kind: series.data.kind().to_string(),
                    renderer,
                    pick_base: bases[i],
                    count: counts[i],
                });
            }
        }
        for mut slot in old_slots.into_iter().flatten() {
            slot.renderer.dispose();
        }
        self.slots = new_slots;

        if first_data && !self.slots.is_empty() && self.options.enter_duration_ms > 0.0 {
            self.enter_pending = true;
            self.enter_start = None;
        }

        tracing::debug!(series = self.slots.len(), "chart data updated");
        self.frame_loop.mark_dirty();
        Ok(())
    }

    /// Resize the canvas, adopting a new device pixel ratio.
    ///
    /// A zero dimension is ignored, as is a non-positive ratio.
    pub fn resize(&mut self, width: u32, height: u32, pixel_ratio: f32) {
        if self.destroyed || width == 0 || height == 0 {
            return;
        }

        self.options.width = width;
        self.options.height = height;
        if pixel_ratio > 0.0 {
            self.options.pixel_ratio = pixel_ratio;
        }
        self.camera.update(width as f32, height as f32);

        let device = self.gpu.device();
        let ratio = self.options.pixel_ratio;
        let dw = ((width as f32) * ratio).round() as u32;
        let dh = ((height as f32) * ratio).round() as u32;
        self.target.resize(device, dw, dh);
        self.pick.set_pixel_ratio(ratio);
        self.pick.resize(device, width, height);

        tracing::debug!(width, height, ratio, "chart resized");
        self.frame_loop.mark_dirty();
    }

    /// Move the camera, preserving its target.
    pub fn set_camera_position(&mut self, position: Vec3) {
        if self.destroyed {
            return;
        }
        self.orbit.set_position(position);
        self.frame_loop.mark_dirty();
    }

    /// Re-aim the camera at a new target, preserving its position.
    pub fn set_camera_target(&mut self, target: Vec3) {
        if self.destroyed {
            return;
        }
        self.orbit.set_target(target);
        self.frame_loop.mark_dirty();
    }

    /// The datum under a screen coordinate, if any.
    ///
    /// Tries the GPU pick buffer first; when no id is under the cursor
    /// it falls back to CPU hit testing across all series, keeping the
    /// nearest match.
    pub fn data_at_point(&mut self, x: f32, y: f32) -> Option<DataPoint> {
        if self.destroyed {
            return None;
        }

        if let Some(hit) = self.pick_at(x, y) {
            return Some(hit);
        }

        let mut best: Option<(usize, SeriesHit)> = None;
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(hit) = slot.renderer.hit_test(&self.camera, x, y) {
                if best.as_ref().is_none_or(|(_, b)| hit.distance < b.distance) {
                    best = Some((i, hit));
                }
            }
        }
        best.map(|(series, hit)| DataPoint {
            series,
            index: hit.index,
            label: hit.label,
        })
    }

    /// Tear the chart down: cancel the pending frame and release series
    /// resources. Afterwards `update` fails and other operations no-op.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.frame_loop.cancel();
        for slot in &mut self.slots {
            slot.renderer.dispose();
        }
        self.slots.clear();
        self.destroyed = true;
        tracing::debug!("chart destroyed");
    }

    // ===== Input events =====

    pub fn pointer_down(&mut self, x: f32, y: f32, button: PointerButton) {
        if self.destroyed {
            return;
        }
        self.orbit.pointer_down(x, y, button);
        self.frame_loop.mark_dirty();
    }

    pub fn pointer_move(&mut self, x: f32, y: f32) {
        if self.destroyed {
            return;
        }
        self.orbit.pointer_move(x, y);
        self.frame_loop.mark_dirty();
    }

    pub fn pointer_up(&mut self) {
        if self.destroyed {
            return;
        }
        self.orbit.pointer_up();
        self.frame_loop.mark_dirty();
    }

    pub fn wheel(&mut self, delta: f32) {
        if self.destroyed {
            return;
        }
        self.orbit.wheel(delta);
        self.frame_loop.mark_dirty();
    }

    pub fn touch_start(&mut self, touches: &[[f32; 2]]) {
        if self.destroyed {
            return;
        }
        self.orbit.touch_start(touches);
        self.frame_loop.mark_dirty();
    }

    pub fn touch_move(&mut self, touches: &[[f32; 2]]) {
        if self.destroyed {
            return;
        }
        self.orbit.touch_move(touches);
        self.frame_loop.mark_dirty();
    }

    pub fn touch_end(&mut self, touches: &[[f32; 2]]) {
        if self.destroyed {
            return;
        }
        self.orbit.touch_end(touches);
        self.frame_loop.mark_dirty();
    }

    // ===== Frame loop =====

    /// Host entry point for a delivered frame.
    ///
    /// `now_ms` is the host's monotonic clock in milliseconds. Returns
    /// whether a render actually happened.
    pub fn on_frame(&mut self, now_ms: f64) -> bool {
        if self.destroyed {
            return false;
        }

        let was_dirty = self.frame_loop.begin_frame();
        let camera_moved = self.orbit.update(&mut self.camera);
        let progress = self.animation_progress(now_ms);
        let animating = progress < 1.0;
        let layout_running = self.slots.iter().any(|slot| slot.renderer.needs_loop());

        // Render on the frame where progress reaches 1.0 as well, so the
        // entry animation ends on a full-size frame.
        let progress_changed = progress != self.last_progress;
        let rendered = was_dirty || camera_moved || layout_running || progress_changed;
        if rendered {
            self.render_visual(progress);
        }

        // needs_loop is re-read after rendering: the graph layout steps
        // inside render and may have just settled.
        let keep = animating
            || self.orbit.is_moving()
            || self.slots.iter().any(|slot| slot.renderer.needs_loop());
        self.frame_loop.finish_frame(keep);

        rendered
    }

    /// Render one frame immediately, outside the scheduler.
    ///
    /// For headless and export use together with [`Chart::read_pixels`];
    /// the frame loop and animation clock are untouched.
    pub fn render_once(&mut self) {
        if self.destroyed {
            return;
        }
        self.render_visual(self.last_progress);
    }

    /// Copy the visual target back to the CPU as tightly packed RGBA.
    pub fn read_pixels(&self) -> Vec<u8> {
        if self.destroyed {
            return Vec::new();
        }
        self.target.read_pixels(self.gpu.device(), self.gpu.queue())
    }

    /// Device-pixel dimensions of the visual target
    pub fn target_size(&self) -> (u32, u32) {
        (self.target.width(), self.target.height())
    }

    // ===== Internals =====

    fn render_ctx(&self, progress: f32, pick_base: u32) -> RenderContext<'_> {
        RenderContext {
            gpu: &self.gpu,
            globals_layout: &self.globals_layout,
            globals_bind_group: &self.globals_bind_group,
            target_format: TARGET_FORMAT,
            pick_format: PickBuffer::FORMAT,
            camera: &self.camera,
            theme: &self.options.theme,
            pixel_ratio: self.options.pixel_ratio,
            progress,
            pick_base,
        }
    }

    fn animation_progress(&mut self, now_ms: f64) -> f32 {
        if self.options.enter_duration_ms <= 0.0 {
            return 1.0;
        }
        if self.enter_pending {
            self.enter_pending = false;
            self.enter_start = Some(now_ms);
        }
        match self.enter_start {
            Some(start) => {
                (((now_ms - start) / self.options.enter_duration_ms).clamp(0.0, 1.0)) as f32
            }
            None => 1.0,
        }
    }

    fn render_visual(&mut self, progress: f32) {
        let globals = shaders::Globals {
            proj_view: self.camera.proj_view(),
            viewport: self.camera.viewport(),
            progress,
            _pad: 0.0,
        };
        self.gpu
            .queue()
            .write_buffer(&self.globals_buffer, 0, bytes_of(&globals));

        let mut slots = std::mem::take(&mut self.slots);
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("chart encoder"),
            });
        {
            let mut pass = self
                .target
                .begin_pass(&mut encoder, self.options.theme.clear_color());
            let ctx = self.render_ctx(progress, 0);
            for slot in &mut slots {
                slot.renderer.render(&ctx, &mut pass);
            }
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.slots = slots;
        self.last_progress = progress;
    }

    /// GPU pick: re-render ids into the pick buffer and read one pixel.
    fn pick_at(&mut self, x: f32, y: f32) -> Option<DataPoint> {
        if self.slots.is_empty() {
            return None;
        }

        let mut slots = std::mem::take(&mut self.slots);
        let mut encoder = self
            .gpu
            .device()
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("pick encoder"),
            });
        {
            // The globals buffer still holds the last rendered frame, so
            // the pick pass sees exactly what is on screen.
            let mut pass = self.pick.begin(&mut encoder);
            let ctx = self.render_ctx(self.last_progress, 0);
            for slot in &mut slots {
                slot.renderer.render_pick(&ctx, &mut pass);
            }
        }
        self.gpu.queue().submit(std::iter::once(encoder.finish()));
        self.slots = slots;

        let id = self.pick.pick(self.gpu.device(), self.gpu.queue(), x, y)?;
        let slot_index = self
            .slots
            .iter()
            .position(|slot| id >= slot.pick_base && id < slot.pick_base + slot.count)?;
        let slot = &self.slots[slot_index];
        let hit = slot.renderer.datum_at((id - slot.pick_base) as usize)?;

        Some(DataPoint {
            series: slot_index,
            index: hit.index,
            label: hit.label,
        })
    }
}

impl Drop for Chart {
    fn drop(&mut self) {
        self.destroy();
    }
}
