//! GPU resource layer built on wgpu
//!
//! Owns the device/queue pair, compiles shader modules with validation
//! diagnostics surfaced as errors, and provides the buffer and render-target
//! helpers the series renderers build on. Everything here is offscreen;
//! surface/swapchain management belongs to the embedding host.

mod buffers;
mod target;

pub mod shaders;

pub use buffers::{MeshBuffer, VertexLayout};
pub use target::{DEPTH_FORMAT, RenderTarget};

use std::sync::Arc;

use crate::error::{RenderError, RenderResult};

/// Shared GPU handles plus the adapter they came from.
///
/// Cloning is cheap; the device and queue are reference counted so the
/// chart, the pick buffer, and every series renderer can hold them.
#[derive(Clone)]
pub struct GpuContext {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Acquire an adapter and device.
    ///
    /// This is the one unrecoverable setup step: without a device nothing
    /// else in the engine can run, so failure here is surfaced to the host
    /// instead of being degraded around.
    pub async fn new() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(RenderError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        tracing::debug!(
            name = %adapter_info.name,
            backend = ?adapter_info.backend,
            "acquired GPU adapter"
        );

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor::default(), None)
            .await
            .map_err(|e| RenderError::Device(e.to_string()))?;

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_info,
        })
    }

    /// Blocking variant of [`GpuContext::new`] for hosts without an executor.
    pub fn new_blocking() -> RenderResult<Self> {
        pollster::block_on(Self::new())
    }

    /// Get the device
    pub fn device(&self) -> &Arc<wgpu::Device> {
        &self.device
    }

    /// Get the queue
    pub fn queue(&self) -> &Arc<wgpu::Queue> {
        &self.queue
    }

    /// Get information about the adapter backing this device
    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.adapter_info
    }

    /// Compile a WGSL shader module, turning validation failures into errors.
    ///
    /// wgpu reports shader problems through the device error callback rather
    /// than a return value, so the compile runs inside a validation error
    /// scope and the scope is drained before returning. The resulting error
    /// carries the full naga diagnostic text.
    pub fn create_shader(&self, label: &str, source: &str) -> RenderResult<wgpu::ShaderModule> {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(source.into()),
            });

        if let Some(err) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(RenderError::Shader {
                label: label.to_string(),
                message: err.to_string(),
            });
        }

        tracing::debug!(label, "compiled shader module");
        Ok(module)
    }

    /// Block until all submitted GPU work has completed.
    pub fn wait(&self) {
        self.device.poll(wgpu::Maintain::Wait);
    }
}

#[cfg(test)]
pub(crate) fn test_context() -> Option<GpuContext> {
    // Headless CI machines may have no adapter at all; tests that need a
    // device skip themselves rather than fail.
    GpuContext::new_blocking().ok()
}
