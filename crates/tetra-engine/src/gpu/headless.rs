use anyhow::{Context, Result};

use crate::device::GpuInit;

use super::WgpuAllocator;

/// Surface-less GPU context for offscreen export.
pub struct Headless {
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl Headless {
    /// Acquires an adapter and device without a presentation surface.
    ///
    /// Only the feature and limit fields of `init` apply.
    pub async fn new(init: &GpuInit) -> Result<Self> {
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
            .context("failed to find a GPU adapter for offscreen rendering")?;

        let (device, queue) = init.open_device(&adapter, "tetra headless device").await?;

        Ok(Self {
            adapter,
            device,
            queue,
        })
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn allocator(&self) -> WgpuAllocator {
        WgpuAllocator::new(self.device.clone(), self.queue.clone())
    }
}
