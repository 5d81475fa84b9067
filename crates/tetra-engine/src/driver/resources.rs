use std::sync::Arc;

use anyhow::Result;

use crate::cache::{BufferCache, TextureCache};
use crate::gpu::{WgpuAllocator, resolve_sample_count};
use crate::handle::SubmissionTracker;
use crate::render::{Compositor, FrameEncoder, PipelineCache, RenderConfig};

/// GPU resources shared by every driver on one device.
///
/// Built once by the host and handed to the live view and the exporter, so
/// buffers, textures and pipelines are created once and reused by both.
#[derive(Clone)]
pub struct RenderResources {
    pub allocator: Arc<WgpuAllocator>,
    pub buffers: Arc<BufferCache<WgpuAllocator>>,
    pub textures: Arc<TextureCache<WgpuAllocator>>,
    pub pipelines: Arc<PipelineCache>,
    pub submissions: Arc<SubmissionTracker>,
    pub config: RenderConfig,
}

impl RenderResources {
    pub fn new(allocator: WgpuAllocator, config: RenderConfig) -> Result<Self> {
        let allocator = Arc::new(allocator);
        let submissions = Arc::new(SubmissionTracker::new());

        let buffers = Arc::new(BufferCache::new(
            Arc::clone(&allocator),
            Arc::clone(&submissions),
        ));
        let textures = Arc::new(TextureCache::new(
            Arc::clone(&allocator),
            config.depth_format,
        )?);
        let pipelines = Arc::new(PipelineCache::new(allocator.device(), config.depth_format));

        Ok(Self {
            allocator,
            buffers,
            textures,
            pipelines,
            submissions,
            config,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        self.allocator.device()
    }

    pub fn queue(&self) -> &wgpu::Queue {
        self.allocator.queue()
    }

    pub fn compositor(&self) -> Compositor<WgpuAllocator> {
        Compositor::new(
            Arc::clone(&self.buffers),
            Arc::clone(&self.textures),
            self.config.clone(),
        )
    }

    pub fn frame_encoder(&self) -> FrameEncoder {
        FrameEncoder::new(self.device(), Arc::clone(&self.pipelines))
    }

    /// Highest MSAA count usable for `format` with the configured depth format.
    pub fn sample_count(&self, adapter: &wgpu::Adapter, format: wgpu::TextureFormat) -> u32 {
        resolve_sample_count(
            adapter,
            format,
            self.config.depth_format,
            self.config.max_sample_count,
        )
    }

    /// Polls the device without blocking, running pending completion callbacks.
    pub fn poll(&self) {
        if let Err(err) = self.device().poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed: {err}");
        }
    }
}
