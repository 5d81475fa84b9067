use std::sync::Arc;

use anyhow::{Context, Result, bail};

use crate::gpu::WgpuAllocator;
use crate::projection::{ProjectionParams, build_projection};
use crate::render::{Compositor, FrameEncoder, FrameTargets, RenderCtx, RenderTarget};
use crate::scene::{FamilySet, SharedScene};

use super::{FrameSource, InFlight, Readback, RenderResources};

/// [`FrameSource`] rendering the shared scene into offscreen targets and
/// reading the resolved image back.
pub struct OffscreenRenderer {
    resources: RenderResources,
    scene: SharedScene,
    compositor: Compositor<WgpuAllocator>,
    encoder: FrameEncoder,
    in_flight: Arc<InFlight>,
    format: wgpu::TextureFormat,
    sample_count: u32,
    available: FamilySet,
    targets: Option<FrameTargets<WgpuAllocator>>,
    readback: Option<Readback>,
}

impl OffscreenRenderer {
    pub fn new(resources: RenderResources, scene: SharedScene, adapter: &wgpu::Adapter) -> Self {
        let format = resources.config.offscreen_format;
        let sample_count = resources.sample_count(adapter, format);
        let available = resources.pipelines.available(format, sample_count);
        log::info!("offscreen renderer: {format:?}, {sample_count}x msaa, {available:?}");

        Self {
            compositor: resources.compositor(),
            encoder: resources.frame_encoder(),
            resources,
            scene,
            in_flight: Arc::new(InFlight::single()),
            format,
            sample_count,
            available,
            targets: None,
            readback: None,
        }
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}

impl FrameSource for OffscreenRenderer {
    fn prepare(&mut self, width: u32, height: u32) -> Result<()> {
        let targets = FrameTargets::allocate(
            &self.resources.textures,
            width,
            height,
            self.format,
            self.sample_count,
            true,
        )
        .with_context(|| format!("export targets {width}x{height}"))?;

        self.readback = Some(Readback::new(self.resources.device(), width, height));
        self.targets = Some(targets);
        Ok(())
    }

    fn render(&mut self, pixels: &mut [u8]) -> Result<()> {
        let (Some(targets), Some(readback)) = (self.targets.as_ref(), self.readback.as_ref())
        else {
            bail!("export targets were not prepared");
        };
        let Some(resolved) = targets.resolve() else {
            bail!("export targets have no resolve image");
        };
        let Some((color_view, resolve_view)) = targets.attachments(None) else {
            bail!("export targets have no resolve image");
        };

        self.in_flight.acquire_with(|| self.resources.poll());

        let (width, height) = targets.size();
        let viewport = self.scene.viewport();
        let projection = build_projection(&viewport, &ProjectionParams::full_bleed(width, height));

        self.resources.buffers.reclaim();
        let plan = self
            .compositor
            .compose(&self.scene.meshes, &viewport, &projection, self.available);

        let device = self.resources.device();
        let queue = self.resources.queue();
        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("tetra export encoder"),
        });

        let ctx = RenderCtx::new(device, queue, self.format, self.sample_count);
        let mut target = RenderTarget {
            encoder: &mut encoder,
            color_view,
            resolve_view,
            depth_view: &targets.depth().view,
        };
        self.encoder.encode(&ctx, &mut target, &plan);
        readback.record_copy(&mut encoder, &resolved.texture);

        let commands = encoder.finish();
        let (serial, _) = self
            .resources
            .submissions
            .submit(|_| queue.submit(std::iter::once(commands)));

        let in_flight = Arc::clone(&self.in_flight);
        let submissions = Arc::clone(&self.resources.submissions);
        queue.on_submitted_work_done(move || {
            submissions.complete(serial);
            in_flight.release();
        });

        readback.read_into(device, pixels)
    }

    fn release(&mut self) {
        self.targets = None;
        self.readback = None;
    }
}
