use std::sync::Arc;

use anyhow::{Result, anyhow};
use glam::Vec2;

use crate::device::{Gpu, SurfaceErrorAction};
use crate::gpu::WgpuAllocator;
use crate::projection::{ProjectionParams, ProjectionSet, build_projection};
use crate::render::{Compositor, FrameEncoder, FrameTargets, RenderConfig, RenderCtx, RenderTarget};
use crate::scene::{FamilySet, SharedScene, ViewportStatus};

use super::{InFlight, RenderResources};

/// What the host needs from the last drawn frame: the projection for hit
/// testing and overlays, and the status for the border colour.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameCache {
    pub projection: ProjectionSet,
    pub status: ViewportStatus,
    pub border: [f32; 4],
    pub nonce: u64,
    pub draws: usize,
}

/// Renders the shared scene into a window's swapchain on request.
pub struct LiveView {
    resources: RenderResources,
    scene: SharedScene,
    compositor: Compositor<WgpuAllocator>,
    encoder: FrameEncoder,
    in_flight: Arc<InFlight>,
    format: wgpu::TextureFormat,
    sample_count: u32,
    available: FamilySet,
    targets: Option<FrameTargets<WgpuAllocator>>,
    point_scale: f32,
    presentation: bool,
    seen_version: u64,
    cache: Option<FrameCache>,
}

impl LiveView {
    /// `format` is the surface format frames are presented in.
    pub fn new(
        resources: RenderResources,
        scene: SharedScene,
        adapter: &wgpu::Adapter,
        format: wgpu::TextureFormat,
    ) -> Self {
        let sample_count = resources.sample_count(adapter, format);
        let available = resources.pipelines.available(format, sample_count);
        if available != FamilySet::ALL {
            log::warn!("live view: only {available:?} pipelines available");
        }
        log::info!("live view: {format:?}, {sample_count}x msaa");

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
            point_scale: 1.0,
            presentation: false,
            seen_version: 0,
            cache: None,
        }
    }

    /// Physical pixels per logical point (the window scale factor).
    pub fn set_point_scale(&mut self, scale: f32) {
        self.point_scale = scale;
    }

    /// Presentation mode letterboxes with a wider margin.
    pub fn set_presentation(&mut self, presentation: bool) {
        self.presentation = presentation;
    }

    /// Last drawn frame, if any.
    pub fn frame_cache(&self) -> Option<&FrameCache> {
        self.cache.as_ref()
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    /// True if a new viewport state was published or the drawable changed
    /// size since the last frame.
    pub fn needs_redraw(&self, width: u32, height: u32) -> bool {
        self.cache.is_none()
            || self.scene.viewport.version() > self.seen_version
            || !self.targets.as_ref().is_some_and(|t| t.matches(width, height))
    }

    /// Draws one frame and presents it.
    ///
    /// Returns `Ok(false)` when the frame was skipped (zero size, transient
    /// surface error, target allocation failure) and an error only when the
    /// surface is unusable.
    pub fn redraw(&mut self, gpu: &mut Gpu<'_>) -> Result<bool> {
        let size = gpu.size();
        if size.width == 0 || size.height == 0 {
            return Ok(false);
        }

        self.in_flight.acquire_with(|| self.resources.poll());

        let mut frame = match gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                self.in_flight.release();
                return match gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => Err(anyhow!("surface is out of memory")),
                    action => {
                        log::debug!("surface error handled: {action:?}");
                        Ok(false)
                    }
                };
            }
        };

        if !self
            .targets
            .as_ref()
            .is_some_and(|t| t.matches(size.width, size.height))
        {
            self.targets = FrameTargets::allocate(
                &self.resources.textures,
                size.width,
                size.height,
                self.format,
                self.sample_count,
                false,
            );
        }
        let Some(targets) = self.targets.as_ref() else {
            self.in_flight.release();
            return Ok(false);
        };

        let version = self.scene.viewport.version();
        let viewport = self.scene.viewport();
        let params = live_params(
            &self.resources.config,
            size.width,
            size.height,
            self.point_scale,
            self.presentation,
        );
        let projection = build_projection(&viewport, &params);

        self.resources.buffers.reclaim();
        let plan = self
            .compositor
            .compose(&self.scene.meshes, &viewport, &projection, self.available);

        let Some((color_view, resolve_view)) = targets.attachments(Some(&frame.view)) else {
            self.in_flight.release();
            return Ok(false);
        };
        let ctx = RenderCtx::new(
            self.resources.device(),
            self.resources.queue(),
            self.format,
            self.sample_count,
        );
        let mut target = RenderTarget {
            encoder: &mut frame.encoder,
            color_view,
            resolve_view,
            depth_view: &targets.depth().view,
        };
        self.encoder.encode(&ctx, &mut target, &plan);

        let (serial, _) = self.resources.submissions.submit(|_| gpu.submit(frame));

        let in_flight = Arc::clone(&self.in_flight);
        let submissions = Arc::clone(&self.resources.submissions);
        self.resources.queue().on_submitted_work_done(move || {
            submissions.complete(serial);
            in_flight.release();
        });

        self.seen_version = version;
        self.cache = Some(FrameCache {
            projection,
            status: viewport.status,
            border: viewport.status.border_color(),
            nonce: viewport.nonce,
            draws: plan.len(),
        });

        Ok(true)
    }
}

/// Projection target for a `width`x`height` drawable.
fn live_params(
    config: &RenderConfig,
    width: u32,
    height: u32,
    point_scale: f32,
    presentation: bool,
) -> ProjectionParams {
    ProjectionParams {
        draw_size: Vec2::new(width as f32, height as f32),
        point_scale,
        padding: if presentation {
            config.presentation_padding
        } else {
            config.padding
        },
        bottom_padding: config.bottom_padding,
    }
}
