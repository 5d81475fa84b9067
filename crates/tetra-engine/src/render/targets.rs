use crate::cache::TextureCache;
use crate::gpu::{Allocator, WgpuAllocator};

/// Per-frame attachments owned by a driver.
///
/// `multisampled` is present only when `sample_count > 1`. `resolve` is the
/// single-sampled copy source used by the exporter; the live view resolves
/// straight into the swapchain image instead.
pub struct FrameTargets<A: Allocator> {
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
    sample_count: u32,
    multisampled: Option<A::Texture>,
    resolve: Option<A::Texture>,
    depth: A::Texture,
}

impl<A: Allocator> FrameTargets<A> {
    /// Allocates a fresh set of targets. `readable` adds the resolve target.
    ///
    /// Returns `None` if any allocation fails; partial sets are dropped.
    pub fn allocate(
        textures: &TextureCache<A>,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
        readable: bool,
    ) -> Option<Self> {
        let width = width.max(1);
        let height = height.max(1);
        let sample_count = sample_count.max(1);

        let multisampled = if sample_count > 1 {
            Some(textures.allocate_render_target(width, height, format, sample_count)?)
        } else {
            None
        };

        let resolve = if readable {
            Some(textures.allocate_resolve_target(width, height, format)?)
        } else {
            None
        };

        let depth = textures.allocate_depth_target(width, height, sample_count)?;

        log::debug!(
            "frame targets {width}x{height} {format:?} x{sample_count} (readable: {readable})"
        );

        Some(Self {
            width,
            height,
            format,
            sample_count,
            multisampled,
            resolve,
            depth,
        })
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width.max(1) && self.height == height.max(1)
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.format
    }

    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }

    pub fn multisampled(&self) -> Option<&A::Texture> {
        self.multisampled.as_ref()
    }

    pub fn resolve(&self) -> Option<&A::Texture> {
        self.resolve.as_ref()
    }

    pub fn depth(&self) -> &A::Texture {
        &self.depth
    }
}

impl FrameTargets<WgpuAllocator> {
    /// Color and resolve views for the pass.
    ///
    /// `present` overrides the readable resolve target as the final image.
    /// Returns `None` when there is nowhere to put the final image.
    pub fn attachments<'a>(
        &'a self,
        present: Option<&'a wgpu::TextureView>,
    ) -> Option<(&'a wgpu::TextureView, Option<&'a wgpu::TextureView>)> {
        let last = present.or(self.resolve.as_ref().map(|t| &t.view))?;
        match &self.multisampled {
            Some(ms) => Some((&ms.view, Some(last))),
            None => Some((last, None)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::gpu::testing::MockAllocator;
    use crate::gpu::TextureUse;

    fn cache() -> (Arc<MockAllocator>, TextureCache<MockAllocator>) {
        let alloc = Arc::new(MockAllocator::new());
        let textures = TextureCache::new(Arc::clone(&alloc), wgpu::TextureFormat::Depth32Float)
            .expect("fallback textures");
        (alloc, textures)
    }

    #[test]
    fn multisampled_targets_share_sample_count_with_depth() {
        let (_, textures) = cache();
        let targets = FrameTargets::allocate(
            &textures,
            640,
            360,
            wgpu::TextureFormat::Bgra8Unorm,
            4,
            true,
        )
        .expect("targets");

        let ms = targets.multisampled().expect("msaa attachment");
        assert_eq!(ms.sample_count, 4);
        assert_eq!(ms.usage, TextureUse::RenderTarget);
        assert_eq!(targets.depth().sample_count, 4);
        assert_eq!(targets.depth().format, wgpu::TextureFormat::Depth32Float);

        let resolve = targets.resolve().expect("resolve");
        assert_eq!(resolve.sample_count, 1);
        assert_eq!(resolve.usage, TextureUse::ResolveTarget);
        assert_eq!((resolve.width, resolve.height), (640, 360));
    }

    #[test]
    fn single_sample_skips_msaa_attachment() {
        let (_, textures) = cache();
        let targets = FrameTargets::allocate(
            &textures,
            32,
            16,
            wgpu::TextureFormat::Bgra8Unorm,
            1,
            false,
        )
        .expect("targets");

        assert!(targets.multisampled().is_none());
        assert!(targets.resolve().is_none());
        assert_eq!(targets.depth().sample_count, 1);
    }

    #[test]
    fn zero_sizes_are_clamped() {
        let (_, textures) = cache();
        let targets =
            FrameTargets::allocate(&textures, 0, 0, wgpu::TextureFormat::Bgra8Unorm, 1, false)
                .expect("targets");
        assert_eq!(targets.size(), (1, 1));
        assert!(targets.matches(0, 0));
        assert!(!targets.matches(2, 1));
    }

    #[test]
    fn allocation_failure_yields_none() {
        let (alloc, textures) = cache();
        alloc.fail_allocations(true);
        assert!(FrameTargets::allocate(
            &textures,
            8,
            8,
            wgpu::TextureFormat::Bgra8Unorm,
            4,
            true
        )
        .is_none());
    }
}
