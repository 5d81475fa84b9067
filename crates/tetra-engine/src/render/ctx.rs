/// Device-side context for encoding one frame.
pub struct RenderCtx<'a> {
    pub device: &'a wgpu::Device,
    pub queue: &'a wgpu::Queue,
    /// Color format of the attachment the pipelines render into.
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
}

impl<'a> RenderCtx<'a> {
    #[inline]
    pub fn new(
        device: &'a wgpu::Device,
        queue: &'a wgpu::Queue,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Self {
        Self {
            device,
            queue,
            format,
            sample_count,
        }
    }
}

/// Attachments for one frame's render pass.
///
/// With MSAA, `color_view` is the multisampled attachment and
/// `resolve_view` receives the resolved image. Without it, `color_view` is
/// the final target and `resolve_view` is `None`.
pub struct RenderTarget<'a> {
    pub encoder: &'a mut wgpu::CommandEncoder,
    pub color_view: &'a wgpu::TextureView,
    pub resolve_view: Option<&'a wgpu::TextureView>,
    pub depth_view: &'a wgpu::TextureView,
}
