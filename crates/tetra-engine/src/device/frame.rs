/// A swapchain image acquired for one live-view frame.
///
/// Presented by [`Gpu::submit`](super::Gpu::submit). Holding it blocks
/// acquisition of the next image.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}
