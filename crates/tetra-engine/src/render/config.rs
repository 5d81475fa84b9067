/// Fixed render parameters shared by both drivers.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderConfig {
    /// Upper bound for MSAA; the highest supported count not above it is used.
    pub max_sample_count: u32,
    pub depth_format: wgpu::TextureFormat,
    /// Color format of offscreen (export) targets.
    pub offscreen_format: wgpu::TextureFormat,
    /// Inlet width at which stroke and dot radii are taken literally.
    pub reference_width: f32,
    /// Depth bias added after every draw.
    pub z_step: f32,
    /// Letterbox margin in points.
    pub padding: f32,
    /// Letterbox margin in presentation mode.
    pub presentation_padding: f32,
    pub bottom_padding: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_sample_count: 16,
            depth_format: wgpu::TextureFormat::Depth32Float,
            offscreen_format: wgpu::TextureFormat::Bgra8Unorm,
            reference_width: 1480.0,
            z_step: 1e-6,
            padding: 10.0,
            presentation_padding: 45.0,
            bottom_padding: 0.0,
        }
    }
}
