/// What a texture will be bound as.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureUse {
    /// Decoded image or fallback, sampled in the triangle shader.
    Sampled,
    /// Color attachment (possibly multisampled) that is later resolved.
    RenderTarget,
    /// Single-sampled color target that is copied back to the CPU.
    ResolveTarget,
    /// Depth attachment.
    Depth,
}

/// Parameters for a texture allocation.
#[derive(Debug, Clone)]
pub struct TextureRequest<'a> {
    pub label: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub usage: TextureUse,
    /// Tightly packed texel data to upload (`Sampled` only).
    pub pixels: Option<&'a [u8]>,
}

impl<'a> TextureRequest<'a> {
    pub fn sampled(label: &'a str, width: u32, height: u32, rgba: &'a [u8]) -> Self {
        Self {
            label,
            width,
            height,
            format: wgpu::TextureFormat::Rgba8Unorm,
            sample_count: 1,
            usage: TextureUse::Sampled,
            pixels: Some(rgba),
        }
    }

    pub fn target(
        label: &'a str,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
        usage: TextureUse,
    ) -> Self {
        Self {
            label,
            width,
            height,
            format,
            sample_count,
            usage,
            pixels: None,
        }
    }
}

/// Creates and fills GPU resources on behalf of the caches.
///
/// Allocation failures are reported as `None`; callers log and degrade.
/// Resource types are cheap, shareable references: a cache hands clones out
/// of its lock and drops its own copy on replacement.
pub trait Allocator: Send + Sync + 'static {
    type Buffer: Clone + Send + Sync + 'static;
    type Texture: Clone + Send + Sync + 'static;

    /// Allocates a vertex/index-capable buffer of at least `capacity` bytes.
    fn create_buffer(&self, label: &str, capacity: u64) -> Option<Self::Buffer>;

    /// Usable size of `buffer` in bytes.
    fn buffer_capacity(&self, buffer: &Self::Buffer) -> u64;

    /// Copies `bytes` into the start of `buffer`.
    ///
    /// Callers guarantee `bytes.len() <= buffer_capacity(buffer)`.
    fn write_buffer(&self, buffer: &Self::Buffer, bytes: &[u8]);

    fn create_texture(&self, request: &TextureRequest<'_>) -> Option<Self::Texture>;
}
