use super::{Allocator, TextureRequest, TextureUse};

/// A wgpu texture together with its default view.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
}

impl GpuTexture {
    pub fn width(&self) -> u32 {
        self.texture.width()
    }

    pub fn height(&self) -> u32 {
        self.texture.height()
    }

    pub fn sample_count(&self) -> u32 {
        self.texture.sample_count()
    }
}

/// [`Allocator`] backed by a wgpu device and queue.
///
/// Device and queue are reference-counted by wgpu, so the allocator can be
/// shared by the live view and the exporter.
#[derive(Debug, Clone)]
pub struct WgpuAllocator {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuAllocator {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }
}

impl Allocator for WgpuAllocator {
    type Buffer = wgpu::Buffer;
    type Texture = GpuTexture;

    fn create_buffer(&self, label: &str, capacity: u64) -> Option<wgpu::Buffer> {
        let size = align_to(capacity.max(1), wgpu::COPY_BUFFER_ALIGNMENT);

        let max = self.device.limits().max_buffer_size;
        if size > max {
            log::error!("buffer '{label}': {size} bytes exceeds device limit {max}");
            return None;
        }

        Some(self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: wgpu::BufferUsages::VERTEX
                | wgpu::BufferUsages::INDEX
                | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        }))
    }

    fn buffer_capacity(&self, buffer: &wgpu::Buffer) -> u64 {
        buffer.size()
    }

    fn write_buffer(&self, buffer: &wgpu::Buffer, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        // Queue writes must be a multiple of COPY_BUFFER_ALIGNMENT.
        let rem = bytes.len() as u64 % wgpu::COPY_BUFFER_ALIGNMENT;
        if rem == 0 {
            self.queue.write_buffer(buffer, 0, bytes);
        } else {
            let mut padded = bytes.to_vec();
            padded.resize(bytes.len() + (wgpu::COPY_BUFFER_ALIGNMENT - rem) as usize, 0);
            self.queue.write_buffer(buffer, 0, &padded);
        }
    }

    fn create_texture(&self, request: &TextureRequest<'_>) -> Option<GpuTexture> {
        let max = self.device.limits().max_texture_dimension_2d;
        if request.width == 0
            || request.height == 0
            || request.width > max
            || request.height > max
        {
            log::error!(
                "texture '{}': invalid size {}x{} (limit {max})",
                request.label,
                request.width,
                request.height
            );
            return None;
        }

        let usage = match request.usage {
            TextureUse::Sampled => {
                wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST
            }
            TextureUse::RenderTarget | TextureUse::Depth => {
                wgpu::TextureUsages::RENDER_ATTACHMENT
            }
            TextureUse::ResolveTarget => {
                wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC
            }
        };

        let size = wgpu::Extent3d {
            width: request.width,
            height: request.height,
            depth_or_array_layers: 1,
        };

        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some(request.label),
            size,
            mip_level_count: 1,
            sample_count: request.sample_count.max(1),
            dimension: wgpu::TextureDimension::D2,
            format: request.format,
            usage,
            view_formats: &[],
        });

        if let Some(pixels) = request.pixels {
            let bpp = request.format.block_copy_size(None).unwrap_or(4);
            let expected = request.width as usize * request.height as usize * bpp as usize;
            if pixels.len() != expected {
                log::error!(
                    "texture '{}': {} texel bytes, expected {expected}",
                    request.label,
                    pixels.len()
                );
                return None;
            }

            self.queue.write_texture(
                wgpu::TexelCopyTextureInfo {
                    texture: &texture,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(request.width * bpp),
                    rows_per_image: Some(request.height),
                },
                size,
            );
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Some(GpuTexture { texture, view })
    }
}

#[inline]
fn align_to(value: u64, align: u64) -> u64 {
    value.div_ceil(align) * align
}
