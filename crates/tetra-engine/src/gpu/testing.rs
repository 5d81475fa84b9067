//! In-memory [`Allocator`] for exercising cache and renderer policy without a
//! GPU adapter.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;

use super::{Allocator, TextureRequest, TextureUse};

#[derive(Debug)]
pub struct MockBuffer {
    pub id: usize,
    pub capacity: u64,
    pub data: Mutex<Vec<u8>>,
}

#[derive(Debug)]
pub struct MockTexture {
    pub id: usize,
    pub label: String,
    pub width: u32,
    pub height: u32,
    pub format: wgpu::TextureFormat,
    pub sample_count: u32,
    pub usage: TextureUse,
    pub pixels: Vec<u8>,
}

/// Records every allocation and write.
///
/// `fail_allocations(true)` makes every subsequent create return `None`.
#[derive(Debug, Default)]
pub struct MockAllocator {
    next_id: AtomicUsize,
    buffers_created: AtomicUsize,
    textures_created: AtomicUsize,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MockAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created.load(Ordering::SeqCst)
    }

    pub fn textures_created(&self) -> usize {
        self.textures_created.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_allocations(&self, fail: bool) {
        self.failing.store(fail, Ordering::SeqCst);
    }

    fn next_id(&self) -> usize {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }
}

impl Allocator for MockAllocator {
    type Buffer = Arc<MockBuffer>;
    type Texture = Arc<MockTexture>;

    fn create_buffer(&self, _label: &str, capacity: u64) -> Option<Arc<MockBuffer>> {
        if self.failing.load(Ordering::SeqCst) {
            return None;
        }
        self.buffers_created.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(MockBuffer {
            id: self.next_id(),
            capacity,
            data: Mutex::new(vec![0; capacity as usize]),
        }))
    }

    fn buffer_capacity(&self, buffer: &Arc<MockBuffer>) -> u64 {
        buffer.capacity
    }

    fn write_buffer(&self, buffer: &Arc<MockBuffer>, bytes: &[u8]) {
        self.writes.fetch_add(1, Ordering::SeqCst);
        buffer.data.lock()[..bytes.len()].copy_from_slice(bytes);
    }

    fn create_texture(&self, request: &TextureRequest<'_>) -> Option<Arc<MockTexture>> {
        if self.failing.load(Ordering::SeqCst) {
            return None;
        }
        self.textures_created.fetch_add(1, Ordering::SeqCst);
        Some(Arc::new(MockTexture {
            id: self.next_id(),
            label: request.label.to_owned(),
            width: request.width,
            height: request.height,
            format: request.format,
            sample_count: request.sample_count,
            usage: request.usage,
            pixels: request.pixels.map(<[u8]>::to_vec).unwrap_or_default(),
        }))
    }
}
