//! Handle-addressed GPU resource caches.

mod buffer;
mod texture;

pub use buffer::{BufferCache, BufferEntry};
pub use texture::{MISSING, TRANSPARENT, TextureCache};
