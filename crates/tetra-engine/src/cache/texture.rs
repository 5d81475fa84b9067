use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;

use crate::gpu::{Allocator, TextureRequest, TextureUse};
use crate::handle::Handle;

/// Handle of the transparent 1x1 fallback.
pub const TRANSPARENT: Handle = Handle(0);
/// Handle of the "missing image" placeholder.
pub const MISSING: Handle = Handle(1);

const CHECKER_SIZE: u32 = 8;

struct PathEntry<T> {
    texture: T,
    handle: Option<Handle>,
}

struct State<T> {
    by_handle: BTreeMap<u32, T>,
    by_path: HashMap<PathBuf, PathEntry<T>>,
}

/// Maps texture handles and source paths to GPU textures.
///
/// Handles 0 and 1 always resolve to the fallback textures. Image handles are
/// assigned monotonically (one past the current maximum) and are never
/// recycled while the scene is open. Each path maps to exactly one GPU
/// texture, whichever entry point loaded it first.
pub struct TextureCache<A: Allocator> {
    allocator: Arc<A>,
    depth_format: wgpu::TextureFormat,
    missing: A::Texture,
    state: Mutex<State<A::Texture>>,
}

impl<A: Allocator> TextureCache<A> {
    /// Creates the cache and uploads both fallback textures.
    pub fn new(allocator: Arc<A>, depth_format: wgpu::TextureFormat) -> Result<Self> {
        let transparent = allocator
            .create_texture(&TextureRequest::sampled("tetra transparent", 1, 1, &[0; 4]))
            .context("failed to create transparent fallback texture")?;

        let checker = missing_checker();
        let missing = allocator
            .create_texture(&TextureRequest::sampled(
                "tetra missing image",
                CHECKER_SIZE,
                CHECKER_SIZE,
                &checker,
            ))
            .context("failed to create missing-image texture")?;

        let mut by_handle = BTreeMap::new();
        by_handle.insert(TRANSPARENT.raw(), transparent);
        by_handle.insert(MISSING.raw(), missing.clone());

        Ok(Self {
            allocator,
            depth_format,
            missing,
            state: Mutex::new(State {
                by_handle,
                by_path: HashMap::new(),
            }),
        })
    }

    /// Texture for `handle`, or the missing-image placeholder when unknown.
    pub fn texture(&self, handle: Handle) -> A::Texture {
        self.state
            .lock()
            .by_handle
            .get(&handle.raw())
            .cloned()
            .unwrap_or_else(|| self.missing.clone())
    }

    /// Returns the handle for `path`, loading the image on first request.
    ///
    /// Decode failures are logged and yield the missing-image handle; they
    /// are not cached, so a later call retries.
    pub fn poll_id(&self, path: &Path) -> Handle {
        let existing = {
            let state = self.state.lock();
            match state.by_path.get(path) {
                Some(PathEntry { handle: Some(h), .. }) => return *h,
                Some(entry) => Some(entry.texture.clone()),
                None => None,
            }
        };

        let texture = match existing {
            Some(texture) => texture,
            None => match self.decode(path) {
                Some(texture) => texture,
                None => return MISSING,
            },
        };

        let mut state = self.state.lock();
        let State {
            by_handle,
            by_path,
        } = &mut *state;

        // Another caller may have raced us while decoding.
        let entry = by_path.entry(path.to_path_buf()).or_insert(PathEntry {
            texture,
            handle: None,
        });
        if let Some(handle) = entry.handle {
            return handle;
        }

        let next = by_handle.keys().next_back().map_or(0, |max| max + 1);
        let handle = Handle(next);
        by_handle.insert(next, entry.texture.clone());
        entry.handle = Some(handle);

        log::debug!("texture {handle} <- {}", path.display());
        handle
    }

    /// Loads `path` without assigning a handle, memoized by path.
    pub fn load_from_source(&self, path: &Path) -> Option<A::Texture> {
        if let Some(entry) = self.state.lock().by_path.get(path) {
            return Some(entry.texture.clone());
        }

        let texture = self.decode(path)?;

        let mut state = self.state.lock();
        let entry = state
            .by_path
            .entry(path.to_path_buf())
            .or_insert(PathEntry {
                texture,
                handle: None,
            });
        Some(entry.texture.clone())
    }

    /// Color attachment sized exactly to the request. Not pooled.
    pub fn allocate_render_target(
        &self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
        sample_count: u32,
    ) -> Option<A::Texture> {
        self.create_target(TextureRequest::target(
            "tetra render target",
            width,
            height,
            format,
            sample_count,
            TextureUse::RenderTarget,
        ))
    }

    /// Single-sampled, CPU-readable color target.
    pub fn allocate_resolve_target(
        &self,
        width: u32,
        height: u32,
        format: wgpu::TextureFormat,
    ) -> Option<A::Texture> {
        self.create_target(TextureRequest::target(
            "tetra resolve target",
            width,
            height,
            format,
            1,
            TextureUse::ResolveTarget,
        ))
    }

    pub fn allocate_depth_target(
        &self,
        width: u32,
        height: u32,
        sample_count: u32,
    ) -> Option<A::Texture> {
        self.create_target(TextureRequest::target(
            "tetra depth target",
            width,
            height,
            self.depth_format,
            sample_count,
            TextureUse::Depth,
        ))
    }

    /// Drops every scene texture; the fallbacks stay resident.
    pub fn clear_scene(&self) {
        let mut state = self.state.lock();
        state
            .by_handle
            .retain(|&raw, _| raw == TRANSPARENT.raw() || raw == MISSING.raw());
        state.by_path.clear();
    }

    /// Number of handle-addressable textures, fallbacks included.
    pub fn len(&self) -> usize {
        self.state.lock().by_handle.len()
    }

    pub fn path_count(&self) -> usize {
        self.state.lock().by_path.len()
    }

    pub fn depth_format(&self) -> wgpu::TextureFormat {
        self.depth_format
    }

    fn create_target(&self, request: TextureRequest<'_>) -> Option<A::Texture> {
        let texture = self.allocator.create_texture(&request);
        if texture.is_none() {
            log::error!(
                "failed to allocate {} {}x{}",
                request.label,
                request.width,
                request.height
            );
        }
        texture
    }

    fn decode(&self, path: &Path) -> Option<A::Texture> {
        let image = match image::open(path) {
            Ok(image) => image.to_rgba8(),
            Err(err) => {
                log::warn!("failed to decode texture '{}': {err}", path.display());
                return None;
            }
        };

        let (width, height) = image.dimensions();
        let label = path.display().to_string();
        let texture = self
            .allocator
            .create_texture(&TextureRequest::sampled(&label, width, height, image.as_raw()));

        if texture.is_none() {
            log::error!("failed to upload texture '{label}' ({width}x{height})");
        }
        texture
    }
}

/// Magenta/black checkerboard, RGBA8.
fn missing_checker() -> Vec<u8> {
    let mut texels = Vec::with_capacity((CHECKER_SIZE * CHECKER_SIZE * 4) as usize);
    for y in 0..CHECKER_SIZE {
        for x in 0..CHECKER_SIZE {
            let on = (x / 2 + y / 2) % 2 == 0;
            texels.extend_from_slice(if on { &[255, 0, 255, 255] } else { &[0, 0, 0, 255] });
        }
    }
    texels
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpu::testing::MockAllocator;

    fn cache() -> (Arc<MockAllocator>, TextureCache<MockAllocator>) {
        let alloc = Arc::new(MockAllocator::new());
        let cache = TextureCache::new(alloc.clone(), wgpu::TextureFormat::Depth32Float).unwrap();
        (alloc, cache)
    }

    fn write_png(dir: &tempfile::TempDir, name: &str, w: u32, h: u32) -> PathBuf {
        let path = dir.path().join(name);
        image::RgbaImage::from_pixel(w, h, image::Rgba([10, 20, 30, 255]))
            .save(&path)
            .unwrap();
        path
    }

    // ── fallbacks ─────────────────────────────────────────────────────────

    #[test]
    fn fallbacks_are_resident() {
        let (alloc, cache) = cache();
        assert_eq!(alloc.textures_created(), 2);
        assert_eq!(cache.len(), 2);

        let transparent = cache.texture(TRANSPARENT);
        assert_eq!((transparent.width, transparent.height), (1, 1));
        assert_eq!(transparent.pixels, vec![0; 4]);

        let missing = cache.texture(MISSING);
        assert_eq!((missing.width, missing.height), (CHECKER_SIZE, CHECKER_SIZE));
    }

    #[test]
    fn unknown_handle_resolves_to_missing() {
        let (_, cache) = cache();
        let missing_id = cache.texture(MISSING).id;
        for raw in [2, 17, 65_534, u32::MAX] {
            assert_eq!(cache.texture(Handle(raw)).id, missing_id);
        }
    }

    #[test]
    fn construction_fails_without_fallbacks() {
        let alloc = Arc::new(MockAllocator::new());
        alloc.fail_allocations(true);
        assert!(TextureCache::new(alloc, wgpu::TextureFormat::Depth32Float).is_err());
    }

    // ── poll_id ───────────────────────────────────────────────────────────

    #[test]
    fn poll_id_twice_yields_one_texture() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png", 4, 2);
        let (alloc, cache) = cache();

        let first = cache.poll_id(&path);
        let second = cache.poll_id(&path);

        assert_eq!(first, second);
        assert_eq!(first, Handle(2));
        assert_eq!(alloc.textures_created(), 3);
        assert_eq!(cache.path_count(), 1);

        let tex = cache.texture(first);
        assert_eq!((tex.width, tex.height), (4, 2));
        assert_eq!(&tex.pixels[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn handles_increase_past_maximum() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_png(&dir, "a.png", 1, 1);
        let b = write_png(&dir, "b.png", 1, 1);
        let (_, cache) = cache();

        let ha = cache.poll_id(&a);
        let hb = cache.poll_id(&b);
        assert!(hb > ha);
        assert!(ha.raw() >= 2);
    }

    #[test]
    fn decode_failure_returns_missing_and_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let bogus = dir.path().join("bogus.png");
        std::fs::write(&bogus, b"not an image").unwrap();
        let (_, cache) = cache();

        assert_eq!(cache.poll_id(&bogus), MISSING);
        assert_eq!(cache.poll_id(&dir.path().join("absent.png")), MISSING);
        assert_eq!(cache.path_count(), 0);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn load_from_source_shares_texture_with_poll_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "shared.png", 2, 2);
        let (alloc, cache) = cache();

        let loaded = cache.load_from_source(&path).unwrap();
        let again = cache.load_from_source(&path).unwrap();
        assert_eq!(loaded.id, again.id);

        let handle = cache.poll_id(&path);
        assert_eq!(cache.texture(handle).id, loaded.id);
        assert_eq!(alloc.textures_created(), 3);
    }

    #[test]
    fn load_from_source_failure_is_none() {
        let (_, cache) = cache();
        assert!(cache.load_from_source(Path::new("/nonexistent/x.png")).is_none());
    }

    // ── targets ───────────────────────────────────────────────────────────

    #[test]
    fn targets_are_sized_exactly_and_never_pooled() {
        let (alloc, cache) = cache();

        let color = cache
            .allocate_render_target(640, 360, wgpu::TextureFormat::Bgra8Unorm, 4)
            .unwrap();
        assert_eq!((color.width, color.height, color.sample_count), (640, 360, 4));
        assert_eq!(color.usage, TextureUse::RenderTarget);

        let depth = cache.allocate_depth_target(640, 360, 4).unwrap();
        assert_eq!(depth.format, wgpu::TextureFormat::Depth32Float);

        let resolve = cache
            .allocate_resolve_target(640, 360, wgpu::TextureFormat::Bgra8Unorm)
            .unwrap();
        assert_eq!(resolve.sample_count, 1);

        let again = cache.allocate_depth_target(640, 360, 4).unwrap();
        assert_ne!(again.id, depth.id);
        assert_eq!(alloc.textures_created(), 2 + 4);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn target_allocation_failure_is_none() {
        let (alloc, cache) = cache();
        alloc.fail_allocations(true);
        assert!(cache.allocate_depth_target(8, 8, 1).is_none());
    }

    // ── teardown ──────────────────────────────────────────────────────────

    #[test]
    fn clear_scene_keeps_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_png(&dir, "a.png", 1, 1);
        let (_, cache) = cache();

        let h = cache.poll_id(&path);
        cache.clear_scene();

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.path_count(), 0);
        assert_eq!(cache.texture(h).id, cache.texture(MISSING).id);
        assert_eq!(cache.poll_id(&path), Handle(2));
    }
}
