use std::sync::atomic::{AtomicBool, Ordering};

use glam::{Vec2, Vec3, Vec4};

use crate::handle::{Handle, HandleSlot};

use super::Family;

/// Triangle corner.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct MeshVertex {
    pub pos: Vec3,
    pub norm: Vec3,
    pub uv: Vec2,
    pub col: Vec4,
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Tri {
    pub verts: [MeshVertex; 3],
}

/// Line segment with links to its neighbours for joins.
///
/// `prev`/`next` index into the owning mesh's line list; a negative value
/// means the segment has no neighbour on that side. Lines come in sibling
/// pairs (one per adjacent face); only the `dominant` sibling is drawn.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lin {
    pub a: Vec3,
    pub b: Vec3,
    pub a_col: Vec4,
    pub b_col: Vec4,
    pub norm: Vec3,
    pub prev: i32,
    pub next: i32,
    pub dominant: bool,
}

impl Lin {
    pub fn new(a: Vec3, b: Vec3, col: Vec4) -> Self {
        Self {
            a,
            b,
            a_col: col,
            b_col: col,
            norm: Vec3::Z,
            prev: -1,
            next: -1,
            dominant: true,
        }
    }

    #[inline]
    pub fn tangent(&self) -> Vec3 {
        self.b - self.a
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Dot {
    pub pos: Vec3,
    pub norm: Vec3,
    pub col: Vec4,
}

/// Material parameters shared by every family of a mesh.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MeshUniforms {
    pub opacity: f32,
    pub gloss: f32,
    /// Half stroke width in reference pixels.
    pub stroke_radius: f32,
    /// Upper bound on miter length as a multiple of `stroke_radius`.
    pub stroke_miter_radius_scale: f32,
    /// Dot radius in reference pixels.
    pub dot_radius: f32,
    /// Vertices in the dot fan, center included.
    pub dot_vertex_count: u16,
}

impl Default for MeshUniforms {
    fn default() -> Self {
        Self {
            opacity: 1.0,
            gloss: 0.0,
            stroke_radius: 2.0,
            stroke_miter_radius_scale: 4.0,
            dot_radius: 4.0,
            dot_vertex_count: 16,
        }
    }
}

/// One drawable unit of geometry.
///
/// Geometry and uniforms are written by the engine under the scene write
/// lock. The handle slots and the modified flag are atomics so the render
/// core can update them while only holding the read lock.
#[derive(Debug)]
pub struct Mesh {
    pub tris: Option<Vec<Tri>>,
    pub lins: Option<Vec<Lin>>,
    pub dots: Option<Vec<Dot>>,
    pub uniforms: MeshUniforms,
    /// Texture cache handle; `Handle::NONE` samples the transparent fallback.
    pub texture: Handle,

    tri_slot: HandleSlot,
    lin_slot: HandleSlot,
    dot_slot: HandleSlot,
    modified: AtomicBool,
}

impl Mesh {
    /// Creates an empty mesh, flagged modified so the first frame uploads it.
    pub fn new() -> Self {
        Self {
            tris: None,
            lins: None,
            dots: None,
            uniforms: MeshUniforms::default(),
            texture: Handle::NONE,
            tri_slot: HandleSlot::empty(),
            lin_slot: HandleSlot::empty(),
            dot_slot: HandleSlot::empty(),
            modified: AtomicBool::new(true),
        }
    }

    pub fn with_tris(mut self, tris: Vec<Tri>) -> Self {
        self.tris = Some(tris);
        self
    }

    pub fn with_lins(mut self, lins: Vec<Lin>) -> Self {
        self.lins = Some(lins);
        self
    }

    pub fn with_dots(mut self, dots: Vec<Dot>) -> Self {
        self.dots = Some(dots);
        self
    }

    pub fn with_uniforms(mut self, uniforms: MeshUniforms) -> Self {
        self.uniforms = uniforms;
        self
    }

    pub fn with_texture(mut self, texture: Handle) -> Self {
        self.texture = texture;
        self
    }

    pub fn has_family(&self, family: Family) -> bool {
        match family {
            Family::Tri => self.tris.is_some(),
            Family::Lin => self.lins.is_some(),
            Family::Dot => self.dots.is_some(),
        }
    }

    /// Cached buffer handle for `family`.
    pub fn slot(&self, family: Family) -> &HandleSlot {
        match family {
            Family::Tri => &self.tri_slot,
            Family::Lin => &self.lin_slot,
            Family::Dot => &self.dot_slot,
        }
    }

    /// Called by the engine after changing geometry or uniforms.
    pub fn mark_modified(&self) {
        self.modified.store(true, Ordering::Release);
    }

    pub fn is_modified(&self) -> bool {
        self.modified.load(Ordering::Acquire)
    }

    pub(crate) fn clear_modified(&self) {
        self.modified.store(false, Ordering::Release);
    }
}

impl Default for Mesh {
    fn default() -> Self {
        Self::new()
    }
}
