use bytemuck::{Pod, Zeroable};

// ── triangle ──────────────────────────────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TriVertex {
    pub pos: [f32; 3],
    pub norm: [f32; 3],
    pub uv: [f32; 2],
    pub col: [f32; 4],
}

impl TriVertex {
    const ATTRS: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x3,
        2 => Float32x2,
        3 => Float32x4,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<TriVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── line ──────────────────────────────────────────────────────────────────

/// Vertex on the centerline, offset to `-radius` in the shader.
pub const BASE: i32 = 0;
/// Vertex offset to `+radius`.
pub const EXTRUDE: i32 = 1;
/// Miter vertex between this segment and its neighbour.
pub const JOIN: i32 = 2;

/// One of the six vertices emitted per line segment.
///
/// `prev_tan`/`prev_norm` describe the neighbouring segment at this
/// vertex's endpoint: the previous one at `a`, the next one at `b`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LinVertex {
    pub pos: [f32; 3],
    pub col: [f32; 4],
    pub tangent: [f32; 3],
    pub norm: [f32; 3],
    pub prev_tan: [f32; 3],
    pub prev_norm: [f32; 3],
    pub extrude: i32,
}

impl LinVertex {
    const ATTRS: [wgpu::VertexAttribute; 7] = wgpu::vertex_attr_array![
        0 => Float32x3,
        1 => Float32x4,
        2 => Float32x3,
        3 => Float32x3,
        4 => Float32x3,
        5 => Float32x3,
        6 => Sint32,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<LinVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

// ── dot ───────────────────────────────────────────────────────────────────

/// Per-instance dot record; the fan geometry comes from the index buffer.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DotInstance {
    pub col: [f32; 4],
    pub pos: [f32; 3],
    pub norm: [f32; 3],
}

impl DotInstance {
    const ATTRS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x4,
        1 => Float32x3,
        2 => Float32x3,
    ];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<DotInstance>() as u64,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRS,
        }
    }
}
