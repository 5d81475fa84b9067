//! Per-draw uniform blocks. Layouts mirror the WGSL structs in `shaders/`.

use bytemuck::{Pod, Zeroable};

use crate::projection::ProjectionSet;

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TriVertUniform {
    pub mv: [[f32; 4]; 4],
    pub p: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub z_offset: f32,
    pub _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LinVertUniform {
    pub mv: [[f32; 4]; 4],
    pub p: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub inlet_size: [f32; 2],
    pub viewport_size: [f32; 2],
    pub radius: f32,
    pub max_miter_scale: f32,
    pub z_offset: f32,
    pub _pad: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DotVertUniform {
    pub mv: [[f32; 4]; 4],
    pub p: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
    pub viewport_size: [f32; 2],
    pub radius: f32,
    pub vertex_count: u32,
    pub z_offset: f32,
    pub _pad: [f32; 3],
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FragUniform {
    pub opacity: f32,
    pub gloss: f32,
    pub _pad: [f32; 2],
}

impl FragUniform {
    pub fn new(opacity: f32, gloss: f32) -> Self {
        Self {
            opacity,
            gloss,
            _pad: [0.0; 2],
        }
    }
}

/// Size of the vertex uniform binding; every family's block fits in it.
pub const VERTEX_UNIFORM_SIZE: u64 = 224;
pub const FRAGMENT_UNIFORM_SIZE: u64 = std::mem::size_of::<FragUniform>() as u64;

/// Camera-derived matrices common to all three blocks.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Matrices {
    pub mv: [[f32; 4]; 4],
    pub p: [[f32; 4]; 4],
    pub normal: [[f32; 4]; 4],
}

impl Matrices {
    pub fn from_projection(set: &ProjectionSet) -> Self {
        Self {
            mv: set.camera.to_cols_array_2d(),
            p: set.projection.to_cols_array_2d(),
            normal: set.normal.to_cols_array_2d(),
        }
    }
}
