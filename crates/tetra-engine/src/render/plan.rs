use crate::gpu::Allocator;
use crate::scene::Family;

use super::uniforms::{DotVertUniform, FragUniform, LinVertUniform, TriVertUniform};

/// One draw, ready to encode.
///
/// Buffers and textures are clones taken from the caches while the mesh list
/// was read-locked; they stay valid even if the cache replaces its entry.
pub enum DrawCall<A: Allocator> {
    Tri {
        buffer: A::Buffer,
        vertices: u32,
        texture: A::Texture,
        uniform: TriVertUniform,
        fragment: FragUniform,
    },
    Lin {
        buffer: A::Buffer,
        segments: u32,
        uniform: LinVertUniform,
        fragment: FragUniform,
    },
    Dot {
        buffer: A::Buffer,
        instances: u32,
        fan_vertices: u32,
        uniform: DotVertUniform,
        fragment: FragUniform,
    },
}

impl<A: Allocator> DrawCall<A> {
    pub fn family(&self) -> Family {
        match self {
            DrawCall::Tri { .. } => Family::Tri,
            DrawCall::Lin { .. } => Family::Lin,
            DrawCall::Dot { .. } => Family::Dot,
        }
    }

    pub fn z_offset(&self) -> f32 {
        match self {
            DrawCall::Tri { uniform, .. } => uniform.z_offset,
            DrawCall::Lin { uniform, .. } => uniform.z_offset,
            DrawCall::Dot { uniform, .. } => uniform.z_offset,
        }
    }

    pub fn fragment(&self) -> &FragUniform {
        match self {
            DrawCall::Tri { fragment, .. }
            | DrawCall::Lin { fragment, .. }
            | DrawCall::Dot { fragment, .. } => fragment,
        }
    }
}

/// Everything needed to encode one frame, in draw order.
pub struct FramePlan<A: Allocator> {
    pub clear: [f32; 4],
    pub draws: Vec<DrawCall<A>>,
}

impl<A: Allocator> FramePlan<A> {
    /// Largest dot fan in the frame, 0 if there are no dots.
    pub fn max_fan_vertices(&self) -> u32 {
        self.draws
            .iter()
            .filter_map(|d| match d {
                DrawCall::Dot { fan_vertices, .. } => Some(*fan_vertices),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Largest line draw in the frame, in segments.
    pub fn max_line_segments(&self) -> u32 {
        self.draws
            .iter()
            .filter_map(|d| match d {
                DrawCall::Lin { segments, .. } => Some(*segments),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use bytemuck::Zeroable;
    use parking_lot::Mutex;

    use super::*;
    use crate::gpu::testing::{MockAllocator, MockBuffer};

    fn buffer() -> Arc<MockBuffer> {
        Arc::new(MockBuffer {
            id: 0,
            capacity: 16,
            data: Mutex::new(vec![0; 16]),
        })
    }

    fn lin(segments: u32) -> DrawCall<MockAllocator> {
        DrawCall::Lin {
            buffer: buffer(),
            segments,
            uniform: LinVertUniform::zeroed(),
            fragment: FragUniform::zeroed(),
        }
    }

    fn dot(fan_vertices: u32) -> DrawCall<MockAllocator> {
        DrawCall::Dot {
            buffer: buffer(),
            instances: 3,
            fan_vertices,
            uniform: DotVertUniform::zeroed(),
            fragment: FragUniform::zeroed(),
        }
    }

    #[test]
    fn maxima_are_zero_without_matching_draws() {
        let plan = FramePlan::<MockAllocator> {
            clear: [0.0; 4],
            draws: vec![lin(4)],
        };
        assert_eq!(plan.max_fan_vertices(), 0);
        assert_eq!(plan.max_line_segments(), 4);
    }

    #[test]
    fn maxima_cover_every_draw() {
        let plan = FramePlan {
            clear: [0.0; 4],
            draws: vec![dot(8), lin(2), dot(24), lin(9), dot(5)],
        };
        assert_eq!(plan.max_fan_vertices(), 24);
        assert_eq!(plan.max_line_segments(), 9);
        assert_eq!(plan.len(), 5);
        assert_eq!(plan.draws[1].family(), Family::Lin);
    }
}
