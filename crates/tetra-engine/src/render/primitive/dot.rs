use crate::gpu::Allocator;
use crate::scene::{Family, Mesh};
use crate::vertex::{DotInstance, MIN_DOT_VERTICES, serialize_dots};

use super::{FrameContext, PrimitiveRenderer, drawable, materialize};
use crate::render::plan::DrawCall;
use crate::render::uniforms::{DotVertUniform, FragUniform};

/// Instanced regular-polygon dots, one instance per dot record.
pub struct DotRenderer;

impl<A: Allocator> PrimitiveRenderer<A> for DotRenderer {
    const FAMILY: Family = Family::Dot;

    fn prepare(mesh: &Mesh, ctx: &FrameContext<'_, A>, z_offset: f32) -> Option<DrawCall<A>> {
        let dots = mesh.dots.as_deref()?;

        let entry = materialize(mesh, Family::Dot, ctx, || serialize_dots(dots))?;

        let opacity = mesh.uniforms.opacity;
        if !drawable(entry.len, opacity, Family::Dot, ctx.available) {
            return None;
        }

        let fan_vertices = u32::from(mesh.uniforms.dot_vertex_count).max(MIN_DOT_VERTICES);
        let m = ctx.matrices;

        Some(DrawCall::Dot {
            buffer: entry.buffer,
            instances: (entry.len / std::mem::size_of::<DotInstance>() as u64) as u32,
            fan_vertices,
            uniform: DotVertUniform {
                mv: m.mv,
                p: m.p,
                normal: m.normal,
                viewport_size: ctx.projection.draw_size.to_array(),
                radius: mesh.uniforms.dot_radius * ctx.radius_scale(),
                vertex_count: fan_vertices,
                z_offset,
                _pad: [0.0; 3],
            },
            fragment: FragUniform::new(opacity, mesh.uniforms.gloss),
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::render::primitive::test_support::Fixture;
    use crate::scene::{Dot, FamilySet};

    fn dot() -> Dot {
        Dot {
            pos: Vec3::ZERO,
            norm: Vec3::Z,
            col: Vec4::ONE,
        }
    }

    #[test]
    fn one_instance_per_dot() {
        let fx = Fixture::new();
        let mesh = Mesh::new().with_dots(vec![dot(); 5]);

        let Some(DrawCall::Dot { instances, fan_vertices, uniform, .. }) =
            DotRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0)
        else {
            panic!("expected a dot draw");
        };
        assert_eq!(instances, 5);
        assert_eq!(fan_vertices, 16);
        assert_eq!(uniform.vertex_count, 16);
        assert_eq!(uniform.radius, 2.0);
    }

    #[test]
    fn tiny_fans_are_clamped() {
        let fx = Fixture::new();
        let mut mesh = Mesh::new().with_dots(vec![dot()]);
        mesh.uniforms.dot_vertex_count = 2;

        let Some(DrawCall::Dot { fan_vertices, .. }) =
            DotRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0)
        else {
            panic!("expected a dot draw");
        };
        assert_eq!(fan_vertices, MIN_DOT_VERTICES);
    }

    #[test]
    fn exhausted_pool_skips_draw() {
        use std::sync::Arc;

        use crate::cache::BufferCache;
        use crate::handle::{HandlePool, SubmissionTracker};

        let fx = Fixture::new();
        let buffers = BufferCache::with_pool(
            fx.alloc.clone(),
            Arc::new(SubmissionTracker::new()),
            HandlePool::with_end(2),
        );
        let mut ctx = fx.ctx(FamilySet::ALL);
        ctx.buffers = &buffers;

        let mesh = Mesh::new().with_dots(vec![dot()]);
        assert!(DotRenderer::prepare(&mesh, &ctx, 0.0).is_none());
        assert!(mesh.slot(Family::Dot).get().is_none());
    }
}
