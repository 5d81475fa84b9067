use crate::gpu::Allocator;
use crate::scene::{Family, Mesh};
use crate::vertex::{LINE_VERTICES, LinVertex, serialize_lins};

use super::{FrameContext, PrimitiveRenderer, drawable, materialize};
use crate::render::plan::DrawCall;
use crate::render::uniforms::{FragUniform, LinVertUniform};

/// Screen-space thick lines with mitered joins.
///
/// Each segment is six vertices; the draw covers `12 * segments` indices of
/// the shared line index buffer.
pub struct LinRenderer;

impl<A: Allocator> PrimitiveRenderer<A> for LinRenderer {
    const FAMILY: Family = Family::Lin;

    fn prepare(mesh: &Mesh, ctx: &FrameContext<'_, A>, z_offset: f32) -> Option<DrawCall<A>> {
        let lins = mesh.lins.as_deref()?;

        let entry = materialize(mesh, Family::Lin, ctx, || serialize_lins(lins))?;

        let opacity = mesh.uniforms.opacity;
        if !drawable(entry.len, opacity, Family::Lin, ctx.available) {
            return None;
        }

        let segment_bytes = std::mem::size_of::<LinVertex>() as u64 * LINE_VERTICES as u64;
        let inlet = ctx.projection.inlet;
        let m = ctx.matrices;

        Some(DrawCall::Lin {
            buffer: entry.buffer,
            segments: (entry.len / segment_bytes) as u32,
            uniform: LinVertUniform {
                mv: m.mv,
                p: m.p,
                normal: m.normal,
                inlet_size: inlet.size(),
                viewport_size: ctx.projection.draw_size.to_array(),
                radius: mesh.uniforms.stroke_radius * ctx.radius_scale(),
                max_miter_scale: mesh.uniforms.stroke_miter_radius_scale,
                z_offset,
                _pad: 0.0,
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
    use crate::scene::{FamilySet, Lin};

    #[test]
    fn segment_count_and_scaled_radius() {
        let fx = Fixture::new();
        let mut mesh = Mesh::new().with_lins(vec![
            Lin::new(Vec3::ZERO, Vec3::X, Vec4::ONE),
            Lin::new(Vec3::X, Vec3::Y, Vec4::ONE),
        ]);
        mesh.uniforms.stroke_radius = 4.0;

        let Some(DrawCall::Lin { segments, uniform, .. }) =
            LinRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0)
        else {
            panic!("expected a line draw");
        };
        assert_eq!(segments, 2);
        // inlet is 740 wide against a 1480 reference
        assert_eq!(uniform.radius, 2.0);
        assert_eq!(uniform.inlet_size, [740.0, 370.0]);
    }

    #[test]
    fn only_non_dominant_lines_do_not_draw() {
        let fx = Fixture::new();
        let mut lin = Lin::new(Vec3::ZERO, Vec3::X, Vec4::ONE);
        lin.dominant = false;
        let mesh = Mesh::new().with_lins(vec![lin]);

        assert!(LinRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0).is_none());
    }
}
