use crate::gpu::Allocator;
use crate::scene::{Family, Mesh};
use crate::vertex::{TriVertex, serialize_tris};

use super::{FrameContext, PrimitiveRenderer, drawable, materialize};
use crate::render::plan::DrawCall;
use crate::render::uniforms::{FragUniform, TriVertUniform};

/// Filled, optionally textured triangles. Drawn as a plain triangle list.
pub struct TriRenderer;

impl<A: Allocator> PrimitiveRenderer<A> for TriRenderer {
    const FAMILY: Family = Family::Tri;

    fn prepare(mesh: &Mesh, ctx: &FrameContext<'_, A>, z_offset: f32) -> Option<DrawCall<A>> {
        let tris = mesh.tris.as_deref()?;

        let entry = materialize(mesh, Family::Tri, ctx, || serialize_tris(tris))?;

        let opacity = mesh.uniforms.opacity;
        if !drawable(entry.len, opacity, Family::Tri, ctx.available) {
            return None;
        }

        let m = ctx.matrices;
        Some(DrawCall::Tri {
            buffer: entry.buffer,
            vertices: (entry.len / std::mem::size_of::<TriVertex>() as u64) as u32,
            texture: ctx.textures.texture(mesh.texture),
            uniform: TriVertUniform {
                mv: m.mv,
                p: m.p,
                normal: m.normal,
                z_offset,
                _pad: [0.0; 3],
            },
            fragment: FragUniform::new(opacity, mesh.uniforms.gloss),
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec4;

    use super::*;
    use crate::cache::MISSING;
    use crate::handle::Handle;
    use crate::render::primitive::test_support::Fixture;
    use crate::scene::{FamilySet, MeshUniforms, MeshVertex, Tri};

    fn tri(alpha: f32) -> Tri {
        let mut v = MeshVertex::default();
        v.col = Vec4::new(1.0, 1.0, 1.0, alpha);
        Tri { verts: [v; 3] }
    }

    fn mesh(tris: Vec<Tri>, opacity: f32) -> Mesh {
        Mesh::new().with_tris(tris).with_uniforms(MeshUniforms {
            opacity,
            ..MeshUniforms::default()
        })
    }

    #[test]
    fn draws_every_vertex() {
        let fx = Fixture::new();
        let mesh = mesh(vec![tri(1.0), tri(1.0)], 1.0);

        let Some(DrawCall::Tri { vertices, uniform, .. }) =
            TriRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.25)
        else {
            panic!("expected a triangle draw");
        };
        assert_eq!(vertices, 6);
        assert_eq!(uniform.z_offset, 0.25);
    }

    #[test]
    fn empty_geometry_with_opacity_does_not_draw() {
        let fx = Fixture::new();
        let mesh = mesh(Vec::new(), 0.5);

        assert!(TriRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0).is_none());
        // the handle is still materialized and the entry written empty
        let h = mesh.slot(Family::Tri).get();
        assert!(!h.is_none());
        assert_eq!(fx.buffers.fetch(h).unwrap().len, 0);
    }

    #[test]
    fn transparent_mesh_does_not_draw() {
        let fx = Fixture::new();
        let mesh = mesh(vec![tri(1.0)], 0.0);
        assert!(TriRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0).is_none());
    }

    #[test]
    fn absent_family_is_skipped_without_materializing() {
        let fx = Fixture::new();
        let mesh = Mesh::new();
        assert!(TriRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0).is_none());
        assert!(mesh.slot(Family::Tri).get().is_none());
        assert_eq!(fx.alloc.buffers_created(), 0);
    }

    #[test]
    fn missing_pipeline_still_uploads() {
        let fx = Fixture::new();
        let mesh = mesh(vec![tri(1.0)], 1.0);
        let ctx = fx.ctx(FamilySet::ALL.without(Family::Tri));

        assert!(TriRenderer::prepare(&mesh, &ctx, 0.0).is_none());
        assert_eq!(fx.alloc.buffers_created(), 1);
    }

    #[test]
    fn handle_materialized_once() {
        let fx = Fixture::new();
        let mesh = mesh(vec![tri(1.0)], 1.0);
        let ctx = fx.ctx(FamilySet::ALL);

        TriRenderer::prepare(&mesh, &ctx, 0.0);
        let first = mesh.slot(Family::Tri).get();
        TriRenderer::prepare(&mesh, &ctx, 0.0);
        assert_eq!(mesh.slot(Family::Tri).get(), first);
        assert_eq!(fx.buffers.len(), 1);
    }

    #[test]
    fn unmodified_mesh_skips_upload() {
        let fx = Fixture::new();
        let mesh = mesh(vec![tri(1.0)], 1.0);
        let ctx = fx.ctx(FamilySet::ALL);

        TriRenderer::prepare(&mesh, &ctx, 0.0);
        let writes = fx.alloc.writes();
        mesh.clear_modified();
        assert!(TriRenderer::prepare(&mesh, &ctx, 0.0).is_some());
        assert_eq!(fx.alloc.writes(), writes);
    }

    #[test]
    fn unknown_texture_falls_back_to_placeholder() {
        let fx = Fixture::new();
        let mesh = mesh(vec![tri(1.0)], 1.0).with_texture(Handle(99));

        let Some(DrawCall::Tri { texture, .. }) =
            TriRenderer::prepare(&mesh, &fx.ctx(FamilySet::ALL), 0.0)
        else {
            panic!("expected a triangle draw");
        };
        assert_eq!(texture.id, fx.textures.texture(MISSING).id);
    }
}
