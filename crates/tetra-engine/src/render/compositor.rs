use std::cell::Cell;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cache::{BufferCache, TextureCache};
use crate::gpu::Allocator;
use crate::projection::ProjectionSet;
use crate::scene::{FamilySet, Mesh, ViewportState};

use super::plan::{DrawCall, FramePlan};
use super::primitive::{DotRenderer, FrameContext, LinRenderer, PrimitiveRenderer, TriRenderer};
use super::uniforms::Matrices;
use super::RenderConfig;

type PreparePass<A> = fn(&Mesh, &FrameContext<'_, A>, f32) -> Option<DrawCall<A>>;

/// Turns the shared mesh list into an ordered [`FramePlan`].
///
/// The caches are injected by the owner, so a live view and an exporter can
/// share one set of buffers and textures.
pub struct Compositor<A: Allocator> {
    buffers: Arc<BufferCache<A>>,
    textures: Arc<TextureCache<A>>,
    config: RenderConfig,
}

impl<A: Allocator> Compositor<A> {
    pub fn new(
        buffers: Arc<BufferCache<A>>,
        textures: Arc<TextureCache<A>>,
        config: RenderConfig,
    ) -> Self {
        Self {
            buffers,
            textures,
            config,
        }
    }

    /// Plans one frame.
    ///
    /// Holds the read side of `meshes` for the whole iteration. Per mesh the
    /// families are visited fill, stroke, dot; the depth bias grows by
    /// `z_step` after every family that produced a draw. The modified flag of
    /// a mesh is cleared once all its families uploaded; a failed upload
    /// skips only this frame's draw and is retried next frame.
    pub fn compose(
        &self,
        meshes: &RwLock<Vec<Mesh>>,
        viewport: &ViewportState,
        projection: &ProjectionSet,
        available: FamilySet,
    ) -> FramePlan<A> {
        let ctx = FrameContext {
            buffers: &self.buffers,
            textures: &self.textures,
            projection,
            matrices: Matrices::from_projection(projection),
            available,
            reference_width: self.config.reference_width,
            upload_failed: Cell::new(false),
        };

        let passes: [PreparePass<A>; 3] = [
            <TriRenderer as PrimitiveRenderer<A>>::prepare,
            <LinRenderer as PrimitiveRenderer<A>>::prepare,
            <DotRenderer as PrimitiveRenderer<A>>::prepare,
        ];

        let meshes = meshes.read();
        let mut draws = Vec::with_capacity(meshes.len() * 3);
        let mut z_offset = 0.0f32;

        for mesh in meshes.iter() {
            ctx.upload_failed.set(false);
            for pass in passes {
                if let Some(draw) = pass(mesh, &ctx, z_offset) {
                    draws.push(draw);
                    z_offset += self.config.z_step;
                }
            }
            if !ctx.upload_failed.get() {
                mesh.clear_modified();
            }
        }

        log::trace!("composed {} draws over {} meshes", draws.len(), meshes.len());

        FramePlan {
            clear: viewport.background.to_array(),
            draws,
        }
    }

    pub fn buffers(&self) -> &Arc<BufferCache<A>> {
        &self.buffers
    }

    pub fn textures(&self) -> &Arc<TextureCache<A>> {
        &self.textures
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use glam::{Vec3, Vec4};

    use super::*;
    use crate::gpu::testing::MockAllocator;
    use crate::handle::SubmissionTracker;
    use crate::projection::{ProjectionParams, build_projection};
    use crate::scene::{Dot, Family, Lin, MeshUniforms, MeshVertex, Tri};

    fn compositor() -> Compositor<MockAllocator> {
        compositor_with_allocator().1
    }

    fn compositor_with_allocator() -> (Arc<MockAllocator>, Compositor<MockAllocator>) {
        let alloc = Arc::new(MockAllocator::new());
        let buffers = Arc::new(BufferCache::new(
            alloc.clone(),
            Arc::new(SubmissionTracker::new()),
        ));
        let textures = Arc::new(
            TextureCache::new(alloc.clone(), wgpu::TextureFormat::Depth32Float).unwrap(),
        );
        let comp = Compositor::new(buffers, textures, RenderConfig::default());
        (alloc, comp)
    }

    fn full_mesh() -> Mesh {
        let mut v = MeshVertex::default();
        v.col = Vec4::ONE;
        Mesh::new()
            .with_tris(vec![Tri { verts: [v; 3] }])
            .with_lins(vec![Lin::new(Vec3::ZERO, Vec3::X, Vec4::ONE)])
            .with_dots(vec![Dot {
                pos: Vec3::ZERO,
                norm: Vec3::Z,
                col: Vec4::ONE,
            }])
    }

    fn compose(
        comp: &Compositor<MockAllocator>,
        meshes: &RwLock<Vec<Mesh>>,
        available: FamilySet,
    ) -> FramePlan<MockAllocator> {
        let state = ViewportState::default();
        let projection = build_projection(&state, &ProjectionParams::full_bleed(320, 180));
        comp.compose(meshes, &state, &projection, available)
    }

    // ── ordering and depth bias ───────────────────────────────────────────

    #[test]
    fn families_in_fixed_order_per_mesh() {
        let comp = compositor();
        let meshes = RwLock::new(vec![full_mesh(), full_mesh()]);
        let plan = compose(&comp, &meshes, FamilySet::ALL);

        let families: Vec<Family> = plan.draws.iter().map(DrawCall::family).collect();
        assert_eq!(
            families,
            [Family::DRAW_ORDER, Family::DRAW_ORDER].concat()
        );
    }

    #[test]
    fn z_offset_strictly_increases_across_draws() {
        let comp = compositor();
        let meshes = RwLock::new(vec![full_mesh(), full_mesh(), full_mesh()]);
        let plan = compose(&comp, &meshes, FamilySet::ALL);

        let z: Vec<f32> = plan.draws.iter().map(DrawCall::z_offset).collect();
        assert_eq!(z[0], 0.0);
        assert!(z.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn skipped_family_does_not_bump_bias() {
        let comp = compositor();
        let mut middle = full_mesh();
        middle.lins = None;
        let meshes = RwLock::new(vec![middle]);
        let plan = compose(&comp, &meshes, FamilySet::ALL);

        assert_eq!(plan.len(), 2);
        assert_eq!(plan.draws[1].family(), Family::Dot);
        assert_eq!(plan.draws[1].z_offset(), comp.config().z_step);
    }

    #[test]
    fn empty_transparent_mesh_draws_nothing() {
        let comp = compositor();
        let mesh = Mesh::new()
            .with_tris(Vec::new())
            .with_uniforms(MeshUniforms {
                opacity: 0.5,
                ..MeshUniforms::default()
            });
        let meshes = RwLock::new(vec![mesh, full_mesh()]);
        let plan = compose(&comp, &meshes, FamilySet::ALL);

        assert_eq!(plan.len(), 3);
        assert_eq!(plan.draws[0].z_offset(), 0.0);
    }

    #[test]
    fn unavailable_pipeline_drops_only_that_family() {
        let comp = compositor();
        let meshes = RwLock::new(vec![full_mesh()]);
        let plan = compose(&comp, &meshes, FamilySet::ALL.without(Family::Lin));

        let families: Vec<Family> = plan.draws.iter().map(DrawCall::family).collect();
        assert_eq!(families, vec![Family::Tri, Family::Dot]);
    }

    // ── mesh bookkeeping ──────────────────────────────────────────────────

    #[test]
    fn modified_flags_cleared_and_uploads_skipped() {
        let comp = compositor();
        let meshes = RwLock::new(vec![full_mesh()]);

        compose(&comp, &meshes, FamilySet::ALL);
        assert!(!meshes.read()[0].is_modified());
        assert_eq!(comp.buffers().len(), 3);

        // a second frame reuses the uploaded buffers
        let plan = compose(&comp, &meshes, FamilySet::ALL);
        assert_eq!(plan.len(), 3);
        assert_eq!(comp.buffers().len(), 3);
    }

    #[test]
    fn engine_edit_reuploads() {
        let comp = compositor();
        let meshes = RwLock::new(vec![full_mesh()]);
        compose(&comp, &meshes, FamilySet::ALL);

        {
            let mut guard = meshes.write();
            let mesh = &mut guard[0];
            let dots = mesh.dots.get_or_insert_with(Vec::new);
            let first = dots[0];
            dots.push(first);
            mesh.mark_modified();
        }

        let plan = compose(&comp, &meshes, FamilySet::ALL);
        let Some(DrawCall::Dot { instances, .. }) = plan.draws.last() else {
            panic!("expected a dot draw last");
        };
        assert_eq!(*instances, 2);
    }

    #[test]
    fn failed_upload_is_retried_next_frame() {
        let (alloc, comp) = compositor_with_allocator();
        let meshes = RwLock::new(vec![full_mesh()]);

        alloc.fail_allocations(true);
        let plan = compose(&comp, &meshes, FamilySet::ALL);
        assert!(plan.is_empty());
        assert!(meshes.read()[0].is_modified());

        alloc.fail_allocations(false);
        let plan = compose(&comp, &meshes, FamilySet::ALL);
        assert_eq!(plan.len(), 3);
        assert!(!meshes.read()[0].is_modified());

        let plan = compose(&comp, &meshes, FamilySet::ALL);
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn failed_growth_skips_stale_draw_and_retries() {
        let (alloc, comp) = compositor_with_allocator();
        let meshes = RwLock::new(vec![full_mesh()]);
        compose(&comp, &meshes, FamilySet::ALL);

        {
            let mut guard = meshes.write();
            let mesh = &mut guard[0];
            let dots = mesh.dots.get_or_insert_with(Vec::new);
            let first = dots[0];
            dots.extend([first; 7]);
            mesh.mark_modified();
        }

        alloc.fail_allocations(true);
        let plan = compose(&comp, &meshes, FamilySet::ALL);
        let families: Vec<Family> = plan.draws.iter().map(DrawCall::family).collect();
        assert_eq!(families, vec![Family::Tri, Family::Lin]);
        assert!(meshes.read()[0].is_modified());

        alloc.fail_allocations(false);
        let plan = compose(&comp, &meshes, FamilySet::ALL);
        let Some(DrawCall::Dot { instances, .. }) = plan.draws.last() else {
            panic!("expected a dot draw last");
        };
        assert_eq!(*instances, 8);
    }

    #[test]
    fn clear_color_is_background() {
        let comp = compositor();
        let meshes = RwLock::new(Vec::new());
        let plan = compose(&comp, &meshes, FamilySet::ALL);
        assert!(plan.is_empty());
        assert_eq!(plan.clear, ViewportState::default().background.to_array());
    }
}
