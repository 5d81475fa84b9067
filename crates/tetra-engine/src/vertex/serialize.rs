//! Mesh geometry to GPU vertex records.
//!
//! Fully transparent primitives are dropped here so they cost neither
//! upload bandwidth nor a draw.

use glam::Vec3;

use crate::scene::{Dot, Lin, Tri};

use super::layouts::{BASE, EXTRUDE, JOIN};
use super::{DotInstance, LinVertex, TriVertex};

#[inline]
fn invisible(alpha: f32) -> bool {
    alpha < f32::EPSILON
}

/// Three vertices per visible triangle.
pub fn serialize_tris(tris: &[Tri]) -> Vec<TriVertex> {
    let mut out = Vec::with_capacity(tris.len() * 3);
    for tri in tris {
        if tri.verts.iter().all(|v| invisible(v.col.w)) {
            continue;
        }
        out.extend(tri.verts.iter().map(|v| TriVertex {
            pos: v.pos.to_array(),
            norm: v.norm.to_array(),
            uv: v.uv.to_array(),
            col: v.col.to_array(),
        }));
    }
    out
}

/// Six vertices per visible dominant segment, ordered
/// join, base, extrude at `a` then base, extrude, join at `b`.
pub fn serialize_lins(lins: &[Lin]) -> Vec<LinVertex> {
    let mut out = Vec::with_capacity(lins.len() * 6);

    let neighbour = |index: i32, own: &Lin| -> (Vec3, Vec3) {
        usize::try_from(index)
            .ok()
            .and_then(|i| lins.get(i))
            .map_or((own.tangent(), own.norm), |n| (n.tangent(), n.norm))
    };

    for lin in lins {
        if !lin.dominant || (invisible(lin.a_col.w) && invisible(lin.b_col.w)) {
            continue;
        }

        let tangent = lin.tangent().to_array();
        let norm = lin.norm.to_array();
        let (prev_tan, prev_norm) = neighbour(lin.prev, lin);
        let (next_tan, next_norm) = neighbour(lin.next, lin);

        let vert = |pos: Vec3, col: glam::Vec4, adj: (Vec3, Vec3), extrude: i32| LinVertex {
            pos: pos.to_array(),
            col: col.to_array(),
            tangent,
            norm,
            prev_tan: adj.0.to_array(),
            prev_norm: adj.1.to_array(),
            extrude,
        };

        let at_a = (prev_tan, prev_norm);
        let at_b = (next_tan, next_norm);
        out.extend([
            vert(lin.a, lin.a_col, at_a, JOIN),
            vert(lin.a, lin.a_col, at_a, BASE),
            vert(lin.a, lin.a_col, at_a, EXTRUDE),
            vert(lin.b, lin.b_col, at_b, BASE),
            vert(lin.b, lin.b_col, at_b, EXTRUDE),
            vert(lin.b, lin.b_col, at_b, JOIN),
        ]);
    }
    out
}

/// One instance per visible dot.
pub fn serialize_dots(dots: &[Dot]) -> Vec<DotInstance> {
    dots.iter()
        .filter(|d| !invisible(d.col.w))
        .map(|d| DotInstance {
            col: d.col.to_array(),
            pos: d.pos.to_array(),
            norm: d.norm.to_array(),
        })
        .collect()
}
