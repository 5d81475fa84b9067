//! GPU vertex formats and the per-family serializers that fill them.

mod indices;
mod layouts;
mod serialize;

pub use indices::{
    FanCache, LINE_INDICES, LINE_VERTICES, LineIndexCache, MIN_DOT_VERTICES, fan_index_count,
    fan_indices, line_indices,
};
pub use layouts::{DotInstance, LinVertex, TriVertex, JOIN, BASE, EXTRUDE};
pub use serialize::{serialize_dots, serialize_lins, serialize_tris};
