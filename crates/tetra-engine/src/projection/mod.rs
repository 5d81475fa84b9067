//! Camera, perspective and letterbox matrices.
//!
//! Everything here is a pure function of the viewport state and the target
//! size. Drivers rebuild the set every frame rather than caching it.

mod builder;
mod letterbox;

pub use builder::{
    ProjectionParams, ProjectionSet, build_projection, camera_matrix, perspective_matrix,
    viewport_map,
};
pub use letterbox::{Inlet, letterbox};
