//! Engine-owned scene data as seen by the render core.
//!
//! The engine thread owns and mutates the mesh list under the write side of
//! [`SharedScene::meshes`]; the render core only reads geometry and updates
//! the atomic handle slots and modified flag of each [`Mesh`].

mod family;
mod mesh;
mod shared;
mod viewport;

pub use family::{Family, FamilySet};
pub use mesh::{Dot, Lin, Mesh, MeshUniforms, MeshVertex, Tri};
pub use shared::SharedScene;
pub use viewport::{Camera, ViewportState, ViewportStatus};
