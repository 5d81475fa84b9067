//! Tetra engine crate.
//!
//! GPU resource caches and the dot/line/triangle render pipeline behind the
//! tetra live view and exporter. Meshes are owned by an external engine and
//! shared through [`scene::SharedScene`]; this crate only reads them and keeps
//! their GPU copies current.

pub mod device;
pub mod driver;
pub mod gpu;
pub mod time;

pub mod cache;
pub mod handle;
pub mod logging;
pub mod projection;
pub mod render;
pub mod scene;
pub mod vertex;
