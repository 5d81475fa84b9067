use glam::{DMat4, DVec4, Mat4, Vec2};

use crate::scene::{Camera, ViewportState};

use super::{Inlet, letterbox};

/// Target description for one projection build.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionParams {
    /// Drawable size in physical pixels.
    pub draw_size: Vec2,
    /// Physical pixels per logical point.
    pub point_scale: f32,
    /// Minimum margin around the inlet, in points.
    pub padding: f32,
    /// Extra margin below the inlet, in points.
    pub bottom_padding: f32,
}

impl ProjectionParams {
    /// Full-bleed target, as used for export.
    pub fn full_bleed(width: u32, height: u32) -> Self {
        Self {
            draw_size: Vec2::new(width as f32, height as f32),
            point_scale: 1.0,
            padding: 0.0,
            bottom_padding: 0.0,
        }
    }
}

/// Matrices for one frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProjectionSet {
    /// World to camera space.
    pub camera: Mat4,
    /// Camera space to clip space over the whole inlet.
    pub perspective: Mat4,
    /// Inlet clip space to drawable clip space.
    pub viewport_map: Mat4,
    /// `viewport_map * perspective`; the `p` matrix the shaders see.
    pub projection: Mat4,
    /// `projection * camera`.
    pub full: Mat4,
    /// `inverse(transpose(camera))`.
    pub normal: Mat4,
    pub inlet: Inlet,
    pub draw_size: Vec2,
}

/// Right-handed look-along matrix. `forward` need not be normalized.
pub fn camera_matrix(camera: &Camera) -> Mat4 {
    let z = camera.forward.normalize();
    let x = z.cross(camera.up).normalize();
    let y = x.cross(z);

    let rotation = DMat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        (-z).extend(0.0),
        DVec4::W,
    )
    .transpose();

    (rotation * DMat4::from_translation(-camera.origin)).as_mat4()
}

/// Perspective with a 90 degree horizontal field of view and depth mapped to
/// `[0, 1]`. `aspect` is width over height.
pub fn perspective_matrix(near: f64, far: f64, aspect: f64) -> Mat4 {
    let depth = far - near;
    DMat4::from_cols(
        DVec4::new(1.0, 0.0, 0.0, 0.0),
        DVec4::new(0.0, aspect, 0.0, 0.0),
        DVec4::new(0.0, 0.0, -far / depth, -1.0),
        DVec4::new(0.0, 0.0, -far * near / depth, 0.0),
    )
    .as_mat4()
}

/// Maps clip space spanning `inlet` into clip space spanning the drawable.
pub fn viewport_map(inlet: Inlet, draw_size: Vec2) -> Mat4 {
    let [cx, cy] = inlet.center();
    let translate = Mat4::from_translation(glam::Vec3::new(
        cx / draw_size.x * 2.0 - 1.0,
        1.0 - cy / draw_size.y * 2.0,
        0.0,
    ));
    let scale = Mat4::from_scale(glam::Vec3::new(
        inlet.width / draw_size.x,
        inlet.height / draw_size.y,
        1.0,
    ));
    translate * scale
}

/// Builds every matrix for `viewport` rendered into `params`.
pub fn build_projection(viewport: &ViewportState, params: &ProjectionParams) -> ProjectionSet {
    let draw_size = params.draw_size.max(Vec2::ONE);
    let scale = params.point_scale.max(f32::EPSILON);

    let inlet = letterbox(
        draw_size.x,
        draw_size.y,
        viewport.aspect_ratio as f32,
        params.padding * scale,
        params.bottom_padding * scale,
    );

    let camera = camera_matrix(&viewport.camera);
    let perspective = perspective_matrix(
        viewport.camera.near,
        viewport.camera.far,
        viewport.aspect_ratio,
    );
    let viewport_map = viewport_map(inlet, draw_size);
    let projection = viewport_map * perspective;

    ProjectionSet {
        camera,
        perspective,
        viewport_map,
        projection,
        full: projection * camera,
        normal: camera.transpose().inverse(),
        inlet,
        draw_size,
    }
}
