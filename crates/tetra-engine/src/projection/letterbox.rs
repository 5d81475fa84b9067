/// Drawable sub-rectangle holding the scene, in physical pixels
/// (top-left origin).
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Inlet {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Inlet {
    #[inline]
    pub fn size(self) -> [f32; 2] {
        [self.width, self.height]
    }

    #[inline]
    pub fn center(self) -> [f32; 2] {
        [self.x + self.width * 0.5, self.y + self.height * 0.5]
    }
}

/// Largest rectangle of `aspect` (width / height) that fits in
/// `width x height` after `padding` on every side and an extra
/// `bottom` strip, centered in the remaining area.
///
/// All lengths share one unit. The result is at least 1x1.
pub fn letterbox(width: f32, height: f32, aspect: f32, padding: f32, bottom: f32) -> Inlet {
    let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };

    let avail_w = width - 2.0 * padding;
    let avail_h = height - 2.0 * padding - bottom;

    let fit_w = avail_w.min(avail_h * aspect).max(1.0);
    let fit_h = (fit_w / aspect).max(1.0);

    Inlet {
        x: (width - fit_w) * 0.5,
        y: (height - bottom - fit_h) * 0.5,
        width: fit_w,
        height: fit_h,
    }
}
