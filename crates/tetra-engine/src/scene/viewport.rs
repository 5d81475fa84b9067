use glam::{DVec3, Vec4};

/// Scene camera. `forward` need not be normalized.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub origin: DVec3,
    pub forward: DVec3,
    pub up: DVec3,
    pub near: f64,
    pub far: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            origin: DVec3::new(0.0, 0.0, 4.0),
            forward: DVec3::new(0.0, 0.0, -1.0),
            up: DVec3::Y,
            near: 0.1,
            far: 100.0,
        }
    }
}

/// Coarse engine state, shown as the viewport border color.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ViewportStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    CompilerError,
    RuntimeError,
}

impl ViewportStatus {
    /// RGBA border color for the host overlay.
    pub const fn border_color(self) -> [f32; 4] {
        match self {
            ViewportStatus::Playing => [1.0, 1.0, 1.0, 1.0],
            ViewportStatus::Idle => [0.5, 0.5, 0.5, 1.0],
            ViewportStatus::CompilerError | ViewportStatus::RuntimeError => [0.9, 0.2, 0.2, 1.0],
            ViewportStatus::Loading => [0.25, 0.45, 0.95, 1.0],
        }
    }

    pub const fn is_error(self) -> bool {
        matches!(
            self,
            ViewportStatus::CompilerError | ViewportStatus::RuntimeError
        )
    }
}

/// Everything besides geometry that determines a frame.
///
/// `nonce` is bumped by the engine whenever geometry changed, so two states
/// with identical camera values still compare unequal and force a redraw.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportState {
    pub camera: Camera,
    pub aspect_ratio: f64,
    pub background: Vec4,
    pub status: ViewportStatus,
    pub nonce: u64,
}

impl Default for ViewportState {
    fn default() -> Self {
        Self {
            camera: Camera::default(),
            aspect_ratio: 16.0 / 9.0,
            background: Vec4::new(0.0, 0.0, 0.0, 1.0),
            status: ViewportStatus::Idle,
            nonce: 0,
        }
    }
}

impl ViewportState {
    /// Same state with the nonce advanced.
    pub fn bumped(mut self) -> Self {
        self.nonce = self.nonce.wrapping_add(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonce_forces_inequality() {
        let a = ViewportState::default();
        let b = a.bumped();
        assert_eq!(a.camera, b.camera);
        assert_ne!(a, b);
    }

    #[test]
    fn error_states_share_a_color() {
        assert_eq!(
            ViewportStatus::CompilerError.border_color(),
            ViewportStatus::RuntimeError.border_color()
        );
        assert_ne!(
            ViewportStatus::Playing.border_color(),
            ViewportStatus::Idle.border_color()
        );
    }
}
