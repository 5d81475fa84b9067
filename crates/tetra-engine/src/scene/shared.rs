use std::sync::Arc;

use parking_lot::RwLock;

use crate::driver::Mailbox;

use super::{Mesh, ViewportState};

/// Handles shared between the engine thread and the render drivers.
///
/// The engine takes the write side of `meshes` to mutate geometry and then
/// publishes a bumped [`ViewportState`]; drivers take the read side for the
/// duration of one frame.
#[derive(Clone)]
pub struct SharedScene {
    pub meshes: Arc<RwLock<Vec<Mesh>>>,
    pub viewport: Arc<Mailbox<ViewportState>>,
}

impl SharedScene {
    pub fn new(initial: ViewportState) -> Self {
        Self {
            meshes: Arc::new(RwLock::new(Vec::new())),
            viewport: Arc::new(Mailbox::new(initial)),
        }
    }

    /// Replaces the viewport state and wakes any waiting driver.
    pub fn publish_viewport(&self, state: ViewportState) {
        self.viewport.publish(state);
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport.latest()
    }
}

impl Default for SharedScene {
    fn default() -> Self {
        Self::new(ViewportState::default())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::scene::ViewportStatus;

    #[test]
    fn published_viewport_is_visible_to_clones() {
        let scene = SharedScene::default();
        let driver_side = scene.clone();
        let seen = driver_side.viewport.version();

        let mut state = scene.viewport();
        state.status = ViewportStatus::Playing;
        scene.publish_viewport(state.bumped());

        assert!(driver_side.viewport.version() > seen);
        assert_eq!(driver_side.viewport().status, ViewportStatus::Playing);
        assert_eq!(driver_side.viewport().nonce, 1);
    }

    #[test]
    fn publish_wakes_the_driver() {
        let scene = SharedScene::default();
        let wakes = Arc::new(AtomicUsize::new(0));
        {
            let wakes = Arc::clone(&wakes);
            scene.viewport.set_waker(move || {
                wakes.fetch_add(1, Ordering::SeqCst);
            });
        }

        scene.publish_viewport(scene.viewport().bumped());
        scene.publish_viewport(scene.viewport().bumped());
        assert_eq!(wakes.load(Ordering::SeqCst), 2);

        scene.viewport.clear_waker();
        scene.publish_viewport(scene.viewport().bumped());
        assert_eq!(wakes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn meshes_are_shared_between_clones() {
        let scene = SharedScene::default();
        scene.meshes.write().push(Mesh::new());
        assert_eq!(scene.clone().meshes.read().len(), 1);
    }
}
