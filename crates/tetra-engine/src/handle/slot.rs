use core::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use super::Handle;

/// Lazily materialized handle cached on a mesh.
///
/// The slot starts at [`Handle::NONE`] and is filled at most once for the
/// lifetime of its owner. Renderers fill slots while the mesh list is only
/// read-locked, so the slot is atomic and two racing readers cannot both
/// install a handle.
#[derive(Default)]
pub struct HandleSlot(AtomicU32);

impl HandleSlot {
    pub const fn empty() -> Self {
        Self(AtomicU32::new(0))
    }

    #[inline]
    pub fn get(&self) -> Handle {
        Handle(self.0.load(Ordering::Acquire))
    }

    /// Returns the cached handle, registering one through `register` on first
    /// use.
    ///
    /// If another thread installs a handle first, the freshly registered one
    /// is passed to `discard` and the winner is returned. A `NONE` result from
    /// `register` leaves the slot empty so a later frame may retry.
    pub fn get_or_register(
        &self,
        register: impl FnOnce() -> Handle,
        discard: impl FnOnce(Handle),
    ) -> Handle {
        let current = self.get();
        if !current.is_none() {
            return current;
        }

        let fresh = register();
        if fresh.is_none() {
            return Handle::NONE;
        }

        match self
            .0
            .compare_exchange(0, fresh.raw(), Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => fresh,
            Err(winner) => {
                discard(fresh);
                Handle(winner)
            }
        }
    }

    /// Empties the slot and returns what it held.
    pub fn take(&self) -> Handle {
        Handle(self.0.swap(0, Ordering::AcqRel))
    }
}

impl fmt::Debug for HandleSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HandleSlot").field(&self.get()).finish()
    }
}
