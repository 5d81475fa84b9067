use parking_lot::Mutex;

type Waker = Box<dyn Fn() + Send + Sync>;

/// Single-slot, last-write-wins handoff of the latest state.
///
/// The engine publishes; the live view reads whatever is newest when it gets
/// to draw. Intermediate states are dropped. Every publish bumps a version so
/// readers can tell whether anything changed since they last looked.
pub struct Mailbox<T> {
    slot: Mutex<Slot<T>>,
    waker: Mutex<Option<Waker>>,
}

struct Slot<T> {
    value: T,
    version: u64,
}

impl<T: Clone> Mailbox<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: initial,
                version: 0,
            }),
            waker: Mutex::new(None),
        }
    }

    /// Replaces the stored value and runs the waker, if any.
    pub fn publish(&self, value: T) {
        {
            let mut slot = self.slot.lock();
            slot.value = value;
            slot.version += 1;
        }
        if let Some(wake) = self.waker.lock().as_ref() {
            wake();
        }
    }

    pub fn latest(&self) -> T {
        self.slot.lock().value.clone()
    }

    pub fn version(&self) -> u64 {
        self.slot.lock().version
    }

    /// The value and its version if it is newer than `seen`.
    pub fn take_newer(&self, seen: u64) -> Option<(u64, T)> {
        let slot = self.slot.lock();
        (slot.version > seen).then(|| (slot.version, slot.value.clone()))
    }

    /// Installs the callback run after every publish, e.g. a redraw request.
    pub fn set_waker(&self, wake: impl Fn() + Send + Sync + 'static) {
        *self.waker.lock() = Some(Box::new(wake));
    }

    pub fn clear_waker(&self) {
        *self.waker.lock() = None;
    }
}

impl<T: Default + Clone> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
