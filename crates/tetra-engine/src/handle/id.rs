use core::fmt;

/// Opaque 32-bit resource identifier.
///
/// `0` is the "unallocated" sentinel for buffer slots. The texture cache
/// additionally reserves `0` and `1` for its permanent fallback textures.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Handle(pub u32);

impl Handle {
    /// Not yet materialized / no identity.
    pub const NONE: Handle = Handle(0);

    /// First value a [`super::HandlePool`] may hand out.
    pub const FIRST_ALLOCATABLE: u32 = 2;

    #[inline]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}
