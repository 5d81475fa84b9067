use core::fmt;

/// Primitive family: one renderer, one pipeline, one buffer per mesh.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum Family {
    Tri,
    Lin,
    Dot,
}

impl Family {
    /// Per-mesh draw order: fills first, then strokes, then dots.
    pub const DRAW_ORDER: [Family; 3] = [Family::Tri, Family::Lin, Family::Dot];

    pub const fn name(self) -> &'static str {
        match self {
            Family::Tri => "tri",
            Family::Lin => "lin",
            Family::Dot => "dot",
        }
    }

    const fn bit(self) -> u8 {
        match self {
            Family::Tri => 1,
            Family::Lin => 2,
            Family::Dot => 4,
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Small bitset of families, used to report which pipelines built.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct FamilySet(u8);

impl FamilySet {
    pub const NONE: FamilySet = FamilySet(0);
    pub const ALL: FamilySet = FamilySet(7);

    #[inline]
    pub const fn contains(self, family: Family) -> bool {
        self.0 & family.bit() != 0
    }

    #[inline]
    pub fn insert(&mut self, family: Family) {
        self.0 |= family.bit();
    }

    #[inline]
    pub const fn without(self, family: Family) -> FamilySet {
        FamilySet(self.0 & !family.bit())
    }
}

impl fmt::Debug for FamilySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set()
            .entries(Family::DRAW_ORDER.iter().filter(|fam| self.contains(**fam)))
            .finish()
    }
}

impl FromIterator<Family> for FamilySet {
    fn from_iter<I: IntoIterator<Item = Family>>(iter: I) -> Self {
        let mut set = FamilySet::NONE;
        for family in iter {
            set.insert(family);
        }
        set
    }
}
