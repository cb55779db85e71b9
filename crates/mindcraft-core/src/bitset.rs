//! Capability / placement bit masks.
//!
//! Tile placement (`WhenSide=1 | DoSide=2 | ...`) and editor capability
//! requirements are both small closed sets of flags, so `BitSet` is a thin
//! `u64` wrapper with grant-checking (`is_subset_of`) rather than a
//! `Vec<Capability>`.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitSet(pub u64);

impl BitSet {
    pub const EMPTY: BitSet = BitSet(0);

    #[must_use]
    pub fn new(bits: u64) -> Self {
        Self(bits)
    }

    #[must_use]
    pub fn single(bit: u32) -> Self {
        Self(1u64 << bit)
    }

    #[must_use]
    pub fn contains(self, other: BitSet) -> bool {
        (self.0 & other.0) == other.0
    }

    /// `true` iff every bit set in `self` (the tile's requirements) is also
    /// set in `mask` (the editor's available capabilities). An empty
    /// `self` is satisfied by any mask.
    #[must_use]
    pub fn is_subset_of(self, mask: BitSet) -> bool {
        (self.0 & !mask.0) == 0
    }

    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for BitSet {
    type Output = BitSet;
    fn bitor(self, rhs: BitSet) -> BitSet {
        BitSet(self.0 | rhs.0)
    }
}

impl BitOrAssign for BitSet {
    fn bitor_assign(&mut self, rhs: BitSet) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Placement bits. `EitherSide` is the union of `WhenSide` and `DoSide`,
/// matching the `WhenSide=1 | DoSide=2 | EitherSide=3` table.
pub mod placement {
    use super::BitSet;

    pub const WHEN_SIDE: BitSet = BitSet(1);
    pub const DO_SIDE: BitSet = BitSet(2);
    pub const EITHER_SIDE: BitSet = BitSet(3);
    pub const INLINE: BitSet = BitSet(16);
    pub const INSIDE_LOOP: BitSet = BitSet(32);
}

/// Which rule side is currently being parsed/suggested into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleSide {
    When,
    Do,
}

impl RuleSide {
    #[must_use]
    pub fn placement_bit(self) -> BitSet {
        match self {
            RuleSide::When => placement::WHEN_SIDE,
            RuleSide::Do => placement::DO_SIDE,
        }
    }

    /// `true` iff a tile whose `placement` mask is `tile_placement` may
    /// legally appear on this rule side. A `None` placement mask (tiles
    /// valid everywhere) always passes.
    #[must_use]
    pub fn allows(self, tile_placement: Option<BitSet>) -> bool {
        match tile_placement {
            None => true,
            Some(mask) => mask.contains(self.placement_bit()) || mask.contains(placement::EITHER_SIDE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subset_checks_requirements_against_mask() {
        let requirements = BitSet::single(2) | BitSet::single(5);
        let full_mask = BitSet::single(2) | BitSet::single(5) | BitSet::single(7);
        let partial_mask = BitSet::single(2);
        assert!(requirements.is_subset_of(full_mask));
        assert!(!requirements.is_subset_of(partial_mask));
        assert!(BitSet::EMPTY.is_subset_of(BitSet::EMPTY));
    }

    #[test]
    fn rule_side_honours_either_side() {
        assert!(RuleSide::When.allows(Some(placement::EITHER_SIDE)));
        assert!(RuleSide::Do.allows(Some(placement::EITHER_SIDE)));
        assert!(RuleSide::When.allows(Some(placement::WHEN_SIDE)));
        assert!(!RuleSide::Do.allows(Some(placement::WHEN_SIDE)));
        assert!(RuleSide::When.allows(None));
    }
}
