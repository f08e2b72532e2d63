//! Packed hit-position representation and the fixed-size field mask.

use serde::{Deserialize, Serialize};

/// Number of bits reserved for the field index in a packed [`HitPos`].
pub const FIELD_BITS: u32 = 8;
/// Maximum number of distinct fields a schema can declare. `FieldMask` is
/// backed by a `u64`, so this is the real ceiling even though `FIELD_BITS`
/// could in principle address more.
pub const MAX_FIELDS: usize = 64;

const END_BIT: u32 = 32 - FIELD_BITS - 1;
const POS_MASK: u32 = (1 << END_BIT) - 1;
const END_MASK: u32 = 1 << END_BIT;
const FIELD_SHIFT: u32 = END_BIT + 1;

/// A 32-bit packed `(field, end-of-field, in-field position)` triple.
///
/// Layout (with `FIELD_BITS = 8`): bits 31..24 field, bit 23 end marker,
/// bits 22..0 in-field position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HitPos(pub u32);

impl HitPos {
    pub const INVALID: HitPos = HitPos(0xFFFF_FFFF);

    #[inline]
    pub fn new(field: u32, pos: u32, is_end: bool) -> HitPos {
        debug_assert!(field < MAX_FIELDS as u32);
        debug_assert!(pos <= POS_MASK);
        let mut v = (field << FIELD_SHIFT) | (pos & POS_MASK);
        if is_end {
            v |= END_MASK;
        }
        HitPos(v)
    }

    #[inline]
    pub fn field(self) -> u32 {
        self.0 >> FIELD_SHIFT
    }

    #[inline]
    pub fn pos(self) -> u32 {
        self.0 & POS_MASK
    }

    #[inline]
    pub fn is_end(self) -> bool {
        self.0 & END_MASK != 0
    }

    /// Field and position, but with the end-of-field bit cleared. Hit
    /// ordering within a document is defined over this projection.
    #[inline]
    pub fn pos_with_field(self) -> u32 {
        self.0 & !END_MASK
    }

    /// Returns a new position with the same field, `delta` added to the
    /// in-field position, preserving the end marker.
    #[inline]
    pub fn add_pos(self, delta: u32) -> HitPos {
        HitPos::new(self.field(), self.pos() + delta, self.is_end())
    }
}

/// A fixed-size bitset over field indices, sized to [`MAX_FIELDS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct FieldMask(u64);

impl FieldMask {
    pub const EMPTY: FieldMask = FieldMask(0);

    #[inline]
    pub fn new() -> FieldMask {
        FieldMask(0)
    }

    #[inline]
    pub fn set(&mut self, field: u32) {
        self.0 |= 1u64 << field;
    }

    #[inline]
    pub fn unset(&mut self, field: u32) {
        self.0 &= !(1u64 << field);
    }

    #[inline]
    pub fn test(self, field: u32) -> bool {
        self.0 & (1u64 << field) != 0
    }

    #[inline]
    pub fn test_all(self) -> bool {
        self.0 != 0
    }

    #[inline]
    pub fn negate(self) -> FieldMask {
        FieldMask(!self.0)
    }

    #[inline]
    pub fn popcount(self) -> u32 {
        self.0.count_ones()
    }

    #[inline]
    pub fn union(self, other: FieldMask) -> FieldMask {
        FieldMask(self.0 | other.0)
    }

    #[inline]
    pub fn intersect(self, other: FieldMask) -> FieldMask {
        FieldMask(self.0 & other.0)
    }

    /// Removes bit `index`, shifting all higher bits down by one. Used when
    /// a field is dropped from a schema without renumbering surviving masks
    /// in place.
    pub fn delete_bit(&mut self, index: u32) {
        let below = self.0 & ((1u64 << index) - 1);
        let above = (self.0 >> (index + 1)) << index;
        self.0 = below | above;
    }

    pub fn from_bits(bits: u64) -> FieldMask {
        FieldMask(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_roundtrip() {
        let h = HitPos::new(3, 120, true);
        assert_eq!(h.field(), 3);
        assert_eq!(h.pos(), 120);
        assert!(h.is_end());
    }

    #[test]
    fn pos_with_field_ignores_end_bit() {
        let a = HitPos::new(2, 5, false);
        let b = HitPos::new(2, 5, true);
        assert_eq!(a.pos_with_field(), b.pos_with_field());
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn add_pos_preserves_field_and_end() {
        let h = HitPos::new(1, 10, true).add_pos(4);
        assert_eq!(h.field(), 1);
        assert_eq!(h.pos(), 14);
        assert!(h.is_end());
    }

    #[test]
    fn field_mask_set_unset_test() {
        let mut m = FieldMask::new();
        assert!(!m.test(2));
        m.set(2);
        assert!(m.test(2));
        m.unset(2);
        assert!(!m.test(2));
    }

    #[test]
    fn field_mask_delete_bit_shifts_higher_bits_down() {
        let mut m = FieldMask::new();
        m.set(1);
        m.set(3);
        m.delete_bit(2);
        assert!(m.test(1));
        assert!(m.test(2));
        assert!(!m.test(3));
    }
}
