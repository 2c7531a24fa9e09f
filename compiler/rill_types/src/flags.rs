//! Pre-computed type metadata flags.
//!
//! `TypeFlags` are computed once at type interning time and cached,
//! enabling O(1) queries about type properties without traversal.

use bitflags::bitflags;

bitflags! {
    /// Pre-computed type properties for O(1) queries.
    ///
    /// Computed once at interning time, never recomputed.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct TypeFlags: u32 {
        // === Presence flags ===

        /// Contains a nominal type somewhere in its structure; subtype
        /// queries over it may need the nominal table.
        const HAS_NOMINAL = 1 << 0;
        /// Contains a negation somewhere in its structure.
        const HAS_NEGATION = 1 << 1;

        // === Category flags ===

        /// Built-in primitive type.
        const IS_PRIMITIVE = 1 << 8;
        /// List, set, map or reference.
        const IS_COLLECTION = 1 << 9;
        /// Record or tuple.
        const IS_COMPOSITE = 1 << 10;
        /// Function or method type.
        const IS_CALLABLE = 1 << 11;
        /// Union, intersection or negation node.
        const IS_CONNECTIVE = 1 << 12;
        /// Nominal reference.
        const IS_NOMINAL = 1 << 13;
    }
}

impl TypeFlags {
    /// Flags that propagate from child types to parents via bitwise OR.
    pub const PROPAGATE_MASK: Self =
        Self::from_bits_truncate(Self::HAS_NOMINAL.bits() | Self::HAS_NEGATION.bits());

    /// Extract the flags that should be inherited from a child type.
    #[inline]
    pub fn propagate_from(child: Self) -> Self {
        child & Self::PROPAGATE_MASK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn propagation_keeps_presence_only() {
        let child = TypeFlags::IS_PRIMITIVE | TypeFlags::HAS_NOMINAL;
        assert_eq!(TypeFlags::propagate_from(child), TypeFlags::HAS_NOMINAL);
    }
}
