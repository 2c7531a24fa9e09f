//! Interned type identifier.
//!
//! `TypeId` is THE canonical type representation: a 32-bit index into the
//! type pool. Primitive types have fixed indices pre-interned at pool
//! creation, so type equality is O(1) index comparison everywhere.

use std::fmt;

/// A 32-bit index into the type pool.
///
/// Types are compared by index equality (O(1)), not structural comparison;
/// the pool guarantees each canonical type is interned exactly once.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // === Primitive Types (indices 0-9) ===
    // Pre-interned at pool creation for O(1) access.

    /// The `void` type (bottom, no values).
    pub const VOID: Self = Self(0);
    /// The `any` type (top, all values).
    pub const ANY: Self = Self(1);
    /// The `null` type (single value `null`).
    pub const NULL: Self = Self(2);
    /// The `bool` type.
    pub const BOOL: Self = Self(3);
    /// The `byte` type (8-bit bit vector).
    pub const BYTE: Self = Self(4);
    /// The `char` type (Unicode scalar value).
    pub const CHAR: Self = Self(5);
    /// The `int` type (unbounded integer).
    pub const INT: Self = Self(6);
    /// The `real` type (unbounded rational).
    pub const REAL: Self = Self(7);
    /// The `string` type.
    pub const STRING: Self = Self(8);
    /// The `meta` type (type values, the rhs of an `is` test).
    pub const META: Self = Self(9);

    // === Reserved Range (10-15) ===

    /// First index for dynamically allocated types.
    pub const FIRST_DYNAMIC: u32 = 16;

    /// Number of pre-interned primitive types.
    pub const PRIMITIVE_COUNT: u32 = 10;

    /// Sentinel value: no type / not yet resolved.
    pub const NONE: Self = Self(u32::MAX);

    /// Create an index from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Check if this is a primitive type (pre-interned).
    #[inline]
    pub const fn is_primitive(self) -> bool {
        self.0 < Self::FIRST_DYNAMIC
    }

    /// Check if this is the NONE sentinel.
    #[inline]
    pub const fn is_none(self) -> bool {
        self.0 == u32::MAX
    }

    /// Check if this is the VOID type.
    #[inline]
    pub const fn is_void(self) -> bool {
        self.0 == Self::VOID.0
    }

    /// Get the human-readable name for primitive types.
    ///
    /// Returns `None` for dynamic types, which need a pool to render.
    #[inline]
    pub const fn name(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("void"),
            1 => Some("any"),
            2 => Some("null"),
            3 => Some("bool"),
            4 => Some("byte"),
            5 => Some("char"),
            6 => Some("int"),
            7 => Some("real"),
            8 => Some("string"),
            9 => Some("meta"),
            _ => None,
        }
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "TypeId::NONE");
        }
        match self.name() {
            Some(n) => write!(f, "TypeId::{}", n.to_uppercase()),
            None => write!(f, "TypeId({})", self.0),
        }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_none() {
            return write!(f, "<none>");
        }
        match self.name() {
            Some(n) => f.write_str(n),
            None => write!(f, "type#{}", self.0),
        }
    }
}

const _: () = assert!(std::mem::size_of::<TypeId>() == 4);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_indices_are_fixed() {
        assert_eq!(TypeId::VOID.raw(), 0);
        assert_eq!(TypeId::ANY.raw(), 1);
        assert_eq!(TypeId::NULL.raw(), 2);
        assert_eq!(TypeId::BOOL.raw(), 3);
        assert_eq!(TypeId::BYTE.raw(), 4);
        assert_eq!(TypeId::CHAR.raw(), 5);
        assert_eq!(TypeId::INT.raw(), 6);
        assert_eq!(TypeId::REAL.raw(), 7);
        assert_eq!(TypeId::STRING.raw(), 8);
        assert_eq!(TypeId::META.raw(), 9);
    }

    #[test]
    fn primitive_check() {
        assert!(TypeId::INT.is_primitive());
        assert!(!TypeId::from_raw(TypeId::FIRST_DYNAMIC).is_primitive());
    }

    #[test]
    fn none_sentinel() {
        assert!(TypeId::NONE.is_none());
        assert!(!TypeId::VOID.is_none());
    }
}
