//! Type kind tag for tag-driven dispatch.
//!
//! Each type in the pool has a `Tag` that identifies its kind. The tag
//! determines how to interpret the associated `data` field.
//!
//! # Tag Categories
//!
//! Tags are organized into semantic ranges:
//! - 0-15: Primitives (data unused)
//! - 16-31: Single-child types (data = child `TypeId`)
//! - 32-47: Two-child types (data = extra index)
//! - 48-79: Variable-length types (data = extra index with length)
//! - 80-95: Nominal types (data = interned name)

use std::fmt;

/// Type kind discriminant.
///
/// Determines how to interpret the `data` field in an `Item`.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Tag {
    // === Primitives (0-15) ===
    // data: unused (0)
    /// The bottom type; no values.
    Void = 0,
    /// The top type; all values.
    Any = 1,
    /// The type of the single value `null`.
    Null = 2,
    Bool = 3,
    /// 8-bit bit vector.
    Byte = 4,
    /// Unicode scalar value.
    Char = 5,
    /// Unbounded integer.
    Int = 6,
    /// Unbounded rational.
    Real = 7,
    Str = 8,
    /// Type values (the right-hand side of an `is` test).
    Meta = 9,

    // === Single-child types (16-31) ===
    // data: child TypeId.raw()
    /// List type `[T]`.
    List = 16,
    /// Set type `{T}`.
    Set = 17,
    /// Reference type `&T`.
    Reference = 18,
    /// Negation type `!T`. Canonicalization guarantees the child is never
    /// a union, intersection or negation.
    Negation = 19,

    // === Two-child types (32-47) ===
    // data: index into extra[] with two consecutive TypeId values
    /// Map type `{K=>V}`. Extra layout: `[key, value]`.
    Map = 32,

    // === Variable-length types (48-79) ===
    // data: index into extra[] with a length prefix
    /// Tuple type. Extra layout: `[count, e0, e1, ...]`.
    Tuple = 48,
    /// Record type. Extra layout: `[open, count, f0_name, f0_ty, ...]`
    /// with fields strictly sorted by field-name string.
    Record = 49,
    /// Function type. Extra layout: `[param_count, ret, throws, p0, ...]`.
    Function = 50,
    /// Method type. Same layout as `Function`.
    Method = 51,
    /// Union type. Extra layout: `[count, c0, c1, ...]`, count >= 2,
    /// children distinct and sorted.
    Union = 52,
    /// Intersection type. Same layout and invariants as `Union`.
    Intersection = 53,

    // === Nominal types (80-95) ===
    // data: Name.raw() of the qualified type name
    /// A named type, expanded on demand through the nominal table.
    Nominal = 80,
}

impl Tag {
    /// True for the pre-interned primitive kinds.
    pub const fn is_primitive(self) -> bool {
        (self as u8) < 16
    }

    /// True for kinds whose `data` field is a child `TypeId` directly.
    pub const fn is_single_child(self) -> bool {
        matches!(self, Tag::List | Tag::Set | Tag::Reference | Tag::Negation)
    }

    /// True for the function and method kinds.
    pub const fn is_callable(self) -> bool {
        matches!(self, Tag::Function | Tag::Method)
    }

    /// True for the union/intersection/negation connectives.
    pub const fn is_connective(self) -> bool {
        matches!(self, Tag::Union | Tag::Intersection | Tag::Negation)
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tag::Void => "Void",
            Tag::Any => "Any",
            Tag::Null => "Null",
            Tag::Bool => "Bool",
            Tag::Byte => "Byte",
            Tag::Char => "Char",
            Tag::Int => "Int",
            Tag::Real => "Real",
            Tag::Str => "Str",
            Tag::Meta => "Meta",
            Tag::List => "List",
            Tag::Set => "Set",
            Tag::Reference => "Reference",
            Tag::Negation => "Negation",
            Tag::Map => "Map",
            Tag::Tuple => "Tuple",
            Tag::Record => "Record",
            Tag::Function => "Function",
            Tag::Method => "Method",
            Tag::Union => "Union",
            Tag::Intersection => "Intersection",
            Tag::Nominal => "Nominal",
        };
        f.write_str(s)
    }
}
