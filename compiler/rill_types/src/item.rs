//! Compact type item storage.
//!
//! Each type in the pool is stored as an `Item` with a tag and data field.
//! The interpretation of `data` depends on the tag.

use rill_ir::{Name, TypeId};

use crate::Tag;

/// A single type item in the pool.
///
/// - `tag`: identifies the type kind (see [`Tag`])
/// - `data`: meaning depends on tag (child index, extra index, or name)
#[derive(Copy, Clone, Debug)]
#[repr(C)]
pub struct Item {
    /// Type kind discriminant.
    pub tag: Tag,
    /// Tag-dependent data field.
    pub data: u32,
}

impl Item {
    /// Create a new item with the given tag and data.
    #[inline]
    pub const fn new(tag: Tag, data: u32) -> Self {
        Self { tag, data }
    }

    /// Create a primitive type item.
    #[inline]
    pub const fn primitive(tag: Tag) -> Self {
        Self { tag, data: 0 }
    }

    /// Create a single-child item (List, Set, Reference, Negation).
    ///
    /// The child id is stored directly in the data field.
    #[inline]
    pub const fn single_child(tag: Tag, child: TypeId) -> Self {
        Self {
            tag,
            data: child.raw(),
        }
    }

    /// Create an item that references the extra array.
    #[inline]
    pub const fn with_extra(tag: Tag, extra_idx: u32) -> Self {
        Self {
            tag,
            data: extra_idx,
        }
    }

    /// Create a nominal item carrying its interned name.
    #[inline]
    pub const fn nominal(name: Name) -> Self {
        Self {
            tag: Tag::Nominal,
            data: name.raw(),
        }
    }

    /// Get the child id for single-child types.
    #[inline]
    pub const fn child(self) -> TypeId {
        TypeId::from_raw(self.data)
    }
}
