//! Unified type pool - single source of truth for all types.
//!
//! The pool stores every type in the compilation as a deterministic,
//! canonicalized automaton node:
//! - Types are referenced by [`TypeId`] (32-bit indices)
//! - Each type is an [`Item`] with tag and data
//! - Variable-length types use an extra array
//! - Hash-based deduplication ensures each canonical type exists once, so
//!   structural equality is index equality
//! - Pre-computed [`TypeFlags`] enable O(1) property queries

mod construct;
mod format;

pub use format::format_type;

use rustc_hash::FxHashMap;

use rill_ir::{Name, TypeId};

use crate::{Item, Tag, TypeFlags};

/// The unified type pool.
pub struct Pool {
    // === Core Storage (parallel arrays) ===
    /// All type items (tag + data).
    items: Vec<Item>,
    /// Pre-computed flags (flags[i] corresponds to items[i]).
    flags: Vec<TypeFlags>,
    /// Stable hashes (hashes[i] corresponds to items[i]).
    hashes: Vec<u64>,

    // === Extra Data ===
    /// Variable-length data for complex types; layout depends on tag.
    extra: Vec<u32>,

    // === Deduplication ===
    /// Hash -> TypeId mapping.
    intern_map: FxHashMap<u64, TypeId>,
}

impl Pool {
    /// Create a new pool with pre-interned primitives.
    pub fn new() -> Self {
        let mut pool = Self {
            items: Vec::with_capacity(128),
            flags: Vec::with_capacity(128),
            hashes: Vec::with_capacity(128),
            extra: Vec::with_capacity(512),
            intern_map: FxHashMap::default(),
        };
        pool.intern_primitives();
        pool
    }

    /// Pre-intern all primitive types at their fixed indices.
    fn intern_primitives(&mut self) {
        // Primitives must be interned in exact order to match TypeId constants.
        self.intern_primitive_at(Tag::Void, TypeId::VOID);
        self.intern_primitive_at(Tag::Any, TypeId::ANY);
        self.intern_primitive_at(Tag::Null, TypeId::NULL);
        self.intern_primitive_at(Tag::Bool, TypeId::BOOL);
        self.intern_primitive_at(Tag::Byte, TypeId::BYTE);
        self.intern_primitive_at(Tag::Char, TypeId::CHAR);
        self.intern_primitive_at(Tag::Int, TypeId::INT);
        self.intern_primitive_at(Tag::Real, TypeId::REAL);
        self.intern_primitive_at(Tag::Str, TypeId::STRING);
        self.intern_primitive_at(Tag::Meta, TypeId::META);

        // Pad the reserved range so dynamic types start at FIRST_DYNAMIC.
        while (self.items.len() as u32) < TypeId::FIRST_DYNAMIC {
            self.items.push(Item::primitive(Tag::Void));
            self.flags.push(TypeFlags::IS_PRIMITIVE);
            self.hashes.push(0);
        }

        debug_assert_eq!(self.items.len() as u32, TypeId::FIRST_DYNAMIC);
    }

    fn intern_primitive_at(&mut self, tag: Tag, expected: TypeId) {
        let id = TypeId::from_raw(self.items.len() as u32);
        debug_assert_eq!(id, expected, "primitive index mismatch for {tag:?}");

        let hash = Self::compute_hash(tag, 0, &[]);
        self.items.push(Item::primitive(tag));
        self.flags.push(TypeFlags::IS_PRIMITIVE);
        self.hashes.push(hash);
        self.intern_map.insert(hash, id);
    }

    // === Query Methods ===

    /// Get the tag for a type id.
    #[inline]
    pub fn tag(&self, id: TypeId) -> Tag {
        self.items[id.raw() as usize].tag
    }

    /// Get the data field for a type id.
    #[inline]
    pub fn data(&self, id: TypeId) -> u32 {
        self.items[id.raw() as usize].data
    }

    /// Get the flags for a type id.
    #[inline]
    pub fn flags(&self, id: TypeId) -> TypeFlags {
        self.flags[id.raw() as usize]
    }

    /// Number of types in the pool.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True if only primitives have been interned.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.len() <= TypeId::FIRST_DYNAMIC as usize
    }

    // === Interning Methods ===

    /// Intern a type with no extra data.
    pub(crate) fn intern(&mut self, tag: Tag, data: u32) -> TypeId {
        let hash = Self::compute_hash(tag, data, &[]);
        if let Some(&id) = self.intern_map.get(&hash) {
            return id;
        }

        let id = TypeId::from_raw(self.items.len() as u32);
        let flags = self.compute_flags(tag, data, &[]);
        self.items.push(Item::new(tag, data));
        self.flags.push(flags);
        self.hashes.push(hash);
        self.intern_map.insert(hash, id);
        id
    }

    /// Intern a type with extra data; the slice is copied into the extra
    /// array.
    pub(crate) fn intern_complex(&mut self, tag: Tag, extra_data: &[u32]) -> TypeId {
        let hash = Self::compute_hash(tag, 0, extra_data);
        if let Some(&id) = self.intern_map.get(&hash) {
            return id;
        }

        let extra_idx = self.extra.len() as u32;
        self.extra.extend_from_slice(extra_data);

        let id = TypeId::from_raw(self.items.len() as u32);
        let flags = self.compute_flags(tag, extra_idx, extra_data);
        self.items.push(Item::with_extra(tag, extra_idx));
        self.flags.push(flags);
        self.hashes.push(hash);
        self.intern_map.insert(hash, id);
        id
    }

    fn compute_hash(tag: Tag, data: u32, extra: &[u32]) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut hasher = rustc_hash::FxHasher::default();
        (tag as u8).hash(&mut hasher);
        data.hash(&mut hasher);
        extra.hash(&mut hasher);
        hasher.finish()
    }

    fn compute_flags(&self, tag: Tag, data: u32, extra: &[u32]) -> TypeFlags {
        let child_flags = |id: u32| TypeFlags::propagate_from(self.flags[id as usize]);
        match tag {
            Tag::Void
            | Tag::Any
            | Tag::Null
            | Tag::Bool
            | Tag::Byte
            | Tag::Char
            | Tag::Int
            | Tag::Real
            | Tag::Str
            | Tag::Meta => TypeFlags::IS_PRIMITIVE,

            Tag::List | Tag::Set | Tag::Reference => {
                TypeFlags::IS_COLLECTION | child_flags(data)
            }
            Tag::Negation => {
                TypeFlags::IS_CONNECTIVE | TypeFlags::HAS_NEGATION | child_flags(data)
            }

            Tag::Map => {
                TypeFlags::IS_COLLECTION | child_flags(extra[0]) | child_flags(extra[1])
            }

            Tag::Tuple => {
                // extra layout: [count, e0, e1, ...]
                let count = extra[0] as usize;
                let mut flags = TypeFlags::IS_COMPOSITE;
                for &e in &extra[1..1 + count] {
                    flags |= child_flags(e);
                }
                flags
            }

            Tag::Record => {
                // extra layout: [open, count, f0_name, f0_ty, ...]
                let count = extra[1] as usize;
                let mut flags = TypeFlags::IS_COMPOSITE;
                for i in 0..count {
                    flags |= child_flags(extra[2 + i * 2 + 1]);
                }
                flags
            }

            Tag::Function | Tag::Method => {
                // extra layout: [param_count, ret, throws, p0, ...]
                let count = extra[0] as usize;
                let mut flags = TypeFlags::IS_CALLABLE;
                flags |= child_flags(extra[1]);
                flags |= child_flags(extra[2]);
                for &p in &extra[3..3 + count] {
                    flags |= child_flags(p);
                }
                flags
            }

            Tag::Union | Tag::Intersection => {
                let count = extra[0] as usize;
                let mut flags = TypeFlags::IS_CONNECTIVE;
                for &c in &extra[1..1 + count] {
                    flags |= child_flags(c);
                }
                flags
            }

            Tag::Nominal => TypeFlags::IS_NOMINAL | TypeFlags::HAS_NOMINAL,
        }
    }

    // === Accessors ===

    /// Child of a single-child type (list, set, reference, negation).
    ///
    /// # Panics
    /// Panics if `id` is not a single-child type.
    pub fn elem(&self, id: TypeId) -> TypeId {
        debug_assert!(self.tag(id).is_single_child(), "elem() on {:?}", self.tag(id));
        self.items[id.raw() as usize].child()
    }

    /// Key type of a map.
    pub fn map_key(&self, id: TypeId) -> TypeId {
        debug_assert_eq!(self.tag(id), Tag::Map);
        let e = self.data(id) as usize;
        TypeId::from_raw(self.extra[e])
    }

    /// Value type of a map.
    pub fn map_value(&self, id: TypeId) -> TypeId {
        debug_assert_eq!(self.tag(id), Tag::Map);
        let e = self.data(id) as usize;
        TypeId::from_raw(self.extra[e + 1])
    }

    /// Number of tuple elements.
    pub fn tuple_len(&self, id: TypeId) -> usize {
        debug_assert_eq!(self.tag(id), Tag::Tuple);
        let e = self.data(id) as usize;
        self.extra[e] as usize
    }

    /// Tuple element by position.
    pub fn tuple_elem(&self, id: TypeId, i: usize) -> TypeId {
        debug_assert!(i < self.tuple_len(id));
        let e = self.data(id) as usize;
        TypeId::from_raw(self.extra[e + 1 + i])
    }

    /// All tuple elements.
    pub fn tuple_elems(&self, id: TypeId) -> Vec<TypeId> {
        (0..self.tuple_len(id))
            .map(|i| self.tuple_elem(id, i))
            .collect()
    }

    /// Whether a record is open.
    pub fn record_is_open(&self, id: TypeId) -> bool {
        debug_assert_eq!(self.tag(id), Tag::Record);
        let e = self.data(id) as usize;
        self.extra[e] != 0
    }

    /// Number of record fields.
    pub fn record_len(&self, id: TypeId) -> usize {
        debug_assert_eq!(self.tag(id), Tag::Record);
        let e = self.data(id) as usize;
        self.extra[e + 1] as usize
    }

    /// Record field by position (fields are sorted by field-name string).
    pub fn record_field(&self, id: TypeId, i: usize) -> (Name, TypeId) {
        debug_assert!(i < self.record_len(id));
        let e = self.data(id) as usize;
        let off = e + 2 + i * 2;
        (
            Name::from_raw(self.extra[off]),
            TypeId::from_raw(self.extra[off + 1]),
        )
    }

    /// All record fields in sorted order.
    pub fn record_fields(&self, id: TypeId) -> Vec<(Name, TypeId)> {
        (0..self.record_len(id))
            .map(|i| self.record_field(id, i))
            .collect()
    }

    /// Type of a record field by name, if present.
    pub fn record_field_type(&self, id: TypeId, name: Name) -> Option<TypeId> {
        (0..self.record_len(id)).find_map(|i| {
            let (n, t) = self.record_field(id, i);
            (n == name).then_some(t)
        })
    }

    /// True for function and method types.
    pub fn is_callable(&self, id: TypeId) -> bool {
        self.tag(id).is_callable()
    }

    /// Number of parameters of a function or method type.
    pub fn fn_param_count(&self, id: TypeId) -> usize {
        debug_assert!(self.is_callable(id));
        let e = self.data(id) as usize;
        self.extra[e] as usize
    }

    /// Parameter type by position.
    pub fn fn_param(&self, id: TypeId, i: usize) -> TypeId {
        debug_assert!(i < self.fn_param_count(id));
        let e = self.data(id) as usize;
        TypeId::from_raw(self.extra[e + 3 + i])
    }

    /// All parameter types.
    pub fn fn_params(&self, id: TypeId) -> Vec<TypeId> {
        (0..self.fn_param_count(id))
            .map(|i| self.fn_param(id, i))
            .collect()
    }

    /// Return type of a function or method type.
    pub fn fn_ret(&self, id: TypeId) -> TypeId {
        debug_assert!(self.is_callable(id));
        let e = self.data(id) as usize;
        TypeId::from_raw(self.extra[e + 1])
    }

    /// Throws type of a function or method type.
    pub fn fn_throws(&self, id: TypeId) -> TypeId {
        debug_assert!(self.is_callable(id));
        let e = self.data(id) as usize;
        TypeId::from_raw(self.extra[e + 2])
    }

    /// Children of a union or intersection node (>= 2, distinct, sorted).
    pub fn connective_children(&self, id: TypeId) -> Vec<TypeId> {
        debug_assert!(matches!(self.tag(id), Tag::Union | Tag::Intersection));
        let e = self.data(id) as usize;
        let count = self.extra[e] as usize;
        self.extra[e + 1..e + 1 + count]
            .iter()
            .map(|&c| TypeId::from_raw(c))
            .collect()
    }

    /// The qualified name of a nominal type.
    pub fn nominal_name(&self, id: TypeId) -> Name {
        debug_assert_eq!(self.tag(id), Tag::Nominal);
        Name::from_raw(self.data(id))
    }
}

impl Default for Pool {
    fn default() -> Self {
        Self::new()
    }
}
