//! Type pool, subtype engine and nominal resolution for the Rill compiler.
//!
//! Types are values in a deterministic structural automaton stored in the
//! [`Pool`]:
//! - referenced by [`TypeId`] (32-bit indices), with structural equality
//!   being O(1) index equality after canonicalization
//! - constructed only through canonicalizing constructors (unions and
//!   intersections flattened/sorted/deduplicated, negation lifted by
//!   De Morgan, record fields strictly sorted)
//! - tested for subtyping by [`SubtypeEngine`], which reduces `T1 <: T2`
//!   to emptiness of `T1 ∩ ¬T2` with an assumption bitset breaking cycles
//!   through recursive nominal types

mod coerce;
mod effective;
mod flags;
mod item;
mod nominal;
mod pool;
mod subtype;
mod tag;

pub use coerce::{is_explicit_coercive_subtype, is_implicit_coercive_subtype};
pub use effective::{
    as_effective_callable, as_effective_collection, as_effective_list, as_effective_map,
    as_effective_record, as_effective_reference, as_effective_set, as_effective_tuple, Collection,
};
pub use flags::TypeFlags;
pub use item::Item;
pub use nominal::NominalTable;
pub use pool::{format_type, Pool};
pub use subtype::SubtypeEngine;
pub use tag::Tag;

// Re-export the canonical handle for convenience.
pub use rill_ir::TypeId;
