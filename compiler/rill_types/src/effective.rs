//! Effective-type views.
//!
//! A type is an *effective X* when it is structurally usable as an `X`
//! after all nominal expansions: `type ilist is [int]` is an effective
//! list, and so is `[int] | [real]`. These helpers expand nominals (and
//! unions, where the union of the underlying shapes is itself usable) and
//! hand back the pieces the resolver needs.

use rill_ir::TypeId;

use crate::{NominalTable, Pool, Tag};

/// An effective list, set or map, as consumed by `for` loops, quantifiers
/// and comprehensions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Collection {
    /// The expanded collection type itself.
    pub raw: TypeId,
    /// Element type; for maps this is the `(key, value)` tuple.
    pub elem: TypeId,
    /// Key/value pair when the collection is a map.
    pub map: Option<(TypeId, TypeId)>,
}

/// Element type of an effective list, if `ty` is one.
pub fn as_effective_list(pool: &mut Pool, nominals: &NominalTable, ty: TypeId) -> Option<TypeId> {
    let ty = nominals.expand_fully(pool, ty);
    match pool.tag(ty) {
        Tag::List => Some(pool.elem(ty)),
        Tag::Union => {
            let children = pool.connective_children(ty);
            let elems = children
                .into_iter()
                .map(|c| as_effective_list(pool, nominals, c))
                .collect::<Option<Vec<_>>>()?;
            Some(pool.union(&elems))
        }
        _ => None,
    }
}

/// Element type of an effective set, if `ty` is one.
pub fn as_effective_set(pool: &mut Pool, nominals: &NominalTable, ty: TypeId) -> Option<TypeId> {
    let ty = nominals.expand_fully(pool, ty);
    match pool.tag(ty) {
        Tag::Set => Some(pool.elem(ty)),
        Tag::Union => {
            let children = pool.connective_children(ty);
            let elems = children
                .into_iter()
                .map(|c| as_effective_set(pool, nominals, c))
                .collect::<Option<Vec<_>>>()?;
            Some(pool.union(&elems))
        }
        _ => None,
    }
}

/// Key and value types of an effective map, if `ty` is one.
pub fn as_effective_map(
    pool: &mut Pool,
    nominals: &NominalTable,
    ty: TypeId,
) -> Option<(TypeId, TypeId)> {
    let ty = nominals.expand_fully(pool, ty);
    match pool.tag(ty) {
        Tag::Map => Some((pool.map_key(ty), pool.map_value(ty))),
        Tag::Union => {
            let children = pool.connective_children(ty);
            let pairs = children
                .into_iter()
                .map(|c| as_effective_map(pool, nominals, c))
                .collect::<Option<Vec<_>>>()?;
            let keys: Vec<TypeId> = pairs.iter().map(|p| p.0).collect();
            let values: Vec<TypeId> = pairs.iter().map(|p| p.1).collect();
            Some((pool.union(&keys), pool.union(&values)))
        }
        _ => None,
    }
}

/// The expanded record type, if `ty` is an effective record.
/// Unions of records are not merged; only nominal indirection is removed.
pub fn as_effective_record(pool: &Pool, nominals: &NominalTable, ty: TypeId) -> Option<TypeId> {
    let ty = nominals.expand_fully(pool, ty);
    (pool.tag(ty) == Tag::Record).then_some(ty)
}

/// The expanded tuple type, if `ty` is an effective tuple.
pub fn as_effective_tuple(pool: &Pool, nominals: &NominalTable, ty: TypeId) -> Option<TypeId> {
    let ty = nominals.expand_fully(pool, ty);
    (pool.tag(ty) == Tag::Tuple).then_some(ty)
}

/// The expanded function or method signature, if `ty` is one.
pub fn as_effective_callable(pool: &Pool, nominals: &NominalTable, ty: TypeId) -> Option<TypeId> {
    let ty = nominals.expand_fully(pool, ty);
    pool.is_callable(ty).then_some(ty)
}

/// The referent type, if `ty` is an effective reference.
pub fn as_effective_reference(pool: &Pool, nominals: &NominalTable, ty: TypeId) -> Option<TypeId> {
    let ty = nominals.expand_fully(pool, ty);
    if pool.tag(ty) == Tag::Reference {
        Some(pool.elem(ty))
    } else {
        None
    }
}

/// Any effective collection: list, set or map. For maps the element is
/// the `(key, value)` tuple, matching what iteration yields.
pub fn as_effective_collection(
    pool: &mut Pool,
    nominals: &NominalTable,
    ty: TypeId,
) -> Option<Collection> {
    let raw = nominals.expand_fully(pool, ty);
    if let Some((k, v)) = as_effective_map(pool, nominals, raw) {
        let elem = pool.tuple(&[k, v]);
        return Some(Collection {
            raw,
            elem,
            map: Some((k, v)),
        });
    }
    if let Some(elem) = as_effective_list(pool, nominals, raw) {
        return Some(Collection {
            raw,
            elem,
            map: None,
        });
    }
    if let Some(elem) = as_effective_set(pool, nominals, raw) {
        return Some(Collection {
            raw,
            elem,
            map: None,
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_ir::StringInterner;

    #[test]
    fn nominal_list_is_effective() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let mut nominals = NominalTable::new();
        let ilist = interner.intern("ilist");
        let def = pool.list(TypeId::INT);
        nominals.register(ilist, def);
        let n = pool.nominal(ilist);

        assert_eq!(as_effective_list(&mut pool, &nominals, n), Some(TypeId::INT));
        assert_eq!(as_effective_set(&mut pool, &nominals, n), None);
    }

    #[test]
    fn union_of_lists_is_effective() {
        let mut pool = Pool::new();
        let nominals = NominalTable::new();
        let li = pool.list(TypeId::INT);
        let ln = pool.list(TypeId::NULL);
        let u = pool.union2(li, ln);
        let expect = pool.union2(TypeId::INT, TypeId::NULL);
        assert_eq!(as_effective_list(&mut pool, &nominals, u), Some(expect));
    }

    #[test]
    fn map_collection_yields_key_value_tuples() {
        let mut pool = Pool::new();
        let nominals = NominalTable::new();
        let m = pool.map(TypeId::STRING, TypeId::INT);
        let coll = as_effective_collection(&mut pool, &nominals, m).unwrap();
        assert_eq!(coll.map, Some((TypeId::STRING, TypeId::INT)));
        let kv = pool.tuple(&[TypeId::STRING, TypeId::INT]);
        assert_eq!(coll.elem, kv);
    }

    #[test]
    fn non_collection_is_rejected() {
        let mut pool = Pool::new();
        let nominals = NominalTable::new();
        assert!(as_effective_collection(&mut pool, &nominals, TypeId::INT).is_none());
    }
}
