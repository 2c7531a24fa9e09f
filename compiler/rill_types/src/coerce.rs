//! Implicit and explicit coercive subtyping.
//!
//! The exact subtype relation ([`SubtypeEngine`]) has no numeric
//! promotions: `int` is not a subtype of `real`. The *implicit coercive*
//! relation layers the transparent promotions on top:
//! - `char ≤ int ≤ real`
//! - `list(T) ≤ set(S)` when `T` coerces to `S` (justified by the empty
//!   collection, which both denote)
//! - pointwise lifting through lists, sets, maps and tuples
//! - unions on either side, nominal expansion on both
//!
//! The *explicit* relation (casts) additionally permits the lossy numeric
//! directions (`real → int`, `int → char`).

use rustc_hash::FxHashSet;

use rill_ir::{StringInterner, TypeId};

use crate::{NominalTable, Pool, SubtypeEngine, Tag};

/// Test whether `sub` is an implicit coercive subtype of `sup`
/// (i.e. a value of `sub` may flow into a position of type `sup` without
/// an explicit cast).
pub fn is_implicit_coercive_subtype(
    pool: &Pool,
    interner: &StringInterner,
    nominals: &NominalTable,
    sup: TypeId,
    sub: TypeId,
) -> bool {
    let mut seen = FxHashSet::default();
    coercive(pool, interner, nominals, sup, sub, &mut seen)
}

/// Test whether a value of `sub` may be *cast* to `sup`.
pub fn is_explicit_coercive_subtype(
    pool: &Pool,
    interner: &StringInterner,
    nominals: &NominalTable,
    sup: TypeId,
    sub: TypeId,
) -> bool {
    if is_implicit_coercive_subtype(pool, interner, nominals, sup, sub) {
        return true;
    }
    // The lossy numeric directions are allowed explicitly.
    let s = nominals.expand_fully(pool, sup);
    let t = nominals.expand_fully(pool, sub);
    let numeric = |ty: TypeId| matches!(pool.tag(ty), Tag::Byte | Tag::Char | Tag::Int | Tag::Real);
    numeric(s) && numeric(t)
}

fn coercive(
    pool: &Pool,
    interner: &StringInterner,
    nominals: &NominalTable,
    sup: TypeId,
    sub: TypeId,
    seen: &mut FxHashSet<(TypeId, TypeId)>,
) -> bool {
    if sup == sub || sup == TypeId::ANY || sub == TypeId::VOID {
        return true;
    }
    // Recursive nominals: a revisited pair is answered coinductively.
    if !seen.insert((sup, sub)) {
        return true;
    }

    let sup = nominals.expand_fully(pool, sup);
    let sub = nominals.expand_fully(pool, sub);

    let exact = SubtypeEngine::new(pool, interner, nominals).is_subtype(sub, sup);
    if exact {
        return true;
    }

    // Unions: every alternative of the subject must coerce; any
    // alternative of the target may receive.
    if pool.tag(sub) == Tag::Union {
        return pool
            .connective_children(sub)
            .into_iter()
            .all(|c| coercive(pool, interner, nominals, sup, c, seen));
    }
    if pool.tag(sup) == Tag::Union {
        return pool
            .connective_children(sup)
            .into_iter()
            .any(|c| coercive(pool, interner, nominals, c, sub, seen));
    }

    match (pool.tag(sup), pool.tag(sub)) {
        // Numeric promotions.
        (Tag::Int, Tag::Char) => true,
        (Tag::Real, Tag::Char | Tag::Int) => true,

        // A list coerces to a set of a coercible element.
        (Tag::Set, Tag::List) => {
            coercive(pool, interner, nominals, pool.elem(sup), pool.elem(sub), seen)
        }

        // Pointwise lifting.
        (Tag::List, Tag::List) | (Tag::Set, Tag::Set) => {
            coercive(pool, interner, nominals, pool.elem(sup), pool.elem(sub), seen)
        }
        (Tag::Map, Tag::Map) => {
            coercive(
                pool,
                interner,
                nominals,
                pool.map_key(sup),
                pool.map_key(sub),
                seen,
            ) && coercive(
                pool,
                interner,
                nominals,
                pool.map_value(sup),
                pool.map_value(sub),
                seen,
            )
        }
        (Tag::Tuple, Tag::Tuple) if pool.tuple_len(sup) == pool.tuple_len(sub) => (0..pool
            .tuple_len(sup))
            .all(|i| {
                coercive(
                    pool,
                    interner,
                    nominals,
                    pool.tuple_elem(sup, i),
                    pool.tuple_elem(sub, i),
                    seen,
                )
            }),

        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> (Pool, StringInterner, NominalTable) {
        (Pool::new(), StringInterner::new(), NominalTable::new())
    }

    #[test]
    fn numeric_promotions() {
        let (pool, interner, nominals) = env();
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::REAL, TypeId::INT));
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::INT, TypeId::CHAR));
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::REAL, TypeId::CHAR));
        assert!(!is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::INT, TypeId::REAL));
    }

    #[test]
    fn lists_coerce_into_sets() {
        let (mut pool, interner, nominals) = env();
        let li = pool.list(TypeId::INT);
        let sr = pool.set(TypeId::REAL);
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, sr, li));
        assert!(!is_implicit_coercive_subtype(&pool, &interner, &nominals, li, sr));
    }

    #[test]
    fn pointwise_lifting() {
        let (mut pool, interner, nominals) = env();
        let li = pool.list(TypeId::INT);
        let lr = pool.list(TypeId::REAL);
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, lr, li));
        let t_ii = pool.tuple(&[TypeId::INT, TypeId::INT]);
        let t_rr = pool.tuple(&[TypeId::REAL, TypeId::REAL]);
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, t_rr, t_ii));
    }

    #[test]
    fn unions_receive_and_distribute() {
        let (mut pool, interner, nominals) = env();
        let u = pool.union2(TypeId::REAL, TypeId::NULL);
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, u, TypeId::INT));
        let sub_u = pool.union2(TypeId::INT, TypeId::CHAR);
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::REAL, sub_u));
        assert!(!is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::INT, u));
    }

    #[test]
    fn nominal_expansion() {
        let (mut pool, interner, mut nominals) = env();
        let nat = interner.intern("nat");
        let n = pool.nominal(nat);
        nominals.register(nat, TypeId::INT);
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, TypeId::REAL, n));
        assert!(is_implicit_coercive_subtype(&pool, &interner, &nominals, n, TypeId::INT));
    }

    #[test]
    fn explicit_allows_lossy_numeric() {
        let (pool, interner, nominals) = env();
        assert!(is_explicit_coercive_subtype(&pool, &interner, &nominals, TypeId::INT, TypeId::REAL));
        assert!(is_explicit_coercive_subtype(&pool, &interner, &nominals, TypeId::CHAR, TypeId::INT));
        assert!(!is_explicit_coercive_subtype(&pool, &interner, &nominals, TypeId::STRING, TypeId::INT));
    }
}
