//! The subtype operator.
//!
//! Decides whether one type is a subtype of another. For the most part one
//! can take subtype to mean *subset*: `T1 <: T2` iff the set of values
//! denoted by `T1` is a subset of those denoted by `T2` (the analogy breaks
//! down for function parameters, which are contravariant).
//!
//! The algorithm actually computes the *intersection* relation — whether an
//! intersection exists between two types' value sets — since
//! `T1 <: T2  ⇔  T1 ∩ ¬T2` is uninhabited. Each side of a query carries a
//! sign; a negative sign means the type is taken as its complement, which
//! is how `¬T2` enters without ever constructing it.
//!
//! Recursive types (through nominal expansion) are handled coinductively:
//! a bitset marks in-flight `(idx, sign, idx, sign)` queries, and re-entry
//! on an in-flight tuple answers *not inhabited*, which is sound under the
//! greatest-fixed-point reading of recursive types.

use rill_ir::{StringInterner, TypeId};

use crate::{NominalTable, Pool, Tag};

/// In-flight query marks, indexed by `(idx_a, sign_a, idx_b, sign_b)`.
///
/// The matrix is `(2n)²` bits for a pool of `n` types: each axis doubles to
/// accommodate both signs.
struct Assumptions {
    bits: Vec<u64>,
    size: u32,
}

impl Assumptions {
    fn new() -> Self {
        Assumptions {
            bits: Vec::new(),
            size: 0,
        }
    }

    /// Clear all marks and resize for a pool of `n` types.
    fn reset(&mut self, n: u32) {
        self.size = n;
        let bits = (2 * n as usize) * (2 * n as usize);
        let words = bits.div_ceil(64);
        self.bits.clear();
        self.bits.resize(words, 0);
    }

    fn index(&self, a: TypeId, sa: bool, b: TypeId, sb: bool) -> usize {
        let n = self.size as usize;
        let ai = a.raw() as usize + if sa { n } else { 0 };
        let bi = b.raw() as usize + if sb { n } else { 0 };
        ai * (2 * n) + bi
    }

    fn get(&self, i: usize) -> bool {
        self.bits[i / 64] & (1 << (i % 64)) != 0
    }

    fn set(&mut self, i: usize, v: bool) {
        if v {
            self.bits[i / 64] |= 1 << (i % 64);
        } else {
            self.bits[i / 64] &= !(1 << (i % 64));
        }
    }
}

/// Effective kind of a node once its sign is applied; reduces the number
/// of cases the mixed-kind path has to consider.
#[derive(Copy, Clone, Eq, PartialEq)]
enum EffKind {
    Void,
    Any,
    Union,
    Intersection,
    Other,
}

fn effective(tag: Tag, sign: bool) -> EffKind {
    match (tag, sign) {
        (Tag::Void, true) | (Tag::Any, false) => EffKind::Void,
        (Tag::Any, true) | (Tag::Void, false) => EffKind::Any,
        (Tag::Union, true) | (Tag::Intersection, false) => EffKind::Union,
        (Tag::Intersection, true) | (Tag::Union, false) => EffKind::Intersection,
        _ => EffKind::Other,
    }
}

/// The subtype operator over a (frozen) pool.
///
/// Construct once per compilation unit; the assumption cache is per-query
/// and reset on entry, so a single engine can serve any number of queries.
/// Both operands must be canonical, which the pool constructors guarantee.
pub struct SubtypeEngine<'a> {
    pool: &'a Pool,
    interner: &'a StringInterner,
    nominals: &'a NominalTable,
    assumptions: Assumptions,
}

impl<'a> SubtypeEngine<'a> {
    pub fn new(pool: &'a Pool, interner: &'a StringInterner, nominals: &'a NominalTable) -> Self {
        SubtypeEngine {
            pool,
            interner,
            nominals,
            assumptions: Assumptions::new(),
        }
    }

    /// Test whether `sub <: sup`.
    pub fn is_subtype(&mut self, sub: TypeId, sup: TypeId) -> bool {
        if sub == sup {
            return true;
        }
        tracing::trace!(sub = ?sub, sup = ?sup, "subtype query");
        self.assumptions.reset(self.pool.len() as u32);
        !self.is_intersection(sub, true, sup, false)
    }

    /// Test whether `sup :> sub`.
    pub fn is_supertype(&mut self, sup: TypeId, sub: TypeId) -> bool {
        self.is_subtype(sub, sup)
    }

    /// Test whether a type denotes at least one value.
    pub fn is_inhabited(&mut self, ty: TypeId) -> bool {
        self.assumptions.reset(self.pool.len() as u32);
        self.is_intersection(ty, true, ty, true)
    }

    /// Determine whether a non-empty intersection exists between `a` under
    /// sign `sa` and `b` under sign `sb` (`true` = the type itself,
    /// `false` = its complement).
    fn is_intersection(&mut self, a: TypeId, sa: bool, b: TypeId, sb: bool) -> bool {
        let index = self.assumptions.index(a, sa, b, sb);
        if self.assumptions.get(index) {
            // In-flight: assume not inhabited (coinduction).
            return false;
        }
        self.assumptions.set(index, true);
        let r = self.is_intersection_inner(a, sa, b, sb);
        self.assumptions.set(index, false);
        r
    }

    fn is_intersection_inner(&mut self, a: TypeId, sa: bool, b: TypeId, sb: bool) -> bool {
        let pool = self.pool;
        let tag_a = pool.tag(a);
        let tag_b = pool.tag(b);

        if tag_a == tag_b {
            match tag_a {
                Tag::Void => return !sa && !sb,
                Tag::Any => return sa && sb,

                Tag::Nominal => {
                    // Nominal-only reasoning: equal names intersect per
                    // their signs, differing names are disjoint.
                    if sa || sb {
                        return if pool.nominal_name(a) == pool.nominal_name(b) {
                            sa && sb
                        } else {
                            !sa || !sb
                        };
                    }
                    return true;
                }

                Tag::List | Tag::Set => {
                    // Signs *differing*, not either-positive: two positive
                    // collection types always intersect on the empty
                    // list/set regardless of their element types.
                    if sa != sb && !self.is_intersection(pool.elem(a), sa, pool.elem(b), sb) {
                        return false;
                    }
                    return true;
                }

                Tag::Reference => {
                    if sa || sb {
                        return self.is_intersection(pool.elem(a), sa, pool.elem(b), sb);
                    }
                    return true;
                }

                Tag::Map => {
                    if sa || sb {
                        let children = [
                            (pool.map_key(a), pool.map_key(b)),
                            (pool.map_value(a), pool.map_value(b)),
                        ];
                        return self.combine(children.into_iter(), sa, sb);
                    }
                    return true;
                }

                Tag::Tuple => {
                    if sa || sb {
                        if pool.tuple_len(a) != pool.tuple_len(b) {
                            return !sa || !sb;
                        }
                        let ea = pool.tuple_elems(a);
                        let eb = pool.tuple_elems(b);
                        return self.combine(ea.into_iter().zip(eb), sa, sb);
                    }
                    return true;
                }

                Tag::Record => return self.intersect_records(a, sa, b, sb),

                Tag::Function | Tag::Method => {
                    if sa || sb {
                        if pool.fn_param_count(a) != pool.fn_param_count(b) {
                            return false;
                        }
                        let mut and_children = true;
                        let mut or_children = false;
                        // Return and throws are covariant.
                        for (ca, cb) in [
                            (pool.fn_ret(a), pool.fn_ret(b)),
                            (pool.fn_throws(a), pool.fn_throws(b)),
                        ] {
                            let v = self.is_intersection(ca, sa, cb, sb);
                            and_children &= v;
                            or_children |= v;
                        }
                        // Parameters are contravariant: the signs flip.
                        for i in 0..pool.fn_param_count(a) {
                            let v = self.is_intersection(
                                pool.fn_param(a, i),
                                !sa,
                                pool.fn_param(b, i),
                                !sb,
                            );
                            and_children &= v;
                            or_children |= v;
                        }
                        return if !sa || !sb { or_children } else { and_children };
                    }
                    return true;
                }

                // Connectives fall through to the sign-normalized path.
                Tag::Negation | Tag::Union | Tag::Intersection => {}

                // Remaining same-kind primitives (bool, byte, char, int,
                // real, string, meta) intersect iff their signs agree.
                _ => return sa == sb,
            }
        }

        // Peel top-level negations by flipping the sign.
        if tag_a == Tag::Negation {
            return self.is_intersection(pool.elem(a), !sa, b, sb);
        }
        if tag_b == Tag::Negation {
            return self.is_intersection(a, sa, pool.elem(b), !sb);
        }

        // A nominal meeting a structural kind is expanded lazily; an
        // unregistered name stays a leaf and falls through to the default.
        if tag_a == Tag::Nominal && tag_b != Tag::Nominal {
            if let Some(def) = self.nominals.get(pool.nominal_name(a)) {
                return self.is_intersection(def, sa, b, sb);
            }
        }
        if tag_b == Tag::Nominal && tag_a != Tag::Nominal {
            if let Some(def) = self.nominals.get(pool.nominal_name(b)) {
                return self.is_intersection(a, sa, def, sb);
            }
        }

        // Normalize kinds under their signs to cut down the cases.
        let kind_a = effective(tag_a, sa);
        let kind_b = effective(tag_b, sb);

        if kind_a == EffKind::Void || kind_b == EffKind::Void {
            return false;
        }
        if kind_a == EffKind::Union {
            // Existential: some alternative intersects.
            return self
                .children_of(a)
                .into_iter()
                .any(|c| self.is_intersection(c, sa, b, sb));
        }
        if kind_b == EffKind::Union {
            return self
                .children_of(b)
                .into_iter()
                .any(|c| self.is_intersection(a, sa, c, sb));
        }
        if kind_a == EffKind::Intersection {
            // Universal: every conjunct must intersect.
            return self
                .children_of(a)
                .into_iter()
                .all(|c| self.is_intersection(c, sa, b, sb));
        }
        if kind_b == EffKind::Intersection {
            return self
                .children_of(b)
                .into_iter()
                .all(|c| self.is_intersection(a, sa, c, sb));
        }
        if kind_a == EffKind::Any || kind_b == EffKind::Any {
            return true;
        }

        // Distinct leaf kinds are disjoint: inhabited only when at least
        // one side is complemented.
        !sa || !sb
    }

    fn children_of(&self, id: TypeId) -> Vec<TypeId> {
        self.pool.connective_children(id)
    }

    /// Combine pairwise child intersections: conjunction when both signs
    /// are positive, disjunction when at least one is negative.
    fn combine(
        &mut self,
        pairs: impl Iterator<Item = (TypeId, TypeId)>,
        sa: bool,
        sb: bool,
    ) -> bool {
        let mut and_children = true;
        let mut or_children = false;
        for (ca, cb) in pairs {
            let v = self.is_intersection(ca, sa, cb, sb);
            and_children &= v;
            or_children |= v;
        }
        if !sa || !sb {
            or_children
        } else {
            and_children
        }
    }

    /// Record intersection; the open/closed distinction adds the
    /// complexity here.
    ///
    /// For closed records: `{T1 f, T2 g} ∩ {T3 f, T4 g}` is inhabited iff
    /// `T1 ∩ T3` and `T2 ∩ T4` are; records with different field sets are
    /// disjoint. An open record acts as `any` for its unspecified fields,
    /// so `{T1 f, ...} ∩ {T2 f, T3 g}` is inhabited iff `T1 ∩ T2` is.
    /// Under mixed signs the per-field results combine disjunctively.
    fn intersect_records(&mut self, a: TypeId, sa: bool, b: TypeId, sb: bool) -> bool {
        if !sa && !sb {
            return true;
        }
        let pool = self.pool;
        let a_len = pool.record_len(a);
        let b_len = pool.record_len(b);
        let a_open = pool.record_is_open(a);
        let b_open = pool.record_is_open(b);

        if a_len < b_len && !a_open {
            return !sa || !sb;
        }
        if a_len > b_len && !b_open {
            return !sa || !sb;
        }
        if !sa && !a_open && b_open {
            return true;
        }
        if !sb && !b_open && a_open {
            return true;
        }

        let mut and_children = true;
        let mut or_children = false;

        // Lockstep walk over the two sorted field lists.
        let mut fi = 0;
        let mut ti = 0;
        while fi != a_len && ti != b_len {
            let (fa_name, fa_ty) = pool.record_field(a, fi);
            let (tb_name, tb_ty) = pool.record_field(b, ti);
            let v;
            match self.interner.cmp_names(fa_name, tb_name) {
                std::cmp::Ordering::Equal => {
                    fi += 1;
                    ti += 1;
                    v = self.is_intersection(fa_ty, sa, tb_ty, sb);
                }
                std::cmp::Ordering::Less if b_open => {
                    fi += 1;
                    v = sb;
                }
                std::cmp::Ordering::Greater if a_open => {
                    ti += 1;
                    v = sa;
                }
                _ => return !sa || !sb,
            }
            and_children &= v;
            or_children |= v;
        }

        if fi < a_len {
            if b_open {
                or_children |= sb;
                and_children &= sb;
            } else {
                return !sa || !sb;
            }
        } else if ti < b_len {
            if a_open {
                or_children |= sa;
                and_children &= sa;
            } else {
                return !sa || !sb;
            }
        }

        if !sa || !sb {
            or_children
        } else {
            and_children
        }
    }
}
