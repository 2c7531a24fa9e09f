//! Canonicalizing type constructors.
//!
//! All construction goes through these methods so that the pool only ever
//! contains canonical nodes:
//! - unions/intersections are flattened, deduplicated, absorbed against
//!   `any`/`void`, sorted, and collapsed when fewer than two children remain
//! - negation is lifted through unions and intersections by De Morgan and
//!   never left doubled or applied to `any`/`void`
//! - record fields are strictly sorted by field-name string

use rill_ir::{Name, StringInterner, TypeId};

use super::Pool;
use crate::Tag;

impl Pool {
    /// `[T]`
    pub fn list(&mut self, elem: TypeId) -> TypeId {
        self.intern(Tag::List, elem.raw())
    }

    /// `{T}`
    pub fn set(&mut self, elem: TypeId) -> TypeId {
        self.intern(Tag::Set, elem.raw())
    }

    /// `&T`
    pub fn reference(&mut self, elem: TypeId) -> TypeId {
        self.intern(Tag::Reference, elem.raw())
    }

    /// `{K=>V}`
    pub fn map(&mut self, key: TypeId, value: TypeId) -> TypeId {
        self.intern_complex(Tag::Map, &[key.raw(), value.raw()])
    }

    /// `(T1, T2, ...)`
    pub fn tuple(&mut self, elems: &[TypeId]) -> TypeId {
        let mut extra = Vec::with_capacity(1 + elems.len());
        extra.push(elems.len() as u32);
        extra.extend(elems.iter().map(|e| e.raw()));
        self.intern_complex(Tag::Tuple, &extra)
    }

    /// `{T1 f1, T2 f2, ...}` — fields are sorted here by field-name string;
    /// callers pass them in any order.
    ///
    /// # Panics
    /// Panics (debug) on duplicate field names.
    pub fn record(
        &mut self,
        fields: &[(Name, TypeId)],
        open: bool,
        interner: &StringInterner,
    ) -> TypeId {
        let mut sorted: Vec<(Name, TypeId)> = fields.to_vec();
        sorted.sort_by(|a, b| interner.cmp_names(a.0, b.0));
        debug_assert!(
            sorted.windows(2).all(|w| w[0].0 != w[1].0),
            "duplicate record field"
        );

        let mut extra = Vec::with_capacity(2 + sorted.len() * 2);
        extra.push(u32::from(open));
        extra.push(sorted.len() as u32);
        for (name, ty) in &sorted {
            extra.push(name.raw());
            extra.push(ty.raw());
        }
        self.intern_complex(Tag::Record, &extra)
    }

    /// `function (P*) => R throws E`
    pub fn function(&mut self, ret: TypeId, throws: TypeId, params: &[TypeId]) -> TypeId {
        self.callable(Tag::Function, ret, throws, params)
    }

    /// `method (P*) => R throws E`
    pub fn method(&mut self, ret: TypeId, throws: TypeId, params: &[TypeId]) -> TypeId {
        self.callable(Tag::Method, ret, throws, params)
    }

    fn callable(&mut self, tag: Tag, ret: TypeId, throws: TypeId, params: &[TypeId]) -> TypeId {
        let mut extra = Vec::with_capacity(3 + params.len());
        extra.push(params.len() as u32);
        extra.push(ret.raw());
        extra.push(throws.raw());
        extra.extend(params.iter().map(|p| p.raw()));
        self.intern_complex(tag, &extra)
    }

    /// A nominal reference to `name`, expanded on demand.
    pub fn nominal(&mut self, name: Name) -> TypeId {
        self.intern(Tag::Nominal, name.raw())
    }

    /// Least upper bound `T1 ∪ T2`.
    pub fn union2(&mut self, a: TypeId, b: TypeId) -> TypeId {
        self.union(&[a, b])
    }

    /// Greatest lower bound `T1 ∩ T2`.
    pub fn intersect2(&mut self, a: TypeId, b: TypeId) -> TypeId {
        self.intersect(&[a, b])
    }

    /// N-ary union, canonicalized.
    pub fn union(&mut self, children: &[TypeId]) -> TypeId {
        let mut flat = Vec::with_capacity(children.len());
        for &c in children {
            self.flatten_into(Tag::Union, c, &mut flat);
        }
        // `any` absorbs; `void` is the identity.
        if flat.iter().any(|&c| c == TypeId::ANY) {
            return TypeId::ANY;
        }
        flat.retain(|&c| c != TypeId::VOID);
        Self::sort_dedup(&mut flat);

        // A type together with its complement covers everything.
        for &c in &flat {
            if self.tag(c) == Tag::Negation && flat.contains(&self.elem(c)) {
                return TypeId::ANY;
            }
        }

        match flat.len() {
            0 => TypeId::VOID,
            1 => flat[0],
            _ => self.connective(Tag::Union, &flat),
        }
    }

    /// Cap on union distribution: beyond this many alternatives the
    /// intersection stays symbolic rather than exploding.
    const DISTRIBUTE_LIMIT: usize = 64;

    /// N-ary intersection, minimized.
    ///
    /// Unions among the conjuncts are distributed (so refinements like
    /// `(int|null) ∩ !int` collapse to `null`), and conjunct pairs are
    /// combined structurally where their meet is representable: pointwise
    /// for collections and tuples, annihilating for distinct concrete
    /// kinds. Pairs with no representable meet (functions, nominals, open
    /// records) are kept as a symbolic intersection node.
    pub fn intersect(&mut self, children: &[TypeId]) -> TypeId {
        let mut flat = Vec::with_capacity(children.len());
        for &c in children {
            self.flatten_into(Tag::Intersection, c, &mut flat);
        }
        if flat.iter().any(|&c| c == TypeId::VOID) {
            return TypeId::VOID;
        }
        flat.retain(|&c| c != TypeId::ANY);
        Self::sort_dedup(&mut flat);

        // Distribute over unions: ∩(..., a|b, ...) = ∩(...,a,...) | ∩(...,b,...).
        if let Some(pos) = flat.iter().position(|&c| self.tag(c) == Tag::Union) {
            let alternatives = self.connective_children(flat[pos]);
            if alternatives.len() * flat.len() <= Self::DISTRIBUTE_LIMIT {
                let mut arms = Vec::with_capacity(alternatives.len());
                for alt in alternatives {
                    let mut arm = flat.clone();
                    arm[pos] = alt;
                    arms.push(self.intersect(&arm));
                }
                return self.union(&arms);
            }
        }

        // Combine conjunct pairs until no further progress.
        let mut progress = true;
        while progress && flat.len() > 1 {
            progress = false;
            'outer: for i in 0..flat.len() {
                for j in i + 1..flat.len() {
                    if let Some(meet) = self.meet_pair(flat[i], flat[j]) {
                        if meet == TypeId::VOID {
                            return TypeId::VOID;
                        }
                        flat.remove(j);
                        flat[i] = meet;
                        Self::sort_dedup(&mut flat);
                        flat.retain(|&c| c != TypeId::ANY);
                        progress = true;
                        break 'outer;
                    }
                }
            }
        }

        match flat.len() {
            0 => TypeId::ANY,
            1 => flat[0],
            _ => self.connective(Tag::Intersection, &flat),
        }
    }

    /// The representable meet of two conjuncts, or `None` to keep both.
    fn meet_pair(&mut self, a: TypeId, b: TypeId) -> Option<TypeId> {
        if a == b {
            return Some(a);
        }
        let (ta, tb) = (self.tag(a), self.tag(b));

        // A complement annihilates its subject and is absorbed by
        // anything disjoint from that subject.
        if ta == Tag::Negation && tb != Tag::Negation {
            return self.meet_negation(a, b);
        }
        if tb == Tag::Negation && ta != Tag::Negation {
            return self.meet_negation(b, a);
        }

        if self.definitely_disjoint(a, b) {
            return Some(TypeId::VOID);
        }

        match (ta, tb) {
            (Tag::List, Tag::List) => {
                let e = self.intersect2(self.elem(a), self.elem(b));
                Some(self.list(e))
            }
            (Tag::Set, Tag::Set) => {
                let e = self.intersect2(self.elem(a), self.elem(b));
                Some(self.set(e))
            }
            (Tag::Reference, Tag::Reference) => {
                let e = self.intersect2(self.elem(a), self.elem(b));
                Some(self.reference(e))
            }
            (Tag::Map, Tag::Map) => {
                let k = self.intersect2(self.map_key(a), self.map_key(b));
                let v = self.intersect2(self.map_value(a), self.map_value(b));
                Some(self.map(k, v))
            }
            (Tag::Tuple, Tag::Tuple) => {
                if self.tuple_len(a) != self.tuple_len(b) {
                    return Some(TypeId::VOID);
                }
                let pairs: Vec<(TypeId, TypeId)> = (0..self.tuple_len(a))
                    .map(|i| (self.tuple_elem(a, i), self.tuple_elem(b, i)))
                    .collect();
                let elems: Vec<TypeId> = pairs
                    .into_iter()
                    .map(|(x, y)| self.intersect2(x, y))
                    .collect();
                Some(self.tuple(&elems))
            }
            (Tag::Record, Tag::Record)
                if !self.record_is_open(a) && !self.record_is_open(b) =>
            {
                // Closed records meet fieldwise; different field sets are
                // disjoint. Field lists are sorted, so compare pairwise.
                if self.record_len(a) != self.record_len(b) {
                    return Some(TypeId::VOID);
                }
                let mut fields = Vec::with_capacity(self.record_len(a));
                for i in 0..self.record_len(a) {
                    let (na, fa) = self.record_field(a, i);
                    let (nb, fb) = self.record_field(b, i);
                    if na != nb {
                        return Some(TypeId::VOID);
                    }
                    fields.push((na, fa, fb));
                }
                let mut met = Vec::with_capacity(fields.len());
                for (n, fa, fb) in fields {
                    met.push((n, self.intersect2(fa, fb)));
                }
                Some(self.record_sorted(&met))
            }
            // Functions, methods, nominals and open records keep a
            // symbolic intersection.
            _ => None,
        }
    }

    /// Meet `!n ∩ b` where `b` is not a negation.
    fn meet_negation(&mut self, neg: TypeId, b: TypeId) -> Option<TypeId> {
        let n = self.elem(neg);
        if n == b {
            return Some(TypeId::VOID);
        }
        if self.definitely_disjoint(n, b) {
            // b already avoids everything !n excludes.
            return Some(b);
        }
        None
    }

    /// Conservatively decide whether two types denote disjoint value sets:
    /// true only for distinct concrete kinds (a record value is never a
    /// list value) and distinct primitives.
    fn definitely_disjoint(&self, a: TypeId, b: TypeId) -> bool {
        let (ta, tb) = (self.tag(a), self.tag(b));
        let concrete = |t: Tag| {
            t.is_primitive()
                || matches!(
                    t,
                    Tag::List
                        | Tag::Set
                        | Tag::Reference
                        | Tag::Map
                        | Tag::Tuple
                        | Tag::Record
                        | Tag::Function
                        | Tag::Method
                )
        };
        if !concrete(ta) || !concrete(tb) {
            return false;
        }
        if ta.is_primitive() && tb.is_primitive() {
            return a != b;
        }
        ta != tb
    }

    /// Intern a record whose fields are already sorted by name string.
    fn record_sorted(&mut self, fields: &[(Name, TypeId)]) -> TypeId {
        let mut extra = Vec::with_capacity(2 + fields.len() * 2);
        extra.push(0);
        extra.push(fields.len() as u32);
        for (name, ty) in fields {
            extra.push(name.raw());
            extra.push(ty.raw());
        }
        self.intern_complex(Tag::Record, &extra)
    }

    /// `!T`, with negation lifted so it is never nested and never applied
    /// to a connective.
    pub fn negation(&mut self, ty: TypeId) -> TypeId {
        match self.tag(ty) {
            Tag::Any => TypeId::VOID,
            Tag::Void => TypeId::ANY,
            Tag::Negation => self.elem(ty),
            Tag::Union => {
                let children = self.connective_children(ty);
                let negated: Vec<TypeId> =
                    children.iter().map(|&c| self.negation(c)).collect();
                self.intersect(&negated)
            }
            Tag::Intersection => {
                let children = self.connective_children(ty);
                let negated: Vec<TypeId> =
                    children.iter().map(|&c| self.negation(c)).collect();
                self.union(&negated)
            }
            _ => self.intern(Tag::Negation, ty.raw()),
        }
    }

    fn flatten_into(&self, tag: Tag, child: TypeId, out: &mut Vec<TypeId>) {
        if self.tag(child) == tag {
            out.extend(self.connective_children(child));
        } else {
            out.push(child);
        }
    }

    fn sort_dedup(children: &mut Vec<TypeId>) {
        children.sort_by_key(|c| c.raw());
        children.dedup();
    }

    fn connective(&mut self, tag: Tag, children: &[TypeId]) -> TypeId {
        debug_assert!(children.len() >= 2);
        let mut extra = Vec::with_capacity(1 + children.len());
        extra.push(children.len() as u32);
        extra.extend(children.iter().map(|c| c.raw()));
        self.intern_complex(tag, &extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rill_ir::StringInterner;

    #[test]
    fn union_is_flattened_and_sorted() {
        let mut pool = Pool::new();
        let ab = pool.union2(TypeId::INT, TypeId::BOOL);
        let abc = pool.union2(ab, TypeId::NULL);
        let cba = pool.union(&[TypeId::NULL, TypeId::BOOL, TypeId::INT]);
        assert_eq!(abc, cba);
        assert_eq!(pool.connective_children(abc).len(), 3);
    }

    #[test]
    fn union_collapses_trivial_cases() {
        let mut pool = Pool::new();
        assert_eq!(pool.union2(TypeId::INT, TypeId::INT), TypeId::INT);
        assert_eq!(pool.union2(TypeId::INT, TypeId::VOID), TypeId::INT);
        assert_eq!(pool.union2(TypeId::INT, TypeId::ANY), TypeId::ANY);
        assert_eq!(pool.union(&[]), TypeId::VOID);
    }

    #[test]
    fn intersection_collapses_trivial_cases() {
        let mut pool = Pool::new();
        assert_eq!(pool.intersect2(TypeId::INT, TypeId::INT), TypeId::INT);
        assert_eq!(pool.intersect2(TypeId::INT, TypeId::ANY), TypeId::INT);
        assert_eq!(pool.intersect2(TypeId::INT, TypeId::VOID), TypeId::VOID);
        assert_eq!(pool.intersect(&[]), TypeId::ANY);
    }

    #[test]
    fn double_negation_vanishes() {
        let mut pool = Pool::new();
        let n = pool.negation(TypeId::INT);
        assert_eq!(pool.tag(n), Tag::Negation);
        assert_eq!(pool.negation(n), TypeId::INT);
    }

    #[test]
    fn negation_lifts_through_connectives() {
        let mut pool = Pool::new();
        let u = pool.union2(TypeId::INT, TypeId::NULL);
        let n = pool.negation(u);
        // De Morgan: !(int | null) == !int & !null
        assert_eq!(pool.tag(n), Tag::Intersection);
        let not_int = pool.negation(TypeId::INT);
        let not_null = pool.negation(TypeId::NULL);
        assert_eq!(n, pool.intersect2(not_int, not_null));
    }

    #[test]
    fn negation_of_extremes() {
        let mut pool = Pool::new();
        assert_eq!(pool.negation(TypeId::ANY), TypeId::VOID);
        assert_eq!(pool.negation(TypeId::VOID), TypeId::ANY);
    }

    #[test]
    fn record_fields_sorted_by_string() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        // Intern in reverse lexicographic order so ids disagree with strings.
        let y = interner.intern("y");
        let x = interner.intern("x");
        let a = pool.record(&[(y, TypeId::INT), (x, TypeId::BOOL)], false, &interner);
        let b = pool.record(&[(x, TypeId::BOOL), (y, TypeId::INT)], false, &interner);
        assert_eq!(a, b);
        assert_eq!(pool.record_field(a, 0).0, x);
        assert_eq!(pool.record_field(a, 1).0, y);
    }

    #[test]
    fn open_and_closed_records_differ() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let f = interner.intern("f");
        let closed = pool.record(&[(f, TypeId::INT)], false, &interner);
        let open = pool.record(&[(f, TypeId::INT)], true, &interner);
        assert_ne!(closed, open);
        assert!(pool.record_is_open(open));
        assert!(!pool.record_is_open(closed));
    }

    #[test]
    fn function_accessors() {
        let mut pool = Pool::new();
        let f = pool.function(TypeId::INT, TypeId::VOID, &[TypeId::REAL, TypeId::BOOL]);
        assert_eq!(pool.fn_ret(f), TypeId::INT);
        assert_eq!(pool.fn_throws(f), TypeId::VOID);
        assert_eq!(pool.fn_params(f), vec![TypeId::REAL, TypeId::BOOL]);
        assert_ne!(
            f,
            pool.method(TypeId::INT, TypeId::VOID, &[TypeId::REAL, TypeId::BOOL])
        );
    }
}
