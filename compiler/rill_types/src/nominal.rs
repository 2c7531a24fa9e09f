//! Nominal type resolution.
//!
//! A [`NominalTable`] maps qualified type names to their structural
//! definitions. The host registers every definition before compilation
//! starts (spec: nominal resolution is pre-loaded); the table itself is the
//! memo, so expansion is a lookup.

use rustc_hash::FxHashMap;

use rill_diagnostic::ResolveError;
use rill_ir::{Name, StringInterner, TypeId};

use crate::Pool;

const MAX_DEPTH: u32 = 32;

/// Registered nominal type definitions.
#[derive(Default, Debug)]
pub struct NominalTable {
    defs: FxHashMap<Name, TypeId>,
}

impl NominalTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the definition of `name`.
    ///
    /// The definition must already be interned in the pool; registering
    /// mutually recursive nominals is fine because each side refers to the
    /// other through a `Nominal` node.
    pub fn register(&mut self, name: Name, ty: TypeId) {
        self.defs.insert(name, ty);
    }

    /// Look up a definition without failing.
    pub fn get(&self, name: Name) -> Option<TypeId> {
        self.defs.get(&name).copied()
    }

    /// Expand one level of `name`.
    pub fn expand(&self, name: Name, interner: &StringInterner) -> Result<TypeId, ResolveError> {
        self.get(name)
            .ok_or_else(|| ResolveError(interner.resolve(name).to_owned()))
    }

    /// Whether `name` expands to an open record.
    pub fn is_open(&self, pool: &Pool, name: Name) -> bool {
        match self.get(name) {
            Some(def) => {
                let def = self.expand_fully(pool, def);
                pool.tag(def) == crate::Tag::Record && pool.record_is_open(def)
            }
            None => false,
        }
    }

    /// Follow nominal indirections until a structural type is reached.
    ///
    /// Chains are depth-limited to guard against self-referential aliases
    /// (`type a is a`); hitting the limit logs a warning and returns the
    /// last type reached.
    pub fn expand_fully(&self, pool: &Pool, ty: TypeId) -> TypeId {
        let mut current = ty;
        for _ in 0..MAX_DEPTH {
            if pool.tag(current) != crate::Tag::Nominal {
                return current;
            }
            match self.get(pool.nominal_name(current)) {
                Some(next) if next != current => current = next,
                _ => return current,
            }
        }
        tracing::warn!(ty = ?ty, depth = MAX_DEPTH, "nominal expansion depth limit reached");
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Tag;

    #[test]
    fn expand_follows_chains() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let mut nominals = NominalTable::new();

        let a = interner.intern("a");
        let b = interner.intern("b");
        let na = pool.nominal(a);
        let nb = pool.nominal(b);
        nominals.register(a, nb);
        nominals.register(b, TypeId::INT);

        assert_eq!(nominals.expand(a, &interner).unwrap(), nb);
        assert_eq!(nominals.expand_fully(&pool, na), TypeId::INT);
    }

    #[test]
    fn unknown_name_is_a_resolve_error() {
        let interner = StringInterner::new();
        let missing = interner.intern("missing");
        let nominals = NominalTable::new();
        assert!(nominals.expand(missing, &interner).is_err());
    }

    #[test]
    fn openness_follows_expansion() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let mut nominals = NominalTable::new();

        let point = interner.intern("point");
        let x = interner.intern("x");
        let open_rec = pool.record(&[(x, TypeId::INT)], true, &interner);
        nominals.register(point, open_rec);

        assert!(nominals.is_open(&pool, point));
        let closed = interner.intern("closed");
        let closed_rec = pool.record(&[(x, TypeId::INT)], false, &interner);
        nominals.register(closed, closed_rec);
        assert!(!nominals.is_open(&pool, closed));
        assert!(!nominals.is_open(&pool, interner.intern("missing")));
    }

    #[test]
    fn self_referential_alias_terminates() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let mut nominals = NominalTable::new();

        let a = interner.intern("a");
        let na = pool.nominal(a);
        nominals.register(a, na);

        let out = nominals.expand_fully(&pool, na);
        assert_eq!(pool.tag(out), Tag::Nominal);
    }
}
