//! Flow-sensitive type environment.
//!
//! Maps variable names to their *current* type, which conditions refine as
//! control flow branches. Environments have value semantics: refining one
//! branch never disturbs the other. Cloning is O(1) via `Rc`; the first
//! write to a shared environment copies it (`Rc::make_mut`).
//!
//! A distinguished *bottom* environment stands for an unreachable branch
//! (after `return`, `throw` or `break`) and is absorbed by [`join`].

use rustc_hash::FxHashMap;
use std::rc::Rc;

use rill_ir::{Name, TypeId};
use rill_types::Pool;

#[derive(Clone, Debug)]
struct Inner {
    bindings: FxHashMap<Name, TypeId>,
    bottom: bool,
}

/// Flow-sensitive mapping from variable names to current types.
#[derive(Clone, Debug)]
pub struct Environment(Rc<Inner>);

impl Environment {
    /// Create a new empty environment.
    pub fn new() -> Self {
        Environment(Rc::new(Inner {
            bindings: FxHashMap::default(),
            bottom: false,
        }))
    }

    /// The unreachable environment.
    pub fn bottom() -> Self {
        Environment(Rc::new(Inner {
            bindings: FxHashMap::default(),
            bottom: true,
        }))
    }

    /// True for the unreachable environment.
    pub fn is_bottom(&self) -> bool {
        self.0.bottom
    }

    /// Mark this environment unreachable, keeping its bindings so that
    /// dead code after a `return`/`throw`/`break` still type-checks.
    #[must_use]
    pub fn into_bottom(mut self) -> Self {
        Rc::make_mut(&mut self.0).bottom = true;
        self
    }

    /// Current type of `name`, if bound.
    pub fn lookup(&self, name: Name) -> Option<TypeId> {
        self.0.bindings.get(&name).copied()
    }

    /// Bind or rebind `name`, copying the underlying map only when shared.
    pub fn bind(&mut self, name: Name, ty: TypeId) {
        Rc::make_mut(&mut self.0).bindings.insert(name, ty);
    }

    /// Iterate over all bindings.
    pub fn iter(&self) -> impl Iterator<Item = (Name, TypeId)> + '_ {
        self.0.bindings.iter().map(|(&n, &t)| (n, t))
    }

    /// Number of bound names.
    pub fn len(&self) -> usize {
        self.0.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.bindings.is_empty()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Merge the environments of two control-flow branches.
///
/// Bottom absorbs: joining with an unreachable branch yields the other
/// unchanged. Otherwise the result binds the names present in *both*
/// branches, each at the union of its two types; names known on only one
/// side are dropped.
pub fn join(pool: &mut Pool, lhs: &Environment, rhs: &Environment) -> Environment {
    if lhs.is_bottom() {
        return rhs.clone();
    }
    if rhs.is_bottom() {
        return lhs.clone();
    }

    let mut result = Environment::new();
    for (name, lhs_ty) in lhs.iter() {
        if let Some(rhs_ty) = rhs.lookup(name) {
            let joined = pool.union2(lhs_ty, rhs_ty);
            result.bind(name, joined);
        }
    }
    result
}
