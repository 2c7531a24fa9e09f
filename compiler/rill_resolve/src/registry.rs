//! Module registry: callee signatures and global constants.
//!
//! The registry is the resolver's window onto the surrounding project. The
//! host pre-loads it with every function/method signature and constant the
//! module under compilation can reach (spec: module lookup is pre-loaded;
//! no I/O happens inside the core).

use rustc_hash::{FxHashMap, FxHashSet};

use rill_ir::{Constant, Name, QName, TypeId};

/// Pre-loaded signatures and constants, keyed by qualified name.
#[derive(Default, Debug)]
pub struct ModuleRegistry {
    /// Function/method overloads per qualified name.
    functions: FxHashMap<QName, Vec<TypeId>>,
    /// Global constants per qualified name.
    constants: FxHashMap<QName, Constant>,
    /// Known module names.
    modules: FxHashSet<Name>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a module name.
    pub fn register_module(&mut self, module: Name) {
        self.modules.insert(module);
    }

    /// Register a function or method signature. Overloads accumulate.
    pub fn register_function(&mut self, module: Name, name: Name, ty: TypeId) {
        self.modules.insert(module);
        self.functions
            .entry(QName::new(module, name))
            .or_default()
            .push(ty);
    }

    /// Register a global constant.
    pub fn register_constant(&mut self, module: Name, name: Name, value: Constant) {
        self.modules.insert(module);
        self.constants.insert(QName::new(module, name), value);
    }

    pub fn is_module(&self, name: Name) -> bool {
        self.modules.contains(&name)
    }

    pub fn constant(&self, module: Name, name: Name) -> Option<&Constant> {
        self.constants.get(&QName::new(module, name))
    }

    /// All registered overloads of `module::name`.
    pub fn candidates(&self, module: Name, name: Name) -> &[TypeId] {
        self.functions
            .get(&QName::new(module, name))
            .map_or(&[], Vec::as_slice)
    }
}
