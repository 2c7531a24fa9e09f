//! Register environment.
//!
//! Maps source variable names to block registers and records each
//! register's declared type. Registers are allocated monotonically and
//! never reused once allocated.

use rustc_hash::FxHashMap;

use rill_ir::{Name, Reg, TypeId};

/// Mapping from variable names to registers, plus per-register types.
#[derive(Clone, Default, Debug)]
pub struct Frame {
    var_to_reg: FxHashMap<Name, Reg>,
    reg_types: Vec<TypeId>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh register of the given type.
    pub fn allocate(&mut self, ty: TypeId) -> Reg {
        let r = Reg::from_raw(self.reg_types.len() as u32);
        self.reg_types.push(ty);
        r
    }

    /// Allocate a fresh register and bind a variable name to it.
    pub fn allocate_named(&mut self, ty: TypeId, name: Name) -> Reg {
        let r = self.allocate(ty);
        self.var_to_reg.insert(name, r);
        r
    }

    /// Bind a name to an already-allocated register (catch variables
    /// rebind onto the exception register).
    pub fn bind(&mut self, name: Name, reg: Reg) {
        self.var_to_reg.insert(name, reg);
    }

    /// Register of a variable, if declared.
    pub fn get(&self, name: Name) -> Option<Reg> {
        self.var_to_reg.get(&name).copied()
    }

    /// Declared type of a register.
    pub fn type_of(&self, reg: Reg) -> TypeId {
        self.reg_types[reg.raw() as usize]
    }

    /// Number of registers allocated so far.
    pub fn len(&self) -> usize {
        self.reg_types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reg_types.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_are_monotonic() {
        let mut frame = Frame::new();
        let a = frame.allocate(TypeId::INT);
        let b = frame.allocate(TypeId::BOOL);
        assert_eq!(a.raw(), 0);
        assert_eq!(b.raw(), 1);
        assert_eq!(frame.type_of(a), TypeId::INT);
        assert_eq!(frame.type_of(b), TypeId::BOOL);
    }

    #[test]
    fn named_allocation_binds() {
        let mut frame = Frame::new();
        let x = Name::from_raw(1);
        let r = frame.allocate_named(TypeId::INT, x);
        assert_eq!(frame.get(x), Some(r));
        assert_eq!(frame.get(Name::from_raw(2)), None);
    }

    #[test]
    fn rebinding_points_to_existing_register() {
        let mut frame = Frame::new();
        let exc = frame.allocate(TypeId::ANY);
        let e = Name::from_raw(3);
        frame.bind(e, exc);
        assert_eq!(frame.get(e), Some(exc));
        assert_eq!(frame.len(), 1);
    }
}
