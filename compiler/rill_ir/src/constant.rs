//! Constant values.
//!
//! Shared between the AST (literals, case constants) and the IR (`Const`
//! instructions). Reals are stored as bit patterns so that constants are
//! `Eq + Hash` — the switch lowering deduplicates case constants in a set.

use std::fmt;

use crate::{Name, TypeId};

/// Bit-pattern wrapper for real constants.
///
/// Two reals are the same case constant iff their bit patterns match.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct RealBits(u64);

impl RealBits {
    #[inline]
    pub fn from_f64(v: f64) -> Self {
        RealBits(v.to_bits())
    }

    #[inline]
    pub fn value(self) -> f64 {
        f64::from_bits(self.0)
    }
}

/// A constant value.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Constant {
    Null,
    Bool(bool),
    Byte(u8),
    Char(char),
    Int(i64),
    Real(RealBits),
    Str(Name),
}

impl Constant {
    /// Shorthand for a real constant from an `f64`.
    pub fn real(v: f64) -> Self {
        Constant::Real(RealBits::from_f64(v))
    }

    /// The type of this constant.
    pub fn ty(&self) -> TypeId {
        match self {
            Constant::Null => TypeId::NULL,
            Constant::Bool(_) => TypeId::BOOL,
            Constant::Byte(_) => TypeId::BYTE,
            Constant::Char(_) => TypeId::CHAR,
            Constant::Int(_) => TypeId::INT,
            Constant::Real(_) => TypeId::REAL,
            Constant::Str(_) => TypeId::STRING,
        }
    }

    /// True for the `null` constant, which the resolver treats as sugar
    /// for a type test in `x == null` / `x != null` comparisons.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Constant::Null)
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Null => f.write_str("null"),
            Constant::Bool(b) => write!(f, "{b}"),
            Constant::Byte(b) => write!(f, "{b:#010b}"),
            Constant::Char(c) => write!(f, "'{c}'"),
            Constant::Int(i) => write!(f, "{i}"),
            Constant::Real(r) => write!(f, "{}", r.value()),
            Constant::Str(n) => write!(f, "\"#{}\"", n.raw()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_types() {
        assert_eq!(Constant::Null.ty(), TypeId::NULL);
        assert_eq!(Constant::Bool(true).ty(), TypeId::BOOL);
        assert_eq!(Constant::Int(3).ty(), TypeId::INT);
        assert_eq!(Constant::real(1.5).ty(), TypeId::REAL);
    }

    #[test]
    fn reals_hash_by_bits() {
        use std::collections::HashSet;
        let mut seen = HashSet::new();
        assert!(seen.insert(Constant::real(1.0)));
        assert!(!seen.insert(Constant::real(1.0)));
        assert!(seen.insert(Constant::real(2.0)));
    }
}
