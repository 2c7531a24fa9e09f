//! Destructuring patterns.
//!
//! Used by variable declarations and type declarations. A pattern mirrors
//! the structure of the declared type; the code generator walks the two in
//! lockstep, emitting field/tuple loads into freshly allocated registers.

use crate::Name;

/// A destructuring pattern.
#[derive(Clone, Debug)]
pub enum Pattern {
    /// Leaf, optionally binding a variable name.
    Leaf(Option<Name>),
    /// Record pattern: one sub-pattern per named field.
    Record(Vec<(Name, Pattern)>),
    /// Tuple pattern: one sub-pattern per position.
    Tuple(Vec<Pattern>),
    /// Rational pattern `n / d`: numerator and denominator, both `int`.
    Rational {
        num: Box<Pattern>,
        den: Box<Pattern>,
    },
}

impl Pattern {
    /// Leaf pattern binding `name`.
    pub fn var(name: Name) -> Self {
        Pattern::Leaf(Some(name))
    }

    /// Collect every bound name, in destructuring order.
    pub fn bound_names(&self, out: &mut Vec<Name>) {
        match self {
            Pattern::Leaf(Some(name)) => out.push(*name),
            Pattern::Leaf(None) => {}
            Pattern::Record(fields) => {
                for (_, p) in fields {
                    p.bound_names(out);
                }
            }
            Pattern::Tuple(elems) => {
                for p in elems {
                    p.bound_names(out);
                }
            }
            Pattern::Rational { num, den } => {
                num.bound_names(out);
                den.bound_names(out);
            }
        }
    }
}
