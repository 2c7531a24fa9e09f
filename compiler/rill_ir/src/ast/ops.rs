//! Operator enums shared between the AST, resolver and code generator.

use std::fmt;

/// Binary operators.
///
/// The parser only produces the "surface" operators; the resolver rewrites
/// overloaded ones in place (`Add` becomes `ListAppend`, `StringAppend` or
/// `Union` depending on operand types, `BitAnd` on sets becomes
/// `Intersection`, and so on).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    /// Integer range `lo .. hi`, producing `list(int)`.
    Range,
    // Bitwise (bytes)
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    // Logical
    And,
    Or,
    Xor,
    // Comparisons
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    // Collections
    Union,
    Intersection,
    Difference,
    ListAppend,
    StringAppend,
    ElementOf,
    Subset,
    SubsetEq,
    /// Runtime type test `x is T`.
    Is,
}

impl BinaryOp {
    /// True for operators whose result is a boolean produced by a
    /// conditional-branch scheme in the code generator.
    pub fn is_condition(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::Subset
                | BinaryOp::SubsetEq
                | BinaryOp::ElementOf
                | BinaryOp::And
                | BinaryOp::Or
                | BinaryOp::Xor
        )
    }

    /// True for the short-circuit connectives. Exclusive-or is not one of
    /// them: both of its operands always evaluate.
    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    /// True for the leaf condition operators: everything boolean except
    /// the short-circuit connectives. Leaf conditions type their operands
    /// in the incoming environment and propagate no refinement of their
    /// own (only `is` and the null comparisons refine, and only at this
    /// level).
    pub fn is_leaf_condition(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::NotEq
                | BinaryOp::Lt
                | BinaryOp::LtEq
                | BinaryOp::Gt
                | BinaryOp::GtEq
                | BinaryOp::ElementOf
                | BinaryOp::Subset
                | BinaryOp::SubsetEq
                | BinaryOp::Is
                | BinaryOp::Xor
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Range => "..",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::Xor => "^^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::Union => "∪",
            BinaryOp::Intersection => "∩",
            BinaryOp::Difference => "∖",
            BinaryOp::ListAppend => "++",
            BinaryOp::StringAppend => "++",
            BinaryOp::ElementOf => "in",
            BinaryOp::Subset => "⊂",
            BinaryOp::SubsetEq => "⊆",
            BinaryOp::Is => "is",
        };
        f.write_str(s)
    }
}

/// Unary operators.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOp {
    /// Arithmetic negation.
    Neg,
    /// Bitwise inversion (bytes).
    Invert,
    /// Logical not.
    Not,
}

/// Comprehension kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CompKind {
    /// `none { ... }` — true iff no binding satisfies the condition.
    None,
    /// `some { ... }` — true iff at least one binding satisfies it.
    Some,
    /// `all { ... }` — true iff every binding satisfies it.
    All,
    /// List comprehension.
    ListComp,
    /// Set comprehension.
    SetComp,
}

impl CompKind {
    /// True for the quantifier kinds whose result is boolean.
    pub fn is_quantifier(self) -> bool {
        matches!(self, CompKind::None | CompKind::Some | CompKind::All)
    }
}
