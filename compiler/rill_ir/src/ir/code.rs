//! IR instruction set.
//!
//! A register-based instruction set over an infinite register file.
//! Registers are allocated monotonically within a block and never reused;
//! control flow is expressed with block-local labels and branch
//! instructions. Structured statements (loops, switches, try-catch) keep
//! marker instructions (`Loop`/`LoopEnd`, `TryCatch`/`TryEnd`) so that
//! downstream passes can recover the region structure.

use smallvec::SmallVec;
use std::fmt;

use crate::{Constant, Name, QName, TypeId};

/// A register index within a code block.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Reg(u32);

impl Reg {
    /// The null register: discards a result (calls in statement position).
    pub const NULL: Reg = Reg(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Reg(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn is_null(self) -> bool {
        self.0 == u32::MAX
    }
}

impl fmt::Debug for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            write!(f, "%null")
        } else {
            write!(f, "%{}", self.0)
        }
    }
}

/// A block-local label id.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Label(u32);

impl Label {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Label(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "label{}", self.0)
    }
}

/// Comparison operators for `If` and `Assert` instructions.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Comparator {
    Eq,
    Neq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Subset,
    SubsetEq,
    ElemOf,
}

/// Binary arithmetic instruction kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinArithKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Range,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
}

/// Binary list instruction kinds. The left/right variants append a single
/// element to a list.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinListKind {
    Append,
    LeftAppend,
    RightAppend,
}

/// Binary set instruction kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinSetKind {
    Union,
    /// Union in place of the left operand; used by comprehension
    /// accumulation.
    LeftUnion,
    Intersection,
    Difference,
}

/// Binary string instruction kinds. The left/right variants append a char
/// to a string.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinStringKind {
    Append,
    LeftAppend,
    RightAppend,
}

/// Unary arithmetic instruction kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnArithKind {
    Neg,
    /// Numerator of a rational.
    Numerator,
    /// Denominator of a rational.
    Denominator,
}

/// Operand register list; most instructions have at most four.
pub type Regs = SmallVec<[Reg; 4]>;

/// A single IR instruction.
#[derive(Clone, PartialEq, Debug)]
pub enum Code {
    Const {
        target: Reg,
        value: Constant,
    },
    Assign {
        ty: TypeId,
        target: Reg,
        operand: Reg,
    },
    Convert {
        from: TypeId,
        target: Reg,
        operand: Reg,
        to: TypeId,
    },
    BinArithOp {
        ty: TypeId,
        kind: BinArithKind,
        target: Reg,
        lhs: Reg,
        rhs: Reg,
    },
    BinListOp {
        ty: TypeId,
        kind: BinListKind,
        target: Reg,
        lhs: Reg,
        rhs: Reg,
    },
    BinSetOp {
        ty: TypeId,
        kind: BinSetKind,
        target: Reg,
        lhs: Reg,
        rhs: Reg,
    },
    BinStringOp {
        kind: BinStringKind,
        target: Reg,
        lhs: Reg,
        rhs: Reg,
    },
    UnArithOp {
        ty: TypeId,
        kind: UnArithKind,
        target: Reg,
        operand: Reg,
    },
    Invert {
        ty: TypeId,
        target: Reg,
        operand: Reg,
    },
    LengthOf {
        ty: TypeId,
        target: Reg,
        operand: Reg,
    },
    IndexOf {
        ty: TypeId,
        target: Reg,
        src: Reg,
        index: Reg,
    },
    SubList {
        ty: TypeId,
        target: Reg,
        src: Reg,
        start: Reg,
        end: Reg,
    },
    SubString {
        target: Reg,
        src: Reg,
        start: Reg,
        end: Reg,
    },
    FieldLoad {
        ty: TypeId,
        target: Reg,
        operand: Reg,
        field: Name,
    },
    TupleLoad {
        ty: TypeId,
        target: Reg,
        operand: Reg,
        index: u32,
    },
    NewRecord {
        ty: TypeId,
        target: Reg,
        operands: Regs,
    },
    NewTuple {
        ty: TypeId,
        target: Reg,
        operands: Regs,
    },
    NewList {
        ty: TypeId,
        target: Reg,
        operands: Regs,
    },
    NewSet {
        ty: TypeId,
        target: Reg,
        operands: Regs,
    },
    /// Operands alternate `[k0, v0, k1, v1, ...]`.
    NewMap {
        ty: TypeId,
        target: Reg,
        operands: Regs,
    },
    NewObject {
        ty: TypeId,
        target: Reg,
        operand: Reg,
    },
    Dereference {
        ty: TypeId,
        target: Reg,
        operand: Reg,
    },
    /// Deep path update `target.f[i].g = operand`, with pre-evaluated index
    /// registers in `keys` and the field path in `fields`.
    Update {
        ty: TypeId,
        target: Reg,
        keys: Regs,
        operand: Reg,
        after_ty: TypeId,
        fields: Vec<Name>,
    },
    If {
        ty: TypeId,
        lhs: Reg,
        rhs: Reg,
        op: Comparator,
        target: Label,
    },
    IfIs {
        ty: TypeId,
        operand: Reg,
        test: TypeId,
        target: Label,
    },
    Switch {
        ty: TypeId,
        operand: Reg,
        default: Label,
        branches: Vec<(Constant, Label)>,
    },
    Goto(Label),
    Label(Label),
    Loop {
        head: Label,
    },
    LoopEnd(Label),
    ForAll {
        ty: TypeId,
        source: Reg,
        index: Reg,
        head: Label,
    },
    TryCatch {
        operand: Reg,
        end: Label,
        catches: Vec<(TypeId, Label)>,
    },
    /// Marks the end of a try region; doubles as the label of the first
    /// catch handler.
    TryEnd(Label),
    Invoke {
        ty: TypeId,
        target: Reg,
        operands: Regs,
        name: QName,
    },
    IndirectInvoke {
        ty: TypeId,
        target: Reg,
        operand: Reg,
        operands: Regs,
    },
    /// Construct a closure over `name`; null operand positions are supplied
    /// at call time, the rest are captured from the enclosing frame.
    Lambda {
        ty: TypeId,
        target: Reg,
        operands: Regs,
        name: QName,
    },
    Assert {
        ty: TypeId,
        lhs: Reg,
        rhs: Reg,
        op: Comparator,
        msg: String,
    },
    Throw {
        ty: TypeId,
        operand: Reg,
    },
    Debug {
        operand: Reg,
    },
    /// `ty == VOID` and a null operand encode a bare return.
    Return {
        ty: TypeId,
        operand: Reg,
    },
    Nop,
}

impl Code {
    /// A bare (void) return.
    pub fn ret() -> Code {
        Code::Return {
            ty: TypeId::VOID,
            operand: Reg::NULL,
        }
    }

    /// Visit every register this instruction mentions.
    pub fn for_each_reg(&self, f: &mut impl FnMut(Reg)) {
        // Single source of truth for register traversal; remap_regs must
        // stay in sync with this.
        match self {
            Code::Const { target, .. } => f(*target),
            Code::Assign {
                target, operand, ..
            }
            | Code::Convert {
                target, operand, ..
            }
            | Code::UnArithOp {
                target, operand, ..
            }
            | Code::Invert {
                target, operand, ..
            }
            | Code::LengthOf {
                target, operand, ..
            }
            | Code::FieldLoad {
                target, operand, ..
            }
            | Code::TupleLoad {
                target, operand, ..
            }
            | Code::NewObject {
                target, operand, ..
            }
            | Code::Dereference {
                target, operand, ..
            } => {
                f(*target);
                f(*operand);
            }
            Code::BinArithOp {
                target, lhs, rhs, ..
            }
            | Code::BinListOp {
                target, lhs, rhs, ..
            }
            | Code::BinSetOp {
                target, lhs, rhs, ..
            }
            | Code::BinStringOp {
                target, lhs, rhs, ..
            } => {
                f(*target);
                f(*lhs);
                f(*rhs);
            }
            Code::IndexOf {
                target, src, index, ..
            } => {
                f(*target);
                f(*src);
                f(*index);
            }
            Code::SubList {
                target,
                src,
                start,
                end,
                ..
            }
            | Code::SubString {
                target,
                src,
                start,
                end,
            } => {
                f(*target);
                f(*src);
                f(*start);
                f(*end);
            }
            Code::NewRecord {
                target, operands, ..
            }
            | Code::NewTuple {
                target, operands, ..
            }
            | Code::NewList {
                target, operands, ..
            }
            | Code::NewSet {
                target, operands, ..
            }
            | Code::NewMap {
                target, operands, ..
            }
            | Code::Invoke {
                target, operands, ..
            }
            | Code::Lambda {
                target, operands, ..
            } => {
                f(*target);
                for r in operands {
                    f(*r);
                }
            }
            Code::Update {
                target,
                keys,
                operand,
                ..
            } => {
                f(*target);
                for r in keys {
                    f(*r);
                }
                f(*operand);
            }
            Code::If { lhs, rhs, .. } => {
                f(*lhs);
                f(*rhs);
            }
            Code::IfIs { operand, .. }
            | Code::Switch { operand, .. }
            | Code::TryCatch { operand, .. }
            | Code::Throw { operand, .. }
            | Code::Debug { operand }
            | Code::Return { operand, .. } => f(*operand),
            Code::ForAll { source, index, .. } => {
                f(*source);
                f(*index);
            }
            Code::IndirectInvoke {
                target,
                operand,
                operands,
                ..
            } => {
                f(*target);
                f(*operand);
                for r in operands {
                    f(*r);
                }
            }
            Code::Assert { lhs, rhs, .. } => {
                f(*lhs);
                f(*rhs);
            }
            Code::Goto(_)
            | Code::Label(_)
            | Code::Loop { .. }
            | Code::LoopEnd(_)
            | Code::TryEnd(_)
            | Code::Nop => {}
        }
    }

    /// Rewrite every register through `f`. Null registers pass through
    /// unchanged.
    pub fn remap_regs(&mut self, f: &mut impl FnMut(Reg) -> Reg) {
        let mut g = |r: &mut Reg| {
            if !r.is_null() {
                *r = f(*r);
            }
        };
        match self {
            Code::Const { target, .. } => g(target),
            Code::Assign {
                target, operand, ..
            }
            | Code::Convert {
                target, operand, ..
            }
            | Code::UnArithOp {
                target, operand, ..
            }
            | Code::Invert {
                target, operand, ..
            }
            | Code::LengthOf {
                target, operand, ..
            }
            | Code::FieldLoad {
                target, operand, ..
            }
            | Code::TupleLoad {
                target, operand, ..
            }
            | Code::NewObject {
                target, operand, ..
            }
            | Code::Dereference {
                target, operand, ..
            } => {
                g(target);
                g(operand);
            }
            Code::BinArithOp {
                target, lhs, rhs, ..
            }
            | Code::BinListOp {
                target, lhs, rhs, ..
            }
            | Code::BinSetOp {
                target, lhs, rhs, ..
            }
            | Code::BinStringOp {
                target, lhs, rhs, ..
            } => {
                g(target);
                g(lhs);
                g(rhs);
            }
            Code::IndexOf {
                target, src, index, ..
            } => {
                g(target);
                g(src);
                g(index);
            }
            Code::SubList {
                target,
                src,
                start,
                end,
                ..
            }
            | Code::SubString {
                target,
                src,
                start,
                end,
            } => {
                g(target);
                g(src);
                g(start);
                g(end);
            }
            Code::NewRecord {
                target, operands, ..
            }
            | Code::NewTuple {
                target, operands, ..
            }
            | Code::NewList {
                target, operands, ..
            }
            | Code::NewSet {
                target, operands, ..
            }
            | Code::NewMap {
                target, operands, ..
            }
            | Code::Invoke {
                target, operands, ..
            }
            | Code::Lambda {
                target, operands, ..
            } => {
                g(target);
                for r in operands.iter_mut() {
                    g(r);
                }
            }
            Code::Update {
                target,
                keys,
                operand,
                ..
            } => {
                g(target);
                for r in keys.iter_mut() {
                    g(r);
                }
                g(operand);
            }
            Code::If { lhs, rhs, .. } => {
                g(lhs);
                g(rhs);
            }
            Code::IfIs { operand, .. }
            | Code::Switch { operand, .. }
            | Code::TryCatch { operand, .. }
            | Code::Throw { operand, .. }
            | Code::Debug { operand }
            | Code::Return { operand, .. } => g(operand),
            Code::ForAll { source, index, .. } => {
                g(source);
                g(index);
            }
            Code::IndirectInvoke {
                target,
                operand,
                operands,
                ..
            } => {
                g(target);
                g(operand);
                for r in operands.iter_mut() {
                    g(r);
                }
            }
            Code::Assert { lhs, rhs, .. } => {
                g(lhs);
                g(rhs);
            }
            Code::Goto(_)
            | Code::Label(_)
            | Code::Loop { .. }
            | Code::LoopEnd(_)
            | Code::TryEnd(_)
            | Code::Nop => {}
        }
    }

    /// Rewrite every label through `f` (both definitions and targets).
    pub fn remap_labels(&mut self, f: &mut impl FnMut(Label) -> Label) {
        match self {
            Code::If { target, .. } | Code::IfIs { target, .. } => *target = f(*target),
            Code::Switch {
                default, branches, ..
            } => {
                *default = f(*default);
                for (_, l) in branches.iter_mut() {
                    *l = f(*l);
                }
            }
            Code::Goto(l) | Code::Label(l) | Code::LoopEnd(l) | Code::TryEnd(l) => *l = f(*l),
            Code::Loop { head } | Code::ForAll { head, .. } => *head = f(*head),
            Code::TryCatch { end, catches, .. } => {
                *end = f(*end);
                for (_, l) in catches.iter_mut() {
                    *l = f(*l);
                }
            }
            _ => {}
        }
    }

    /// Visit every label this instruction *branches to* (not definitions).
    pub fn for_each_branch_target(&self, f: &mut impl FnMut(Label)) {
        match self {
            Code::If { target, .. } | Code::IfIs { target, .. } | Code::Goto(target) => f(*target),
            Code::Switch {
                default, branches, ..
            } => {
                f(*default);
                for (_, l) in branches {
                    f(*l);
                }
            }
            Code::TryCatch { end, catches, .. } => {
                f(*end);
                for (_, l) in catches {
                    f(*l);
                }
            }
            _ => {}
        }
    }

    /// The label this instruction *defines* as a position, if any.
    pub fn defined_label(&self) -> Option<Label> {
        match self {
            Code::Label(l) | Code::TryEnd(l) => Some(*l),
            _ => None,
        }
    }
}
