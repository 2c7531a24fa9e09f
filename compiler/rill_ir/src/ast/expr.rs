//! Expression nodes.
//!
//! Expressions live in an [`ExprArena`](crate::ExprArena) and reference each
//! other by `ExprId`. Each node carries two mutable type attributes filled by
//! the resolver: `ty` (the result type) and `src_ty` (an operand or source
//! type some lowerings need, e.g. the collection type of an index access or
//! the signature of a call).
//!
//! Several kinds are *abstract*: the parser cannot tell a list index from a
//! map lookup, or a direct call from an indirect one. The resolver rewrites
//! abstract kinds in place into their concrete counterparts, preserving the
//! span.

use std::fmt;

use super::ops::{BinaryOp, CompKind, UnaryOp};
use crate::{Constant, Name, QName, Span, TypeId};

/// Index of an expression in its arena.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct ExprId(u32);

impl ExprId {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

/// Expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Result type, `TypeId::NONE` until resolved.
    pub ty: TypeId,
    /// Source/operand type used by some lowerings, `TypeId::NONE` if unused.
    ///
    /// - comparisons: the common operand type fed to the `If` instruction
    /// - index/length/field/slice accesses: the (expanded) collection type
    /// - calls: the full function or method signature
    /// - dereference: the reference type
    pub src_ty: TypeId,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Expr {
            kind,
            span,
            ty: TypeId::NONE,
            src_ty: TypeId::NONE,
        }
    }
}

/// Expression variants.
#[derive(Clone, Debug)]
pub enum ExprKind {
    /// Literal constant.
    Constant(Constant),

    /// Unresolved name (abstract). The resolver rewrites this to `Local`,
    /// `ConstAccess` or `ModuleAccess`.
    Variable(Name),

    /// Resolved local variable.
    Local(Name),

    /// Resolved global constant access; `value` is filled by the resolver.
    ConstAccess {
        module: Option<Name>,
        name: Name,
        value: Option<Constant>,
    },

    /// Resolved module reference (only legal as a call or access qualifier).
    ModuleAccess(Name),

    /// Type value, the right-hand side of `x is T`.
    TypeVal(TypeId),

    Unary {
        op: UnaryOp,
        operand: ExprId,
    },

    Binary {
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
    },

    /// Record literal; field order is as written, sorted at lowering.
    RecordLit(Vec<(Name, ExprId)>),
    TupleLit(Vec<ExprId>),
    ListLit(Vec<ExprId>),
    SetLit(Vec<ExprId>),
    MapLit(Vec<(ExprId, ExprId)>),

    /// Dot access whose meaning is not yet known (abstract): record field,
    /// constant in a module, or module in a package.
    Access {
        src: ExprId,
        field: Name,
    },

    /// Resolved record field access.
    FieldAccess {
        src: ExprId,
        field: Name,
    },

    /// Index access whose collection kind is not yet known (abstract).
    IndexOf {
        src: ExprId,
        index: ExprId,
    },
    ListAccess {
        src: ExprId,
        index: ExprId,
    },
    StringAccess {
        src: ExprId,
        index: ExprId,
    },
    MapAccess {
        src: ExprId,
        index: ExprId,
    },

    /// Slice whose collection kind is not yet known (abstract).
    SubRange {
        src: ExprId,
        start: ExprId,
        end: ExprId,
    },
    SubList {
        src: ExprId,
        start: ExprId,
        end: ExprId,
    },
    SubString {
        src: ExprId,
        start: ExprId,
        end: ExprId,
    },

    /// Length whose collection kind is not yet known (abstract).
    LengthOf(ExprId),
    ListLength(ExprId),
    SetLength(ExprId),
    StringLength(ExprId),
    MapLength(ExprId),

    /// Explicit cast `(T) e`.
    Cast {
        ty: TypeId,
        operand: ExprId,
    },

    /// Reference allocation `new e`.
    New(ExprId),

    /// Dereference `*e`.
    Dereference(ExprId),

    /// Function or method reference `&f`, optionally parameter-qualified
    /// to pick an overload.
    FunctionRef {
        module: Option<Name>,
        name: Name,
        params: Option<Vec<TypeId>>,
    },

    /// Call whose target kind is not yet known (abstract): direct,
    /// indirect via a local, or indirect via a record field.
    Invoke {
        receiver: Option<ExprId>,
        name: Name,
        args: Vec<ExprId>,
    },

    /// Resolved direct function call.
    FunctionCall {
        name: QName,
        args: Vec<ExprId>,
    },
    /// Resolved direct method call.
    MethodCall {
        name: QName,
        args: Vec<ExprId>,
    },
    /// Resolved indirect call through a function-typed value.
    IndirectFunctionCall {
        src: ExprId,
        args: Vec<ExprId>,
    },
    /// Resolved indirect call through a method-typed value.
    IndirectMethodCall {
        src: ExprId,
        args: Vec<ExprId>,
    },

    /// Lambda literal. Captured free variables are discovered at lowering.
    Lambda {
        params: Vec<(Name, TypeId)>,
        body: ExprId,
    },

    /// Quantifier or list/set comprehension over one or more sources.
    Comprehension {
        kind: CompKind,
        sources: Vec<(Name, ExprId)>,
        condition: Option<ExprId>,
        /// Yielded value; `None` for quantifiers.
        value: Option<ExprId>,
    },
}

impl ExprKind {
    /// True for the abstract kinds the resolver must rewrite before
    /// code generation.
    pub fn is_abstract(&self) -> bool {
        matches!(
            self,
            ExprKind::Variable(_)
                | ExprKind::Access { .. }
                | ExprKind::IndexOf { .. }
                | ExprKind::SubRange { .. }
                | ExprKind::LengthOf(_)
                | ExprKind::Invoke { .. }
        )
    }
}
