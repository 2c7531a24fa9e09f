//! Expression arena.
//!
//! All expressions of a module live in one contiguous arena and reference
//! each other by [`ExprId`]. The resolver mutates nodes in place through
//! `IndexMut`, replacing abstract kinds with concrete ones while keeping
//! the id (and hence every parent reference) stable.

use std::ops::{Index, IndexMut};

use crate::{Expr, ExprId, ExprKind, Span};

/// Arena of expression nodes.
#[derive(Default, Debug)]
pub struct ExprArena {
    exprs: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        ExprArena { exprs: Vec::new() }
    }

    /// Allocate a new expression, returning its id.
    ///
    /// # Panics
    /// Panics if more than `u32::MAX` expressions are allocated.
    pub fn alloc(&mut self, kind: ExprKind, span: Span) -> ExprId {
        let id = u32::try_from(self.exprs.len()).expect("expression arena overflow");
        self.exprs.push(Expr::new(kind, span));
        ExprId::from_raw(id)
    }

    /// Replace the kind of an existing node, preserving its span and
    /// clearing both type attributes.
    ///
    /// This is the in-place disambiguation rewrite: `IndexOf` becoming
    /// `ListAccess`, an abstract `Invoke` becoming a `FunctionCall`, etc.
    pub fn rewrite(&mut self, id: ExprId, kind: ExprKind) {
        let expr = &mut self.exprs[id.raw() as usize];
        expr.kind = kind;
        expr.ty = crate::TypeId::NONE;
        expr.src_ty = crate::TypeId::NONE;
    }

    pub fn len(&self) -> usize {
        self.exprs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty()
    }
}

impl Index<ExprId> for ExprArena {
    type Output = Expr;

    #[inline]
    fn index(&self, id: ExprId) -> &Expr {
        &self.exprs[id.raw() as usize]
    }
}

impl IndexMut<ExprId> for ExprArena {
    #[inline]
    fn index_mut(&mut self, id: ExprId) -> &mut Expr {
        &mut self.exprs[id.raw() as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Constant, TypeId};

    #[test]
    fn alloc_and_index() {
        let mut arena = ExprArena::new();
        let id = arena.alloc(ExprKind::Constant(Constant::Int(1)), Span::new(0, 1));
        assert!(matches!(arena[id].kind, ExprKind::Constant(_)));
        assert_eq!(arena[id].span, Span::new(0, 1));
        assert!(arena[id].ty.is_none());
    }

    #[test]
    fn rewrite_preserves_span() {
        let mut arena = ExprArena::new();
        let src = arena.alloc(ExprKind::Constant(Constant::Int(1)), Span::new(0, 1));
        let index = arena.alloc(ExprKind::Constant(Constant::Int(0)), Span::new(2, 3));
        let id = arena.alloc(ExprKind::IndexOf { src, index }, Span::new(0, 3));

        arena[id].ty = TypeId::INT;
        arena.rewrite(id, ExprKind::ListAccess { src, index });

        assert!(matches!(arena[id].kind, ExprKind::ListAccess { .. }));
        assert_eq!(arena[id].span, Span::new(0, 3));
        assert!(arena[id].ty.is_none());
    }
}
