//! Condition lowering.
//!
//! `generate_condition(target, cond, ...)` emits instructions such that
//! control transfers to `target` iff the condition is true, and falls
//! through otherwise. Comparisons exist only as conditional branches in
//! the IR, so boolean expressions are built from branch scaffolding;
//! `&&`/`||` short-circuit by construction.

use rill_diagnostic::ErrorCode;
use rill_ir::{
    BinaryOp, Code, CodeBlock, CompKind, Comparator, Constant, ExprArena, ExprId, ExprKind, Label,
    TypeId, UnaryOp,
};
use rill_types::as_effective_collection;

use crate::{Frame, Generator};

type Result<T> = rill_diagnostic::Result<T>;

impl Generator<'_> {
    pub(crate) fn generate_condition(
        &mut self,
        target: Label,
        cond: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = arena[cond].span;
        let attr = self.attr(span);
        match arena[cond].kind.clone() {
            ExprKind::Constant(Constant::Bool(b)) => {
                // Constant conditions allow selectively disabled code:
                // true branches unconditionally, false falls through.
                if b {
                    block.append(Code::Goto(target), attr);
                }
                Ok(())
            }

            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                // Send the underlying condition to a skip label; the fall
                // through then branches to the real target.
                let skip = block.fresh_label();
                self.generate_condition(skip, operand, frame, block, arena)?;
                block.append(Code::Goto(target), attr);
                block.append(Code::Label(skip), attr);
                Ok(())
            }

            ExprKind::Binary { op, lhs, rhs } => {
                self.generate_binary_condition(target, cond, op, lhs, rhs, frame, block, arena)
            }

            ExprKind::Comprehension {
                kind,
                sources,
                condition,
                ..
            } if kind.is_quantifier() => self.generate_quantifier_condition(
                target, cond, kind, &sources, condition, frame, block, arena,
            ),

            // Any other boolean-valued expression: compare its value
            // against true.
            ExprKind::ConstAccess { .. }
            | ExprKind::Constant(_)
            | ExprKind::Local(_)
            | ExprKind::FieldAccess { .. }
            | ExprKind::ListAccess { .. }
            | ExprKind::StringAccess { .. }
            | ExprKind::MapAccess { .. }
            | ExprKind::FunctionCall { .. }
            | ExprKind::MethodCall { .. }
            | ExprKind::IndirectFunctionCall { .. }
            | ExprKind::IndirectMethodCall { .. } => {
                let r1 = self.generate_expr(cond, frame, block, arena)?;
                let r2 = frame.allocate(TypeId::BOOL);
                block.append(
                    Code::Const {
                        target: r2,
                        value: Constant::Bool(true),
                    },
                    attr,
                );
                block.append(
                    Code::If {
                        ty: TypeId::BOOL,
                        lhs: r1,
                        rhs: r2,
                        op: Comparator::Eq,
                        target,
                    },
                    attr,
                );
                Ok(())
            }

            _ => Err(self.syntax_error(ErrorCode::E2008, "invalid boolean expression", span)),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn generate_binary_condition(
        &mut self,
        target: Label,
        cond: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = arena[cond].span;
        let attr = self.attr(span);

        match op {
            BinaryOp::Or => {
                self.generate_condition(target, lhs, frame, block, arena)?;
                self.generate_condition(target, rhs, frame, block, arena)
            }

            BinaryOp::And => {
                let exit = block.fresh_label();
                let inverted = self.invert(lhs, arena);
                self.generate_condition(exit, inverted, frame, block, arena)?;
                self.generate_condition(target, rhs, frame, block, arena)?;
                block.append(Code::Label(exit), attr);
                Ok(())
            }

            BinaryOp::Is => self.generate_type_condition(target, cond, lhs, rhs, frame, block, arena),

            BinaryOp::Xor => {
                // No short-circuit here: both operands always evaluate,
                // and the branch fires when their values disagree.
                let l = self.generate_expr(lhs, frame, block, arena)?;
                let r = self.generate_expr(rhs, frame, block, arena)?;
                block.append(
                    Code::If {
                        ty: TypeId::BOOL,
                        lhs: l,
                        rhs: r,
                        op: Comparator::Neq,
                        target,
                    },
                    attr,
                );
                Ok(())
            }

            _ => {
                let cop = comparator_of(op)
                    .ok_or_else(|| {
                        self.syntax_error(ErrorCode::E2008, "invalid boolean expression", span)
                    })?;

                let rhs_is_null =
                    matches!(&arena[rhs].kind, ExprKind::Constant(c) if c.is_null());
                let lhs_local = matches!(arena[lhs].kind, ExprKind::Local(_));

                if cop == Comparator::Eq && lhs_local && rhs_is_null {
                    // `x == null` branches on the type test directly so the
                    // lowered IR preserves the refinement knowledge.
                    let ExprKind::Local(name) = arena[lhs].kind else {
                        unreachable!()
                    };
                    let slot = self.local_register(name, frame, arena[lhs].span)?;
                    block.append(
                        Code::IfIs {
                            ty: arena[cond].src_ty,
                            operand: slot,
                            test: TypeId::NULL,
                            target,
                        },
                        attr,
                    );
                    Ok(())
                } else if cop == Comparator::Neq && lhs_local && rhs_is_null {
                    // `x != null`: the inverse via a two-branch scheme.
                    let ExprKind::Local(name) = arena[lhs].kind else {
                        unreachable!()
                    };
                    let exit = block.fresh_label();
                    let slot = self.local_register(name, frame, arena[lhs].span)?;
                    block.append(
                        Code::IfIs {
                            ty: arena[cond].src_ty,
                            operand: slot,
                            test: TypeId::NULL,
                            target: exit,
                        },
                        attr,
                    );
                    block.append(Code::Goto(target), attr);
                    block.append(Code::Label(exit), attr);
                    Ok(())
                } else {
                    let l = self.generate_expr(lhs, frame, block, arena)?;
                    let r = self.generate_expr(rhs, frame, block, arena)?;
                    block.append(
                        Code::If {
                            ty: arena[cond].src_ty,
                            lhs: l,
                            rhs: r,
                            op: cop,
                            target,
                        },
                        attr,
                    );
                    Ok(())
                }
            }
        }
    }

    /// Runtime type test `x is T`. When the lhs is a local variable the
    /// test must run on the variable's own register, since the branch
    /// retypes that variable.
    #[allow(clippy::too_many_arguments)]
    fn generate_type_condition(
        &mut self,
        target: Label,
        cond: ExprId,
        lhs: ExprId,
        rhs: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = arena[cond].span;
        let attr = self.attr(span);

        let operand = if let ExprKind::Local(name) = arena[lhs].kind {
            self.local_register(name, frame, arena[lhs].span)?
        } else {
            self.generate_expr(lhs, frame, block, arena)?
        };

        let ExprKind::TypeVal(test) = arena[rhs].kind else {
            return Err(self.internal_failure("type test without a type value", span));
        };

        block.append(
            Code::IfIs {
                ty: arena[cond].src_ty,
                operand,
                test,
                target,
            },
            attr,
        );
        Ok(())
    }

    /// Quantifier condition: nested for-all loops over the sources with
    /// the branch sense chosen per quantifier kind.
    #[allow(clippy::too_many_arguments)]
    fn generate_quantifier_condition(
        &mut self,
        target: Label,
        cond: ExprId,
        kind: CompKind,
        sources: &[(rill_ir::Name, ExprId)],
        condition: Option<ExprId>,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = arena[cond].span;
        let attr = self.attr(span);
        let condition = condition
            .ok_or_else(|| self.internal_failure("quantifier without a condition", span))?;

        let slots = self.generate_quantifier_sources(sources, frame, block, arena)?;

        let mut labels = Vec::with_capacity(slots.len());
        for (var_slot, src_slot, coll_ty) in slots {
            let head = block.fresh_label();
            block.append(
                Code::ForAll {
                    ty: coll_ty,
                    source: src_slot,
                    index: var_slot,
                    head,
                },
                attr,
            );
            labels.push(head);
        }

        match kind {
            CompKind::None => {
                // Any hit escapes to the non-target path.
                let exit = block.fresh_label();
                self.generate_condition(exit, condition, frame, block, arena)?;
                self.close_loops(&labels, block, attr);
                block.append(Code::Goto(target), attr);
                block.append(Code::Label(exit), attr);
            }
            CompKind::Some => {
                self.generate_condition(target, condition, frame, block, arena)?;
                self.close_loops(&labels, block, attr);
            }
            CompKind::All => {
                // A counterexample escapes; falling out of the loops means
                // every binding satisfied the condition.
                let exit = block.fresh_label();
                let inverted = self.invert(condition, arena);
                self.generate_condition(exit, inverted, frame, block, arena)?;
                self.close_loops(&labels, block, attr);
                block.append(Code::Goto(target), attr);
                block.append(Code::Label(exit), attr);
            }
            CompKind::ListComp | CompKind::SetComp => {
                return Err(self.internal_failure("non-boolean comprehension as condition", span));
            }
        }
        Ok(())
    }

    /// Evaluate quantifier/comprehension sources, allocating the bound
    /// variable register for each. Returns `(var, source, collection type)`
    /// triples.
    pub(crate) fn generate_quantifier_sources(
        &mut self,
        sources: &[(rill_ir::Name, ExprId)],
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Vec<(rill_ir::Reg, rill_ir::Reg, TypeId)>> {
        let mut slots = Vec::with_capacity(sources.len());
        for &(var, src) in sources {
            let src_ty = arena[src].ty;
            let coll = as_effective_collection(self.pool, self.nominals, src_ty)
                .ok_or_else(|| {
                    self.internal_failure("quantifier over a non-collection", arena[src].span)
                })?;
            let var_slot = frame.allocate_named(coll.elem, var);

            // Iterating a variable reuses its register rather than
            // copying the whole collection.
            let src_slot = match arena[src].kind {
                ExprKind::Local(name) => match frame.get(name) {
                    Some(reg) => reg,
                    None => self.generate_expr(src, frame, block, arena)?,
                },
                _ => self.generate_expr(src, frame, block, arena)?,
            };
            slots.push((var_slot, src_slot, coll.raw));
        }
        Ok(slots)
    }

    pub(crate) fn close_loops(
        &self,
        labels: &[Label],
        block: &mut CodeBlock,
        attr: rill_ir::SourceAttr,
    ) {
        for &head in labels.iter().rev() {
            // Nop keeps labels at the region boundary addressable.
            block.append(Code::Nop, attr);
            block.append(Code::LoopEnd(head), attr);
        }
    }

    /// Syntactic negation: De Morgan on the connectives, flipped
    /// comparisons, peeled double negation; anything else wraps in `!`.
    /// New nodes preserve the source span and operand type.
    pub(crate) fn invert(&mut self, e: ExprId, arena: &mut ExprArena) -> ExprId {
        let span = arena[e].span;
        let src_ty = arena[e].src_ty;

        let inverted = match arena[e].kind.clone() {
            ExprKind::Binary { op, lhs, rhs } => {
                let flipped = match op {
                    BinaryOp::And => {
                        let l = self.invert(lhs, arena);
                        let r = self.invert(rhs, arena);
                        Some(ExprKind::Binary {
                            op: BinaryOp::Or,
                            lhs: l,
                            rhs: r,
                        })
                    }
                    BinaryOp::Or => {
                        let l = self.invert(lhs, arena);
                        let r = self.invert(rhs, arena);
                        Some(ExprKind::Binary {
                            op: BinaryOp::And,
                            lhs: l,
                            rhs: r,
                        })
                    }
                    BinaryOp::Eq => Some(ExprKind::Binary {
                        op: BinaryOp::NotEq,
                        lhs,
                        rhs,
                    }),
                    BinaryOp::NotEq => Some(ExprKind::Binary {
                        op: BinaryOp::Eq,
                        lhs,
                        rhs,
                    }),
                    BinaryOp::Lt => Some(ExprKind::Binary {
                        op: BinaryOp::GtEq,
                        lhs,
                        rhs,
                    }),
                    BinaryOp::LtEq => Some(ExprKind::Binary {
                        op: BinaryOp::Gt,
                        lhs,
                        rhs,
                    }),
                    BinaryOp::Gt => Some(ExprKind::Binary {
                        op: BinaryOp::LtEq,
                        lhs,
                        rhs,
                    }),
                    BinaryOp::GtEq => Some(ExprKind::Binary {
                        op: BinaryOp::Lt,
                        lhs,
                        rhs,
                    }),
                    _ => None,
                };
                flipped
            }
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => return operand,
            _ => None,
        };

        match inverted {
            Some(kind) => {
                let id = arena.alloc(kind, span);
                arena[id].ty = TypeId::BOOL;
                arena[id].src_ty = src_ty;
                id
            }
            None => {
                let id = arena.alloc(
                    ExprKind::Unary {
                        op: UnaryOp::Not,
                        operand: e,
                    },
                    span,
                );
                arena[id].ty = TypeId::BOOL;
                id
            }
        }
    }
}

fn comparator_of(op: BinaryOp) -> Option<Comparator> {
    match op {
        BinaryOp::Eq => Some(Comparator::Eq),
        BinaryOp::NotEq => Some(Comparator::Neq),
        BinaryOp::Lt => Some(Comparator::Lt),
        BinaryOp::LtEq => Some(Comparator::LtEq),
        BinaryOp::Gt => Some(Comparator::Gt),
        BinaryOp::GtEq => Some(Comparator::GtEq),
        BinaryOp::Subset => Some(Comparator::Subset),
        BinaryOp::SubsetEq => Some(Comparator::SubsetEq),
        BinaryOp::ElementOf => Some(Comparator::ElemOf),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use rill_ir::{
        BinaryOp, Constant, ExprArena, ExprKind, Module, Span, StringInterner, UnaryOp,
    };
    use rill_types::{NominalTable, Pool};

    use crate::Generator;

    #[test]
    fn inverting_twice_restores_comparisons_and_connectives() {
        let interner = StringInterner::new();
        let mut pool = Pool::new();
        let nominals = NominalTable::new();
        let module = Module {
            name: interner.intern("test"),
            file: interner.intern("test.rl"),
            decls: Vec::new(),
        };
        let mut arena = ExprArena::new();

        let a = arena.alloc(ExprKind::Constant(Constant::Int(1)), Span::DUMMY);
        let b = arena.alloc(ExprKind::Constant(Constant::Int(2)), Span::DUMMY);
        let lt = arena.alloc(
            ExprKind::Binary {
                op: BinaryOp::Lt,
                lhs: a,
                rhs: b,
            },
            Span::DUMMY,
        );
        let c = arena.alloc(ExprKind::Constant(Constant::Bool(true)), Span::DUMMY);
        let and = arena.alloc(
            ExprKind::Binary {
                op: BinaryOp::And,
                lhs: lt,
                rhs: c,
            },
            Span::DUMMY,
        );

        let mut generator = Generator::new(&mut pool, &interner, &nominals, &module);

        // A comparison flips and flips back.
        let once = generator.invert(lt, &mut arena);
        assert!(matches!(
            arena[once].kind,
            ExprKind::Binary { op: BinaryOp::GtEq, .. }
        ));
        let twice = generator.invert(once, &mut arena);
        assert!(matches!(
            arena[twice].kind,
            ExprKind::Binary { op: BinaryOp::Lt, lhs, rhs } if lhs == a && rhs == b
        ));

        // De Morgan on the connectives.
        let n_and = generator.invert(and, &mut arena);
        let ExprKind::Binary {
            op: BinaryOp::Or,
            lhs: nl,
            ..
        } = arena[n_and].kind
        else {
            panic!("expected a disjunction");
        };
        assert!(matches!(
            arena[nl].kind,
            ExprKind::Binary { op: BinaryOp::GtEq, .. }
        ));

        // `!e` peels rather than double-wrapping.
        let wrapped = generator.invert(c, &mut arena);
        assert!(matches!(
            arena[wrapped].kind,
            ExprKind::Unary { op: UnaryOp::Not, operand } if operand == c
        ));
        let peeled = generator.invert(wrapped, &mut arena);
        assert_eq!(peeled, c);
    }
}
