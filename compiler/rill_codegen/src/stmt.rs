//! Statement lowering.
//!
//! Structured statements become labelled goto graphs. Switch and try-catch
//! reserve their position in the instruction stream and insert the
//! dispatch instruction once every case label is known.

use rustc_hash::FxHashSet;

use rill_diagnostic::ErrorCode;
use rill_ir::{
    BinaryOp, Code, CodeBlock, Constant, ExprArena, ExprId, ExprKind, Name, Reg, Stmt, StmtKind,
    TypeId, UnArithKind,
};
use rill_types::as_effective_collection;

use crate::{BreakScope, FnCtx, Frame, Generator};

type Result<T> = rill_diagnostic::Result<T>;

impl Generator<'_> {
    pub(crate) fn generate_stmt(
        &mut self,
        stmt: &Stmt,
        ctx: &FnCtx,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = stmt.span;
        let attr = self.attr(span);
        match &stmt.kind {
            StmtKind::VarDecl { pattern, ty, init } => {
                let root = frame.allocate(*ty);
                match init {
                    Some(init) => {
                        let operand = self.generate_expr(*init, frame, block, arena)?;
                        block.append(
                            Code::Assign {
                                ty: arena[*init].ty,
                                target: root,
                                operand,
                            },
                            attr,
                        );
                        self.add_declared_variables(
                            root,
                            pattern,
                            *ty,
                            frame,
                            Some(block),
                            span,
                        )
                    }
                    None => {
                        // No initializer: allocate and bind, but emit no
                        // destructuring code.
                        self.add_declared_variables(root, pattern, *ty, frame, None, span)
                    }
                }
            }

            StmtKind::Assign { lhs, rhs } => self.generate_assign(*lhs, *rhs, frame, block, arena),

            StmtKind::Assert { cond } => {
                let cond = *cond;
                self.generate_check(cond, "assertion failed", frame, block, arena)
            }

            // Assumptions are discharged statically; at runtime they are
            // inert.
            StmtKind::Assume { .. } | StmtKind::Skip => {
                block.append(Code::Nop, attr);
                Ok(())
            }

            StmtKind::Return { expr } => {
                match expr {
                    Some(e) => {
                        let operand = self.generate_expr(*e, frame, block, arena)?;
                        // The declared return type, not the inferred one:
                        // this is the implicit coercion point.
                        block.append(
                            Code::Return {
                                ty: ctx.ret,
                                operand,
                            },
                            attr,
                        );
                    }
                    None => block.append(Code::ret(), attr),
                }
                Ok(())
            }

            StmtKind::Debug { expr } => {
                let operand = self.generate_expr(*expr, frame, block, arena)?;
                block.append(Code::Debug { operand }, attr);
                Ok(())
            }

            StmtKind::Throw { expr } => {
                let operand = self.generate_expr(*expr, frame, block, arena)?;
                block.append(
                    Code::Throw {
                        ty: arena[*expr].ty,
                        operand,
                    },
                    attr,
                );
                Ok(())
            }

            StmtKind::Break => {
                let label = self.enclosing_break().ok_or_else(|| {
                    self.syntax_error(ErrorCode::E3001, "break outside of a loop", span)
                })?;
                block.append(Code::Goto(label), attr);
                Ok(())
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let false_lab = block.fresh_label();
                let exit_lab = if else_branch.is_empty() {
                    false_lab
                } else {
                    block.fresh_label()
                };

                let inverted = self.invert(*cond, arena);
                self.generate_condition(false_lab, inverted, frame, block, arena)?;

                for st in then_branch {
                    self.generate_stmt(st, ctx, frame, block, arena)?;
                }
                if !else_branch.is_empty() {
                    block.append(Code::Goto(exit_lab), attr);
                    block.append(Code::Label(false_lab), attr);
                    for st in else_branch {
                        self.generate_stmt(st, ctx, frame, block, arena)?;
                    }
                }
                block.append(Code::Label(exit_lab), attr);
                Ok(())
            }

            StmtKind::While { cond, body } => {
                let head = block.fresh_label();
                let exit = block.fresh_label();

                block.append(Code::Loop { head }, attr);
                let inverted = self.invert(*cond, arena);
                self.generate_condition(exit, inverted, frame, block, arena)?;

                self.scopes.push(BreakScope { label: exit });
                for st in body {
                    self.generate_stmt(st, ctx, frame, block, arena)?;
                }
                self.scopes.pop();

                // Nop keeps labels at the region boundary addressable.
                block.append(Code::Nop, attr);
                block.append(Code::LoopEnd(head), attr);
                block.append(Code::Label(exit), attr);
                Ok(())
            }

            StmtKind::DoWhile { cond, body } => {
                let head = block.fresh_label();
                let exit = block.fresh_label();

                block.append(Code::Loop { head }, attr);

                self.scopes.push(BreakScope { label: exit });
                for st in body {
                    self.generate_stmt(st, ctx, frame, block, arena)?;
                }
                self.scopes.pop();

                let inverted = self.invert(*cond, arena);
                self.generate_condition(exit, inverted, frame, block, arena)?;

                block.append(Code::Nop, attr);
                block.append(Code::LoopEnd(head), attr);
                block.append(Code::Label(exit), attr);
                Ok(())
            }

            StmtKind::ForAll { vars, source, body } => {
                let head = block.fresh_label();
                let exit = block.fresh_label();

                let src_reg = self.generate_expr(*source, frame, block, arena)?;
                let src_ty = arena[*source].ty;
                let coll = as_effective_collection(self.pool, self.nominals, src_ty)
                    .ok_or_else(|| {
                        self.internal_failure("for-all over a non-collection", span)
                    })?;

                if vars.len() > 1 {
                    // Destructuring form; the resolver admits it only for
                    // map sources.
                    let Some((key, value)) = coll.map else {
                        return Err(self.syntax_error(
                            ErrorCode::E2011,
                            "invalid map expression",
                            span,
                        ));
                    };
                    let element = coll.elem;
                    let index = frame.allocate(element);
                    block.append(
                        Code::ForAll {
                            ty: coll.raw,
                            source: src_reg,
                            index,
                            head,
                        },
                        attr,
                    );
                    for (i, (&var, elem_ty)) in vars.iter().zip([key, value]).enumerate() {
                        let target = frame.allocate_named(elem_ty, var);
                        block.append(
                            Code::TupleLoad {
                                ty: element,
                                target,
                                operand: index,
                                index: i as u32,
                            },
                            attr,
                        );
                    }
                } else {
                    let index = frame.allocate_named(coll.elem, vars[0]);
                    block.append(
                        Code::ForAll {
                            ty: coll.raw,
                            source: src_reg,
                            index,
                            head,
                        },
                        attr,
                    );
                }

                self.scopes.push(BreakScope { label: exit });
                for st in body {
                    self.generate_stmt(st, ctx, frame, block, arena)?;
                }
                self.scopes.pop();

                block.append(Code::Nop, attr);
                block.append(Code::LoopEnd(head), attr);
                block.append(Code::Label(exit), attr);
                Ok(())
            }

            StmtKind::Switch { expr, cases } => {
                let exit = block.fresh_label();
                let operand = self.generate_expr(*expr, frame, block, arena)?;
                let mut default_target = exit;
                let mut values: FxHashSet<Constant> = FxHashSet::default();
                let mut branches: Vec<(Constant, rill_ir::Label)> = Vec::new();
                // The dispatch instruction is inserted here once all case
                // labels are known.
                let start = block.len();

                for case in cases {
                    let case_attr = self.attr(case.span);
                    if case.constants.is_empty() {
                        // The default label; only one is allowed.
                        if default_target != exit {
                            return Err(self.syntax_error(
                                ErrorCode::E3003,
                                "duplicate default label",
                                case.span,
                            ));
                        }
                        default_target = block.fresh_label();
                        block.append(Code::Label(default_target), case_attr);
                        for st in &case.body {
                            self.generate_stmt(st, ctx, frame, block, arena)?;
                        }
                        block.append(Code::Goto(exit), case_attr);
                    } else if default_target == exit {
                        let target = block.fresh_label();
                        block.append(Code::Label(target), case_attr);
                        for c in &case.constants {
                            if !values.insert(c.clone()) {
                                return Err(self.syntax_error(
                                    ErrorCode::E3002,
                                    "duplicate case label",
                                    case.span,
                                ));
                            }
                            branches.push((c.clone(), target));
                        }
                        for st in &case.body {
                            self.generate_stmt(st, ctx, frame, block, arena)?;
                        }
                        block.append(Code::Goto(exit), case_attr);
                    } else {
                        // A non-default case after the default can never
                        // execute.
                        return Err(self.syntax_error(
                            ErrorCode::E3004,
                            "unreachable code",
                            case.span,
                        ));
                    }
                }

                block.insert(
                    start,
                    Code::Switch {
                        ty: arena[*expr].ty,
                        operand,
                        default: default_target,
                        branches,
                    },
                    attr,
                );
                block.append(Code::Label(exit), attr);
                Ok(())
            }

            StmtKind::TryCatch { body, catches } => {
                if catches.is_empty() {
                    for st in body {
                        self.generate_stmt(st, ctx, frame, block, arena)?;
                    }
                    return Ok(());
                }

                let start = block.len();
                let exc = frame.allocate(TypeId::ANY);
                let exit = block.fresh_label();

                for st in body {
                    self.generate_stmt(st, ctx, frame, block, arena)?;
                }
                block.append(Code::Goto(exit), attr);

                let mut end_lab = None;
                let mut handlers = Vec::with_capacity(catches.len());
                for catch in catches {
                    let catch_attr = self.attr(catch.span);
                    let lab = block.fresh_label();
                    if end_lab.is_none() {
                        // The first handler's marker doubles as the end of
                        // the try region.
                        end_lab = Some(lab);
                        block.append(Code::TryEnd(lab), catch_attr);
                    } else {
                        block.append(Code::Label(lab), catch_attr);
                    }
                    handlers.push((catch.ty, lab));
                    frame.bind(catch.var, exc);
                    for st in &catch.body {
                        self.generate_stmt(st, ctx, frame, block, arena)?;
                    }
                    block.append(Code::Goto(exit), catch_attr);
                }

                let end = end_lab.expect("at least one catch handler");
                block.insert(
                    start,
                    Code::TryCatch {
                        operand: exc,
                        end,
                        catches: handlers,
                    },
                    attr,
                );
                block.append(Code::Label(exit), attr);
                Ok(())
            }

            StmtKind::Expr { expr } => {
                let expr = *expr;
                match &arena[expr].kind {
                    ExprKind::FunctionCall { .. }
                    | ExprKind::MethodCall { .. }
                    | ExprKind::IndirectFunctionCall { .. }
                    | ExprKind::IndirectMethodCall { .. } => {
                        self.generate_call(expr, Reg::NULL, frame, block, arena)?;
                    }
                    _ => {
                        // Anything else in statement position is evaluated
                        // for its effects and the result discarded.
                        self.generate_expr(expr, frame, block, arena)?;
                    }
                }
                Ok(())
            }
        }
    }

    fn generate_assign(
        &mut self,
        lhs: ExprId,
        rhs: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = arena[lhs].span.merge(arena[rhs].span);
        let attr = self.attr(span);

        // The right-hand side is evaluated once, up front.
        let operand = self.generate_expr(rhs, frame, block, arena)?;

        match arena[lhs].kind.clone() {
            ExprKind::Local(name) => {
                let target = self.local_register(name, frame, arena[lhs].span)?;
                block.append(
                    Code::Assign {
                        ty: arena[rhs].ty,
                        target,
                        operand,
                    },
                    attr,
                );
                Ok(())
            }

            // Rational destructuring `n / d = e`.
            ExprKind::Binary {
                op: BinaryOp::Div,
                lhs: num,
                rhs: den,
            } => {
                let rhs_ty = arena[rhs].ty;
                for (part, kind) in [(num, UnArithKind::Numerator), (den, UnArithKind::Denominator)]
                {
                    let ExprKind::Local(name) = arena[part].kind else {
                        return Err(self.syntax_error(
                            ErrorCode::E3005,
                            "invalid assignment target",
                            arena[part].span,
                        ));
                    };
                    let target = self.local_register(name, frame, arena[part].span)?;
                    block.append(
                        Code::UnArithOp {
                            ty: rhs_ty,
                            kind,
                            target,
                            operand,
                        },
                        attr,
                    );
                }
                Ok(())
            }

            // Tuple destructuring `x, y = e`.
            ExprKind::TupleLit(elems) => {
                let tuple_ty = arena[lhs].ty;
                for (i, part) in elems.iter().enumerate() {
                    let ExprKind::Local(name) = arena[*part].kind else {
                        return Err(self.syntax_error(
                            ErrorCode::E3005,
                            "invalid assignment target",
                            arena[*part].span,
                        ));
                    };
                    let target = self.local_register(name, frame, arena[*part].span)?;
                    block.append(
                        Code::TupleLoad {
                            ty: tuple_ty,
                            target,
                            operand,
                            index: i as u32,
                        },
                        attr,
                    );
                }
                Ok(())
            }

            // Path assignment: a single deep update on the base variable.
            ExprKind::FieldAccess { .. }
            | ExprKind::ListAccess { .. }
            | ExprKind::StringAccess { .. }
            | ExprKind::MapAccess { .. }
            | ExprKind::IndexOf { .. }
            | ExprKind::Dereference(_) => {
                let mut fields = Vec::new();
                let mut keys = rill_ir::Regs::new();
                let base = self.extract_lval(lhs, &mut fields, &mut keys, frame, block, arena)?;
                let target = self.local_register(base, frame, arena[lhs].span)?;
                let base_ty = frame.type_of(target);
                block.append(
                    Code::Update {
                        ty: base_ty,
                        target,
                        keys,
                        operand,
                        after_ty: base_ty,
                        fields,
                    },
                    attr,
                );
                Ok(())
            }

            _ => Err(self.syntax_error(ErrorCode::E3005, "invalid assignment target", span)),
        }
    }

    /// Recurse down a complex lval collecting the field path and the
    /// pre-computed index registers, returning the base variable.
    fn extract_lval(
        &mut self,
        e: ExprId,
        fields: &mut Vec<Name>,
        keys: &mut rill_ir::Regs,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Name> {
        match arena[e].kind.clone() {
            ExprKind::Local(name) => Ok(name),
            ExprKind::Dereference(src) => {
                self.extract_lval(src, fields, keys, frame, block, arena)
            }
            ExprKind::ListAccess { src, index }
            | ExprKind::StringAccess { src, index }
            | ExprKind::MapAccess { src, index }
            | ExprKind::IndexOf { src, index } => {
                let operand = self.generate_expr(index, frame, block, arena)?;
                let base = self.extract_lval(src, fields, keys, frame, block, arena)?;
                keys.push(operand);
                Ok(base)
            }
            ExprKind::FieldAccess { src, field } => {
                let base = self.extract_lval(src, fields, keys, frame, block, arena)?;
                fields.push(field);
                Ok(base)
            }
            _ => Err(self.syntax_error(
                ErrorCode::E3005,
                "invalid assignment target",
                arena[e].span,
            )),
        }
    }

    pub(crate) fn local_register(
        &self,
        name: Name,
        frame: &Frame,
        span: rill_ir::Span,
    ) -> Result<Reg> {
        frame.get(name).ok_or_else(|| {
            self.syntax_error(
                ErrorCode::E3006,
                format!(
                    "variable '{}' may be uninitialized",
                    self.interner.resolve(name)
                ),
                span,
            )
        })
    }
}
