//! Expression lowering.
//!
//! Every generator returns the register holding its result. Local
//! variables are copied into fresh registers rather than returned
//! directly, so downstream rewrites never alias a named register.

use smallvec::SmallVec;

use rill_diagnostic::ErrorCode;
use rill_ir::{
    BinArithKind, BinListKind, BinSetKind, BinStringKind, BinaryOp, Code, CodeBlock, CompKind,
    Constant, ExprArena, ExprId, ExprKind, IrFunction, Name, Reg, Regs, TypeId, UnArithKind,
    UnaryOp,
};
use rill_types::Tag;

use crate::{Frame, Generator};

type Result<T> = rill_diagnostic::Result<T>;

impl Generator<'_> {
    pub(crate) fn generate_expr(
        &mut self,
        id: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Reg> {
        let span = arena[id].span;
        let attr = self.attr(span);
        let result_ty = arena[id].ty;

        match arena[id].kind.clone() {
            ExprKind::Constant(value) => {
                let target = frame.allocate(value.ty());
                block.append(Code::Const { target, value }, attr);
                Ok(target)
            }

            ExprKind::ConstAccess { value, .. } => {
                let value = value
                    .ok_or_else(|| self.internal_failure("unresolved constant access", span))?;
                let target = frame.allocate(value.ty());
                block.append(Code::Const { target, value }, attr);
                Ok(target)
            }

            ExprKind::Local(name) => {
                let operand = self.local_register(name, frame, span)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::Assign {
                        ty: result_ty,
                        target,
                        operand,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::Unary { op, operand } => match op {
                UnaryOp::Neg => {
                    let src = self.generate_expr(operand, frame, block, arena)?;
                    let target = frame.allocate(result_ty);
                    block.append(
                        Code::UnArithOp {
                            ty: result_ty,
                            kind: UnArithKind::Neg,
                            target,
                            operand: src,
                        },
                        attr,
                    );
                    Ok(target)
                }
                UnaryOp::Invert => {
                    let src = self.generate_expr(operand, frame, block, arena)?;
                    let target = frame.allocate(result_ty);
                    block.append(
                        Code::Invert {
                            ty: result_ty,
                            target,
                            operand: src,
                        },
                        attr,
                    );
                    Ok(target)
                }
                UnaryOp::Not => {
                    // Materialize through branches: if the operand holds,
                    // the result is false.
                    let false_lab = block.fresh_label();
                    let exit_lab = block.fresh_label();
                    let target = frame.allocate(TypeId::BOOL);
                    self.generate_condition(false_lab, operand, frame, block, arena)?;
                    block.append(
                        Code::Const {
                            target,
                            value: Constant::Bool(true),
                        },
                        attr,
                    );
                    block.append(Code::Goto(exit_lab), attr);
                    block.append(Code::Label(false_lab), attr);
                    block.append(
                        Code::Const {
                            target,
                            value: Constant::Bool(false),
                        },
                        attr,
                    );
                    block.append(Code::Label(exit_lab), attr);
                    Ok(target)
                }
            },

            ExprKind::Binary { op, lhs, rhs } => {
                self.generate_binary(id, op, lhs, rhs, frame, block, arena)
            }

            ExprKind::RecordLit(fields) => {
                // Fields are evaluated in sorted field-name order, the
                // same order the record type stores them.
                let mut sorted = fields;
                sorted.sort_by(|a, b| self.interner.cmp_names(a.0, b.0));
                let mut operands = Regs::new();
                for (_, value) in &sorted {
                    operands.push(self.generate_expr(*value, frame, block, arena)?);
                }
                let target = frame.allocate(result_ty);
                block.append(
                    Code::NewRecord {
                        ty: result_ty,
                        target,
                        operands,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::TupleLit(elems) => {
                let operands = self.generate_operands(&elems, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::NewTuple {
                        ty: result_ty,
                        target,
                        operands,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::ListLit(elems) => {
                let operands = self.generate_operands(&elems, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::NewList {
                        ty: result_ty,
                        target,
                        operands,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::SetLit(elems) => {
                let operands = self.generate_operands(&elems, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::NewSet {
                        ty: result_ty,
                        target,
                        operands,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::MapLit(pairs) => {
                // Key/value pairs lay out as alternating operands.
                let mut operands = Regs::new();
                for (k, v) in &pairs {
                    operands.push(self.generate_expr(*k, frame, block, arena)?);
                    operands.push(self.generate_expr(*v, frame, block, arena)?);
                }
                let target = frame.allocate(result_ty);
                block.append(
                    Code::NewMap {
                        ty: result_ty,
                        target,
                        operands,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::FieldAccess { src, field } => {
                let operand = self.generate_expr(src, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::FieldLoad {
                        ty: arena[id].src_ty,
                        target,
                        operand,
                        field,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::ListAccess { src, index }
            | ExprKind::StringAccess { src, index }
            | ExprKind::MapAccess { src, index } => {
                let src_reg = self.generate_expr(src, frame, block, arena)?;
                let idx_reg = self.generate_expr(index, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::IndexOf {
                        ty: arena[id].src_ty,
                        target,
                        src: src_reg,
                        index: idx_reg,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::SubList { src, start, end } => {
                let src_reg = self.generate_expr(src, frame, block, arena)?;
                let start_reg = self.generate_expr(start, frame, block, arena)?;
                let end_reg = self.generate_expr(end, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::SubList {
                        ty: arena[id].src_ty,
                        target,
                        src: src_reg,
                        start: start_reg,
                        end: end_reg,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::SubString { src, start, end } => {
                let src_reg = self.generate_expr(src, frame, block, arena)?;
                let start_reg = self.generate_expr(start, frame, block, arena)?;
                let end_reg = self.generate_expr(end, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::SubString {
                        target,
                        src: src_reg,
                        start: start_reg,
                        end: end_reg,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::ListLength(src)
            | ExprKind::SetLength(src)
            | ExprKind::StringLength(src)
            | ExprKind::MapLength(src) => {
                let operand = self.generate_expr(src, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::LengthOf {
                        ty: arena[id].src_ty,
                        target,
                        operand,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::Cast { ty, operand } => {
                let src = self.generate_expr(operand, frame, block, arena)?;
                let from = arena[id].src_ty;
                let target = frame.allocate(ty);
                block.append(
                    Code::Convert {
                        from,
                        target,
                        operand: src,
                        to: ty,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::New(operand) => {
                let src = self.generate_expr(operand, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::NewObject {
                        ty: result_ty,
                        target,
                        operand: src,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::Dereference(operand) => {
                let src = self.generate_expr(operand, frame, block, arena)?;
                let target = frame.allocate(result_ty);
                block.append(
                    Code::Dereference {
                        ty: arena[id].src_ty,
                        target,
                        operand: src,
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::FunctionRef { module, name, .. } => {
                let ty = result_ty;
                let target = frame.allocate(ty);
                block.append(
                    Code::Lambda {
                        ty,
                        target,
                        operands: Regs::new(),
                        name: self.qualify(module, name),
                    },
                    attr,
                );
                Ok(target)
            }

            ExprKind::FunctionCall { .. }
            | ExprKind::MethodCall { .. }
            | ExprKind::IndirectFunctionCall { .. }
            | ExprKind::IndirectMethodCall { .. } => {
                let target = frame.allocate(result_ty);
                self.generate_call(id, target, frame, block, arena)?;
                Ok(target)
            }

            ExprKind::Lambda { params, body } => {
                self.generate_lambda(id, &params, body, frame, block, arena)
            }

            ExprKind::Comprehension {
                kind,
                sources,
                condition,
                value,
            } => self.generate_comprehension(
                id, kind, &sources, condition, value, frame, block, arena,
            ),

            kind => Err(self.internal_failure(
                format!("unexpected expression in code generation: {kind:?}"),
                span,
            )),
        }
    }

    /// Evaluate a list of argument expressions into registers.
    fn generate_operands(
        &mut self,
        exprs: &[ExprId],
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Regs> {
        let mut operands = SmallVec::new();
        for &e in exprs {
            operands.push(self.generate_expr(e, frame, block, arena)?);
        }
        Ok(operands)
    }

    /// Lower a direct or indirect call into `target` (the null register in
    /// statement position).
    pub(crate) fn generate_call(
        &mut self,
        id: ExprId,
        target: Reg,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<()> {
        let span = arena[id].span;
        let attr = self.attr(span);
        let sig = arena[id].src_ty;

        match arena[id].kind.clone() {
            ExprKind::FunctionCall { name, args } | ExprKind::MethodCall { name, args } => {
                let operands = self.generate_operands(&args, frame, block, arena)?;
                block.append(
                    Code::Invoke {
                        ty: sig,
                        target,
                        operands,
                        name,
                    },
                    attr,
                );
                Ok(())
            }
            ExprKind::IndirectFunctionCall { src, args }
            | ExprKind::IndirectMethodCall { src, args } => {
                let operand = self.generate_expr(src, frame, block, arena)?;
                let operands = self.generate_operands(&args, frame, block, arena)?;
                block.append(
                    Code::IndirectInvoke {
                        ty: sig,
                        target,
                        operand,
                        operands,
                    },
                    attr,
                );
                Ok(())
            }
            _ => Err(self.internal_failure("not a call expression", span)),
        }
    }

    fn generate_binary(
        &mut self,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Reg> {
        let span = arena[id].span;
        let attr = self.attr(span);
        let result_ty = arena[id].ty;

        // Conditions (including `^^`, which branches on operand
        // disagreement) materialize through a two-label scheme.
        if op.is_condition() || op == BinaryOp::Is {
            let true_lab = block.fresh_label();
            let exit_lab = block.fresh_label();
            self.generate_condition(true_lab, id, frame, block, arena)?;
            let target = frame.allocate(TypeId::BOOL);
            block.append(
                Code::Const {
                    target,
                    value: Constant::Bool(false),
                },
                attr,
            );
            block.append(Code::Goto(exit_lab), attr);
            block.append(Code::Label(true_lab), attr);
            block.append(
                Code::Const {
                    target,
                    value: Constant::Bool(true),
                },
                attr,
            );
            block.append(Code::Label(exit_lab), attr);
            return Ok(target);
        }

        let left = self.generate_expr(lhs, frame, block, arena)?;
        let right = self.generate_expr(rhs, frame, block, arena)?;
        let target = frame.allocate(result_ty);

        match op {
            BinaryOp::Union => block.append(
                Code::BinSetOp {
                    ty: result_ty,
                    kind: BinSetKind::Union,
                    target,
                    lhs: left,
                    rhs: right,
                },
                attr,
            ),
            BinaryOp::Intersection => block.append(
                Code::BinSetOp {
                    ty: result_ty,
                    kind: BinSetKind::Intersection,
                    target,
                    lhs: left,
                    rhs: right,
                },
                attr,
            ),
            BinaryOp::Difference => block.append(
                Code::BinSetOp {
                    ty: result_ty,
                    kind: BinSetKind::Difference,
                    target,
                    lhs: left,
                    rhs: right,
                },
                attr,
            ),
            BinaryOp::ListAppend => block.append(
                Code::BinListOp {
                    ty: result_ty,
                    kind: BinListKind::Append,
                    target,
                    lhs: left,
                    rhs: right,
                },
                attr,
            ),
            BinaryOp::StringAppend => {
                // A char operand on either side selects the partial
                // append forms.
                let lhs_ty = arena[lhs].ty;
                let rhs_ty = arena[rhs].ty;
                let char_rhs = self.is_char_like(rhs_ty);
                let char_lhs = self.is_char_like(lhs_ty);
                let kind = if lhs_ty == TypeId::STRING && rhs_ty == TypeId::STRING {
                    BinStringKind::Append
                } else if lhs_ty == TypeId::STRING && char_rhs {
                    BinStringKind::LeftAppend
                } else if rhs_ty == TypeId::STRING && char_lhs {
                    BinStringKind::RightAppend
                } else {
                    // One operand still needs an explicit conversion.
                    BinStringKind::Append
                };
                block.append(
                    Code::BinStringOp {
                        kind,
                        target,
                        lhs: left,
                        rhs: right,
                    },
                    attr,
                );
            }
            _ => {
                let kind = arith_kind(op).ok_or_else(|| {
                    self.syntax_error(
                        ErrorCode::E2015,
                        format!("invalid binary operation '{op}'"),
                        span,
                    )
                })?;
                block.append(
                    Code::BinArithOp {
                        ty: result_ty,
                        kind,
                        target,
                        lhs: left,
                        rhs: right,
                    },
                    attr,
                );
            }
        }
        Ok(target)
    }

    fn is_char_like(&self, ty: TypeId) -> bool {
        self.engine_is_subtype(TypeId::CHAR, ty)
    }

    fn engine_is_subtype(&self, sup: TypeId, sub: TypeId) -> bool {
        rill_types::SubtypeEngine::new(self.pool, self.interner, self.nominals)
            .is_subtype(sub, sup)
    }

    /// Lower a list/set comprehension (quantifiers materialize through the
    /// condition path). The target accumulates from an empty literal via
    /// element appends inside the loop nest.
    #[allow(clippy::too_many_arguments)]
    fn generate_comprehension(
        &mut self,
        id: ExprId,
        kind: CompKind,
        sources: &[(Name, ExprId)],
        condition: Option<ExprId>,
        value: Option<ExprId>,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Reg> {
        let span = arena[id].span;
        let attr = self.attr(span);
        let result_ty = arena[id].ty;

        if kind.is_quantifier() {
            let true_lab = block.fresh_label();
            let exit_lab = block.fresh_label();
            self.generate_condition(true_lab, id, frame, block, arena)?;
            let target = frame.allocate(TypeId::BOOL);
            block.append(
                Code::Const {
                    target,
                    value: Constant::Bool(false),
                },
                attr,
            );
            block.append(Code::Goto(exit_lab), attr);
            block.append(Code::Label(true_lab), attr);
            block.append(
                Code::Const {
                    target,
                    value: Constant::Bool(true),
                },
                attr,
            );
            block.append(Code::Label(exit_lab), attr);
            return Ok(target);
        }

        let value =
            value.ok_or_else(|| self.internal_failure("comprehension without a value", span))?;

        let slots = self.generate_quantifier_sources(sources, frame, block, arena)?;

        let target = frame.allocate(result_ty);
        match kind {
            CompKind::ListComp => block.append(
                Code::NewList {
                    ty: result_ty,
                    target,
                    operands: Regs::new(),
                },
                attr,
            ),
            CompKind::SetComp => block.append(
                Code::NewSet {
                    ty: result_ty,
                    target,
                    operands: Regs::new(),
                },
                attr,
            ),
            _ => unreachable!("quantifiers handled above"),
        }

        let continue_lab = block.fresh_label();
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

        if let Some(cond) = condition {
            let inverted = self.invert(cond, arena);
            self.generate_condition(continue_lab, inverted, frame, block, arena)?;
        }

        let operand = self.generate_expr(value, frame, block, arena)?;
        match kind {
            CompKind::ListComp => block.append(
                Code::BinListOp {
                    ty: result_ty,
                    kind: BinListKind::LeftAppend,
                    target,
                    lhs: target,
                    rhs: operand,
                },
                attr,
            ),
            CompKind::SetComp => block.append(
                Code::BinSetOp {
                    ty: result_ty,
                    kind: BinSetKind::LeftUnion,
                    target,
                    lhs: target,
                    rhs: operand,
                },
                attr,
            ),
            _ => unreachable!(),
        }

        if condition.is_some() {
            block.append(Code::Label(continue_lab), attr);
        }
        self.close_loops(&labels, block, attr);
        Ok(target)
    }

    /// Synthesize a lambda literal as an anonymous top-level function.
    ///
    /// The synthesized parameter list is the explicit parameters followed
    /// by the captured free variables; call-time positions carry the null
    /// register in the `Lambda` instruction's operands, capture positions
    /// carry the enclosing frame's register for the captured variable.
    fn generate_lambda(
        &mut self,
        id: ExprId,
        params: &[(Name, TypeId)],
        body: ExprId,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> Result<Reg> {
        let span = arena[id].span;
        let attr = self.attr(span);
        let lambda_ty = arena[id].ty;
        let ret = self.pool.fn_ret(lambda_ty);
        let throws = self.pool.fn_throws(lambda_ty);

        let mut inner_frame = Frame::new();
        let mut operands = Regs::new();
        let mut param_types: Vec<TypeId> = Vec::with_capacity(params.len());
        for &(name, ty) in params {
            inner_frame.allocate_named(ty, name);
            param_types.push(ty);
            operands.push(Reg::NULL);
        }

        // Free variables of the body become trailing parameters, captured
        // from the enclosing frame at the construction site.
        let mut free = Vec::new();
        collect_free_locals(arena, body, &mut free);
        for (name, ty) in free {
            if inner_frame.get(name).is_none() {
                if let Some(outer) = frame.get(name) {
                    inner_frame.allocate_named(ty, name);
                    param_types.push(ty);
                    operands.push(outer);
                }
            }
        }

        // Generate the body against the inner frame.
        let mut body_block = CodeBlock::new(param_types.len() as u32);
        if ret != TypeId::VOID {
            let target = self.generate_expr(body, &mut inner_frame, &mut body_block, arena)?;
            body_block.append(
                Code::Return {
                    ty: ret,
                    operand: target,
                },
                attr,
            );
        } else {
            body_block.append(Code::ret(), attr);
        }

        // The concrete type includes the capture parameters.
        let concrete_ty = if self.pool.tag(lambda_ty) == Tag::Method {
            self.pool.method(ret, throws, &param_types)
        } else {
            self.pool.function(ret, throws, &param_types)
        };

        let name = self
            .interner
            .intern(&format!("$lambda{}", span.start));
        let qname = self.qualify(Some(self.module_name()), name);
        self.lambdas.push(IrFunction {
            name,
            ty: concrete_ty,
            body: body_block,
            precondition: None,
            postcondition: None,
            synthetic: true,
        });

        let target = frame.allocate(lambda_ty);
        block.append(
            Code::Lambda {
                ty: concrete_ty,
                target,
                operands,
                name: qname,
            },
            attr,
        );
        Ok(target)
    }
}

/// Collect the free local variables of an expression, in first-use order.
fn collect_free_locals(arena: &ExprArena, id: ExprId, out: &mut Vec<(Name, TypeId)>) {
    if let ExprKind::Local(name) = arena[id].kind {
        if !out.iter().any(|(n, _)| *n == name) {
            out.push((name, arena[id].ty));
        }
        return;
    }
    for child in expr_children(&arena[id].kind) {
        collect_free_locals(arena, child, out);
    }
}

/// Child expression ids of a node.
fn expr_children(kind: &ExprKind) -> Vec<ExprId> {
    match kind {
        ExprKind::Constant(_)
        | ExprKind::Variable(_)
        | ExprKind::Local(_)
        | ExprKind::ConstAccess { .. }
        | ExprKind::ModuleAccess(_)
        | ExprKind::TypeVal(_)
        | ExprKind::FunctionRef { .. } => Vec::new(),
        ExprKind::Unary { operand, .. }
        | ExprKind::LengthOf(operand)
        | ExprKind::ListLength(operand)
        | ExprKind::SetLength(operand)
        | ExprKind::StringLength(operand)
        | ExprKind::MapLength(operand)
        | ExprKind::New(operand)
        | ExprKind::Dereference(operand)
        | ExprKind::Cast { operand, .. } => vec![*operand],
        ExprKind::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
        ExprKind::RecordLit(fields) => fields.iter().map(|(_, e)| *e).collect(),
        ExprKind::TupleLit(es) | ExprKind::ListLit(es) | ExprKind::SetLit(es) => es.clone(),
        ExprKind::MapLit(pairs) => pairs.iter().flat_map(|(k, v)| [*k, *v]).collect(),
        ExprKind::Access { src, .. } | ExprKind::FieldAccess { src, .. } => vec![*src],
        ExprKind::IndexOf { src, index }
        | ExprKind::ListAccess { src, index }
        | ExprKind::StringAccess { src, index }
        | ExprKind::MapAccess { src, index } => vec![*src, *index],
        ExprKind::SubRange { src, start, end }
        | ExprKind::SubList { src, start, end }
        | ExprKind::SubString { src, start, end } => vec![*src, *start, *end],
        ExprKind::Invoke { receiver, args, .. } => {
            let mut out: Vec<ExprId> = receiver.iter().copied().collect();
            out.extend(args.iter().copied());
            out
        }
        ExprKind::FunctionCall { args, .. } | ExprKind::MethodCall { args, .. } => args.clone(),
        ExprKind::IndirectFunctionCall { src, args }
        | ExprKind::IndirectMethodCall { src, args } => {
            let mut out = vec![*src];
            out.extend(args.iter().copied());
            out
        }
        ExprKind::Lambda { body, .. } => vec![*body],
        ExprKind::Comprehension {
            sources,
            condition,
            value,
            ..
        } => {
            let mut out: Vec<ExprId> = sources.iter().map(|(_, e)| *e).collect();
            out.extend(condition.iter().copied());
            out.extend(value.iter().copied());
            out
        }
    }
}

fn arith_kind(op: BinaryOp) -> Option<BinArithKind> {
    match op {
        BinaryOp::Add => Some(BinArithKind::Add),
        BinaryOp::Sub => Some(BinArithKind::Sub),
        BinaryOp::Mul => Some(BinArithKind::Mul),
        BinaryOp::Div => Some(BinArithKind::Div),
        BinaryOp::Rem => Some(BinArithKind::Rem),
        BinaryOp::Range => Some(BinArithKind::Range),
        BinaryOp::BitAnd => Some(BinArithKind::BitAnd),
        BinaryOp::BitOr => Some(BinArithKind::BitOr),
        BinaryOp::BitXor => Some(BinArithKind::BitXor),
        BinaryOp::Shl => Some(BinArithKind::Shl),
        BinaryOp::Shr => Some(BinArithKind::Shr),
        _ => None,
    }
}
