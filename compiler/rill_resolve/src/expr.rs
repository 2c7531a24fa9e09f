//! Expression resolution.
//!
//! Bottom-up typed traversal. Overloaded operators and abstract node kinds
//! are rewritten in place once operand types are known.

use rill_diagnostic::ErrorCode;
use rill_ir::{
    BinaryOp, CompKind, ExprArena, ExprId, ExprKind, Name, Span, TypeId, UnaryOp,
};
use rill_types::{
    as_effective_callable, as_effective_list, as_effective_map, as_effective_record,
    as_effective_reference, as_effective_set, Tag,
};

use crate::{Environment, Resolver};

type Result<T> = rill_diagnostic::Result<T>;

impl Resolver<'_> {
    /// Exact (non-coercive) subtype test `sub <: sup`.
    pub(crate) fn is_subtype_exact(&self, sup: TypeId, sub: TypeId) -> bool {
        self.engine().is_subtype(sub, sup)
    }

    /// Resolve one expression, filling its type attributes and rewriting
    /// abstract kinds. Returns the node's resolved type.
    pub fn resolve_expr(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;
        let kind = arena[id].kind.clone();

        let ty = match kind {
            ExprKind::Constant(c) => c.ty(),

            ExprKind::Variable(name) => return self.resolve_variable(arena, id, name, env),

            ExprKind::Local(name) => env.lookup(name).ok_or_else(|| {
                self.syntax_error(
                    ErrorCode::E2001,
                    format!("unknown variable '{}'", self.interner.resolve(name)),
                    span,
                )
            })?,

            ExprKind::ConstAccess { value, .. } => match value {
                Some(c) => c.ty(),
                None => {
                    return Err(self.internal_failure("unresolved constant access", span));
                }
            },

            ExprKind::ModuleAccess(_) | ExprKind::TypeVal(_) => TypeId::META,

            ExprKind::Unary { op, operand } => {
                return self.resolve_unary(arena, id, op, operand, env);
            }

            ExprKind::Binary { op, lhs, rhs } => {
                return self.resolve_binary(arena, id, op, lhs, rhs, env);
            }

            ExprKind::RecordLit(fields) => {
                let mut field_types = Vec::with_capacity(fields.len());
                for (name, value) in &fields {
                    let t = self.resolve_expr(arena, *value, env)?;
                    field_types.push((*name, t));
                }
                self.pool.record(&field_types, false, self.interner)
            }

            ExprKind::TupleLit(elems) => {
                let mut elem_types = Vec::with_capacity(elems.len());
                for e in &elems {
                    elem_types.push(self.resolve_expr(arena, *e, env)?);
                }
                self.pool.tuple(&elem_types)
            }

            ExprKind::ListLit(elems) => {
                let mut elem = TypeId::VOID;
                for e in &elems {
                    let t = self.resolve_expr(arena, *e, env)?;
                    elem = self.pool.union2(elem, t);
                }
                self.pool.list(elem)
            }

            ExprKind::SetLit(elems) => {
                let mut elem = TypeId::VOID;
                for e in &elems {
                    let t = self.resolve_expr(arena, *e, env)?;
                    elem = self.pool.union2(elem, t);
                }
                self.pool.set(elem)
            }

            ExprKind::MapLit(pairs) => {
                let mut key = TypeId::VOID;
                let mut value = TypeId::VOID;
                for (k, v) in &pairs {
                    let kt = self.resolve_expr(arena, *k, env)?;
                    let vt = self.resolve_expr(arena, *v, env)?;
                    key = self.pool.union2(key, kt);
                    value = self.pool.union2(value, vt);
                }
                self.pool.map(key, value)
            }

            ExprKind::Access { src, field } => {
                return self.resolve_access(arena, id, src, field, env);
            }

            ExprKind::FieldAccess { src, field } => {
                let src_ty = self.resolve_expr(arena, src, env)?;
                let (field_ty, rec) = self.record_field(src_ty, field, span)?;
                arena[id].src_ty = rec;
                field_ty
            }

            ExprKind::IndexOf { src, index } => {
                return self.resolve_index(arena, id, src, index, env);
            }
            // Re-resolution of already-concrete accesses retypes children
            // and re-checks, mirroring the first pass.
            ExprKind::ListAccess { src, index }
            | ExprKind::StringAccess { src, index }
            | ExprKind::MapAccess { src, index } => {
                return self.resolve_index(arena, id, src, index, env);
            }

            ExprKind::SubRange { src, start, end }
            | ExprKind::SubList { src, start, end }
            | ExprKind::SubString { src, start, end } => {
                return self.resolve_subrange(arena, id, src, start, end, env);
            }

            ExprKind::LengthOf(src)
            | ExprKind::ListLength(src)
            | ExprKind::SetLength(src)
            | ExprKind::StringLength(src)
            | ExprKind::MapLength(src) => {
                return self.resolve_length(arena, id, src, env);
            }

            ExprKind::Cast { ty, operand } => {
                let from = self.resolve_expr(arena, operand, env)?;
                if !rill_types::is_explicit_coercive_subtype(
                    self.pool,
                    self.interner,
                    self.nominals,
                    ty,
                    from,
                ) {
                    return Err(self.syntax_error(
                        ErrorCode::E2007,
                        format!(
                            "cannot cast {} to {}",
                            self.format_type(from),
                            self.format_type(ty)
                        ),
                        span,
                    ));
                }
                arena[id].src_ty = from;
                ty
            }

            ExprKind::New(operand) => {
                let t = self.resolve_expr(arena, operand, env)?;
                self.pool.reference(t)
            }

            ExprKind::Dereference(operand) => {
                let src_ty = self.resolve_expr(arena, operand, env)?;
                let referent =
                    as_effective_reference(self.pool, self.nominals, src_ty).ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2016,
                            format!("invalid reference expression of type {}", self.format_type(src_ty)),
                            span,
                        )
                    })?;
                arena[id].src_ty = src_ty;
                referent
            }

            ExprKind::FunctionRef {
                module,
                name,
                ref params,
            } => {
                let (_, ty) = self.resolve_function_ref(module, name, params.as_deref(), span)?;
                ty
            }

            ExprKind::Invoke {
                receiver,
                name,
                args,
            } => return self.resolve_invoke(arena, id, receiver, name, args, env),

            ExprKind::FunctionCall { ref args, .. } | ExprKind::MethodCall { ref args, .. } => {
                // Already concrete; retype the arguments and keep the
                // previously selected signature.
                let args = args.clone();
                for a in &args {
                    self.resolve_expr(arena, *a, env)?;
                }
                let sig = arena[id].src_ty;
                if sig.is_none() {
                    return Err(self.internal_failure("direct call without a signature", span));
                }
                arena[id].ty = self.pool.fn_ret(sig);
                arena[id].src_ty = sig;
                return Ok(arena[id].ty);
            }

            ExprKind::IndirectFunctionCall { src, ref args }
            | ExprKind::IndirectMethodCall { src, ref args } => {
                let args = args.clone();
                let src_ty = self.resolve_expr(arena, src, env)?;
                let sig = as_effective_callable(self.pool, self.nominals, src_ty)
                    .ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2018,
                            "function or method type expected",
                            span,
                        )
                    })?;
                self.check_call_arguments(arena, sig, &args, env, span)?;
                arena[id].src_ty = sig;
                self.pool.fn_ret(sig)
            }

            ExprKind::Lambda { ref params, body } => {
                let params = params.clone();
                let mut inner = env.clone();
                for (name, ty) in &params {
                    inner.bind(*name, *ty);
                }
                let ret = self.resolve_expr(arena, body, &inner)?;
                let param_types: Vec<TypeId> = params.iter().map(|(_, t)| *t).collect();
                self.pool.function(ret, TypeId::VOID, &param_types)
            }

            ExprKind::Comprehension {
                kind,
                ref sources,
                condition,
                value,
            } => {
                let sources = sources.clone();
                let mut local = env.clone();
                for (var, src) in &sources {
                    let src_ty = self.resolve_expr(arena, *src, &local)?;
                    let elem = as_effective_list(self.pool, self.nominals, src_ty)
                        .or_else(|| as_effective_set(self.pool, self.nominals, src_ty))
                        .ok_or_else(|| {
                            self.syntax_error(
                                ErrorCode::E2010,
                                format!(
                                    "invalid set or list expression of type {}",
                                    self.format_type(src_ty)
                                ),
                                arena[*src].span,
                            )
                        })?;
                    local.bind(*var, elem);
                }

                if let Some(cond) = condition {
                    let t = self.resolve_expr(arena, cond, &local)?;
                    self.check_is_subtype(TypeId::BOOL, t, arena[cond].span)?;
                }

                match kind {
                    CompKind::ListComp => {
                        let v = value.ok_or_else(|| {
                            self.internal_failure("list comprehension without value", span)
                        })?;
                        let vt = self.resolve_expr(arena, v, &local)?;
                        self.pool.list(vt)
                    }
                    CompKind::SetComp => {
                        let v = value.ok_or_else(|| {
                            self.internal_failure("set comprehension without value", span)
                        })?;
                        let vt = self.resolve_expr(arena, v, &local)?;
                        self.pool.set(vt)
                    }
                    _ => TypeId::BOOL,
                }
            }
        };

        arena[id].ty = ty;
        Ok(ty)
    }

    // === Variables and names ===

    fn resolve_variable(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        name: Name,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;

        if let Some(ty) = env.lookup(name) {
            arena.rewrite(id, ExprKind::Local(name));
            arena[id].ty = ty;
            return Ok(ty);
        }

        // Not a local; try a constant in the current module, then a module
        // reference.
        if let Some(value) = self.registry.constant(self.module, name) {
            let value = value.clone();
            let ty = value.ty();
            arena.rewrite(
                id,
                ExprKind::ConstAccess {
                    module: Some(self.module),
                    name,
                    value: Some(value),
                },
            );
            arena[id].ty = ty;
            return Ok(ty);
        }

        if self.registry.is_module(name) {
            arena.rewrite(id, ExprKind::ModuleAccess(name));
            arena[id].ty = TypeId::META;
            return Ok(TypeId::META);
        }

        Err(self.syntax_error(
            ErrorCode::E2001,
            format!("unknown variable '{}'", self.interner.resolve(name)),
            span,
        ))
    }

    fn resolve_access(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        src: ExprId,
        field: Name,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;
        let src_ty = self.resolve_expr(arena, src, env)?;

        if let ExprKind::ModuleAccess(module) = arena[src].kind {
            // Qualified constant access.
            let value = self.registry.constant(module, field).cloned().ok_or_else(|| {
                self.syntax_error(
                    ErrorCode::E2017,
                    format!(
                        "'{}' is not a constant of module '{}'",
                        self.interner.resolve(field),
                        self.interner.resolve(module)
                    ),
                    span,
                )
            })?;
            let ty = value.ty();
            arena.rewrite(
                id,
                ExprKind::ConstAccess {
                    module: Some(module),
                    name: field,
                    value: Some(value),
                },
            );
            arena[id].ty = ty;
            return Ok(ty);
        }

        // Plain record field access.
        let (field_ty, rec) = self.record_field(src_ty, field, span)?;
        arena.rewrite(id, ExprKind::FieldAccess { src, field });
        arena[id].ty = field_ty;
        arena[id].src_ty = rec;
        Ok(field_ty)
    }

    /// Field type plus the expanded record type, or the appropriate error.
    fn record_field(&self, src_ty: TypeId, field: Name, span: Span) -> Result<(TypeId, TypeId)> {
        let rec = as_effective_record(self.pool, self.nominals, src_ty).ok_or_else(|| {
            self.syntax_error(
                ErrorCode::E2004,
                format!("record type required, found {}", self.format_type(src_ty)),
                span,
            )
        })?;
        let field_ty = self.pool.record_field_type(rec, field).ok_or_else(|| {
            self.syntax_error(
                ErrorCode::E2005,
                format!("record has no field '{}'", self.interner.resolve(field)),
                span,
            )
        })?;
        Ok((field_ty, rec))
    }

    // === Operators ===

    fn resolve_unary(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        op: UnaryOp,
        operand: ExprId,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;
        if op == UnaryOp::Not {
            // Hand off to the condition path; refinement is discarded in
            // expression position.
            self.resolve_condition(arena, id, true, env.clone())?;
            return Ok(arena[id].ty);
        }

        let src = self.resolve_expr(arena, operand, env)?;
        match op {
            UnaryOp::Neg => self.check_is_subtype(TypeId::REAL, src, span)?,
            UnaryOp::Invert => self.check_is_subtype(TypeId::BYTE, src, span)?,
            UnaryOp::Not => unreachable!("handled above"),
        }
        arena[id].ty = src;
        Ok(src)
    }

    fn resolve_binary(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;

        // Conditions route through the flow-sensitive path, discarding the
        // refined environment in expression position.
        if op.is_logical() || op.is_leaf_condition() {
            self.resolve_condition(arena, id, true, env.clone())?;
            return Ok(arena[id].ty);
        }

        let lhs_ty = self.resolve_expr(arena, lhs, env)?;
        let rhs_ty = self.resolve_expr(arena, rhs, env)?;

        let list_any = self.pool.list(TypeId::ANY);
        let set_any = self.pool.set(TypeId::ANY);
        let lhs_str = self.is_subtype_exact(TypeId::STRING, lhs_ty);
        let rhs_str = self.is_subtype_exact(TypeId::STRING, rhs_ty);
        let lhs_list = self.is_coercive_subtype(list_any, lhs_ty);
        let rhs_list = self.is_coercive_subtype(list_any, rhs_ty);
        let lhs_set = self.is_coercive_subtype(set_any, lhs_ty);
        let rhs_set = self.is_coercive_subtype(set_any, rhs_ty);

        let src_ty;
        let mut new_op = op;

        if lhs_str || rhs_str {
            match op {
                BinaryOp::Add => new_op = BinaryOp::StringAppend,
                BinaryOp::StringAppend => {}
                _ => {
                    return Err(self.syntax_error(
                        ErrorCode::E2012,
                        format!("invalid string operation '{op}'"),
                        span,
                    ));
                }
            }
            src_ty = TypeId::STRING;
        } else if lhs_list && rhs_list {
            match op {
                BinaryOp::Add | BinaryOp::ListAppend => {
                    new_op = BinaryOp::ListAppend;
                    src_ty = self.pool.union2(lhs_ty, rhs_ty);
                }
                _ => {
                    return Err(self.syntax_error(
                        ErrorCode::E2014,
                        format!("invalid list operation '{op}'"),
                        span,
                    ));
                }
            }
        } else if lhs_set && rhs_set {
            // A list operand acts as a set of its element type here.
            let lhs_eff = self.as_set_type(lhs_ty, span)?;
            let rhs_eff = self.as_set_type(rhs_ty, span)?;
            match op {
                BinaryOp::Add | BinaryOp::Union => {
                    new_op = BinaryOp::Union;
                    let le = self.pool.elem(lhs_eff);
                    let re = self.pool.elem(rhs_eff);
                    let e = self.pool.union2(le, re);
                    src_ty = self.pool.set(e);
                }
                BinaryOp::BitAnd | BinaryOp::Intersection => {
                    new_op = BinaryOp::Intersection;
                    src_ty = if self.is_subtype_exact(lhs_eff, rhs_eff) {
                        rhs_eff
                    } else {
                        lhs_eff
                    };
                }
                BinaryOp::Sub | BinaryOp::Difference => {
                    new_op = BinaryOp::Difference;
                    src_ty = lhs_eff;
                }
                _ => {
                    return Err(self.syntax_error(
                        ErrorCode::E2013,
                        format!("invalid set operation '{op}'"),
                        span,
                    ));
                }
            }
        } else {
            match op {
                BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor => {
                    self.check_is_subtype(TypeId::BYTE, lhs_ty, span)?;
                    self.check_is_subtype(TypeId::BYTE, rhs_ty, span)?;
                    src_ty = TypeId::BYTE;
                }
                BinaryOp::Shl | BinaryOp::Shr => {
                    self.check_is_subtype(TypeId::BYTE, lhs_ty, span)?;
                    self.check_is_subtype(TypeId::INT, rhs_ty, span)?;
                    src_ty = TypeId::BYTE;
                }
                BinaryOp::Range => {
                    self.check_is_subtype(TypeId::INT, lhs_ty, span)?;
                    self.check_is_subtype(TypeId::INT, rhs_ty, span)?;
                    src_ty = self.pool.list(TypeId::INT);
                }
                BinaryOp::Rem => {
                    self.check_is_subtype(TypeId::INT, lhs_ty, span)?;
                    self.check_is_subtype(TypeId::INT, rhs_ty, span)?;
                    src_ty = TypeId::INT;
                }
                BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
                    // Numeric: int when both operands are int-ish (char
                    // promotes to int), real otherwise.
                    if self.is_coercive_subtype(lhs_ty, rhs_ty) {
                        self.check_is_subtype(TypeId::REAL, lhs_ty, span)?;
                        src_ty = if self.is_subtype_exact(TypeId::CHAR, lhs_ty)
                            || self.is_subtype_exact(TypeId::INT, lhs_ty)
                        {
                            TypeId::INT
                        } else {
                            TypeId::REAL
                        };
                    } else {
                        self.check_is_subtype(TypeId::REAL, lhs_ty, span)?;
                        self.check_is_subtype(TypeId::REAL, rhs_ty, span)?;
                        src_ty = if self.is_subtype_exact(TypeId::CHAR, rhs_ty)
                            || self.is_subtype_exact(TypeId::INT, rhs_ty)
                        {
                            TypeId::INT
                        } else {
                            TypeId::REAL
                        };
                    }
                }
                _ => {
                    return Err(self.syntax_error(
                        ErrorCode::E2015,
                        format!(
                            "invalid binary operation '{op}' on {} and {}",
                            self.format_type(lhs_ty),
                            self.format_type(rhs_ty)
                        ),
                        span,
                    ));
                }
            }
        }

        if new_op != op {
            arena[id].kind = ExprKind::Binary {
                op: new_op,
                lhs,
                rhs,
            };
        }
        arena[id].ty = src_ty;
        arena[id].src_ty = src_ty;
        Ok(src_ty)
    }

    /// View a set-or-list type as a set type.
    fn as_set_type(&mut self, ty: TypeId, span: Span) -> Result<TypeId> {
        if let Some(elem) = as_effective_set(self.pool, self.nominals, ty) {
            return Ok(self.pool.set(elem));
        }
        if let Some(elem) = as_effective_list(self.pool, self.nominals, ty) {
            return Ok(self.pool.set(elem));
        }
        Err(self.syntax_error(
            ErrorCode::E2010,
            format!("invalid set or list expression of type {}", self.format_type(ty)),
            span,
        ))
    }

    // === Accesses ===

    fn resolve_index(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        src: ExprId,
        index: ExprId,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;
        let src_ty = self.resolve_expr(arena, src, env)?;
        let index_ty = self.resolve_expr(arena, index, env)?;

        let list_any = self.pool.list(TypeId::ANY);
        let map_any = self.pool.map(TypeId::ANY, TypeId::ANY);

        let ty = if self.is_coercive_subtype(TypeId::STRING, src_ty) {
            self.check_is_subtype(TypeId::STRING, src_ty, span)?;
            self.check_is_subtype(TypeId::INT, index_ty, arena[index].span)?;
            arena.rewrite(id, ExprKind::StringAccess { src, index });
            arena[id].src_ty = TypeId::STRING;
            TypeId::CHAR
        } else if self.is_coercive_subtype(list_any, src_ty) {
            let elem = as_effective_list(self.pool, self.nominals, src_ty).ok_or_else(|| {
                self.syntax_error(
                    ErrorCode::E2009,
                    format!("invalid list expression of type {}", self.format_type(src_ty)),
                    span,
                )
            })?;
            self.check_is_subtype(TypeId::INT, index_ty, arena[index].span)?;
            arena.rewrite(id, ExprKind::ListAccess { src, index });
            arena[id].src_ty = self.nominals.expand_fully(self.pool, src_ty);
            elem
        } else if self.is_coercive_subtype(map_any, src_ty) {
            let (key, value) =
                as_effective_map(self.pool, self.nominals, src_ty).ok_or_else(|| {
                    self.syntax_error(
                        ErrorCode::E2011,
                        format!("invalid map expression of type {}", self.format_type(src_ty)),
                        span,
                    )
                })?;
            self.check_is_subtype(key, index_ty, arena[index].span)?;
            arena.rewrite(id, ExprKind::MapAccess { src, index });
            arena[id].src_ty = self.nominals.expand_fully(self.pool, src_ty);
            value
        } else {
            return Err(self.syntax_error(
                ErrorCode::E2010,
                format!("invalid set or list expression of type {}", self.format_type(src_ty)),
                span,
            ));
        };

        arena[id].ty = ty;
        Ok(ty)
    }

    fn resolve_subrange(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        src: ExprId,
        start: ExprId,
        end: ExprId,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;
        let src_ty = self.resolve_expr(arena, src, env)?;
        let start_ty = self.resolve_expr(arena, start, env)?;
        let end_ty = self.resolve_expr(arena, end, env)?;
        self.check_is_subtype(TypeId::INT, start_ty, arena[start].span)?;
        self.check_is_subtype(TypeId::INT, end_ty, arena[end].span)?;

        let ty = if as_effective_list(self.pool, self.nominals, src_ty).is_some() {
            let raw = self.nominals.expand_fully(self.pool, src_ty);
            arena.rewrite(id, ExprKind::SubList { src, start, end });
            arena[id].src_ty = raw;
            raw
        } else {
            // Must be a substring.
            self.check_is_subtype(TypeId::STRING, src_ty, span)?;
            arena.rewrite(id, ExprKind::SubString { src, start, end });
            arena[id].src_ty = TypeId::STRING;
            TypeId::STRING
        };
        arena[id].ty = ty;
        Ok(ty)
    }

    fn resolve_length(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        src: ExprId,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;
        let src_ty = self.resolve_expr(arena, src, env)?;

        let list_any = self.pool.list(TypeId::ANY);
        let set_any = self.pool.set(TypeId::ANY);
        let map_any = self.pool.map(TypeId::ANY, TypeId::ANY);
        let raw = self.nominals.expand_fully(self.pool, src_ty);

        if self.is_coercive_subtype(TypeId::STRING, src_ty) {
            arena.rewrite(id, ExprKind::StringLength(src));
            arena[id].src_ty = TypeId::STRING;
        } else if self.is_coercive_subtype(list_any, src_ty) {
            arena.rewrite(id, ExprKind::ListLength(src));
            arena[id].src_ty = raw;
        } else if self.is_coercive_subtype(set_any, src_ty) {
            arena.rewrite(id, ExprKind::SetLength(src));
            arena[id].src_ty = raw;
        } else if self.is_coercive_subtype(map_any, src_ty) {
            arena.rewrite(id, ExprKind::MapLength(src));
            arena[id].src_ty = raw;
        } else {
            return Err(self.syntax_error(
                ErrorCode::E2010,
                format!(
                    "found {}, expected string, set, list or map",
                    self.format_type(src_ty)
                ),
                span,
            ));
        }
        arena[id].ty = TypeId::INT;
        Ok(TypeId::INT)
    }

    // === Calls ===

    fn resolve_invoke(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        receiver: Option<ExprId>,
        name: Name,
        args: Vec<ExprId>,
        env: &Environment,
    ) -> Result<TypeId> {
        let span = arena[id].span;

        if let Some(recv) = receiver {
            self.resolve_expr(arena, recv, env)?;
        }
        let mut arg_types = Vec::with_capacity(args.len());
        for a in &args {
            arg_types.push(self.resolve_expr(arena, *a, env)?);
        }

        match receiver {
            // Module-qualified: a direct call.
            Some(recv) if matches!(arena[recv].kind, ExprKind::ModuleAccess(_)) => {
                let ExprKind::ModuleAccess(module) = arena[recv].kind else {
                    unreachable!()
                };
                let (qname, sig) =
                    self.resolve_as_function(Some(module), name, &arg_types, span)?;
                self.finish_direct_call(arena, id, qname, sig, args)
            }

            // Record-qualified: field access plus indirect call.
            Some(recv) => {
                let recv_ty = arena[recv].ty;
                let (field_ty, rec) = self.record_field(recv_ty, name, span)?;
                let sig = as_effective_callable(self.pool, self.nominals, field_ty)
                    .ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2018,
                            "function or method type expected",
                            span,
                        )
                    })?;
                self.check_call_arguments(arena, sig, &args, env, span)?;

                let fa = arena.alloc(ExprKind::FieldAccess { src: recv, field: name }, span);
                arena[fa].ty = field_ty;
                arena[fa].src_ty = rec;

                let kind = if self.pool.tag(sig) == Tag::Method {
                    ExprKind::IndirectMethodCall { src: fa, args }
                } else {
                    ExprKind::IndirectFunctionCall { src: fa, args }
                };
                arena.rewrite(id, kind);
                arena[id].ty = self.pool.fn_ret(sig);
                arena[id].src_ty = sig;
                Ok(arena[id].ty)
            }

            None => {
                // A local variable of function type makes this an indirect
                // call; otherwise resolve as a direct call.
                if let Some(var_ty) = env.lookup(name) {
                    if let Some(sig) = as_effective_callable(self.pool, self.nominals, var_ty) {
                        self.check_call_arguments(arena, sig, &args, env, span)?;
                        let lv = arena.alloc(ExprKind::Local(name), span);
                        arena[lv].ty = var_ty;
                        let kind = if self.pool.tag(sig) == Tag::Method {
                            ExprKind::IndirectMethodCall { src: lv, args }
                        } else {
                            ExprKind::IndirectFunctionCall { src: lv, args }
                        };
                        arena.rewrite(id, kind);
                        arena[id].ty = self.pool.fn_ret(sig);
                        arena[id].src_ty = sig;
                        return Ok(arena[id].ty);
                    }
                }

                let (qname, sig) = self.resolve_as_function(None, name, &arg_types, span)?;
                self.finish_direct_call(arena, id, qname, sig, args)
            }
        }
    }

    fn finish_direct_call(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        qname: rill_ir::QName,
        sig: TypeId,
        args: Vec<ExprId>,
    ) -> Result<TypeId> {
        let kind = if self.pool.tag(sig) == Tag::Method {
            ExprKind::MethodCall { name: qname, args }
        } else {
            ExprKind::FunctionCall { name: qname, args }
        };
        arena.rewrite(id, kind);
        arena[id].ty = self.pool.fn_ret(sig);
        arena[id].src_ty = sig;
        Ok(arena[id].ty)
    }

    /// Arity and parameter checks for an indirect call through `sig`.
    fn check_call_arguments(
        &mut self,
        arena: &ExprArena,
        sig: TypeId,
        args: &[ExprId],
        _env: &Environment,
        span: Span,
    ) -> Result<()> {
        if self.pool.fn_param_count(sig) != args.len() {
            return Err(self.syntax_error(
                ErrorCode::E2006,
                format!(
                    "expected {} arguments, found {}",
                    self.pool.fn_param_count(sig),
                    args.len()
                ),
                span,
            ));
        }
        for (i, &a) in args.iter().enumerate() {
            let param = self.pool.fn_param(sig, i);
            self.check_is_subtype(param, arena[a].ty, arena[a].span)?;
        }
        Ok(())
    }
}
