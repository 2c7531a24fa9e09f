//! Statement and declaration resolution.
//!
//! Threads the flow environment through statement sequences: conditionals
//! fork it under both signs of their condition and join at the merge,
//! terminating statements mark it unreachable, and assignments strongly
//! update the assigned variable's type.

use rill_diagnostic::ErrorCode;
use rill_ir::{
    BinaryOp, Decl, DeclKind, ExprArena, ExprId, ExprKind, Pattern, Span, Stmt, StmtKind, TypeId,
};
use rill_types::{as_effective_collection, as_effective_record, as_effective_tuple};

use crate::{env::join, Environment, Resolver};

type Result<T> = rill_diagnostic::Result<T>;

/// Enclosing function context for statement resolution.
struct FnCtx {
    /// Declared return type; `void` for none.
    ret: TypeId,
}

impl Resolver<'_> {
    /// Resolve a single declaration in place.
    pub fn resolve_decl(&mut self, decl: &mut Decl, arena: &mut ExprArena) -> Result<()> {
        match &mut decl.kind {
            DeclKind::Constant(_) => Ok(()),

            DeclKind::Type(td) => {
                tracing::debug!(name = ?td.name, "resolving type declaration");
                if let Some(inv) = td.invariant {
                    let mut env = Environment::new();
                    self.bind_pattern(&td.pattern, td.ty, &mut env, decl.span)?;
                    self.resolve_condition(arena, inv, true, env)?;
                }
                Ok(())
            }

            DeclKind::Function(fd) => {
                tracing::debug!(name = ?fd.name, "resolving function declaration");
                let ftype = fd.ty;
                let params = fd.params.clone();
                let ret = self.pool.fn_ret(ftype);
                if params.len() != self.pool.fn_param_count(ftype) {
                    return Err(self.internal_failure(
                        "parameter list does not match the declared signature",
                        decl.span,
                    ));
                }

                let mut env = Environment::new();
                for (i, &p) in params.iter().enumerate() {
                    env.bind(p, self.pool.fn_param(ftype, i));
                }

                // Preconditions see only the parameters.
                let requires = fd.requires.clone();
                for r in requires {
                    self.resolve_condition(arena, r, true, env.clone())?;
                }

                // Postconditions additionally see the return value through
                // the return pattern.
                let ensures = fd.ensures.clone();
                if !ensures.is_empty() {
                    let mut post_env = env.clone();
                    let ret_pattern = fd.ret_pattern.clone();
                    self.bind_pattern(&ret_pattern, ret, &mut post_env, decl.span)?;
                    for e in ensures {
                        self.resolve_condition(arena, e, true, post_env.clone())?;
                    }
                }

                let fctx = FnCtx { ret };
                self.resolve_block(&mut fd.body, arena, env, &fctx)?;
                Ok(())
            }
        }
    }

    fn resolve_block(
        &mut self,
        stmts: &mut [Stmt],
        arena: &mut ExprArena,
        mut env: Environment,
        fctx: &FnCtx,
    ) -> Result<Environment> {
        for stmt in stmts {
            env = self.resolve_stmt(stmt, arena, env, fctx)?;
        }
        Ok(env)
    }

    fn resolve_stmt(
        &mut self,
        stmt: &mut Stmt,
        arena: &mut ExprArena,
        env: Environment,
        fctx: &FnCtx,
    ) -> Result<Environment> {
        let span = stmt.span;
        match &mut stmt.kind {
            StmtKind::VarDecl { pattern, ty, init } => {
                let ty = *ty;
                let init = *init;
                let pattern = pattern.clone();
                let mut env = env;
                if let Some(init) = init {
                    let init_ty = self.resolve_expr(arena, init, &env)?;
                    self.check_is_subtype(ty, init_ty, arena[init].span)?;
                }
                self.bind_pattern(&pattern, ty, &mut env, span)?;
                Ok(env)
            }

            StmtKind::Assign { lhs, rhs } => {
                let (lhs, rhs) = (*lhs, *rhs);
                self.resolve_assign(arena, lhs, rhs, env, span)
            }

            StmtKind::Assert { cond } | StmtKind::Assume { cond } => {
                // The condition holds on the way out, so its refinement
                // flows on.
                let cond = *cond;
                self.resolve_condition(arena, cond, true, env)
            }

            StmtKind::Return { expr } => {
                let expr = *expr;
                match expr {
                    Some(e) => {
                        let ty = self.resolve_expr(arena, e, &env)?;
                        // The declared return type governs; this is the
                        // implicit coercion point at returns.
                        self.check_is_subtype(fctx.ret, ty, arena[e].span)?;
                    }
                    None => {
                        if fctx.ret != TypeId::VOID {
                            return Err(self.syntax_error(
                                ErrorCode::E2007,
                                format!("expected a return value of type {}", self.format_type(fctx.ret)),
                                span,
                            ));
                        }
                    }
                }
                Ok(env.into_bottom())
            }

            StmtKind::Debug { expr } => {
                let expr = *expr;
                let ty = self.resolve_expr(arena, expr, &env)?;
                self.check_is_subtype(TypeId::STRING, ty, arena[expr].span)?;
                Ok(env)
            }

            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond = *cond;
                let true_env = self.resolve_condition(arena, cond, true, env.clone())?;
                let false_env = self.resolve_condition(arena, cond, false, env)?;
                let then_out = self.resolve_block(then_branch, arena, true_env, fctx)?;
                let else_out = self.resolve_block(else_branch, arena, false_env, fctx)?;
                Ok(join(self.pool, &then_out, &else_out))
            }

            StmtKind::Switch { expr, cases } => {
                let expr = *expr;
                let scrut_ty = self.resolve_expr(arena, expr, &env)?;

                for case in cases.iter_mut() {
                    for c in &case.constants {
                        let cty = c.ty();
                        if !self.is_coercive_subtype(scrut_ty, cty)
                            && !self.is_coercive_subtype(cty, scrut_ty)
                        {
                            return Err(self.syntax_error(
                                ErrorCode::E2003,
                                format!(
                                    "incomparable operands: {} and {}",
                                    self.format_type(scrut_ty),
                                    self.format_type(cty)
                                ),
                                case.span,
                            ));
                        }
                    }
                    self.resolve_block(&mut case.body, arena, env.clone(), fctx)?;
                }
                Ok(env)
            }

            StmtKind::TryCatch { body, catches } => {
                self.resolve_block(body, arena, env.clone(), fctx)?;
                for catch in catches.iter_mut() {
                    let mut catch_env = env.clone();
                    catch_env.bind(catch.var, catch.ty);
                    self.resolve_block(&mut catch.body, arena, catch_env, fctx)?;
                }
                Ok(env)
            }

            StmtKind::Break => Ok(env.into_bottom()),

            StmtKind::Throw { expr } => {
                let expr = *expr;
                self.resolve_expr(arena, expr, &env)?;
                Ok(env.into_bottom())
            }

            StmtKind::While { cond, body } => {
                let cond = *cond;
                let body_env = self.resolve_condition(arena, cond, true, env.clone())?;
                self.resolve_block(body, arena, body_env, fctx)?;
                self.resolve_condition(arena, cond, false, env)
            }

            StmtKind::DoWhile { cond, body } => {
                let cond = *cond;
                let body_out = self.resolve_block(body, arena, env, fctx)?;
                self.resolve_condition(arena, cond, false, body_out)
            }

            StmtKind::ForAll { vars, source, body } => {
                let vars = vars.clone();
                let source = *source;

                let src_ty = self.resolve_expr(arena, source, &env)?;
                let coll = as_effective_collection(self.pool, self.nominals, src_ty)
                    .ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2010,
                            format!(
                                "invalid set or list expression of type {}",
                                self.format_type(src_ty)
                            ),
                            arena[source].span,
                        )
                    })?;

                let mut body_env = env.clone();
                if vars.len() > 1 {
                    // Destructuring is only supported over map sources.
                    let Some((key, value)) = coll.map else {
                        return Err(self.syntax_error(
                            ErrorCode::E2011,
                            format!("invalid map expression of type {}", self.format_type(src_ty)),
                            arena[source].span,
                        ));
                    };
                    if vars.len() != 2 {
                        return Err(self.syntax_error(
                            ErrorCode::E2011,
                            "map iteration destructures into exactly two variables",
                            span,
                        ));
                    }
                    body_env.bind(vars[0], key);
                    body_env.bind(vars[1], value);
                } else {
                    body_env.bind(vars[0], coll.elem);
                }

                self.resolve_block(body, arena, body_env, fctx)?;
                Ok(env)
            }

            StmtKind::Skip => Ok(env),

            StmtKind::Expr { expr } => {
                let expr = *expr;
                self.resolve_expr(arena, expr, &env)?;
                Ok(env)
            }
        }
    }

    fn resolve_assign(
        &mut self,
        arena: &mut ExprArena,
        lhs: ExprId,
        rhs: ExprId,
        mut env: Environment,
        span: Span,
    ) -> Result<Environment> {
        let rhs_ty = self.resolve_expr(arena, rhs, &env)?;

        match arena[lhs].kind.clone() {
            ExprKind::Variable(name) | ExprKind::Local(name) => {
                if env.lookup(name).is_none() {
                    return Err(self.syntax_error(
                        ErrorCode::E2001,
                        format!("unknown variable '{}'", self.interner.resolve(name)),
                        arena[lhs].span,
                    ));
                }
                arena.rewrite(lhs, ExprKind::Local(name));
                arena[lhs].ty = rhs_ty;
                // Strong update: the variable now holds the assigned type.
                env.bind(name, rhs_ty);
                Ok(env)
            }

            // Rational destructuring `n / d = e`.
            ExprKind::Binary {
                op: BinaryOp::Div,
                lhs: num,
                rhs: den,
            } => {
                self.check_is_subtype(TypeId::REAL, rhs_ty, arena[rhs].span)?;
                for part in [num, den] {
                    let (ExprKind::Variable(name) | ExprKind::Local(name)) = arena[part].kind
                    else {
                        return Err(self.syntax_error(
                            ErrorCode::E3005,
                            "invalid assignment target",
                            arena[part].span,
                        ));
                    };
                    if env.lookup(name).is_none() {
                        return Err(self.syntax_error(
                            ErrorCode::E2001,
                            format!("unknown variable '{}'", self.interner.resolve(name)),
                            arena[part].span,
                        ));
                    }
                    arena.rewrite(part, ExprKind::Local(name));
                    arena[part].ty = TypeId::INT;
                    env.bind(name, TypeId::INT);
                }
                arena[lhs].ty = rhs_ty;
                Ok(env)
            }

            // Tuple destructuring `x, y = e`.
            ExprKind::TupleLit(elems) => {
                let tuple = as_effective_tuple(self.pool, self.nominals, rhs_ty)
                    .ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2007,
                            format!("expected a tuple, found {}", self.format_type(rhs_ty)),
                            arena[rhs].span,
                        )
                    })?;
                if self.pool.tuple_len(tuple) != elems.len() {
                    return Err(self.syntax_error(
                        ErrorCode::E2006,
                        format!(
                            "expected {} assignment targets, found {}",
                            self.pool.tuple_len(tuple),
                            elems.len()
                        ),
                        span,
                    ));
                }
                for (i, &part) in elems.iter().enumerate() {
                    let elem_ty = self.pool.tuple_elem(tuple, i);
                    let (ExprKind::Variable(name) | ExprKind::Local(name)) = arena[part].kind
                    else {
                        return Err(self.syntax_error(
                            ErrorCode::E3005,
                            "invalid assignment target",
                            arena[part].span,
                        ));
                    };
                    if env.lookup(name).is_none() {
                        return Err(self.syntax_error(
                            ErrorCode::E2001,
                            format!("unknown variable '{}'", self.interner.resolve(name)),
                            arena[part].span,
                        ));
                    }
                    arena.rewrite(part, ExprKind::Local(name));
                    arena[part].ty = elem_ty;
                    env.bind(name, elem_ty);
                }
                arena[lhs].ty = tuple;
                arena[lhs].src_ty = tuple;
                Ok(env)
            }

            // Path assignment `x.f[i].g = e`: type the whole path, then
            // require the assigned value to fit its type.
            ExprKind::Access { .. }
            | ExprKind::FieldAccess { .. }
            | ExprKind::IndexOf { .. }
            | ExprKind::ListAccess { .. }
            | ExprKind::StringAccess { .. }
            | ExprKind::MapAccess { .. }
            | ExprKind::Dereference(_) => {
                let lhs_ty = self.resolve_expr(arena, lhs, &env)?;
                self.check_is_subtype(lhs_ty, rhs_ty, arena[rhs].span)?;
                Ok(env)
            }

            _ => Err(self.syntax_error(ErrorCode::E3005, "invalid assignment target", span)),
        }
    }

    /// Bind the variables of a destructuring pattern against a type.
    fn bind_pattern(
        &mut self,
        pattern: &Pattern,
        ty: TypeId,
        env: &mut Environment,
        span: Span,
    ) -> Result<()> {
        match pattern {
            Pattern::Leaf(Some(name)) => {
                env.bind(*name, ty);
                Ok(())
            }
            Pattern::Leaf(None) => Ok(()),

            Pattern::Record(fields) => {
                let rec = as_effective_record(self.pool, self.nominals, ty).ok_or_else(|| {
                    self.syntax_error(
                        ErrorCode::E2004,
                        format!("record type required, found {}", self.format_type(ty)),
                        span,
                    )
                })?;
                for (name, sub) in fields {
                    let field_ty = self.pool.record_field_type(rec, *name).ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2005,
                            format!("record has no field '{}'", self.interner.resolve(*name)),
                            span,
                        )
                    })?;
                    self.bind_pattern(sub, field_ty, env, span)?;
                }
                Ok(())
            }

            Pattern::Tuple(elems) => {
                let tuple = as_effective_tuple(self.pool, self.nominals, ty).ok_or_else(|| {
                    self.syntax_error(
                        ErrorCode::E2007,
                        format!("expected a tuple, found {}", self.format_type(ty)),
                        span,
                    )
                })?;
                if self.pool.tuple_len(tuple) != elems.len() {
                    return Err(self.syntax_error(
                        ErrorCode::E2006,
                        format!(
                            "pattern has {} elements but the type has {}",
                            elems.len(),
                            self.pool.tuple_len(tuple)
                        ),
                        span,
                    ));
                }
                for (i, sub) in elems.iter().enumerate() {
                    let elem_ty = self.pool.tuple_elem(tuple, i);
                    self.bind_pattern(sub, elem_ty, env, span)?;
                }
                Ok(())
            }

            Pattern::Rational { num, den } => {
                self.bind_pattern(num, TypeId::INT, env, span)?;
                self.bind_pattern(den, TypeId::INT, env, span)
            }
        }
    }
}

#[cfg(test)]
mod tests;
