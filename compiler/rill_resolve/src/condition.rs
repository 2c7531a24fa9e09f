//! Condition resolution with flow-sensitive refinement.
//!
//! `resolve_condition(expr, sign, env)` types a boolean expression and
//! returns the environment that holds *when the condition evaluates to
//! `sign`*. Type tests (`x is T`) and null comparisons on local variables
//! refine the variable's type; the short-circuit connectives thread
//! refinements through their operands and join at the merge.

use rill_diagnostic::ErrorCode;
use rill_ir::{BinaryOp, ExprArena, ExprId, ExprKind, TypeId, UnaryOp};

use crate::{env::join, Environment, Resolver};

type Result<T> = rill_diagnostic::Result<T>;

impl Resolver<'_> {
    /// Resolve `id` as a condition under `sign`, returning the refined
    /// environment for the branch where the condition has that sense.
    pub fn resolve_condition(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        sign: bool,
        env: Environment,
    ) -> Result<Environment> {
        let kind = arena[id].kind.clone();
        match kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => {
                let out = self.resolve_condition(arena, operand, !sign, env)?;
                self.check_is_subtype(TypeId::BOOL, arena[operand].ty, arena[operand].span)?;
                arena[id].ty = TypeId::BOOL;
                Ok(out)
            }

            ExprKind::Binary { op, lhs, rhs } if op.is_logical() => {
                self.resolve_connective(arena, id, op, lhs, rhs, sign, env)
            }

            ExprKind::Binary { op, lhs, rhs } if op.is_leaf_condition() => {
                self.resolve_leaf_condition(arena, id, op, lhs, rhs, sign, env)
            }

            _ => {
                // Any other boolean-valued expression: type-check only.
                let ty = self.resolve_expr(arena, id, &env)?;
                self.check_is_subtype(TypeId::BOOL, ty, arena[id].span)?;
                Ok(env)
            }
        }
    }

    fn resolve_connective(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        sign: bool,
        env: Environment,
    ) -> Result<Environment> {
        // `a && b` under the true sign (and `a || b` under the false sign)
        // evaluate `b` only in the world where `a` already has that sense,
        // so refinements follow on directly.
        let follow_on =
            (sign && op == BinaryOp::And) || (!sign && op == BinaryOp::Or);

        let out = if follow_on {
            let after_lhs = self.resolve_condition(arena, lhs, sign, env.clone())?;
            self.resolve_condition(arena, rhs, sign, after_lhs)?
        } else {
            // Two ways for the condition to have this sense: the lhs alone
            // decides it, or the lhs has the opposite sense and the rhs
            // decides. The rhs is only ever evaluated in the latter world.
            let lhs_env = self.resolve_condition(arena, lhs, sign, env.clone())?;
            let lhs_opposite = self.resolve_condition(arena, lhs, !sign, env.clone())?;
            let rhs_env = self.resolve_condition(arena, rhs, sign, lhs_opposite)?;
            join(self.pool, &lhs_env, &rhs_env)
        };

        self.check_is_subtype(TypeId::BOOL, arena[lhs].ty, arena[lhs].span)?;
        self.check_is_subtype(TypeId::BOOL, arena[rhs].ty, arena[rhs].span)?;
        arena[id].ty = TypeId::BOOL;
        arena[id].src_ty = TypeId::BOOL;
        Ok(out)
    }

    fn resolve_leaf_condition(
        &mut self,
        arena: &mut ExprArena,
        id: ExprId,
        op: BinaryOp,
        lhs: ExprId,
        rhs: ExprId,
        mut sign: bool,
        mut env: Environment,
    ) -> Result<Environment> {
        let span = arena[id].span;
        let lhs_ty = self.resolve_expr(arena, lhs, &env)?;
        let rhs_ty = self.resolve_expr(arena, rhs, &env)?;

        match op {
            // Exclusive-or always evaluates both operands, so neither side
            // establishes anything in the other's world (or downstream):
            // a boolean leaf pair, no refinement in either sign.
            BinaryOp::Xor => {
                self.check_is_subtype(TypeId::BOOL, lhs_ty, arena[lhs].span)?;
                self.check_is_subtype(TypeId::BOOL, rhs_ty, arena[rhs].span)?;
                arena[id].ty = TypeId::BOOL;
                arena[id].src_ty = TypeId::BOOL;
                Ok(env)
            }

            BinaryOp::Is => {
                let ExprKind::TypeVal(test) = arena[rhs].kind else {
                    // No type constant on the right: nothing to refine,
                    // just require a type value.
                    self.check_is_subtype(TypeId::META, rhs_ty, arena[rhs].span)?;
                    arena[id].ty = TypeId::BOOL;
                    arena[id].src_ty = lhs_ty;
                    return Ok(env);
                };

                // Refinement computes on expanded types so the meet
                // simplifies structurally; the nominal wrapper only
                // matters for display.
                let lhs_exp = self.nominals.expand_fully(self.pool, lhs_ty);
                let test_exp = self.nominals.expand_fully(self.pool, test);
                let glb = self.pool.intersect2(lhs_exp, test_exp);
                if !self.engine().is_inhabited(glb) {
                    // Definite false: the test can never succeed.
                    return Err(self.syntax_error(
                        ErrorCode::E2003,
                        format!(
                            "incomparable operands: {} and {}",
                            self.format_type(lhs_ty),
                            self.format_type(test)
                        ),
                        span,
                    ));
                }

                if let ExprKind::Local(var) = arena[lhs].kind {
                    let refined = if sign {
                        glb
                    } else {
                        let negated = self.pool.negation(test_exp);
                        self.pool.intersect2(lhs_exp, negated)
                    };
                    env.bind(var, refined);
                }
                arena[id].ty = TypeId::BOOL;
                arena[id].src_ty = lhs_ty;
                Ok(env)
            }

            BinaryOp::ElementOf => {
                let elem = rill_types::as_effective_list(self.pool, self.nominals, rhs_ty)
                    .or_else(|| rill_types::as_effective_set(self.pool, self.nominals, rhs_ty))
                    .ok_or_else(|| {
                        self.syntax_error(
                            ErrorCode::E2010,
                            format!(
                                "invalid set or list expression of type {}",
                                self.format_type(rhs_ty)
                            ),
                            arena[rhs].span,
                        )
                    })?;
                if !self.is_coercive_subtype(elem, lhs_ty) {
                    return Err(self.syntax_error(
                        ErrorCode::E2003,
                        format!(
                            "incomparable operands: {} and {}",
                            self.format_type(lhs_ty),
                            self.format_type(elem)
                        ),
                        span,
                    ));
                }
                arena[id].ty = TypeId::BOOL;
                arena[id].src_ty = rhs_ty;
                Ok(env)
            }

            BinaryOp::Subset | BinaryOp::SubsetEq => {
                let set_any = self.pool.set(TypeId::ANY);
                self.check_is_subtype(set_any, lhs_ty, arena[lhs].span)?;
                self.check_is_subtype(set_any, rhs_ty, arena[rhs].span)?;
                arena[id].src_ty = self.common_operand_type(lhs_ty, rhs_ty, span)?;
                arena[id].ty = TypeId::BOOL;
                Ok(env)
            }

            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => {
                self.check_is_subtype(TypeId::REAL, lhs_ty, arena[lhs].span)?;
                self.check_is_subtype(TypeId::REAL, rhs_ty, arena[rhs].span)?;
                arena[id].src_ty = self.common_operand_type(lhs_ty, rhs_ty, span)?;
                arena[id].ty = TypeId::BOOL;
                Ok(env)
            }

            BinaryOp::Eq | BinaryOp::NotEq => {
                // `x != null` refines exactly as `!(x is null)`.
                if op == BinaryOp::NotEq {
                    sign = !sign;
                }

                let rhs_is_null =
                    matches!(&arena[rhs].kind, ExprKind::Constant(c) if c.is_null());
                if rhs_is_null {
                    if let ExprKind::Local(var) = arena[lhs].kind {
                        let lhs_exp = self.nominals.expand_fully(self.pool, lhs_ty);
                        let glb = self.pool.intersect2(lhs_exp, TypeId::NULL);
                        if !self.engine().is_inhabited(glb) {
                            return Err(self.syntax_error(
                                ErrorCode::E2003,
                                format!(
                                    "incomparable operands: {} and null",
                                    self.format_type(lhs_ty)
                                ),
                                span,
                            ));
                        }
                        let refined = if sign {
                            glb
                        } else {
                            let not_null = self.pool.negation(TypeId::NULL);
                            self.pool.intersect2(lhs_exp, not_null)
                        };
                        env.bind(var, refined);
                        arena[id].ty = TypeId::BOOL;
                        arena[id].src_ty = lhs_ty;
                        return Ok(env);
                    }
                }

                arena[id].src_ty = self.common_operand_type(lhs_ty, rhs_ty, span)?;
                arena[id].ty = TypeId::BOOL;
                Ok(env)
            }

            _ => Err(self.syntax_error(
                ErrorCode::E2008,
                format!("invalid boolean expression '{op}'"),
                span,
            )),
        }
    }

    /// The operand type a comparison is performed at: whichever side the
    /// other coerces into.
    fn common_operand_type(
        &self,
        lhs_ty: TypeId,
        rhs_ty: TypeId,
        span: rill_ir::Span,
    ) -> Result<TypeId> {
        if self.is_coercive_subtype(lhs_ty, rhs_ty) {
            Ok(lhs_ty)
        } else if self.is_coercive_subtype(rhs_ty, lhs_ty) {
            Ok(rhs_ty)
        } else {
            Err(self.syntax_error(
                ErrorCode::E2003,
                format!(
                    "incomparable operands: {} and {}",
                    self.format_type(lhs_ty),
                    self.format_type(rhs_ty)
                ),
                span,
            ))
        }
    }
}
