//! Pattern destructuring.
//!
//! Walks a declaration pattern alongside its type, allocating a register
//! per bound position and emitting the field/tuple loads that populate it
//! from the root value. Variable declarations without an initializer pass
//! `None` for the block: the registers (and name bindings) are still
//! allocated, but no code is emitted, since there is nothing to
//! destructure yet.

use rill_diagnostic::ErrorCode;
use rill_ir::{Code, CodeBlock, Pattern, Reg, Span, TypeId, UnArithKind};
use rill_types::{as_effective_record, as_effective_tuple};

use crate::{Frame, Generator};

impl Generator<'_> {
    pub(crate) fn add_declared_variables(
        &mut self,
        root: Reg,
        pattern: &Pattern,
        ty: TypeId,
        frame: &mut Frame,
        mut block: Option<&mut CodeBlock>,
        span: Span,
    ) -> rill_diagnostic::Result<()> {
        let attr = self.attr(span);
        match pattern {
            Pattern::Leaf(Some(name)) => {
                frame.bind(*name, root);
                Ok(())
            }
            Pattern::Leaf(None) => Ok(()),

            Pattern::Record(fields) => {
                let rec = as_effective_record(self.pool, self.nominals, ty).ok_or_else(|| {
                    self.syntax_error(ErrorCode::E2004, "record type required", span)
                })?;
                for (field, sub) in fields {
                    let field_ty =
                        self.pool.record_field_type(rec, *field).ok_or_else(|| {
                            self.syntax_error(
                                ErrorCode::E2005,
                                format!(
                                    "record has no field '{}'",
                                    self.interner.resolve(*field)
                                ),
                                span,
                            )
                        })?;
                    let target = frame.allocate(field_ty);
                    if let Some(block) = block.as_deref_mut() {
                        block.append(
                            Code::FieldLoad {
                                ty: rec,
                                target,
                                operand: root,
                                field: *field,
                            },
                            attr,
                        );
                    }
                    self.add_declared_variables(
                        target,
                        sub,
                        field_ty,
                        frame,
                        block.as_deref_mut(),
                        span,
                    )?;
                }
                Ok(())
            }

            Pattern::Tuple(elems) => {
                let tuple = as_effective_tuple(self.pool, self.nominals, ty).ok_or_else(|| {
                    self.syntax_error(ErrorCode::E2007, "tuple type required", span)
                })?;
                for (i, sub) in elems.iter().enumerate() {
                    let elem_ty = self.pool.tuple_elem(tuple, i);
                    let target = frame.allocate(elem_ty);
                    if let Some(block) = block.as_deref_mut() {
                        block.append(
                            Code::TupleLoad {
                                ty: tuple,
                                target,
                                operand: root,
                                index: i as u32,
                            },
                            attr,
                        );
                    }
                    self.add_declared_variables(
                        target,
                        sub,
                        elem_ty,
                        frame,
                        block.as_deref_mut(),
                        span,
                    )?;
                }
                Ok(())
            }

            Pattern::Rational { num, den } => {
                let num_reg = frame.allocate(TypeId::INT);
                let den_reg = frame.allocate(TypeId::INT);
                if let Some(block) = block.as_deref_mut() {
                    block.append(
                        Code::UnArithOp {
                            ty: TypeId::REAL,
                            kind: UnArithKind::Numerator,
                            target: num_reg,
                            operand: root,
                        },
                        attr,
                    );
                    block.append(
                        Code::UnArithOp {
                            ty: TypeId::REAL,
                            kind: UnArithKind::Denominator,
                            target: den_reg,
                            operand: root,
                        },
                        attr,
                    );
                }
                self.add_declared_variables(
                    num_reg,
                    num,
                    TypeId::INT,
                    frame,
                    block.as_deref_mut(),
                    span,
                )?;
                self.add_declared_variables(den_reg, den, TypeId::INT, frame, block, span)
            }
        }
    }
}
