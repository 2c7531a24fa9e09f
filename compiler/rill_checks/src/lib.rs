//! Runtime assertion insertion.
//!
//! Rewrites generated IR, splicing a small check block in front of the
//! instructions that need one:
//! - `Invoke` of a callee with a precondition: the precondition block is
//!   cloned under a binding from its formal parameter registers to the
//!   caller's operand registers;
//! - `IndexOf` on a list or string: a negative-index check and a
//!   less-than-length check;
//! - integer/real division: a divisor-is-nonzero check;
//! - `Return` with a value when the function has a postcondition: the
//!   postcondition block is cloned with its return slot bound to the
//!   returned register and each parameter slot bound to the *shadow*
//!   register saved at function entry.
//!
//! The pass is pure over its input; assertions either pass at runtime or
//! fail the program.

use rustc_hash::FxHashMap;

use rill_diagnostic::CompileError;
use rill_ir::{
    Code, CodeBlock, Comparator, Constant, IrDecl, IrFunction, IrModule, IrType, QName, Reg,
    SourceAttr, TypeId,
};
use rill_types::{as_effective_list, NominalTable, Pool};

/// Where callee contracts come from. The host implements this over its
/// loaded modules; [`IrModule`] implements it for the single-module case.
pub trait PreconditionSource {
    /// The precondition block of `name` with signature `ty`, if any.
    fn precondition(&self, name: QName, ty: TypeId) -> Option<&CodeBlock>;
}

impl PreconditionSource for IrModule {
    fn precondition(&self, name: QName, ty: TypeId) -> Option<&CodeBlock> {
        if name.module != self.name {
            return None;
        }
        self.decls.iter().find_map(|d| match d {
            IrDecl::Function(f) if f.name == name.name && f.ty == ty => {
                f.precondition.as_ref()
            }
            _ => None,
        })
    }
}

/// The runtime-assertion rewriter.
pub struct RuntimeAssertions<'a> {
    pool: &'a mut Pool,
    nominals: &'a NominalTable,
    source: &'a dyn PreconditionSource,
}

impl<'a> RuntimeAssertions<'a> {
    pub fn new(
        pool: &'a mut Pool,
        nominals: &'a NominalTable,
        source: &'a dyn PreconditionSource,
    ) -> Self {
        RuntimeAssertions {
            pool,
            nominals,
            source,
        }
    }

    /// Transform every declaration of a module.
    pub fn transform_module(&mut self, module: &IrModule) -> Result<IrModule, CompileError> {
        tracing::debug!(module = ?module.name, "inserting runtime assertions");
        let mut decls = Vec::with_capacity(module.decls.len());
        for decl in &module.decls {
            decls.push(self.transform_decl(decl)?);
        }
        Ok(IrModule {
            name: module.name,
            file: module.file,
            decls,
        })
    }

    /// Transform a single declaration.
    pub fn transform_decl(&mut self, decl: &IrDecl) -> Result<IrDecl, CompileError> {
        match decl {
            IrDecl::Constant(c) => Ok(IrDecl::Constant(c.clone())),
            IrDecl::Type(t) => Ok(IrDecl::Type(self.transform_type(t)?)),
            IrDecl::Function(f) => Ok(IrDecl::Function(self.transform_function(f)?)),
        }
    }

    fn transform_type(&mut self, decl: &IrType) -> Result<IrType, CompileError> {
        let invariant = match &decl.invariant {
            None => None,
            Some(block) => {
                let free_slot = block.num_slots();
                let mut out = CodeBlock::new(block.num_inputs());
                for i in 0..block.len() {
                    let entry = block.get(i);
                    self.prepend_checks(&entry.code, entry.attr, free_slot, None, &mut out)?;
                    out.append(entry.code.clone(), entry.attr);
                }
                Some(out)
            }
        };
        Ok(IrType {
            name: decl.name,
            ty: decl.ty,
            invariant,
        })
    }

    fn transform_function(&mut self, decl: &IrFunction) -> Result<IrFunction, CompileError> {
        let body = &decl.body;
        let params = self.pool.fn_params(decl.ty);
        let mut out = CodeBlock::new(body.num_inputs());

        // Shadow copies of the parameters on entry: the postcondition
        // refers to parameter values as they were when the function was
        // called, so they must survive later reassignment.
        let shadow_base = body.num_slots();
        let mut free_slot = shadow_base;
        let post = decl.postcondition.as_ref().map(|p| {
            for (i, &ty) in params.iter().enumerate() {
                out.append(
                    Code::Assign {
                        ty,
                        target: Reg::from_raw(shadow_base + i as u32),
                        operand: Reg::from_raw(i as u32),
                    },
                    SourceAttr::SYNTHETIC,
                );
            }
            free_slot += params.len() as u32;
            (p, shadow_base)
        });

        for i in 0..body.len() {
            let entry = body.get(i);
            self.prepend_checks(
                &entry.code,
                entry.attr,
                free_slot,
                post.map(|(p, base)| (p, base, params.len())),
                &mut out,
            )?;
            out.append(entry.code.clone(), entry.attr);
        }

        Ok(IrFunction {
            name: decl.name,
            ty: decl.ty,
            body: out,
            precondition: decl.precondition.clone(),
            postcondition: decl.postcondition.clone(),
            synthetic: decl.synthetic,
        })
    }

    /// Emit the check block for one instruction, if it needs one.
    fn prepend_checks(
        &mut self,
        code: &Code,
        attr: SourceAttr,
        free_slot: u32,
        post: Option<(&CodeBlock, u32, usize)>,
        out: &mut CodeBlock,
    ) -> Result<(), CompileError> {
        match code {
            // Inline the callee's precondition under a binding from its
            // formals to the caller's operands.
            Code::Invoke {
                ty,
                operands,
                name,
                ..
            } => {
                if let Some(pre) = self.source.precondition(*name, *ty) {
                    let binding: FxHashMap<u32, u32> = operands
                        .iter()
                        .enumerate()
                        .map(|(i, r)| (i as u32, r.raw()))
                        .collect();
                    out.import_external(pre, &binding, attr);
                }
                Ok(())
            }

            // Bounds checks for list and string accesses; map lookups are
            // unchecked here.
            Code::IndexOf {
                ty, src, index, ..
            } => {
                if self.is_bounds_checked(*ty) {
                    let zero = Reg::from_raw(free_slot);
                    let len = Reg::from_raw(free_slot + 1);
                    out.append(
                        Code::Const {
                            target: zero,
                            value: Constant::Int(0),
                        },
                        attr,
                    );
                    out.append(
                        Code::Assert {
                            ty: TypeId::INT,
                            lhs: *index,
                            rhs: zero,
                            op: Comparator::GtEq,
                            msg: "index out of bounds (negative)".to_owned(),
                        },
                        attr,
                    );
                    out.append(
                        Code::LengthOf {
                            ty: *ty,
                            target: len,
                            operand: *src,
                        },
                        attr,
                    );
                    out.append(
                        Code::Assert {
                            ty: TypeId::INT,
                            lhs: *index,
                            rhs: len,
                            op: Comparator::Lt,
                            msg: "index out of bounds (not less than length)".to_owned(),
                        },
                        attr,
                    );
                }
                Ok(())
            }

            // Division by zero.
            Code::BinArithOp {
                ty,
                kind: rill_ir::BinArithKind::Div,
                rhs,
                ..
            } => {
                let zero_reg = Reg::from_raw(free_slot);
                let zero = if *ty == TypeId::INT {
                    Constant::Int(0)
                } else {
                    Constant::real(0.0)
                };
                out.append(
                    Code::Const {
                        target: zero_reg,
                        value: zero,
                    },
                    attr,
                );
                out.append(
                    Code::Assert {
                        ty: *ty,
                        lhs: *rhs,
                        rhs: zero_reg,
                        op: Comparator::Neq,
                        msg: "division by zero".to_owned(),
                    },
                    attr,
                );
                Ok(())
            }

            // Postcondition at value returns: return slot 0 binds to the
            // returned register, parameter slots bind to their shadows.
            Code::Return { ty, operand } => {
                if *ty != TypeId::VOID {
                    if let Some((postcondition, shadow_base, nparams)) = post {
                        let mut binding: FxHashMap<u32, u32> = FxHashMap::default();
                        binding.insert(0, operand.raw());
                        for i in 0..nparams {
                            binding.insert(1 + i as u32, shadow_base + i as u32);
                        }
                        out.import_external(postcondition, &binding, attr);
                    }
                }
                Ok(())
            }

            _ => Ok(()),
        }
    }

    /// True when an `IndexOf` over `ty` requires bounds checks: effective
    /// lists and strings, not maps.
    fn is_bounds_checked(&mut self, ty: TypeId) -> bool {
        if self.nominals.expand_fully(self.pool, ty) == TypeId::STRING {
            return true;
        }
        as_effective_list(self.pool, self.nominals, ty).is_some()
    }
}

/// Convenience entry point: transform a module against its own callees.
pub fn transform(
    pool: &mut Pool,
    nominals: &NominalTable,
    module: &IrModule,
) -> Result<IrModule, CompileError> {
    let source = module.clone();
    RuntimeAssertions::new(pool, nominals, &source).transform_module(module)
}

#[cfg(test)]
mod tests;
