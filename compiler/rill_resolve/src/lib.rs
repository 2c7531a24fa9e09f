//! Flow-sensitive type resolver.
//!
//! Types every expression bottom-up, refines variable types across
//! conditional control flow, and disambiguates abstract AST nodes into
//! concrete ones (an `IndexOf` becomes a list, string or map access; an
//! abstract invoke becomes a direct call, an indirect call through a
//! local, or a field access plus indirect call). Nodes are rewritten in
//! place through the expression arena, so the typed AST that code
//! generation consumes is the same tree the parser produced.

mod condition;
mod env;
mod expr;
mod registry;
mod stmt;

pub use env::{join, Environment};
pub use registry::ModuleRegistry;

use rill_diagnostic::{CompileError, ErrorCode, InternalFailure, SyntaxError};
use rill_ir::{ExprArena, Module, Name, QName, Span, StringInterner, TypeId};
use rill_types::{format_type, is_implicit_coercive_subtype, NominalTable, Pool, SubtypeEngine};

/// The resolver. One per module; borrows the shared type machinery.
pub struct Resolver<'a> {
    pub pool: &'a mut Pool,
    pub interner: &'a StringInterner,
    pub nominals: &'a NominalTable,
    pub registry: &'a ModuleRegistry,
    /// Interned file name of the module, for diagnostics.
    file: Name,
    /// Module being compiled; unqualified calls resolve against it.
    module: Name,
}

impl<'a> Resolver<'a> {
    pub fn new(
        pool: &'a mut Pool,
        interner: &'a StringInterner,
        nominals: &'a NominalTable,
        registry: &'a ModuleRegistry,
        module: &Module,
    ) -> Self {
        Resolver {
            pool,
            interner,
            nominals,
            registry,
            file: module.file,
            module: module.name,
        }
    }

    /// Resolve every declaration of a module in place.
    pub fn resolve_module(
        &mut self,
        module: &mut Module,
        arena: &mut ExprArena,
    ) -> rill_diagnostic::Result<()> {
        for decl in &mut module.decls {
            self.resolve_decl(decl, arena)?;
        }
        Ok(())
    }

    // === Diagnostics helpers ===

    pub(crate) fn syntax_error(
        &self,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
    ) -> CompileError {
        SyntaxError::new(code, message, self.file, span).into()
    }

    pub(crate) fn internal_failure(
        &self,
        message: impl Into<String>,
        span: Span,
    ) -> CompileError {
        InternalFailure::new(message, self.file, span).into()
    }

    pub(crate) fn format_type(&self, ty: TypeId) -> String {
        format_type(self.pool, self.interner, ty)
    }

    // === Type helpers ===

    pub(crate) fn engine(&self) -> SubtypeEngine<'_> {
        SubtypeEngine::new(self.pool, self.interner, self.nominals)
    }

    pub(crate) fn is_coercive_subtype(&self, sup: TypeId, sub: TypeId) -> bool {
        is_implicit_coercive_subtype(self.pool, self.interner, self.nominals, sup, sub)
    }

    /// Check `sup :> sub` under implicit coercion, or fail with a subtype
    /// error at `span`.
    pub(crate) fn check_is_subtype(
        &self,
        sup: TypeId,
        sub: TypeId,
        span: Span,
    ) -> rill_diagnostic::Result<()> {
        if self.is_coercive_subtype(sup, sub) {
            Ok(())
        } else {
            Err(self.syntax_error(
                ErrorCode::E2007,
                format!(
                    "expected type {}, found {}",
                    self.format_type(sup),
                    self.format_type(sub)
                ),
                span,
            ))
        }
    }

    /// Resolve a call target against the registry: `module::name` if
    /// qualified, else the current module. Picks the first overload whose
    /// arity matches and whose parameters accept the argument types.
    pub(crate) fn resolve_as_function(
        &self,
        module: Option<Name>,
        name: Name,
        args: &[TypeId],
        span: Span,
    ) -> rill_diagnostic::Result<(QName, TypeId)> {
        let module = module.unwrap_or(self.module);
        let candidates = self.registry.candidates(module, name);
        if candidates.is_empty() {
            return Err(self.syntax_error(
                ErrorCode::E2002,
                format!("unknown function or method '{}'", self.interner.resolve(name)),
                span,
            ));
        }

        let mut arity_seen = false;
        for &ty in candidates {
            if self.pool.fn_param_count(ty) != args.len() {
                continue;
            }
            arity_seen = true;
            let accepts = (0..args.len())
                .all(|i| self.is_coercive_subtype(self.pool.fn_param(ty, i), args[i]));
            if accepts {
                return Ok((QName::new(module, name), ty));
            }
        }

        if !arity_seen {
            return Err(self.syntax_error(
                ErrorCode::E2006,
                format!(
                    "wrong number of arguments to '{}'",
                    self.interner.resolve(name)
                ),
                span,
            ));
        }
        Err(self.syntax_error(
            ErrorCode::E2002,
            format!(
                "no matching overload of '{}' for the given argument types",
                self.interner.resolve(name)
            ),
            span,
        ))
    }

    /// Resolve a function reference `&f`, optionally parameter-qualified.
    pub(crate) fn resolve_function_ref(
        &self,
        module: Option<Name>,
        name: Name,
        params: Option<&[TypeId]>,
        span: Span,
    ) -> rill_diagnostic::Result<(QName, TypeId)> {
        let module = module.unwrap_or(self.module);
        let candidates = self.registry.candidates(module, name);
        let found = match params {
            Some(params) => candidates.iter().copied().find(|&ty| {
                self.pool.fn_param_count(ty) == params.len()
                    && (0..params.len()).all(|i| self.pool.fn_param(ty, i) == params[i])
            }),
            None => candidates.first().copied(),
        };
        found.map(|ty| (QName::new(module, name), ty)).ok_or_else(|| {
            self.syntax_error(
                ErrorCode::E2002,
                format!("unknown function or method '{}'", self.interner.resolve(name)),
                span,
            )
        })
    }
}
