//! Register-based IR generation.
//!
//! Lowers resolved declarations into labelled blocks of IR instructions:
//! statements become goto graphs, conditions become short-circuit branch
//! sequences, lambdas become synthesized top-level functions, and
//! destructuring patterns become field/tuple load chains. The resolver
//! must have run first; every expression consumed here carries its
//! resolved types.

mod cond;
mod env;
mod expr;
mod pattern;
mod stmt;

pub use env::Frame;

use rill_diagnostic::{CompileError, ErrorCode, InternalFailure, SyntaxError};
use rill_ir::{
    Code, CodeBlock, Comparator, Constant, Decl, DeclKind, ExprArena, ExprId, IrConstant, IrDecl,
    IrFunction, IrModule, IrType, Label, Module, Name, QName, SourceAttr, Span, TypeId,
};
use rill_types::{NominalTable, Pool};

/// Lexical scope stack entry; `break` branches to the label of the
/// nearest enclosing one.
pub(crate) struct BreakScope {
    pub label: Label,
}

/// Per-function lowering context.
pub(crate) struct FnCtx {
    /// Declared return type; governs the type on `Return` instructions.
    pub ret: TypeId,
}

/// The code generator. One per module.
pub struct Generator<'a> {
    pub(crate) pool: &'a mut Pool,
    pub(crate) interner: &'a rill_ir::StringInterner,
    pub(crate) nominals: &'a NominalTable,
    file: Name,
    module: Name,
    /// Functions synthesized from lambda literals, appended to the module
    /// declarations once generation completes.
    pub(crate) lambdas: Vec<IrFunction>,
    /// Stack of enclosing loop scopes for `break` resolution.
    pub(crate) scopes: Vec<BreakScope>,
}

impl<'a> Generator<'a> {
    pub fn new(
        pool: &'a mut Pool,
        interner: &'a rill_ir::StringInterner,
        nominals: &'a NominalTable,
        module: &Module,
    ) -> Self {
        Generator {
            pool,
            interner,
            nominals,
            file: module.file,
            module: module.name,
            lambdas: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Lower a resolved module to IR, translating declarations in order of
    /// appearance and appending synthesized lambda functions at the end.
    pub fn generate_module(
        mut self,
        module: &Module,
        arena: &mut ExprArena,
    ) -> rill_diagnostic::Result<IrModule> {
        let mut decls = Vec::with_capacity(module.decls.len());
        for decl in &module.decls {
            decls.push(self.generate_decl(decl, arena)?);
        }
        decls.extend(self.lambdas.drain(..).map(IrDecl::Function));
        Ok(IrModule {
            name: module.name,
            file: module.file,
            decls,
        })
    }

    /// Lower a single declaration.
    pub fn generate_decl(
        &mut self,
        decl: &Decl,
        arena: &mut ExprArena,
    ) -> rill_diagnostic::Result<IrDecl> {
        match &decl.kind {
            DeclKind::Constant(cd) => Ok(IrDecl::Constant(IrConstant {
                name: cd.name,
                value: cd.value.clone(),
            })),
            DeclKind::Type(td) => self.generate_type_decl(td, decl.span, arena),
            DeclKind::Function(fd) => self.generate_function_decl(fd, decl.span, arena),
        }
    }

    /// Lower a type declaration. The invariant block receives the root
    /// value in register 0, destructures the declared pattern, and asserts
    /// the invariant expression.
    fn generate_type_decl(
        &mut self,
        td: &rill_ir::TypeDecl,
        span: Span,
        arena: &mut ExprArena,
    ) -> rill_diagnostic::Result<IrDecl> {
        tracing::debug!(name = ?td.name, "generating type declaration");
        let invariant = match td.invariant {
            None => None,
            Some(inv) => {
                let mut block = CodeBlock::new(1);
                let mut frame = Frame::new();
                let root = frame.allocate(td.ty);
                self.add_declared_variables(
                    root,
                    &td.pattern,
                    td.ty,
                    &mut frame,
                    Some(&mut block),
                    span,
                )?;
                self.generate_check(
                    inv,
                    "type invariant not satisfied",
                    &mut frame,
                    &mut block,
                    arena,
                )?;
                Some(block)
            }
        };

        Ok(IrDecl::Type(IrType {
            name: td.name,
            ty: td.ty,
            invariant,
        }))
    }

    /// Lower a function or method declaration: precondition and
    /// postcondition blocks from the `requires`/`ensures` clauses, then
    /// the body with an implicit final return.
    fn generate_function_decl(
        &mut self,
        fd: &rill_ir::FunctionDecl,
        span: Span,
        arena: &mut ExprArena,
    ) -> rill_diagnostic::Result<IrDecl> {
        tracing::debug!(name = ?fd.name, "generating function declaration");
        let ftype = fd.ty;
        let ret = self.pool.fn_ret(ftype);
        let nparams = fd.params.len() as u32;

        // Parameters occupy consecutive registers from 0 in declaration
        // order.
        let mut frame = Frame::new();
        for (i, &p) in fd.params.iter().enumerate() {
            let ty = self.pool.fn_param(ftype, i);
            frame.allocate_named(ty, p);
        }

        // Precondition: its own frame, parameters at registers 0..n.
        let precondition = if fd.requires.is_empty() {
            None
        } else {
            let mut pre_frame = Frame::new();
            for (i, &p) in fd.params.iter().enumerate() {
                let ty = self.pool.fn_param(ftype, i);
                pre_frame.allocate_named(ty, p);
            }
            let mut block = CodeBlock::new(nparams);
            for &clause in &fd.requires {
                self.generate_check(
                    clause,
                    "precondition not satisfied",
                    &mut pre_frame,
                    &mut block,
                    arena,
                )?;
            }
            Some(block)
        };

        // Postcondition: register 0 holds the return value, parameters
        // follow.
        let postcondition = if fd.ensures.is_empty() {
            None
        } else {
            let mut post_frame = Frame::new();
            let root = post_frame.allocate(ret);
            for (i, &p) in fd.params.iter().enumerate() {
                let ty = self.pool.fn_param(ftype, i);
                post_frame.allocate_named(ty, p);
            }
            let mut block = CodeBlock::new(nparams + 1);
            self.add_declared_variables(
                root,
                &fd.ret_pattern,
                ret,
                &mut post_frame,
                Some(&mut block),
                span,
            )?;
            for &clause in &fd.ensures {
                self.generate_check(
                    clause,
                    "postcondition not satisfied",
                    &mut post_frame,
                    &mut block,
                    arena,
                )?;
            }
            Some(block)
        };

        // Body. The trailing bare return guarantees every path ends in a
        // return; when a value is required it is either dead code or a
        // caught error downstream.
        let mut block = CodeBlock::new(nparams);
        let ctx = FnCtx { ret };
        for stmt in &fd.body {
            self.generate_stmt(stmt, &ctx, &mut frame, &mut block, arena)?;
        }
        block.append(Code::ret(), SourceAttr::new(span, self.file));

        Ok(IrDecl::Function(IrFunction {
            name: fd.name,
            ty: ftype,
            body: block,
            precondition,
            postcondition,
            synthetic: false,
        }))
    }

    /// Lower a boolean contract clause: evaluate it and assert it equals
    /// `true`.
    fn generate_check(
        &mut self,
        clause: ExprId,
        msg: &str,
        frame: &mut Frame,
        block: &mut CodeBlock,
        arena: &mut ExprArena,
    ) -> rill_diagnostic::Result<()> {
        let attr = self.attr(arena[clause].span);
        let cond = self.generate_expr(clause, frame, block, arena)?;
        let expected = frame.allocate(TypeId::BOOL);
        block.append(
            Code::Const {
                target: expected,
                value: Constant::Bool(true),
            },
            attr,
        );
        block.append(
            Code::Assert {
                ty: TypeId::BOOL,
                lhs: cond,
                rhs: expected,
                op: Comparator::Eq,
                msg: msg.to_owned(),
            },
            attr,
        );
        Ok(())
    }

    // === Shared helpers ===

    pub(crate) fn attr(&self, span: Span) -> SourceAttr {
        SourceAttr::new(span, self.file)
    }

    pub(crate) fn module_name(&self) -> Name {
        self.module
    }

    pub(crate) fn qualify(&self, module: Option<Name>, name: Name) -> QName {
        QName::new(module.unwrap_or(self.module), name)
    }

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

    /// The nearest enclosing break scope's label.
    pub(crate) fn enclosing_break(&self) -> Option<Label> {
        self.scopes.last().map(|s| s.label)
    }
}
