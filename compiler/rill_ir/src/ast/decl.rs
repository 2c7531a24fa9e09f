//! Top-level declarations.

use super::pattern::Pattern;
use super::stmt::Stmt;
use crate::{Constant, ExprId, Name, Span, TypeId};

/// A source module: the unit handed to the resolver and code generator.
#[derive(Clone, Debug)]
pub struct Module {
    /// Module name (used to qualify generated lambda functions).
    pub name: Name,
    /// Interned source file name, attached to every emitted instruction.
    pub file: Name,
    pub decls: Vec<Decl>,
}

/// A top-level declaration.
#[derive(Clone, Debug)]
pub struct Decl {
    pub kind: DeclKind,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum DeclKind {
    Constant(ConstantDecl),
    Type(TypeDecl),
    Function(FunctionDecl),
}

/// `constant name is value` — the value is evaluated by the host before
/// code generation.
#[derive(Clone, Debug)]
pub struct ConstantDecl {
    pub name: Name,
    pub value: Constant,
}

/// `type name is pattern where invariant`.
#[derive(Clone, Debug)]
pub struct TypeDecl {
    pub name: Name,
    pub ty: TypeId,
    pub pattern: Pattern,
    pub invariant: Option<ExprId>,
}

/// A function or method declaration. Whether it is a method is determined
/// by the tag of `ty` in the type pool.
#[derive(Clone, Debug)]
pub struct FunctionDecl {
    pub name: Name,
    /// Parameter names, in declaration order; types live in `ty`.
    pub params: Vec<Name>,
    /// The full function or method type.
    pub ty: TypeId,
    /// Pattern for the return value, used when lowering `ensures` clauses.
    pub ret_pattern: Pattern,
    /// Precondition clauses.
    pub requires: Vec<ExprId>,
    /// Postcondition clauses.
    pub ensures: Vec<ExprId>,
    pub body: Vec<Stmt>,
}
