//! AST, intermediate representation and shared identifiers for the Rill
//! compiler.
//!
//! This crate is the vocabulary of the front-end: interned [`Name`]s,
//! [`Span`]s, the canonical [`TypeId`] handle, the expression arena and AST
//! node types, and the register-based IR that code generation produces.
//! It has no compilation logic of its own.

pub mod arena;
pub mod ast;
pub mod constant;
pub mod interner;
pub mod ir;
pub mod name;
pub mod span;
pub mod type_id;

pub use arena::ExprArena;
pub use ast::{
    BinaryOp, Catch, CompKind, ConstantDecl, Decl, DeclKind, Expr, ExprId, ExprKind, FunctionDecl,
    Module, Pattern, Stmt, StmtKind, SwitchCase, TypeDecl, UnaryOp,
};
pub use constant::{Constant, RealBits};
pub use interner::StringInterner;
pub use ir::{
    BinArithKind, BinListKind, BinSetKind, BinStringKind, Code, CodeBlock, Comparator, Entry,
    IrConstant, IrDecl, IrFunction, IrModule, IrType, Label, Reg, Regs, UnArithKind,
};
pub use name::{Name, QName};
pub use span::{SourceAttr, Span};
pub use type_id::TypeId;
