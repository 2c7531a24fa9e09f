//! Abstract syntax tree.

pub mod decl;
pub mod expr;
pub mod ops;
pub mod pattern;
pub mod stmt;

pub use decl::{ConstantDecl, Decl, DeclKind, FunctionDecl, Module, TypeDecl};
pub use expr::{Expr, ExprId, ExprKind};
pub use ops::{BinaryOp, CompKind, UnaryOp};
pub use pattern::Pattern;
pub use stmt::{Catch, Stmt, StmtKind, SwitchCase};
