//! Register-based intermediate representation.

pub mod block;
pub mod code;
pub mod decl;

pub use block::{CodeBlock, Entry};
pub use code::{
    BinArithKind, BinListKind, BinSetKind, BinStringKind, Code, Comparator, Label, Reg, Regs,
    UnArithKind,
};
pub use decl::{IrConstant, IrDecl, IrFunction, IrModule, IrType};
