//! Error types for the Rill compiler front-end.
//!
//! Two user-visible kinds (spec'd by the language, not the compiler):
//! - [`SyntaxError`]: a mistake in the program being compiled.
//! - [`InternalFailure`]: a bug in the compiler itself, kept as a distinct
//!   type so that callers can tell the two apart.
//!
//! [`ResolveError`] is the low-level name-resolution failure; the resolver
//! and code generator catch it at their dispatch boundaries and rewrap it
//! as a `SyntaxError`.

mod code;

pub use code::ErrorCode;

use rill_ir::{Name, Span};
use thiserror::Error;

/// A user-facing error in the compiled program.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("{code}: {message} ({span})")]
pub struct SyntaxError {
    pub code: ErrorCode,
    pub message: String,
    /// Interned source file name.
    pub file: Name,
    pub span: Span,
}

impl SyntaxError {
    pub fn new(code: ErrorCode, message: impl Into<String>, file: Name, span: Span) -> Self {
        SyntaxError {
            code,
            message: message.into(),
            file,
            span,
        }
    }
}

/// A compiler bug: an unknown AST kind, or dead code reached.
///
/// Raised by the covering default arms of resolver and code generator
/// dispatch tables. Not a recovery path.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("internal failure: {message} ({span})")]
pub struct InternalFailure {
    pub message: String,
    pub file: Name,
    pub span: Span,
}

impl InternalFailure {
    pub fn new(message: impl Into<String>, file: Name, span: Span) -> Self {
        InternalFailure {
            message: message.into(),
            file,
            span,
        }
    }
}

/// Low-level name-resolution failure from the nominal table or module
/// registry.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("unable to resolve {0}")]
pub struct ResolveError(pub String);

/// Any error a core entry point can produce.
#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
    #[error(transparent)]
    Internal(#[from] InternalFailure),
}

impl CompileError {
    /// The error code, when user-facing.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            CompileError::Syntax(e) => Some(e.code),
            CompileError::Internal(_) => None,
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Syntax(e) => e.span,
            CompileError::Internal(e) => e.span,
        }
    }
}

/// Convenience result alias used across the front-end.
pub type Result<T> = std::result::Result<T, CompileError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_error_displays_code_and_span() {
        let e = SyntaxError::new(ErrorCode::E2001, "unknown variable 'x'", Name::EMPTY, Span::new(3, 4));
        assert_eq!(e.to_string(), "E2001: unknown variable 'x' (3..4)");
    }

    #[test]
    fn compile_error_distinguishes_kinds() {
        let s: CompileError =
            SyntaxError::new(ErrorCode::E3001, "break outside loop", Name::EMPTY, Span::DUMMY)
                .into();
        let i: CompileError =
            InternalFailure::new("unknown statement", Name::EMPTY, Span::DUMMY).into();
        assert_eq!(s.code(), Some(ErrorCode::E3001));
        assert_eq!(i.code(), None);
    }
}
