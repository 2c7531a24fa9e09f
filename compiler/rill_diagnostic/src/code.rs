//! Error codes for all compiler diagnostics.
//!
//! Each code is a unique identifier with the first digit indicating the
//! phase. All codes are declared in a single [`define_error_codes!`]
//! invocation; the macro generates the enum, `ALL`, `COUNT`, `as_str()` and
//! `description()`.

use std::fmt;

/// Declare all error codes in a single location.
///
/// Each entry is `$variant, $description`. Generates:
/// - `ErrorCode` enum with doc comments from descriptions
/// - `ALL: &[ErrorCode]` — all variants for iteration
/// - `COUNT: usize` — variant count
/// - `as_str()` — variant name as `&'static str`
/// - `description()` — one-line summary
macro_rules! define_error_codes {
    ($( $variant:ident, $desc:literal );+ $(;)?) => {
        /// Error codes for all compiler diagnostics.
        ///
        /// Format: E#### where the first digit indicates the phase:
        /// - E2xxx: type and resolution errors
        /// - E3xxx: code generation errors
        /// - E9xxx: internal compiler errors
        #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
        pub enum ErrorCode {
            $(
                #[doc = $desc]
                $variant,
            )+
        }

        impl ErrorCode {
            /// All error code variants, for exhaustive iteration and testing.
            pub const ALL: &'static [ErrorCode] = &[ $( ErrorCode::$variant, )+ ];

            /// Number of error code variants.
            pub const COUNT: usize = [ $( ErrorCode::$variant, )+ ].len();

            /// Get the code as a string (e.g., `"E2001"`).
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => stringify!($variant), )+
                }
            }

            /// One-line summary of the error.
            pub fn description(&self) -> &'static str {
                match self {
                    $( ErrorCode::$variant => $desc, )+
                }
            }
        }
    };
}

define_error_codes! {
    // Type and resolution errors (E2xxx)
    E2001, "unknown variable";
    E2002, "unknown function or method";
    E2003, "incomparable operands";
    E2004, "record type required";
    E2005, "record has no such field";
    E2006, "wrong number of arguments";
    E2007, "expected a subtype";
    E2008, "invalid boolean expression";
    E2009, "invalid list expression";
    E2010, "invalid set or list expression";
    E2011, "invalid map expression";
    E2012, "invalid string operation";
    E2013, "invalid set operation";
    E2014, "invalid list operation";
    E2015, "invalid binary operation";
    E2016, "invalid reference expression";
    E2017, "name resolution failed";
    E2018, "function or method type expected";

    // Code generation errors (E3xxx)
    E3001, "break outside of a loop";
    E3002, "duplicate case label";
    E3003, "duplicate default label";
    E3004, "unreachable code";
    E3005, "invalid assignment target";
    E3006, "variable possibly uninitialized";

    // Internal errors (E9xxx)
    E9001, "internal compiler failure";
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
