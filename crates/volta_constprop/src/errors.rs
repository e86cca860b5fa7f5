//! Diagnostic codes for constant propagation.
//!
//! Error codes `E300`--`E302` cover parameters without a consistent value and
//! failed constraints. Warning `W300` marks values that only inherit an error
//! reported elsewhere.

use volta_diagnostics::{Category, DiagnosticCode};

/// A parameter resolved to an error: conflicting values, a cycle, or an
/// invalid operation.
pub const E300: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 300,
};

/// A boolean constraint evaluated to false.
pub const E301: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 301,
};

/// A constraint evaluated to something other than a boolean.
pub const E302: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 302,
};

/// A parameter depends on a value that is itself an error.
pub const W300: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 300,
};
