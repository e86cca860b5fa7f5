//! Errors raised by the instantiation and generator transforms.

use crate::errors;
use volta_common::InternalError;
use volta_core::BuildError;
use volta_diagnostics::Diagnostic;
use volta_ir::{DesignPath, LibraryPath, LocalPath};

/// Result of a transform step.
pub type ElaborateResult<T> = Result<T, ElaborateError>;

/// A failure that stops compiling the design.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ElaborateError {
    /// The library could not produce an element.
    #[error("cannot instantiate {class} at {path}: {source}")]
    Library {
        /// Where the element was needed.
        path: DesignPath,
        /// The class asked for.
        class: LibraryPath,
        /// What the library reported.
        source: BuildError,
    },

    /// The library produced the wrong kind of element.
    #[error("{class} at {path} is a {found}, not a {expected}")]
    WrongKind {
        /// Where the element was needed.
        path: DesignPath,
        /// The class asked for.
        class: LibraryPath,
        /// The kind the use requires.
        expected: &'static str,
        /// The kind the library returned.
        found: &'static str,
    },

    /// A required generator input that nothing constrains.
    #[error("required input {input} of generator {path} has no value")]
    MissingInput {
        /// The generator block.
        path: DesignPath,
        /// The input, relative to the block.
        input: LocalPath,
    },

    /// A required generator input that resolved to an error.
    #[error("required input {input} of generator {path} is erroneous: {desc}")]
    ErroneousInput {
        /// The generator block.
        path: DesignPath,
        /// The input, relative to the block.
        input: LocalPath,
        /// The error value.
        desc: String,
    },

    /// A generator body that failed.
    #[error("generator {path} failed: {source}")]
    Generator {
        /// The generator block.
        path: DesignPath,
        /// What the generator reported.
        source: BuildError,
    },

    /// A generated block whose ports or parameters differ from its stub.
    #[error("generator {path} changed its interface: {detail}")]
    StructureMismatch {
        /// The generator block.
        path: DesignPath,
        /// What differs.
        detail: String,
    },

    /// A vector connection or allocation that cannot be expanded.
    #[error("cannot expand `{name}` in {path}: {reason}")]
    Connection {
        /// The block or link owning the constraint.
        path: DesignPath,
        /// Constraint name.
        name: String,
        /// Why.
        reason: String,
    },

    /// A bug in the compiler.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

impl ElaborateError {
    /// Whether the error belongs to a single generator and compilation may go
    /// on without it.
    pub fn is_generator_local(&self) -> bool {
        matches!(
            self,
            ElaborateError::MissingInput { .. }
                | ElaborateError::ErroneousInput { .. }
                | ElaborateError::Generator { .. }
        )
    }

    /// The design path the error is about.
    pub fn path(&self) -> Option<&DesignPath> {
        match self {
            ElaborateError::Library { path, .. }
            | ElaborateError::WrongKind { path, .. }
            | ElaborateError::MissingInput { path, .. }
            | ElaborateError::ErroneousInput { path, .. }
            | ElaborateError::Generator { path, .. }
            | ElaborateError::StructureMismatch { path, .. }
            | ElaborateError::Connection { path, .. } => Some(path),
            ElaborateError::Internal(_) => None,
        }
    }

    /// Converts the error to a diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = match self {
            ElaborateError::Library { source, .. } => {
                Diagnostic::error(errors::E200, self.to_string())
                    .with_note(format!("{}: {source}", errors::build_code(source)))
            }
            ElaborateError::WrongKind { .. } => Diagnostic::error(errors::E201, self.to_string()),
            ElaborateError::MissingInput { input, .. } => {
                Diagnostic::error(errors::E202, self.to_string()).with_help(format!(
                    "assign `{input}`, or refine it with a value in `[refinements.values]`"
                ))
            }
            ElaborateError::ErroneousInput { .. } => {
                Diagnostic::error(errors::E203, self.to_string())
            }
            ElaborateError::Generator { source, .. } => {
                Diagnostic::error(errors::build_code(source), self.to_string())
            }
            ElaborateError::StructureMismatch { .. } => {
                Diagnostic::error(errors::E205, self.to_string())
                    .with_note("generators may only add contents, not ports or parameters")
            }
            ElaborateError::Connection { .. } => Diagnostic::error(errors::E206, self.to_string()),
            ElaborateError::Internal(err) => {
                return Diagnostic::error(errors::E208, err.to_string())
            }
        };
        match self.path() {
            Some(path) => diag.at(path.to_string()),
            None => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_names_the_path() {
        let err = ElaborateError::MissingInput {
            path: DesignPath::of_blocks(&["chain"]),
            input: LocalPath::names(&["count"]),
        };
        let diag = err.to_diagnostic();
        assert_eq!(diag.code, errors::E202);
        assert!(diag.message.contains("count"));
        assert_eq!(diag.path.as_deref(), Some("chain"));
        assert!(err.is_generator_local());
    }

    #[test]
    fn generator_failure_keeps_builder_code() {
        let err = ElaborateError::Generator {
            path: DesignPath::of_blocks(&["chain"]),
            source: BuildError::UnknownClass("power.Gone".into()),
        };
        assert_eq!(err.to_diagnostic().code, errors::E105);
    }

    #[test]
    fn structure_mismatch_is_not_local() {
        let err = ElaborateError::StructureMismatch {
            path: DesignPath::root(),
            detail: "ports differ".into(),
        };
        assert!(!err.is_generator_local());
        assert_eq!(err.to_diagnostic().code, errors::E205);
    }
}
