//! Diagnostic codes and helper functions for compiling a design.
//!
//! Error codes `E100`--`E106` report failures of the block builder, surfaced
//! while fetching library elements or running generators. Codes
//! `E200`--`E210` cover instantiation, generators, the top-level driver and
//! the external solver. Warnings `W200`--`W201` flag refinements that did
//! not do what they appear to.

use volta_core::BuildError;
use volta_diagnostics::{Category, Diagnostic, DiagnosticCode};

/// A builder call outside the phase that allows it.
pub const E100: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 100,
};

/// A malformed block, port, or link declaration.
pub const E101: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 101,
};

/// Operand or initializer types that do not match.
pub const E102: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 102,
};

/// A connection or export that cannot be realized.
pub const E103: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 103,
};

/// An expression that reads something the block cannot see.
pub const E104: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 104,
};

/// A class name with no registered definition.
pub const E105: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 105,
};

/// A block definition that contains itself.
pub const E106: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 106,
};

/// A library element could not be fetched during instantiation.
pub const E200: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 200,
};

/// A library element is not the kind of element its use requires.
pub const E201: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 201,
};

/// A required generator input has no value.
pub const E202: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 202,
};

/// A required generator input resolved to an error.
pub const E203: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 203,
};

/// A generator body failed.
pub const E204: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 204,
};

/// A generated block does not keep the interface of its stub.
pub const E205: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 205,
};

/// A vector connection or allocation could not be expanded.
pub const E206: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 206,
};

/// A refinement value names no parameter of the design.
pub const E207: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 207,
};

/// The top block could not be built.
pub const E208: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 208,
};

/// A refinement value that is not a valid literal for its parameter.
pub const E209: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 209,
};

/// The external solver could not be run or could not solve the design.
pub const E210: DiagnosticCode = DiagnosticCode {
    category: Category::Error,
    number: 210,
};

/// An instance refinement that matched no block.
pub const W200: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 200,
};

/// A refinement replacing a class with one that does not derive from it.
pub const W201: DiagnosticCode = DiagnosticCode {
    category: Category::Warning,
    number: 201,
};

/// The code a builder error is reported under.
pub fn build_code(err: &BuildError) -> DiagnosticCode {
    match err {
        BuildError::Lifecycle { .. } => E100,
        BuildError::Structural { .. } => E101,
        BuildError::TypeMismatch { .. } => E102,
        BuildError::Unconnectable { .. }
        | BuildError::BoundaryInitializer { .. }
        | BuildError::InaccessiblePort { .. }
        | BuildError::MissingBridge { .. }
        | BuildError::AmbiguousLink { .. } => E103,
        BuildError::UnreachableParameter { .. }
        | BuildError::UnboundExpression(_)
        | BuildError::ForeignExpression { .. }
        | BuildError::UndeclaredGeneratorInput { .. } => E104,
        BuildError::MissingGeneratorInput { .. } => E202,
        BuildError::Generator { .. } => E204,
        BuildError::UnknownClass(_) => E105,
        BuildError::CyclicDefinition(_) => E106,
        BuildError::Source(_) => E200,
    }
}

/// Creates a diagnostic for a builder error.
pub fn error_build(err: &BuildError) -> Diagnostic {
    let diag = Diagnostic::error(build_code(err), err.to_string());
    match err {
        BuildError::MissingBridge { port, .. } => diag
            .at(port.as_str())
            .with_help("give the port class a bridge, or connect it to a sub-block port"),
        BuildError::Unconnectable { port, .. }
        | BuildError::BoundaryInitializer { port }
        | BuildError::InaccessiblePort { port, .. } => diag.at(port.as_str()),
        BuildError::UndeclaredGeneratorInput { .. } => {
            diag.with_help("list every value the generator reads in its `generator` call")
        }
        BuildError::CyclicDefinition(_) => {
            diag.with_note("the block directly or indirectly contains itself")
        }
        _ => diag,
    }
}

/// Creates a diagnostic for a top block that could not be built.
pub fn error_top(name: &str, err: &BuildError) -> Diagnostic {
    Diagnostic::error(E208, format!("cannot build top block `{name}`"))
        .with_note(err.to_string())
        .with_help("set `project.top` in volta.toml to a block class of the library")
}

/// Creates a diagnostic for a refinement value with no matching parameter.
pub fn error_unknown_refinement_value(path: &str) -> Diagnostic {
    Diagnostic::error(E207, format!("refinement value `{path}` names no parameter"))
        .at(path)
        .with_help("refinement value keys are dotted paths to parameters, e.g. `reg.fb.ratio`")
}

/// Creates a diagnostic for a failed solver run.
pub fn error_solver(reason: &str) -> Diagnostic {
    Diagnostic::error(E210, "the external solver failed")
        .with_note(reason.to_string())
        .with_help("the compiled design is written without solver results")
}

/// Creates a warning for an instance refinement that never applied.
pub fn warn_unused_instance(path: &str, class: &str) -> Diagnostic {
    Diagnostic::warning(
        W200,
        format!("instance refinement `{path}` = `{class}` matched no block"),
    )
    .at(path)
}

/// Creates a warning for a refinement to a class outside the original's family.
pub fn warn_not_subclass(path: &str, original: &str, refined: &str) -> Diagnostic {
    Diagnostic::warning(
        W201,
        format!("`{refined}` does not derive from `{original}`, which it replaces"),
    )
    .at(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_formats() {
        assert_eq!(format!("{E100}"), "E100");
        assert_eq!(format!("{E202}"), "E202");
        assert_eq!(format!("{W201}"), "W201");
    }

    #[test]
    fn builder_errors_map_to_codes() {
        assert_eq!(build_code(&BuildError::UnknownClass("x.Y".into())), E105);
        assert_eq!(
            build_code(&BuildError::generator("lib.Gen", "no parts")),
            E204
        );
        let bridge = BuildError::MissingBridge {
            port: "reg.pwr".into(),
            port_class: "power.VoltageSink".into(),
        };
        let diag = error_build(&bridge);
        assert_eq!(diag.code, E103);
        assert_eq!(diag.path.as_deref(), Some("reg.pwr"));
        assert_eq!(diag.help.len(), 1);
    }

    #[test]
    fn top_not_found_diagnostic() {
        let d = error_top("power.Missing", &BuildError::UnknownClass("power.Missing".into()));
        assert_eq!(d.code, E208);
        assert!(d.message.contains("power.Missing"));
    }
}
