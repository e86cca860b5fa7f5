//! Errors raised while building and emitting blocks.
//!
//! Every builder operation returns [`BuildResult`]. All of these errors are
//! fatal for the design being elaborated; they carry the class of the block
//! that raised them and, where one exists, the dotted path of the element at
//! fault.

use crate::block::BlockState;

/// Result of a builder operation.
pub type BuildResult<T> = Result<T, BuildError>;

/// A structural, typing, connection, or generator error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// A builder call outside the lifecycle phases that allow it.
    #[error("{class}: {call} is not allowed during {state}")]
    Lifecycle {
        /// Class of the block being built.
        class: String,
        /// The offending call.
        call: &'static str,
        /// The phase the block was in.
        state: BlockState,
    },

    /// A malformed declaration, such as a duplicate name or a second generator.
    #[error("{class}: {message}")]
    Structural {
        /// Class of the block being built.
        class: String,
        /// What went wrong.
        message: String,
    },

    /// Operand types that the operator does not accept.
    #[error("type mismatch in {op}: {detail}")]
    TypeMismatch {
        /// Operator or declaration.
        op: String,
        /// The types involved.
        detail: String,
    },

    /// A connection that cannot be realized.
    #[error("cannot connect {port}: {reason}")]
    Unconnectable {
        /// Dotted path of the port.
        port: String,
        /// Why.
        reason: String,
    },

    /// An export whose boundary side carries parameter initializers.
    #[error("boundary port {port} has initializers and cannot be exported")]
    BoundaryInitializer {
        /// Dotted path of the boundary port.
        port: String,
    },

    /// A port outside the current block and its immediate sub-blocks.
    #[error("{port} is not accessible from {class}")]
    InaccessiblePort {
        /// Dotted path of the port, as far as it could be named.
        port: String,
        /// Class of the block making the connection.
        class: String,
    },

    /// A boundary port that must join a link through a bridge but has none.
    #[error("boundary port {port} of type {port_class} has no bridge to join a link")]
    MissingBridge {
        /// Dotted path of the port.
        port: String,
        /// Class of the port.
        port_class: String,
    },

    /// Joined ports that name different link classes.
    #[error("ambiguous link for {ports}: {classes}")]
    AmbiguousLink {
        /// The joined ports.
        ports: String,
        /// The link classes they name.
        classes: String,
    },

    /// An expression reading a parameter this block cannot see.
    #[error("{class}: {param} is not reachable from this block")]
    UnreachableParameter {
        /// Class of the block adding the constraint.
        class: String,
        /// Description of the parameter.
        param: String,
    },

    /// An expression node with no location in the emitted tree.
    #[error("expression {0} has no path in the emitted design")]
    UnboundExpression(String),

    /// An expression handle created by a different elaboration.
    #[error("{class}: expression handle belongs to another elaboration")]
    ForeignExpression {
        /// Class of the block that received the handle.
        class: String,
    },

    /// A generator reading a value it did not declare as required.
    #[error("{class}: generator input {path} was not declared as required")]
    UndeclaredGeneratorInput {
        /// Generator class.
        class: String,
        /// Path of the input.
        path: String,
    },

    /// A declared generator input that has no value.
    #[error("{class}: required generator input {path} has no value")]
    MissingGeneratorInput {
        /// Generator class.
        class: String,
        /// Path of the input.
        path: String,
    },

    /// A failure raised by a generator body.
    #[error("generator {class} failed: {message}")]
    Generator {
        /// Generator class.
        class: String,
        /// What went wrong.
        message: String,
    },

    /// A class name no definition is registered for.
    #[error("unknown library element {0}")]
    UnknownClass(String),

    /// A block class that contains itself.
    #[error("cyclic block definition through {0}")]
    CyclicDefinition(String),

    /// A library source that could not answer, such as a remote library
    /// whose connection failed.
    #[error("library source failed: {0}")]
    Source(String),
}

impl BuildError {
    /// A structural error for `class`.
    pub fn structural(class: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::Structural {
            class: class.into(),
            message: message.into(),
        }
    }

    /// A generator failure for `class`, for use in generator bodies.
    pub fn generator(class: impl Into<String>, message: impl Into<String>) -> Self {
        BuildError::Generator {
            class: class.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_display() {
        let err = BuildError::Lifecycle {
            class: "lib.Reg".into(),
            call: "declare_port",
            state: BlockState::Contents,
        };
        assert_eq!(
            format!("{err}"),
            "lib.Reg: declare_port is not allowed during contents"
        );
    }

    #[test]
    fn missing_bridge_display() {
        let err = BuildError::MissingBridge {
            port: "pwr".into(),
            port_class: "lib.Sink".into(),
        };
        assert!(format!("{err}").contains("has no bridge"));
    }
}
