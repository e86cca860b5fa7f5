//! Diagnostic creation, severity management, and rendering.
//!
//! Design errors found while elaborating, instantiating, or propagating a design
//! are reported as structured [`Diagnostic`] messages. Each carries a code, a
//! severity, and the dotted design path of the offending element. The thread-safe
//! [`DiagnosticSink`] accumulates them, and [`DiagnosticRenderer`] implementations
//! format them for the terminal or as JSON.

#![warn(missing_docs)]

pub mod code;
pub mod diagnostic;
pub mod label;
pub mod renderer;
pub mod severity;
pub mod sink;

pub use code::{Category, DiagnosticCode};
pub use diagnostic::Diagnostic;
pub use label::{Label, LabelStyle};
pub use renderer::{DiagnosticRenderer, JsonRenderer, TerminalRenderer};
pub use severity::Severity;
pub use sink::DiagnosticSink;
