//! Configuration types deserialized from `volta.toml`.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level project configuration parsed from `volta.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    /// Core project metadata (name, version, top design).
    pub project: ProjectMeta,
    /// Compile options.
    #[serde(default)]
    pub compile: CompileConfig,
    /// Refinement directives applied while instantiating the design.
    #[serde(default)]
    pub refinements: RefinementConfig,
}

/// Core project metadata required in every `volta.toml`.
#[derive(Debug, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// The project version string.
    pub version: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
    /// Library class name of the top-level design, e.g. `boards.BlinkyBoard`.
    pub top: String,
    /// Path to the compiled block library, relative to the project directory.
    #[serde(default)]
    pub library: Option<String>,
}

/// How diagnostics are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticFormat {
    /// Human-readable terminal output.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Options controlling a compile.
#[derive(Debug, Default, Deserialize)]
pub struct CompileConfig {
    /// Keep going past generator failures, recording them in block metadata.
    #[serde(default)]
    pub continue_on_error: bool,
    /// Command of the external constraint solver, if one should be invoked.
    #[serde(default)]
    pub solver: Option<String>,
    /// Extra arguments passed to the solver command.
    #[serde(default)]
    pub solver_args: Vec<String>,
    /// Where the compiled design is written, relative to the project directory.
    #[serde(default)]
    pub output: Option<String>,
    /// Diagnostic output format.
    #[serde(default)]
    pub format: DiagnosticFormat,
}

/// Class and instance substitutions plus literal parameter overrides.
///
/// Keys of `instances` and `values` are dotted design paths relative to the
/// top block, e.g. `reg.fb.r1` or `reg.fb.r1.resistance`.
#[derive(Debug, Default, Deserialize)]
pub struct RefinementConfig {
    /// Library class to library class substitutions.
    #[serde(default)]
    pub classes: BTreeMap<String, String>,
    /// Block instance path to library class substitutions.
    #[serde(default)]
    pub instances: BTreeMap<String, String>,
    /// Parameter path to literal value overrides.
    #[serde(default)]
    pub values: BTreeMap<String, RefinementValue>,
}

/// A literal parameter value written in TOML.
///
/// A two-element numeric array denotes a range `[lower, upper]`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RefinementValue {
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Float(f64),
    /// A string.
    Text(String),
    /// A closed range.
    Range([f64; 2]),
}
