//! Project resolution: merging `volta.toml` with command-line overrides.

use crate::error::ConfigError;
use crate::types::{DiagnosticFormat, ProjectConfig};
use std::path::{Path, PathBuf};

/// Command-line values that take precedence over the configuration file.
#[derive(Debug, Default, Clone)]
pub struct CompileOverrides {
    /// Replaces `project.top`.
    pub top: Option<String>,
    /// Replaces `project.library`.
    pub library: Option<PathBuf>,
    /// Replaces `compile.output`.
    pub output: Option<PathBuf>,
    /// Forces continue-on-error mode when set.
    pub continue_on_error: bool,
    /// Replaces `compile.format`.
    pub format: Option<DiagnosticFormat>,
}

/// A compile request with every path made absolute against the project directory.
#[derive(Debug)]
pub struct ResolvedProject {
    /// Project name.
    pub name: String,
    /// Project version.
    pub version: String,
    /// Top-level design class.
    pub top: String,
    /// Library file to load block definitions from.
    pub library: PathBuf,
    /// Where the compiled design is written.
    pub output: PathBuf,
    /// Whether generator failures are recorded instead of aborting.
    pub continue_on_error: bool,
    /// External solver command line, program first.
    pub solver: Option<Vec<String>>,
    /// Diagnostic output format.
    pub format: DiagnosticFormat,
}

/// Resolves the compile request for a project.
///
/// The library defaults to `<project>/build/<name>.vlib` and the output to
/// `<project>/build/<name>.vdesign` when neither the file nor the overrides
/// name one.
pub fn resolve_project(
    config: &ProjectConfig,
    project_dir: &Path,
    overrides: &CompileOverrides,
) -> Result<ResolvedProject, ConfigError> {
    let name = config.project.name.clone();
    let top = overrides
        .top
        .clone()
        .unwrap_or_else(|| config.project.top.clone());
    if top.is_empty() {
        return Err(ConfigError::MissingField("project.top".to_string()));
    }

    let library = match (&overrides.library, &config.project.library) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => project_dir.join(path),
        (None, None) => project_dir.join("build").join(format!("{name}.vlib")),
    };
    let output = match (&overrides.output, &config.compile.output) {
        (Some(path), _) => path.clone(),
        (None, Some(path)) => project_dir.join(path),
        (None, None) => project_dir.join("build").join(format!("{name}.vdesign")),
    };

    let solver = config.compile.solver.as_ref().map(|program| {
        let mut command = vec![program.clone()];
        command.extend(config.compile.solver_args.iter().cloned());
        command
    });

    Ok(ResolvedProject {
        name,
        version: config.project.version.clone(),
        top,
        library,
        output,
        continue_on_error: overrides.continue_on_error || config.compile.continue_on_error,
        solver,
        format: overrides.format.unwrap_or(config.compile.format),
    })
}
