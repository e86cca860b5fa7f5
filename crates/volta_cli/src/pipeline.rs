//! Shared helpers for CLI commands: project discovery, logging setup, and
//! diagnostic output.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use volta_config::CONFIG_FILE;
use volta_diagnostics::{
    Diagnostic, DiagnosticRenderer, JsonRenderer, Severity, TerminalRenderer,
};

use crate::{GlobalArgs, ReportFormat};

/// Walks up from `start` looking for the nearest directory containing `volta.toml`.
///
/// Returns the directory containing `volta.toml`, or an error if none is found.
pub fn find_project_root(start: &Path) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let mut current = start.to_path_buf();
    loop {
        if current.join(CONFIG_FILE).exists() {
            return Ok(current);
        }
        if !current.pop() {
            return Err(format!(
                "could not find {CONFIG_FILE} in {} or any parent directory",
                start.display()
            )
            .into());
        }
    }
}

/// Resolves the project root directory from global CLI args.
///
/// If `--config` is specified, uses that path (file → parent dir, dir → itself).
/// Otherwise walks up from the current directory looking for `volta.toml`.
pub fn resolve_project_root(global: &GlobalArgs) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if let Some(ref config_path) = global.config {
        let p = PathBuf::from(config_path);
        if p.is_file() {
            Ok(p.parent()
                .map(|p| p.to_path_buf())
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(".")))
        } else {
            Ok(p)
        }
    } else {
        find_project_root(&std::env::current_dir()?)
    }
}

/// The log level the global flags ask for.
pub fn log_level(global: &GlobalArgs) -> log::LevelFilter {
    if global.quiet {
        log::LevelFilter::Error
    } else if global.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    }
}

/// Sends library log events to stderr. `RUST_LOG` refines the level.
pub fn init_logging(global: &GlobalArgs) {
    env_logger::Builder::new()
        .format_timestamp(None)
        .filter_level(log_level(global))
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();
}

/// Whether stderr, where diagnostics go, is a terminal.
pub fn stderr_is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Renders diagnostics, one per entry, in the requested format.
pub fn render_diagnostics(
    diagnostics: &[Diagnostic],
    format: ReportFormat,
    color: bool,
) -> Vec<String> {
    match format {
        ReportFormat::Text => {
            let renderer = TerminalRenderer::new(color);
            diagnostics.iter().map(|d| renderer.render(d)).collect()
        }
        ReportFormat::Json => {
            let renderer = JsonRenderer;
            diagnostics.iter().map(|d| renderer.render(d)).collect()
        }
    }
}

/// Counts errors and warnings.
pub fn summarize(diagnostics: &[Diagnostic]) -> (usize, usize) {
    let errors = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Error)
        .count();
    let warnings = diagnostics
        .iter()
        .filter(|d| d.severity == Severity::Warning)
        .count();
    (errors, warnings)
}
