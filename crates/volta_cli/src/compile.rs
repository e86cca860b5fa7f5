//! `volta compile`: library file to compiled design.
//!
//! The pipeline:
//!
//! 1. Find the project root and load `volta.toml`
//! 2. Merge command-line overrides into the compile request
//! 3. Convert `[refinements]` into IR refinements
//! 4. Read the library file
//! 5. Instantiate the top design, run generators, propagate and check values
//! 6. Hand the design to the external solver, if one is configured
//! 7. Write the design file and render diagnostics

use std::path::Path;

use volta_config::{CompileOverrides, DiagnosticFormat, ResolvedProject};
use volta_diagnostics::DiagnosticSink;
use volta_elaborate::{compile, errors, refinement, CompileOptions, Compiled};
use volta_ir::LibraryPath;
use volta_wire::{
    write_file, DesignFile, SolverProcess, SolverRequest, SolverResponse, VoltaFile,
};

use crate::pipeline::{render_diagnostics, resolve_project_root, summarize};
use crate::{CompileArgs, GlobalArgs, ReportFormat};

/// Runs the `volta compile` command.
///
/// Returns exit code 0 if no errors were reported, 1 otherwise.
pub fn run(args: &CompileArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project_dir = resolve_project_root(global)?;
    let config = volta_config::load_config(&project_dir)?;
    let resolved = volta_config::resolve_project(&config, &project_dir, &overrides(args))?;
    let format = match resolved.format {
        DiagnosticFormat::Text => ReportFormat::Text,
        DiagnosticFormat::Json => ReportFormat::Json,
    };

    if !global.quiet && format == ReportFormat::Text {
        eprintln!("   Compiling {} v{} ({})", resolved.name, resolved.version, resolved.top);
    }

    let sink = DiagnosticSink::new();
    let project = refinement::from_config(&config.refinements, &sink);
    let options = CompileOptions::from_project(project, resolved.continue_on_error);
    let written = compile_project(&resolved, &options, &sink)?;

    let diagnostics = sink.diagnostics();
    for rendered in render_diagnostics(&diagnostics, format, global.color) {
        match format {
            ReportFormat::Text => eprintln!("{rendered}"),
            ReportFormat::Json => println!("{rendered}"),
        }
    }

    let (error_count, warning_count) = summarize(&diagnostics);
    if !global.quiet && format == ReportFormat::Text {
        if written {
            eprintln!("     Wrote {}", resolved.output.display());
        }
        eprintln!("   Result: {error_count} error(s), {warning_count} warning(s)");
    }

    if sink.has_errors() {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn overrides(args: &CompileArgs) -> CompileOverrides {
    CompileOverrides {
        top: args.top.clone(),
        library: args.library.clone(),
        output: args.output.clone(),
        continue_on_error: args.continue_on_error,
        format: args.format.map(|format| match format {
            ReportFormat::Text => DiagnosticFormat::Text,
            ReportFormat::Json => DiagnosticFormat::Json,
        }),
    }
}

/// Compiles the project and writes the design file.
///
/// Returns whether a design was written. Design problems go to `sink`;
/// unreadable or unwritable files are returned as errors.
pub fn compile_project(
    resolved: &ResolvedProject,
    options: &CompileOptions,
    sink: &DiagnosticSink,
) -> Result<bool, Box<dyn std::error::Error>> {
    let library = volta_wire::read_library(&resolved.library)?;
    log::debug!(
        "loaded {} library elements from {}",
        library.len(),
        resolved.library.display()
    );

    let top = LibraryPath::new(resolved.top.as_str());
    let Some(mut compiled) = compile(&library, &top, options, sink)? else {
        return Ok(false);
    };
    if let Some(command) = &resolved.solver {
        if !sink.has_errors() {
            solve(command, &mut compiled, sink);
        }
    }
    write_design(&resolved.output, compiled)?;
    Ok(true)
}

/// Replaces the design and values with the solver's, or reports why not.
fn solve(command: &[String], compiled: &mut Compiled, sink: &DiagnosticSink) {
    let request = SolverRequest {
        design: compiled.design.clone(),
        refinements: compiled.refinements.clone(),
    };
    let response = SolverProcess::new(command).and_then(|solver| solver.solve(&request));
    match response {
        Ok(SolverResponse::Solved { design, values }) => {
            log::debug!("solver returned {} values", values.len());
            compiled.design = design;
            compiled.values = values;
        }
        Ok(SolverResponse::Failed(reason)) => sink.emit(errors::error_solver(&reason)),
        Err(err) => sink.emit(errors::error_solver(&err.to_string())),
    }
}

fn write_design(path: &Path, compiled: Compiled) -> Result<(), Box<dyn std::error::Error>> {
    let file = VoltaFile::Design(DesignFile {
        design: compiled.design,
        values: compiled.values,
        refinements: compiled.refinements,
    });
    write_file(path, &file)?;
    Ok(())
}
