//! Volta CLI: the command-line interface of the Volta hardware compiler.
//!
//! Provides `volta compile` to instantiate, propagate, and check a design from
//! a compiled block library, `volta values` to list the solved values of a
//! compiled design, and `volta dump` to pretty-print library and design files.

#![warn(missing_docs)]

mod compile;
mod dump;
mod pipeline;
mod values;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};

/// Volta: hardware designs from typed, parameterized blocks.
#[derive(Parser, Debug)]
#[command(name = "volta", version, about = "Volta hardware compiler")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Control colored output.
    #[arg(long, global = true, value_enum, default_value_t = ColorChoice::Auto)]
    pub color: ColorChoice,

    /// Path to a custom `volta.toml` configuration file.
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compile the project's top design.
    Compile(CompileArgs),
    /// List the solved values of a compiled design.
    Values(ValuesArgs),
    /// Pretty-print a library or design file.
    Dump {
        /// The file to print.
        file: PathBuf,
    },
}

/// Arguments for the `volta compile` subcommand.
#[derive(Parser, Debug)]
pub struct CompileArgs {
    /// Library file to load block definitions from.
    #[arg(short, long)]
    pub library: Option<PathBuf>,

    /// Top-level design class (overrides `project.top`).
    #[arg(short, long)]
    pub top: Option<String>,

    /// Where to write the compiled design.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Leave failing generators unexpanded instead of stopping.
    #[arg(long)]
    pub continue_on_error: bool,

    /// Output format for diagnostics (overrides `compile.format`).
    #[arg(short, long, value_enum)]
    pub format: Option<ReportFormat>,
}

/// Arguments for the `volta values` subcommand.
#[derive(Parser, Debug)]
pub struct ValuesArgs {
    /// Compiled design file.
    pub file: PathBuf,

    /// Only list values under this dotted path.
    #[arg(long)]
    pub filter: Option<String>,
}

/// Controls whether colored output is produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ColorChoice {
    /// Detect from terminal capabilities.
    Auto,
    /// Always produce colored output.
    Always,
    /// Never produce colored output.
    Never,
}

/// Diagnostic output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// One JSON object per diagnostic per line.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Whether to print verbose/debug information.
    pub verbose: bool,
    /// Whether to use colored output.
    pub color: bool,
    /// Optional path to a custom config file.
    pub config: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    let color = match cli.color {
        ColorChoice::Auto => pipeline::stderr_is_terminal(),
        ColorChoice::Always => true,
        ColorChoice::Never => false,
    };

    let global = GlobalArgs {
        quiet: cli.quiet,
        verbose: cli.verbose,
        color,
        config: cli.config,
    };
    pipeline::init_logging(&global);

    let result = match cli.command {
        Command::Compile(ref args) => compile::run(args, &global),
        Command::Values(ref args) => values::run(args),
        Command::Dump { ref file } => dump::run(file),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_compile_default() {
        let cli = Cli::parse_from(["volta", "compile"]);
        match cli.command {
            Command::Compile(ref args) => {
                assert!(args.library.is_none());
                assert!(args.top.is_none());
                assert!(args.output.is_none());
                assert!(!args.continue_on_error);
                assert!(args.format.is_none());
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_compile_with_args() {
        let cli = Cli::parse_from([
            "volta",
            "compile",
            "--library",
            "build/board.vlib",
            "--top",
            "boards.Blinky",
            "--output",
            "out.vdesign",
            "--continue-on-error",
            "--format",
            "json",
        ]);
        match cli.command {
            Command::Compile(ref args) => {
                assert_eq!(args.library, Some(PathBuf::from("build/board.vlib")));
                assert_eq!(args.top.as_deref(), Some("boards.Blinky"));
                assert_eq!(args.output, Some(PathBuf::from("out.vdesign")));
                assert!(args.continue_on_error);
                assert_eq!(args.format, Some(ReportFormat::Json));
            }
            _ => panic!("expected Compile command"),
        }
    }

    #[test]
    fn parse_values_with_filter() {
        let cli = Cli::parse_from(["volta", "values", "out.vdesign", "--filter", "reg.fb"]);
        match cli.command {
            Command::Values(ref args) => {
                assert_eq!(args.file, PathBuf::from("out.vdesign"));
                assert_eq!(args.filter.as_deref(), Some("reg.fb"));
            }
            _ => panic!("expected Values command"),
        }
    }

    #[test]
    fn parse_dump() {
        let cli = Cli::parse_from(["volta", "dump", "build/board.vlib"]);
        match cli.command {
            Command::Dump { file } => assert_eq!(file, PathBuf::from("build/board.vlib")),
            _ => panic!("expected Dump command"),
        }
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::parse_from(["volta", "--quiet", "--color", "never", "compile"]);
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn parse_config_path() {
        let cli = Cli::parse_from(["volta", "--config", "/path/to/volta.toml", "compile"]);
        assert_eq!(cli.config.as_deref(), Some("/path/to/volta.toml"));
    }

    #[test]
    fn values_requires_a_file() {
        assert!(Cli::try_parse_from(["volta", "values"]).is_err());
    }
}
