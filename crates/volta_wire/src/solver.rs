//! The external solver protocol.
//!
//! A compile sends one [`SolverRequest`] frame and reads one
//! [`SolverResponse`] frame back. [`SolverProcess`] runs the solver as a
//! child process speaking the protocol over its standard input and output.

use crate::error::WireError;
use crate::frame::{read_frame, write_frame};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::process::{Command, Stdio};
use volta_ir::{Design, DesignPath, Refinements, ValueLit};

/// A design to solve.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolverRequest {
    /// The elaborated design.
    pub design: Design,
    /// Substitutions and value overrides to apply while solving.
    pub refinements: Refinements,
}

/// The solver's answer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SolverResponse {
    /// The solved design and every solved parameter.
    Solved {
        /// The design with solved values written back.
        design: Design,
        /// Solved parameters.
        values: Vec<(DesignPath, ValueLit)>,
    },
    /// The solver could not solve the design.
    Failed(String),
}

/// Sends `request` on `writer` and reads the answer from `reader`.
pub fn exchange<R: Read, W: Write>(
    reader: &mut R,
    writer: &mut W,
    request: &SolverRequest,
) -> Result<SolverResponse, WireError> {
    write_frame(writer, request)?;
    read_frame(reader)?.ok_or(WireError::Solver {
        reason: "the solver closed the stream without answering".to_string(),
    })
}

/// A solver run as a child process.
#[derive(Debug, Clone)]
pub struct SolverProcess {
    program: String,
    args: Vec<String>,
}

impl SolverProcess {
    /// A solver started with `command`, program first.
    pub fn new(command: &[String]) -> Result<Self, WireError> {
        let (program, args) = command.split_first().ok_or_else(|| WireError::Solver {
            reason: "the solver command is empty".to_string(),
        })?;
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// Starts the solver, sends `request`, and waits for it to exit.
    pub fn solve(&self, request: &SolverRequest) -> Result<SolverResponse, WireError> {
        log::debug!("starting solver {} {:?}", self.program, self.args);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|err| WireError::Solver {
                reason: format!("cannot start `{}`: {err}", self.program),
            })?;

        let answer = match (child.stdin.take(), child.stdout.take()) {
            (Some(mut stdin), Some(mut stdout)) => {
                write_frame(&mut stdin, request)?;
                // the solver reads until end of input
                drop(stdin);
                read_frame(&mut stdout)?
            }
            _ => None,
        };
        let status = child.wait()?;
        if !status.success() {
            return Err(WireError::Solver {
                reason: format!("`{}` exited with {status}", self.program),
            });
        }
        answer.ok_or(WireError::Solver {
            reason: format!("`{}` exited without answering", self.program),
        })
    }
}
