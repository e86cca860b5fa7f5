//! Library and design files.
//!
//! A file holds exactly one frame whose payload is a [`VoltaFile`]: either a
//! compiled library, the input of `volta compile`, or a compiled design with
//! its solved values, the output.

use crate::error::WireError;
use crate::frame;
use serde::{Deserialize, Serialize};
use std::path::Path;
use volta_ir::{Design, DesignPath, Library, Refinements, ValueLit};

/// The contents of a Volta file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VoltaFile {
    /// Library elements, containers before their contents.
    Library(Library),
    /// A compiled design.
    Design(DesignFile),
}

impl VoltaFile {
    /// Human-readable kind, for messages.
    pub fn kind(&self) -> &'static str {
        match self {
            VoltaFile::Library(_) => "library",
            VoltaFile::Design(_) => "design",
        }
    }
}

/// A compiled design and everything known about its values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DesignFile {
    /// The design, with solved values written back.
    pub design: Design,
    /// Every solved parameter, ordered by path.
    pub values: Vec<(DesignPath, ValueLit)>,
    /// Refinements the design was compiled with.
    pub refinements: Refinements,
}

/// Writes `file` to `path`, creating parent directories.
pub fn write_file(path: &Path, file: &VoltaFile) -> Result<(), WireError> {
    let io_err = |source| WireError::File {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let bytes = frame::encode(file)?;
    std::fs::write(path, &bytes).map_err(io_err)?;
    log::debug!("wrote {} file {} ({} bytes)", file.kind(), path.display(), bytes.len());
    Ok(())
}

/// Reads a file of either kind.
pub fn read_file(path: &Path) -> Result<VoltaFile, WireError> {
    let bytes = std::fs::read(path).map_err(|source| WireError::File {
        path: path.to_path_buf(),
        source,
    })?;
    frame::decode(&bytes)
}

/// Reads a library file.
pub fn read_library(path: &Path) -> Result<Library, WireError> {
    match read_file(path)? {
        VoltaFile::Library(library) => Ok(library),
        VoltaFile::Design(_) => Err(WireError::UnexpectedMessage {
            expected: "a library file",
        }),
    }
}

/// Reads a design file.
pub fn read_design(path: &Path) -> Result<DesignFile, WireError> {
    match read_file(path)? {
        VoltaFile::Design(design) => Ok(design),
        VoltaFile::Library(_) => Err(WireError::UnexpectedMessage {
            expected: "a design file",
        }),
    }
}
