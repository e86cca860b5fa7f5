//! Framing, files, and the remote protocols of Volta.
//!
//! Everything Volta writes or sends is a checksummed [`frame`] holding a
//! bincode payload: library and design [`file`]s, the external [`solver`]
//! request and response, and the library [`rpc`] used to instantiate designs
//! whose definitions live in another process.
//!
//! # Usage
//!
//! ```ignore
//! let library = read_library(Path::new("build/blinky.vlib"))?;
//! let mut stream = TcpStream::connect(addr)?;
//! let client = LibraryClient::new(stream.try_clone()?, stream);
//! let top = client.top(&LibraryPath::new("boards.Blinky"))?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod file;
pub mod frame;
pub mod rpc;
pub mod solver;

pub use error::WireError;
pub use file::{read_design, read_file, read_library, write_file, DesignFile, VoltaFile};
pub use frame::{decode, encode, read_frame, write_frame, FORMAT_VERSION};
pub use rpc::{serve, LibraryClient, LibraryRequest, LibraryResponse, RemoteFailure};
pub use solver::{exchange, SolverProcess, SolverRequest, SolverResponse};
