//! Interval constant propagation over instantiated designs.
//!
//! [`ConstProp`] turns the constraints of a design into a graph from each
//! parameter to the expressions that contribute to it: assignments, equalities
//! between references (in both directions), subset bounds, and the equalities
//! implied by joining two ports. Port-to-port connection edges are kept
//! separately so a port can find the link it ends up on.
//!
//! Values are resolved lazily by [`ConstProp::resolve`]. Unknown is a normal
//! answer (`None`); conflicts and cycles become [`Value::Error`] values that
//! poison whatever reads them instead of stopping the pass.
//!
//! # Usage
//!
//! ```ignore
//! let prop = ConstProp::from_design(&design);
//! let drawn = prop.resolve(&link_path.append_param("current_drawn"));
//! let checked = prop.check(&design, &sink);
//! let solved = prop.write_solved(&checked);
//! ```

#![warn(missing_docs)]

mod check;
pub mod errors;
mod expr;
mod graph;
pub mod ops;
mod resolve;
pub mod value;

pub use check::SOLVED_PREFIX;
pub use graph::ConstProp;
pub use value::{ErrorValue, Value};
