//! Shared foundational types used across the Volta hardware compiler.
//!
//! This crate provides the closed-interval [`Range`] value type shared by the
//! expression layer and the constant propagator, content hashing for wire frames
//! and generator memoization, and common result types.

#![warn(missing_docs)]

pub mod hash;
pub mod range;
pub mod result;

pub use hash::ContentHash;
pub use range::{Range, RangeError};
pub use result::{InternalError, VoltaResult};
