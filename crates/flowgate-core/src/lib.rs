//! flowgate core: transport-agnostic request primitives, resource model, and
//! the shared error type.
//!
//! This crate defines what a flow-control adapter sees of a request (headers,
//! protocol variables) and what it hands to a decision engine (a resource
//! descriptor with entry options). It carries no runtime dependencies so the
//! same contracts can be used by the filter crate, tests, and embedders.
//!
//! # Defensive guarantees
//! Panics, `unwrap`, and `expect` are compile-denied here. All fallible paths
//! surface as `FlowGateError`/`Result`.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod protocol;
pub mod resource;

/// Shared result type.
pub use error::{FlowGateError, Result};
