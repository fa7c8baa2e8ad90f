//! Request-side primitives seen by flow-control adapters.
//!
//! - `headers`: ordered, case-insensitive header/trailer container.
//! - `context`: per-request context carrying protocol variables.
//! - `variable`: resolution of protocol-level attributes (path/URI/arg).
//!
//! Lookups never panic: a missing attribute is reported as
//! `FlowGateError::VariableNotFound` and left to the caller's policy.

pub mod context;
pub mod headers;
pub mod variable;

pub use context::{Protocol, RequestContext};
pub use headers::{HeaderMap, HEADER_STATUS};
pub use variable::{ProtocolResolver, VariableResolver};
