//! flowgate filter library entry.
//!
//! Wires the config loader, flow-control callbacks, decision engine, stream
//! filter, metrics, and HTTP transport into a gateway stack. Consumed by the
//! binary (`main.rs`) and by integration tests.

pub mod app_state;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod filter;
pub mod obs;
pub mod ops;
pub mod router;
pub mod transport;
