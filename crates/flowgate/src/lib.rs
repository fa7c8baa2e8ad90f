//! Top-level facade crate for flowgate.
//!
//! Re-exports core types and the filter library so users can depend on a single crate.

pub mod core {
    pub use flowgate_core::*;
}

pub mod filter {
    pub use flowgate_filter::*;
}
