//! Shared error type across flowgate crates.

use thiserror::Error;

/// Shared result type.
pub type Result<T> = std::result::Result<T, FlowGateError>;

/// Unified error type used by core and filter.
#[derive(Debug, Error)]
pub enum FlowGateError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("variable not found: {0}")]
    VariableNotFound(String),
    #[error("unsupported protocol: {0}")]
    UnsupportedProtocol(String),
    #[error("decision engine unavailable: {0}")]
    EngineUnavailable(String),
    #[error("internal: {0}")]
    Internal(String),
}

impl FlowGateError {
    /// Stable, low-cardinality label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FlowGateError::BadRequest(_) => "bad_request",
            FlowGateError::InvalidConfig(_) => "invalid_config",
            FlowGateError::VariableNotFound(_) => "variable_not_found",
            FlowGateError::UnsupportedProtocol(_) => "unsupported_protocol",
            FlowGateError::EngineUnavailable(_) => "engine_unavailable",
            FlowGateError::Internal(_) => "internal",
        }
    }
}
