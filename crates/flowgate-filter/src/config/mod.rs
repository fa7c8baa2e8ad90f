//! Gateway config loader (strict parsing).

pub mod schema;

use std::fs;

use flowgate_core::error::{FlowGateError, Result};

pub use schema::{BlockActionConfig, FailMode, FlowControlConfig, GatewayConfig, RuleConfig};

pub fn load_from_file(path: &str) -> Result<GatewayConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| FlowGateError::Internal(format!("read config failed: {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<GatewayConfig> {
    let cfg: GatewayConfig = serde_yaml::from_str(s)
        .map_err(|e| FlowGateError::InvalidConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
