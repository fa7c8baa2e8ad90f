use serde::Deserialize;
use flowgate_core::error::{FlowGateError, Result};
use flowgate_core::resource::ResourceKeySource;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    pub version: u32,

    #[serde(default)]
    pub gateway: GatewaySection,

    #[serde(default)]
    pub flow_control: FlowControlConfig,
}

impl GatewayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(FlowGateError::InvalidConfig(format!(
                "unsupported config version: {}",
                self.version
            )));
        }

        self.gateway.validate()?;
        self.flow_control.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewaySection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl GatewaySection {
    pub fn validate(&self) -> Result<()> {
        if self.listen.parse::<std::net::SocketAddr>().is_err() {
            return Err(FlowGateError::InvalidConfig(format!(
                "gateway.listen must be a valid socket address: {}",
                self.listen
            )));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8080".into()
}

/// What the caller does when the decision engine errors or times out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailMode {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FlowControlConfig {
    #[serde(default)]
    pub global_switch: bool,

    /// Log block verdicts but let the request through.
    #[serde(default)]
    pub monitor: bool,

    /// PATH | URI | ARG. Unknown values fall back to PATH.
    #[serde(default = "default_key_type")]
    pub limit_key_type: String,

    /// Single argument used as the key when `limit_key_type` is ARG.
    #[serde(default)]
    pub limit_arg_name: Option<String>,

    /// Registered callbacks implementation; empty selects the default one.
    #[serde(default)]
    pub callback_name: String,

    #[serde(default = "default_engine_timeout_ms")]
    pub engine_timeout_ms: u64,

    #[serde(default)]
    pub fail_mode: FailMode,

    #[serde(default)]
    pub action: BlockActionConfig,

    #[serde(default)]
    pub rules: Vec<RuleConfig>,
}

impl Default for FlowControlConfig {
    fn default() -> Self {
        Self {
            global_switch: false,
            monitor: false,
            limit_key_type: default_key_type(),
            limit_arg_name: None,
            callback_name: String::new(),
            engine_timeout_ms: default_engine_timeout_ms(),
            fail_mode: FailMode::default(),
            action: BlockActionConfig::default(),
            rules: Vec::new(),
        }
    }
}

impl FlowControlConfig {
    pub fn validate(&self) -> Result<()> {
        if !(1..=10_000).contains(&self.engine_timeout_ms) {
            return Err(FlowGateError::InvalidConfig(
                "flow_control.engine_timeout_ms must be between 1 and 10000".into(),
            ));
        }

        self.action.validate()?;

        for (i, rule) in self.rules.iter().enumerate() {
            rule.validate()
                .map_err(|e| FlowGateError::InvalidConfig(format!("flow_control.rules[{i}]: {e}")))?;
        }

        Ok(())
    }

    pub fn key_source(&self) -> ResourceKeySource {
        ResourceKeySource::from_key_type(&self.limit_key_type, self.limit_arg_name.as_deref())
    }
}

fn default_key_type() -> String {
    "PATH".into()
}
fn default_engine_timeout_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BlockActionConfig {
    #[serde(default = "default_block_status")]
    pub status: u16,

    #[serde(default = "default_block_body")]
    pub body: String,
}

impl Default for BlockActionConfig {
    fn default() -> Self {
        Self {
            status: default_block_status(),
            body: default_block_body(),
        }
    }
}

impl BlockActionConfig {
    pub fn validate(&self) -> Result<()> {
        if !(100..=599).contains(&self.status) {
            return Err(FlowGateError::InvalidConfig(
                "flow_control.action.status must be between 100 and 599".into(),
            ));
        }
        Ok(())
    }
}

fn default_block_status() -> u16 {
    509
}
fn default_block_body() -> String {
    "current request is limited".into()
}

/// Local engine rule for one resource.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleConfig {
    pub resource: String,

    #[serde(default)]
    pub qps: Option<u32>,

    #[serde(default)]
    pub burst: Option<u32>,

    #[serde(default)]
    pub max_concurrency: Option<u32>,
}

impl RuleConfig {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.resource.is_empty() {
            return Err("resource must not be empty".into());
        }
        if self.qps.is_none() && self.max_concurrency.is_none() {
            return Err("at least one of qps/max_concurrency is required".into());
        }
        if self.qps == Some(0) || self.max_concurrency == Some(0) {
            return Err("limits must be greater than zero".into());
        }
        if self.burst.is_some() && self.qps.is_none() {
            return Err("burst requires qps".into());
        }
        if self.burst == Some(0) {
            return Err("burst must be greater than zero".into());
        }
        Ok(())
    }
}
