//! Resource model handed to the decision engine.
//!
//! A `ResourceDescriptor` lives for one request: it is built by an adapter,
//! used for one admission check, then dropped.

use crate::error::{FlowGateError, Result};

/// Which request attribute names the protected resource.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ResourceKeySource {
    #[default]
    Path,
    Uri,
    /// The argument string, or a single named argument out of it.
    Arg { name: Option<String> },
}

impl ResourceKeySource {
    /// Map a configured key type (`PATH`, `URI`, `ARG`, case-insensitive).
    /// Anything unrecognized falls back to `Path`.
    pub fn from_key_type(key_type: &str, arg_name: Option<&str>) -> Self {
        match key_type.trim().to_ascii_uppercase().as_str() {
            "URI" => ResourceKeySource::Uri,
            "ARG" => ResourceKeySource::Arg {
                name: arg_name.filter(|n| !n.is_empty()).map(str::to_string),
            },
            _ => ResourceKeySource::Path,
        }
    }

    /// True when `key_type` maps to a source without falling back.
    pub fn is_known_key_type(key_type: &str) -> bool {
        matches!(
            key_type.trim().to_ascii_uppercase().as_str(),
            "PATH" | "URI" | "ARG"
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKeySource::Path => "PATH",
            ResourceKeySource::Uri => "URI",
            ResourceKeySource::Arg { .. } => "ARG",
        }
    }
}

/// Direction of the traffic being admitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrafficDirection {
    Inbound,
    Outbound,
}

impl TrafficDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            TrafficDirection::Inbound => "inbound",
            TrafficDirection::Outbound => "outbound",
        }
    }
}

/// Classification of a resource for the engine's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceType {
    Common,
    Web,
    Rpc,
}

/// Engine-specific hint attached to one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryOption {
    /// Traffic type the check is accounted under.
    TrafficType(TrafficDirection),
    /// Number of permits the check acquires (default 1).
    BatchCount(u32),
    /// Free-form key/value hint.
    Attachment { key: String, value: String },
}

/// Resolved resource plus ordered entry options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceDescriptor {
    name: String,
    resource_type: ResourceType,
    direction: TrafficDirection,
    options: Vec<EntryOption>,
}

impl ResourceDescriptor {
    /// Empty names are rejected; no descriptor exists without a resource.
    pub fn new(
        name: impl Into<String>,
        resource_type: ResourceType,
        direction: TrafficDirection,
    ) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(FlowGateError::BadRequest("resource name must not be empty".into()));
        }
        Ok(Self {
            name,
            resource_type,
            direction,
            options: Vec::new(),
        })
    }

    /// Inbound web resource with the inbound traffic-type hint.
    pub fn inbound_web(name: impl Into<String>) -> Result<Self> {
        Ok(Self::new(name, ResourceType::Web, TrafficDirection::Inbound)?
            .with_option(EntryOption::TrafficType(TrafficDirection::Inbound)))
    }

    pub fn with_option(mut self, opt: EntryOption) -> Self {
        self.options.push(opt);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    pub fn direction(&self) -> TrafficDirection {
        self.direction
    }

    pub fn options(&self) -> &[EntryOption] {
        &self.options
    }

    /// Traffic type hint, or the descriptor's direction when none is set.
    pub fn traffic_type(&self) -> TrafficDirection {
        self.options
            .iter()
            .find_map(|o| match o {
                EntryOption::TrafficType(t) => Some(*t),
                _ => None,
            })
            .unwrap_or(self.direction)
    }

    /// Permits requested by this check.
    pub fn batch_count(&self) -> u32 {
        self.options
            .iter()
            .find_map(|o| match o {
                EntryOption::BatchCount(n) => Some((*n).max(1)),
                _ => None,
            })
            .unwrap_or(1)
    }
}
