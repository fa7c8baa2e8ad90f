//! Per-request context.
//!
//! The context is the only place adapters read protocol attributes from. The
//! transport fills it once per request under protocol-specific variable names
//! (see [`crate::protocol::variable`]).

use std::collections::HashMap;

use crate::error::{FlowGateError, Result};
use crate::protocol::variable::{names_for, ProtocolVariables};

/// Application protocol of the current stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Protocol {
    Http1,
    Http2,
}

impl Protocol {
    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Http1 => "Http1",
            Protocol::Http2 => "Http2",
        }
    }

    /// Parse a protocol label such as `HTTP/1.1` or `Http2`.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "http1" | "http/1.0" | "http/1.1" => Ok(Protocol::Http1),
            "http2" | "http/2" | "http/2.0" | "h2" => Ok(Protocol::Http2),
            other => Err(FlowGateError::UnsupportedProtocol(other.to_string())),
        }
    }
}

/// Variables of one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    protocol: Protocol,
    variables: HashMap<String, String>,
}

impl RequestContext {
    pub fn new(protocol: Protocol) -> Self {
        Self {
            protocol,
            variables: HashMap::new(),
        }
    }

    /// Build a context from a request line, splitting the target into
    /// path and argument string.
    pub fn from_request(protocol: Protocol, method: &str, target: &str) -> Self {
        let names = names_for(protocol);
        let (path, arg) = match target.split_once('?') {
            Some((p, a)) => (p, Some(a)),
            None => (target, None),
        };

        let mut ctx = Self::new(protocol);
        ctx.set_variable(names.method, method);
        ctx.set_variable(names.uri, target);
        ctx.set_variable(names.path, path);
        if let Some(arg) = arg {
            ctx.set_variable(names.arg, arg);
        }
        ctx
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Protocol-specific variable names for this context.
    pub fn names(&self) -> ProtocolVariables {
        names_for(self.protocol)
    }

    pub fn set_variable(&mut self, name: &str, value: impl Into<String>) {
        self.variables.insert(name.to_string(), value.into());
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }
}
