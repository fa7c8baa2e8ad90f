//! Protocol attribute resolution.
//!
//! A resource key source (path / URI / argument) is mapped to the variable
//! name the current protocol registers it under, then read from the context.

use url::form_urlencoded;

use crate::error::{FlowGateError, Result};
use crate::protocol::context::{Protocol, RequestContext};
use crate::resource::ResourceKeySource;

/// Variable names one protocol registers its request attributes under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVariables {
    pub method: &'static str,
    pub path: &'static str,
    pub uri: &'static str,
    pub arg: &'static str,
}

const HTTP1_VARIABLES: ProtocolVariables = ProtocolVariables {
    method: "http_request_method",
    path: "http_request_path",
    uri: "http_request_uri",
    arg: "http_request_arg",
};

const HTTP2_VARIABLES: ProtocolVariables = ProtocolVariables {
    method: "http2_request_method",
    path: "http2_request_path",
    uri: "http2_request_uri",
    arg: "http2_request_arg",
};

pub fn names_for(protocol: Protocol) -> ProtocolVariables {
    match protocol {
        Protocol::Http1 => HTTP1_VARIABLES,
        Protocol::Http2 => HTTP2_VARIABLES,
    }
}

/// Context lookup service consumed by flow-control adapters.
pub trait VariableResolver: Send + Sync {
    /// Resolve `source` against `ctx`. An empty string is a valid result;
    /// callers decide whether it is usable.
    fn resolve(&self, ctx: &RequestContext, source: &ResourceKeySource) -> Result<String>;
}

/// Resolver backed by the protocol variable table.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProtocolResolver;

impl VariableResolver for ProtocolResolver {
    fn resolve(&self, ctx: &RequestContext, source: &ResourceKeySource) -> Result<String> {
        let names = ctx.names();
        let var = match source {
            ResourceKeySource::Path => names.path,
            ResourceKeySource::Uri => names.uri,
            ResourceKeySource::Arg { .. } => names.arg,
        };

        let value = ctx
            .variable(var)
            .ok_or_else(|| FlowGateError::VariableNotFound(var.to_string()))?;

        match source {
            ResourceKeySource::Arg { name: Some(arg_name) } => query_arg(value, arg_name)
                .ok_or_else(|| FlowGateError::VariableNotFound(format!("{var}.{arg_name}"))),
            _ => Ok(value.to_string()),
        }
    }
}

/// First value of `name` in a `k=v&k2=v2` argument string. Keys and values
/// are form-decoded (`%xx`, `+`) before comparing. A bare key yields an
/// empty value.
pub fn query_arg(args: &str, name: &str) -> Option<String> {
    form_urlencoded::parse(args.as_bytes())
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}
