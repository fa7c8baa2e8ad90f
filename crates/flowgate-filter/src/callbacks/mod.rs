//! Flow-control callbacks: the adapter contract between the stream filter
//! and a decision engine.
//!
//! The stream filter drives one request through
//! `parse_resource -> (engine verdict) -> after_block | after_pass -> exit`,
//! and never calls the first three when `enabled()` is false.

pub mod default;
pub mod registry;

use std::sync::Arc;

use bytes::Bytes;

use flowgate_core::protocol::{HeaderMap, RequestContext};
use flowgate_core::resource::{ResourceDescriptor, ResourceKeySource};

use crate::config::FlowControlConfig;
use crate::filter::StreamFilterHandler;

pub use default::DefaultCallbacks;
pub use registry::{CallbacksFactory, CallbacksRegistry};

/// Response emitted when a request is denied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAction {
    pub status: u16,
    pub body: Bytes,
}

/// Immutable adapter configuration, shared by every in-flight request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    pub key_source: ResourceKeySource,
    pub global_switch: bool,
    pub action: BlockAction,
}

impl From<&FlowControlConfig> for AdapterConfig {
    fn from(cfg: &FlowControlConfig) -> Self {
        Self {
            key_source: cfg.key_source(),
            global_switch: cfg.global_switch,
            action: BlockAction {
                status: cfg.action.status,
                body: Bytes::from(cfg.action.body.clone()),
            },
        }
    }
}

/// Hooks a stream filter invokes around an admission check.
///
/// Implementations must not fail: anything that goes wrong degrades to
/// "flow control inactive for this request" plus a log entry.
pub trait FlowControlCallbacks: Send + Sync {
    /// Prepare adapter-local state. Idempotent.
    fn init(&self);

    /// Resource to check for this request, or `None` when it cannot be
    /// resolved (the request then proceeds without a verdict).
    fn parse_resource(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
        body: &Bytes,
        trailers: &HeaderMap,
    ) -> Option<ResourceDescriptor>;

    /// The engine denied the resource.
    fn after_block(
        &self,
        handler: &dyn StreamFilterHandler,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    );

    /// The engine admitted the resource.
    fn after_pass(
        &self,
        handler: &dyn StreamFilterHandler,
        ctx: &RequestContext,
        headers: &mut HeaderMap,
        body: &Bytes,
        trailers: &mut HeaderMap,
    );

    /// Filter teardown. Runs once per request whatever happened before.
    fn exit(&self, handler: &dyn StreamFilterHandler);

    fn enabled(&self) -> bool;
}

/// Shared handle the filter factory hands to every request.
pub type SharedCallbacks = Arc<dyn FlowControlCallbacks>;
