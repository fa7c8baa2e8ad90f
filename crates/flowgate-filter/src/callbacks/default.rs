use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::Span;

use flowgate_core::protocol::{HeaderMap, RequestContext, VariableResolver, HEADER_STATUS};
use flowgate_core::resource::ResourceDescriptor;

use super::{AdapterConfig, FlowControlCallbacks};
use crate::filter::StreamFilterHandler;

/// Default adapter: keys resources by a request attribute and answers
/// blocked requests with the configured status and body.
pub struct DefaultCallbacks {
    config: Arc<AdapterConfig>,
    resolver: Arc<dyn VariableResolver>,
    span: Span,
    initialized: AtomicBool,
}

impl DefaultCallbacks {
    /// `span` is the logging collaborator; every event is emitted under it.
    pub fn new(config: Arc<AdapterConfig>, resolver: Arc<dyn VariableResolver>, span: Span) -> Self {
        Self {
            config,
            resolver,
            span,
            initialized: AtomicBool::new(false),
        }
    }
}

impl FlowControlCallbacks for DefaultCallbacks {
    fn init(&self) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::debug!(
            parent: &self.span,
            key_source = self.config.key_source.as_str(),
            enabled = self.config.global_switch,
            "flow control callbacks ready"
        );
    }

    fn parse_resource(
        &self,
        ctx: &RequestContext,
        _headers: &HeaderMap,
        _body: &Bytes,
        _trailers: &HeaderMap,
    ) -> Option<ResourceDescriptor> {
        let resource = match self.resolver.resolve(ctx, &self.config.key_source) {
            Ok(r) if !r.is_empty() => r,
            Ok(_) => {
                tracing::error!(
                    parent: &self.span,
                    key_source = self.config.key_source.as_str(),
                    "parse resource failed: empty value"
                );
                return None;
            }
            Err(e) => {
                tracing::error!(
                    parent: &self.span,
                    key_source = self.config.key_source.as_str(),
                    error = %e,
                    "parse resource failed"
                );
                return None;
            }
        };

        ResourceDescriptor::inbound_web(resource).ok()
    }

    fn after_block(
        &self,
        handler: &dyn StreamFilterHandler,
        _ctx: &RequestContext,
        headers: &mut HeaderMap,
        _body: &Bytes,
        trailers: &mut HeaderMap,
    ) {
        headers.set(HEADER_STATUS, self.config.action.status.to_string());
        handler.send_direct_response(
            headers.clone(),
            self.config.action.body.clone(),
            trailers.clone(),
        );
    }

    fn after_pass(
        &self,
        _handler: &dyn StreamFilterHandler,
        _ctx: &RequestContext,
        _headers: &mut HeaderMap,
        _body: &Bytes,
        _trailers: &mut HeaderMap,
    ) {
    }

    fn exit(&self, _handler: &dyn StreamFilterHandler) {}

    fn enabled(&self) -> bool {
        self.config.global_switch
    }
}
