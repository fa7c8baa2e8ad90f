//! Default callbacks and registry behavior.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use bytes::Bytes;
use tracing::Span;

use flowgate_core::protocol::{HeaderMap, Protocol, ProtocolResolver, RequestContext, VariableResolver};
use flowgate_core::resource::{EntryOption, ResourceKeySource, TrafficDirection};
use flowgate_filter::callbacks::{
    AdapterConfig, CallbacksFactory, CallbacksRegistry, FlowControlCallbacks, SharedCallbacks,
};
use flowgate_filter::filter::StreamFilterHandler;

use common::{adapter_config, default_callbacks, request, RecordingHandler};

#[test]
fn parse_resource_uses_request_path() {
    let cb = default_callbacks(ResourceKeySource::Path, true);
    let (ctx, headers, body, trailers) = request("/api/orders");

    let d = cb.parse_resource(&ctx, &headers, &body, &trailers).expect("descriptor");
    assert_eq!(d.name(), "/api/orders");
    assert_eq!(d.direction(), TrafficDirection::Inbound);
    assert_eq!(d.options(), &[EntryOption::TrafficType(TrafficDirection::Inbound)]);
}

#[test]
fn parse_resource_by_uri_and_named_arg() {
    let (ctx, headers, body, trailers) = request("/search?user=alice&q=x");

    let by_uri = default_callbacks(ResourceKeySource::Uri, true);
    let d = by_uri.parse_resource(&ctx, &headers, &body, &trailers).unwrap();
    assert_eq!(d.name(), "/search?user=alice&q=x");

    let by_arg = default_callbacks(ResourceKeySource::Arg { name: Some("user".into()) }, true);
    let d = by_arg.parse_resource(&ctx, &headers, &body, &trailers).unwrap();
    assert_eq!(d.name(), "alice");
}

#[test]
fn parse_resource_absent_when_variable_missing() {
    let cb = default_callbacks(ResourceKeySource::Path, true);
    // No variables registered at all.
    let ctx = RequestContext::new(Protocol::Http1);
    let got = cb.parse_resource(&ctx, &HeaderMap::new(), &Bytes::new(), &HeaderMap::new());
    assert!(got.is_none());
}

#[test]
fn parse_resource_absent_when_value_empty() {
    let cb = default_callbacks(ResourceKeySource::Arg { name: Some("user".into()) }, true);
    let (ctx, headers, body, trailers) = request("/search?user=&q=x");
    assert!(cb.parse_resource(&ctx, &headers, &body, &trailers).is_none());
}

#[test]
fn after_block_sets_status_and_sends_configured_body() {
    let cb = default_callbacks(ResourceKeySource::Path, true);
    let handler = RecordingHandler::default();
    let (ctx, mut headers, body, mut trailers) = request("/api/orders");

    cb.after_block(&handler, &ctx, &mut headers, &body, &mut trailers);

    assert_eq!(headers.get(":status"), Some("429"));
    let sent = handler.sent();
    assert_eq!(sent.len(), 1);
    let (h, b, t) = &sent[0];
    assert_eq!(h.get(":status"), Some("429"));
    assert_eq!(h.get("x-request-id"), Some("r-1"));
    assert_eq!(&b[..], b"blocked");
    assert_eq!(t, &trailers);
}

#[test]
fn after_pass_and_exit_leave_request_untouched() {
    let cb = default_callbacks(ResourceKeySource::Path, true);
    let handler = RecordingHandler::default();
    let (ctx, mut headers, body, mut trailers) = request("/api/orders");
    let (before_h, before_b, before_t) = (headers.clone(), body.clone(), trailers.clone());

    cb.after_pass(&handler, &ctx, &mut headers, &body, &mut trailers);
    cb.exit(&handler);

    assert_eq!(headers, before_h);
    assert_eq!(body, before_b);
    assert_eq!(trailers, before_t);
    assert!(handler.sent().is_empty());
}

#[test]
fn enabled_reflects_global_switch() {
    assert!(default_callbacks(ResourceKeySource::Path, true).enabled());
    assert!(!default_callbacks(ResourceKeySource::Path, false).enabled());
}

#[test]
fn init_is_idempotent() {
    let cb = default_callbacks(ResourceKeySource::Path, true);
    cb.init();
    cb.init();
    assert!(cb.enabled());
}

/// Alternative adapter keyed by a fixed tenant header.
struct TenantCallbacks {
    config: Arc<AdapterConfig>,
}

impl FlowControlCallbacks for TenantCallbacks {
    fn init(&self) {}

    fn parse_resource(
        &self,
        _ctx: &RequestContext,
        headers: &HeaderMap,
        _body: &Bytes,
        _trailers: &HeaderMap,
    ) -> Option<flowgate_core::resource::ResourceDescriptor> {
        headers
            .get("x-tenant")
            .and_then(|t| flowgate_core::resource::ResourceDescriptor::inbound_web(t).ok())
    }

    fn after_block(
        &self,
        handler: &dyn StreamFilterHandler,
        _ctx: &RequestContext,
        headers: &mut HeaderMap,
        _body: &Bytes,
        trailers: &mut HeaderMap,
    ) {
        headers.set(":status", "503");
        handler.send_direct_response(headers.clone(), Bytes::new(), trailers.clone());
    }

    fn after_pass(
        &self,
        _handler: &dyn StreamFilterHandler,
        _ctx: &RequestContext,
        headers: &mut HeaderMap,
        _body: &Bytes,
        _trailers: &mut HeaderMap,
    ) {
        headers.set("x-flow-checked", "1");
    }

    fn exit(&self, _handler: &dyn StreamFilterHandler) {}

    fn enabled(&self) -> bool {
        self.config.global_switch
    }
}

struct TenantFactory;

impl CallbacksFactory for TenantFactory {
    fn name(&self) -> &'static str {
        "tenant"
    }

    fn create(
        &self,
        config: Arc<AdapterConfig>,
        _resolver: Arc<dyn VariableResolver>,
        _span: Span,
    ) -> SharedCallbacks {
        Arc::new(TenantCallbacks { config })
    }
}

#[test]
fn registry_selects_by_name_and_falls_back_to_default() {
    let registry = CallbacksRegistry::new();
    registry.register(Arc::new(TenantFactory));
    assert_eq!(registry.registered_names(), vec!["tenant"]);

    let mut headers: HeaderMap = [("x-tenant", "acme")].into_iter().collect();
    let ctx = RequestContext::from_request(Protocol::Http1, "GET", "/api/orders");

    let tenant = registry.build(
        "tenant",
        adapter_config(ResourceKeySource::Path, true),
        Arc::new(ProtocolResolver),
    );
    let d = tenant
        .parse_resource(&ctx, &headers, &Bytes::new(), &HeaderMap::new())
        .unwrap();
    assert_eq!(d.name(), "acme");
    tenant.after_pass(
        &RecordingHandler::default(),
        &ctx,
        &mut headers,
        &Bytes::new(),
        &mut HeaderMap::new(),
    );
    assert_eq!(headers.get("x-flow-checked"), Some("1"));

    for name in ["", "missing"] {
        let cb = registry.build(
            name,
            adapter_config(ResourceKeySource::Path, true),
            Arc::new(ProtocolResolver),
        );
        let d = cb
            .parse_resource(&ctx, &headers, &Bytes::new(), &HeaderMap::new())
            .unwrap();
        assert_eq!(d.name(), "/api/orders", "callback_name={name:?}");
    }
}
